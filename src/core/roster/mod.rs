//! Tabular roster ingestion and emission

pub mod reader;
pub mod validator;
pub mod writer;

pub use reader::{read_roster, OPTIONAL_COLUMNS, REQUIRED_COLUMNS};
pub use writer::write_roster;
