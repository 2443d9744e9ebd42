//! Data models for Shibutz

pub mod class;
pub mod school;
pub mod student;

pub use class::{ClassId, ClassStats};
pub use school::{ForceGroup, Roster, School, STANDARD_COLUMNS};
pub use student::{Gender, Rank, Student, StudentId};
