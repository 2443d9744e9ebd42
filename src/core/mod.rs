//! Core module for the assignment engine and its collaborators

pub mod config;
pub mod constraints;
pub mod error;
pub mod init;
pub mod models;
pub mod ops;
pub mod optimizer;
pub mod output;
pub mod progress;
pub mod roster;
pub mod scorer;

/// Returns the current version of the `shibutz` crate
#[must_use]
pub const fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
