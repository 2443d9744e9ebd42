//! Core library for Shibutz
//! Assignment engine, scorer and optimizers used by the CLI and other components

pub mod core;

pub use core::*;
// No logger re-exports: use the standalone `logger` crate directly.
