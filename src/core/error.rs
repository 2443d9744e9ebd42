//! Error taxonomy for the assignment engine.
//!
//! Every fallible boundary (parsing, validation, initialization, running)
//! returns a [`CoreError`]. Hot-path constraint rejection is not an error:
//! neighborhood operations return the lightweight [`Rejection`] predicate
//! instead, and algorithms simply try another proposal.

use thiserror::Error;

/// Structured errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A cell in the input table failed validation.
    #[error("validation failed at row {row}, column '{column}': {reason}")]
    Validation {
        /// Column name of the offending cell.
        column: String,
        /// 1-based data row (header excluded).
        row: usize,
        /// Human-readable reason.
        reason: String,
    },

    /// A preference, dislike or force-group entry names an unknown student.
    #[error("{kind} references unknown student {id}")]
    UnknownReference {
        /// Which list held the reference (e.g. "preferred_friends").
        kind: String,
        /// The unresolved student id.
        id: String,
    },

    /// No feasible starting assignment exists.
    #[error("no feasible starting assignment: {reason}")]
    InfeasibleInitialization {
        /// Why initialization could not satisfy the hard constraints.
        reason: String,
    },

    /// The proposal space was exhausted without an accepted move.
    #[error("optimizer stuck after {attempts} consecutive rejected proposals")]
    Stuck {
        /// Number of consecutive rejections observed.
        attempts: usize,
    },

    /// Cooperative cancellation was signalled.
    #[error("operation cancelled")]
    Cancelled,

    /// A wall-clock budget was exceeded.
    #[error("operation exceeded its wall-clock budget")]
    Timeout,

    /// A scorer or operator error aborted a run.
    #[error("algorithm '{algorithm}' failed: {reason}")]
    RunFailed {
        /// Name of the failing algorithm.
        algorithm: String,
        /// What went wrong.
        reason: String,
    },

    /// A configuration key is unknown or out of range.
    #[error("invalid configuration key '{key}': {reason}")]
    InvalidConfig {
        /// Offending (dotted) key.
        key: String,
        /// Why the value is rejected.
        reason: String,
    },

    /// Filesystem or stream failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed tabular input.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl CoreError {
    /// Process exit code for the CLI contract.
    ///
    /// 1 = validation failure, 2 = initialization infeasible,
    /// 3 = cancelled / timed out, 4 = unexpected error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::UnknownReference { .. } | Self::InvalidConfig { .. } => {
                1
            }
            Self::InfeasibleInitialization { .. } => 2,
            Self::Cancelled | Self::Timeout => 3,
            _ => 4,
        }
    }
}
