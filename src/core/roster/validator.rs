//! Cell-level validation and skip-validation normalization
//!
//! Strict mode surfaces the first offending cell as a structured error.
//! Skip-validation mode instead normalizes each invalid cell to a safe
//! default: a synthetic 9-digit id from a stable hash, `"Unknown"`,
//! `"Student"`, `"M"`, `50.0`, `"A"`, `"A"`, `false`.

use crate::core::error::CoreError;
use crate::core::models::{Gender, Rank, StudentId};
use std::collections::HashSet;

/// Maximum accepted name length.
pub const MAX_NAME_LENGTH: usize = 50;

/// Truthy/falsy spellings accepted for boolean cells.
const TRUE_VALUES: &[&str] = &["true", "1", "yes"];
const FALSE_VALUES: &[&str] = &["false", "0", "no", ""];

fn invalid(column: &str, row: usize, reason: impl Into<String>) -> CoreError {
    CoreError::Validation {
        column: column.to_string(),
        row,
        reason: reason.into(),
    }
}

/// FNV-1a over the row's identity material; stable across runs.
fn stable_hash(material: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in material.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Derive a synthetic 9-digit id from the raw cell and row, avoiding ids
/// already taken.
#[must_use]
pub fn synthetic_id(raw: &str, row: usize, taken: &HashSet<StudentId>) -> StudentId {
    let seed = stable_hash(&format!("{raw}#{row}"));
    let mut value = 100_000_000 + (seed % 900_000_000) as u32;
    loop {
        let candidate = StudentId::new(value).expect("value stays below ten digits");
        if !taken.contains(&candidate) {
            return candidate;
        }
        value = if value >= 999_999_999 { 100_000_000 } else { value + 1 };
    }
}

/// Parse a student id cell.
///
/// # Errors
/// Strict mode: malformed or duplicate ids. Skip mode never fails; it
/// substitutes a synthetic id instead.
pub fn parse_student_id(
    raw: &str,
    row: usize,
    taken: &HashSet<StudentId>,
    skip_validation: bool,
) -> Result<StudentId, CoreError> {
    match raw.trim().parse::<StudentId>() {
        Ok(id) if !taken.contains(&id) => Ok(id),
        Ok(id) => {
            if skip_validation {
                Ok(synthetic_id(raw, row, taken))
            } else {
                Err(invalid("student_id", row, format!("duplicate student id {id}")))
            }
        }
        Err(reason) => {
            if skip_validation {
                Ok(synthetic_id(raw, row, taken))
            } else {
                Err(invalid("student_id", row, reason))
            }
        }
    }
}

/// Parse a name cell (non-empty, bounded length).
///
/// # Errors
/// Strict mode only; skip mode substitutes `fallback`.
pub fn parse_name(
    raw: &str,
    column: &str,
    fallback: &str,
    row: usize,
    skip_validation: bool,
) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return if skip_validation {
            Ok(fallback.to_string())
        } else {
            Err(invalid(column, row, "name must not be empty"))
        };
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return if skip_validation {
            Ok(trimmed.chars().take(MAX_NAME_LENGTH).collect())
        } else {
            Err(invalid(
                column,
                row,
                format!("name exceeds {MAX_NAME_LENGTH} characters"),
            ))
        };
    }
    Ok(trimmed.to_string())
}

/// Parse a gender cell.
///
/// # Errors
/// Strict mode only; skip mode defaults to `M`.
pub fn parse_gender(raw: &str, row: usize, skip_validation: bool) -> Result<Gender, CoreError> {
    match raw.parse::<Gender>() {
        Ok(gender) => Ok(gender),
        Err(reason) => {
            if skip_validation {
                Ok(Gender::M)
            } else {
                Err(invalid("gender", row, reason))
            }
        }
    }
}

/// Parse an academic-score cell in [0, 100].
///
/// # Errors
/// Strict mode only; skip mode defaults to `50.0`.
pub fn parse_academic_score(raw: &str, row: usize, skip_validation: bool) -> Result<f64, CoreError> {
    let parsed = raw.trim().parse::<f64>();
    match parsed {
        Ok(score) if (0.0..=100.0).contains(&score) => Ok(score),
        Ok(score) => {
            if skip_validation {
                Ok(50.0)
            } else {
                Err(invalid(
                    "academic_score",
                    row,
                    format!("score must lie in [0, 100], got {score}"),
                ))
            }
        }
        Err(_) => {
            if skip_validation {
                Ok(50.0)
            } else {
                Err(invalid(
                    "academic_score",
                    row,
                    format!("expected a number, got '{raw}'"),
                ))
            }
        }
    }
}

/// Parse a rank cell (A-D; empty means A).
///
/// # Errors
/// Strict mode only; skip mode defaults to `A`.
pub fn parse_rank(
    raw: &str,
    column: &str,
    row: usize,
    skip_validation: bool,
) -> Result<Rank, CoreError> {
    match raw.parse::<Rank>() {
        Ok(rank) => Ok(rank),
        Err(reason) => {
            if skip_validation {
                Ok(Rank::A)
            } else {
                Err(invalid(column, row, reason))
            }
        }
    }
}

/// Parse a boolean cell; the empty string counts as `false`.
///
/// # Errors
/// Strict mode only; skip mode defaults to `false`.
pub fn parse_bool(
    raw: &str,
    column: &str,
    row: usize,
    skip_validation: bool,
) -> Result<bool, CoreError> {
    let lowered = raw.trim().to_ascii_lowercase();
    if TRUE_VALUES.contains(&lowered.as_str()) {
        Ok(true)
    } else if FALSE_VALUES.contains(&lowered.as_str()) {
        Ok(false)
    } else if skip_validation {
        Ok(false)
    } else {
        Err(invalid(
            column,
            row,
            format!("expected a boolean, got '{raw}'"),
        ))
    }
}

/// Parse one peer-reference cell: empty is `None`; malformed ids fail in
/// strict mode and are dropped in skip mode.
///
/// # Errors
/// Strict mode only.
pub fn parse_peer_ref(
    raw: &str,
    column: &str,
    row: usize,
    skip_validation: bool,
) -> Result<Option<StudentId>, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<StudentId>() {
        Ok(id) => Ok(Some(id)),
        Err(reason) => {
            if skip_validation {
                Ok(None)
            } else {
                Err(invalid(column, row, reason))
            }
        }
    }
}

/// Parse a comma-separated force-friend list.
///
/// # Errors
/// Strict mode only; skip mode drops malformed entries.
pub fn parse_force_friend(
    raw: &str,
    row: usize,
    skip_validation: bool,
) -> Result<Vec<StudentId>, CoreError> {
    let mut ids = Vec::new();
    for part in raw.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.parse::<StudentId>() {
            Ok(id) => ids.push(id),
            Err(reason) => {
                if !skip_validation {
                    return Err(invalid("force_friend", row, reason));
                }
            }
        }
    }
    Ok(ids)
}
