//! Validate command handler

use shibutz::core::constraints::{AssignmentStatus, ConstraintChecker};
use shibutz::core::error::CoreError;
use std::path::Path;

/// Validate a roster file: data validation first, then hard constraints.
///
/// # Errors
/// Returns the first data-validation error in strict mode, and a
/// `Validation` error when an assigned roster breaks hard constraints.
pub fn run(
    input_file: &Path,
    skip_validation: bool,
    min_friends: Option<usize>,
    config_path: Option<&Path>,
) -> Result<(), CoreError> {
    let mut config = super::load_config(config_path)?;
    if let Some(min_friends) = min_friends {
        config.constraints.minimum_friends = min_friends;
    }

    let school = super::load_school(input_file, skip_validation)?;
    println!(
        "✓ Data valid: {} students, {} classes",
        school.roster().len(),
        school.num_classes()
    );

    let checker = ConstraintChecker::from_config(&config);
    let status = checker.classify(&school);
    println!("Assignment status: {status}");
    if status == AssignmentStatus::Unassigned {
        println!("No assignment to check constraints against.");
        return Ok(());
    }

    let violations = checker.validate(&school);
    if violations.is_empty() {
        println!("✓ All hard constraints satisfied");
        return Ok(());
    }
    println!("✗ {} hard-constraint violations:", violations.len());
    for violation in &violations {
        println!("  - {violation}");
    }
    Err(CoreError::Validation {
        column: "class".to_string(),
        row: 0,
        reason: format!("{} hard-constraint violations", violations.len()),
    })
}
