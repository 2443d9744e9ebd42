//! Score command handler

use crate::args::CommonFlags;
use shibutz::core::constraints::ConstraintChecker;
use shibutz::core::error::CoreError;
use shibutz::core::output::OperationInfo;
use shibutz::core::scorer::Scorer;
use std::path::Path;
use std::time::Instant;

/// Score a roster file and print the layer decomposition.
///
/// # Errors
/// Propagates configuration, validation and I/O errors.
pub fn run(
    input_file: &Path,
    common: &CommonFlags,
    config_path: Option<&Path>,
) -> Result<(), CoreError> {
    let started = Instant::now();
    let mut config = super::load_config(config_path)?;
    super::apply_common_overrides(&mut config, common);

    let school = super::load_school(input_file, common.skip_validation)?;
    let checker = ConstraintChecker::from_config(&config);
    let status = checker.classify(&school);
    println!("Assignment status: {status}");

    let violations = checker.validate(&school);
    if !violations.is_empty() {
        println!("⚠ {} hard-constraint violations:", violations.len());
        for violation in &violations {
            println!("  - {violation}");
        }
    }

    let scorer = Scorer::from_config(&config);
    let result = scorer.score(&school);
    println!("{}", result.detailed_report());

    if let Some(output) = &common.output {
        let manager = super::output_manager(Some(output));
        let dir = manager.create_run_directory("score", input_file, "scorer")?;
        manager.write_snapshot_artifacts(&dir, &school, &result, &config)?;
        manager.write_operation_info(
            &dir,
            &OperationInfo {
                operation: "score".to_string(),
                input_file: input_file.display().to_string(),
                algorithm: "scorer".to_string(),
                initial_score: Some(result.final_score),
                final_score: Some(result.final_score),
                duration: started.elapsed(),
                iterations: None,
                constraints_satisfied: violations.is_empty(),
            },
        )?;
        println!("✓ Artifacts written to {}", dir.display());
    }
    Ok(())
}
