//! Generate-assignment command handler

use crate::args::CommonFlags;
use shibutz::core::constraints::ConstraintChecker;
use shibutz::core::error::CoreError;
use shibutz::core::init::InitStrategy;
use shibutz::core::output::OperationInfo;
use shibutz::core::scorer::Scorer;
use std::path::Path;
use std::time::Instant;

/// Produce a feasible starting assignment for an unassigned roster.
///
/// # Errors
/// Propagates configuration, validation, initialization and I/O errors.
pub fn run(
    input_file: &Path,
    common: &CommonFlags,
    init_strategy: &str,
    config_path: Option<&Path>,
) -> Result<(), CoreError> {
    let started = Instant::now();
    let mut config = super::load_config(config_path)?;
    super::apply_common_overrides(&mut config, common);

    let init_strategy: InitStrategy =
        init_strategy
            .parse()
            .map_err(|reason| CoreError::InvalidConfig {
                key: "init_strategy".to_string(),
                reason,
            })?;
    let school = super::load_school(input_file, common.skip_validation)?;
    if school.is_fully_assigned() && school.num_classes() > 0 {
        println!("⚠ Roster is already fully assigned; re-running the initializer anyway");
    }

    let (assigned, _) =
        super::ensure_assigned(school, &config, init_strategy, common.random_seed)?;
    let checker = ConstraintChecker::from_config(&config);
    let violations = checker.validate(&assigned);
    let scorer = Scorer::from_config(&config);
    let result = scorer.score(&assigned);
    println!(
        "✓ Generated {} classes for {} students (score {:.2})",
        assigned.num_classes(),
        assigned.roster().len(),
        result.final_score
    );

    let manager = super::output_manager(common.output.as_ref());
    let dir = manager.create_run_directory("generate", input_file, init_strategy.name())?;
    manager.write_snapshot_artifacts(&dir, &assigned, &result, &config)?;
    manager.write_operation_info(
        &dir,
        &OperationInfo {
            operation: "generate".to_string(),
            input_file: input_file.display().to_string(),
            algorithm: init_strategy.name().to_string(),
            initial_score: None,
            final_score: Some(result.final_score),
            duration: started.elapsed(),
            iterations: None,
            constraints_satisfied: violations.is_empty(),
        },
    )?;
    println!("✓ Artifacts written to {}", dir.display());
    Ok(())
}
