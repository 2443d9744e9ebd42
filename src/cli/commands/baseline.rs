//! Baseline command handler

use crate::args::CommonFlags;
use shibutz::core::error::CoreError;
use shibutz::core::init::InitStrategy;
use shibutz::core::optimizer::{BaselineGenerator, CancelToken};
use shibutz::core::optimizer::baseline::SeedPlan;
use shibutz::core::output::OperationInfo;
use shibutz::core::scorer::Scorer;
use std::path::Path;
use std::time::Instant;

/// Generate the random-swap baseline distribution for a roster.
///
/// # Errors
/// Propagates configuration, validation, initialization and I/O errors.
pub fn run(
    input_file: &Path,
    common: &CommonFlags,
    num_runs: usize,
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
    let (start, _) =
        super::ensure_assigned(school, &config, init_strategy, common.random_seed)?;

    let generator = BaselineGenerator::new(&config);
    let outcome = generator.generate(
        &start,
        num_runs,
        &SeedPlan::Sequential {
            base: common.random_seed,
        },
        None,
        &CancelToken::new(),
    )?;
    println!("{}", outcome.statistics.summary_report());

    let manager = super::output_manager(common.output.as_ref());
    let dir = manager.create_run_directory("baseline", input_file, "random_swap")?;
    std::fs::write(
        dir.join("baseline_summary.txt"),
        outcome.statistics.summary_report(),
    )?;

    if let Some(best) = outcome.best_run() {
        let scorer = Scorer::from_config(&config);
        let result = scorer.score(&best.best_snapshot);
        manager.write_snapshot_artifacts(&dir, &best.best_snapshot, &result, &config)?;
        manager.write_operation_info(
            &dir,
            &OperationInfo {
                operation: "baseline".to_string(),
                input_file: input_file.display().to_string(),
                algorithm: "random_swap".to_string(),
                initial_score: Some(best.initial_score),
                final_score: Some(best.best_score),
                duration: started.elapsed(),
                iterations: Some(best.iterations_used),
                constraints_satisfied: best.constraint_violations_at_end == 0,
            },
        )?;
    }
    println!("✓ Baseline artifacts written to {}", dir.display());
    Ok(())
}
