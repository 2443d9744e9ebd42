//! Optimize command handler

use crate::args::{CommonFlags, LogLevelArg};
use logger::warn;
use shibutz::core::constraints::ConstraintChecker;
use shibutz::core::error::CoreError;
use shibutz::core::init::InitStrategy;
use shibutz::core::optimizer::{
    AlgorithmKind, CancelToken, OptimizationManager, RunOptions, Strategy,
};
use shibutz::core::output::OperationInfo;
use shibutz::core::progress::ProgressSink;
use shibutz::core::scorer::Scorer;
use std::path::Path;
use std::time::{Duration, Instant};

/// Settings resolved from the optimize command line.
pub struct OptimizeArgs<'a> {
    /// Roster file.
    pub input_file: &'a Path,
    /// Shared flags.
    pub common: &'a CommonFlags,
    /// `--algorithm`.
    pub algorithm: &'a str,
    /// `--algorithms`.
    pub algorithms: &'a [String],
    /// `--strategy`.
    pub strategy: &'a str,
    /// `--init-strategy`.
    pub init_strategy: &'a str,
    /// `--time-budget` in seconds.
    pub time_budget: Option<u64>,
    /// Progress cadence.
    pub log_level: LogLevelArg,
}

fn parse_invalid(key: &str, reason: String) -> CoreError {
    CoreError::InvalidConfig {
        key: key.to_string(),
        reason,
    }
}

/// Optimize a roster and write the improved assignment.
///
/// # Errors
/// Propagates configuration, validation, initialization and I/O errors.
pub fn run(args: &OptimizeArgs<'_>, config_path: Option<&Path>) -> Result<(), CoreError> {
    let started = Instant::now();
    let mut config = super::load_config(config_path)?;
    super::apply_common_overrides(&mut config, args.common);

    let strategy: Strategy = args
        .strategy
        .parse()
        .map_err(|reason| parse_invalid("strategy", reason))?;
    let init_strategy: InitStrategy = args
        .init_strategy
        .parse()
        .map_err(|reason| parse_invalid("init_strategy", reason))?;
    let algorithms: Vec<AlgorithmKind> = if args.algorithms.is_empty() {
        vec![args
            .algorithm
            .parse()
            .map_err(|reason| parse_invalid("algorithm", reason))?]
    } else {
        args.algorithms
            .iter()
            .map(|name| {
                name.parse()
                    .map_err(|reason| parse_invalid("algorithms", reason))
            })
            .collect::<Result<_, _>>()?
    };

    let school = super::load_school(args.input_file, args.common.skip_validation)?;
    let (start, initialized) = super::ensure_assigned(
        school,
        &config,
        init_strategy,
        args.common.random_seed,
    )?;
    if initialized {
        println!("✓ Produced a feasible starting assignment");
    }
    let checker = ConstraintChecker::from_config(&config);
    let violations = checker.validate(&start);
    if !violations.is_empty() {
        warn!(
            "input assignment violates {} hard constraints; proposals that touch them will keep being rejected",
            violations.len()
        );
    }

    let manager = OptimizationManager::new(&config);
    let options = RunOptions {
        seed: args.common.random_seed,
        vary_seeds: matches!(strategy, Strategy::Parallel | Strategy::BestOf)
            && algorithms.windows(2).any(|pair| pair[0] == pair[1]),
        budget: args.time_budget.map(Duration::from_secs),
        cancel: CancelToken::new(),
    };
    let mut print = super::print_progress;
    let mut sink = ProgressSink::new(args.log_level.into(), &mut print);
    let outcome = manager.optimize(&start, &algorithms, strategy, &options, &mut sink)?;

    for (name, error) in &outcome.failures {
        warn!("algorithm {name} failed: {error}");
    }

    let scorer = Scorer::from_config(&config);
    let label = if algorithms.len() == 1 {
        algorithms[0].name().to_string()
    } else {
        strategy.name().to_string()
    };
    let out_manager = super::output_manager(args.common.output.as_ref());

    match outcome.best() {
        Some(best) => {
            println!(
                "✓ {}: {:.2} → {:.2} ({:+.2}) in {} iterations",
                best.algorithm,
                best.initial_score,
                best.best_score,
                best.improvement(),
                best.iterations_used
            );
            if best.cancelled {
                println!("⚠ run was cancelled; best snapshot so far is reported");
            }
            if best.timed_out {
                println!("⚠ wall-clock budget exhausted; best snapshot so far is reported");
            }
            let result = scorer.score(&best.best_snapshot);
            let dir = out_manager.create_run_directory("optimize", args.input_file, &label)?;
            out_manager.write_snapshot_artifacts(&dir, &best.best_snapshot, &result, &config)?;
            out_manager.write_operation_info(
                &dir,
                &OperationInfo {
                    operation: "optimize".to_string(),
                    input_file: args.input_file.display().to_string(),
                    algorithm: label,
                    initial_score: Some(best.initial_score),
                    final_score: Some(best.best_score),
                    duration: started.elapsed(),
                    iterations: Some(best.iterations_used),
                    constraints_satisfied: best.constraint_violations_at_end == 0,
                },
            )?;
            println!("✓ Artifacts written to {}", dir.display());
            Ok(())
        }
        None => {
            // No algorithm finished; the initializer's snapshot is still a
            // valid deliverable.
            warn!("no algorithm completed; emitting the starting assignment unchanged");
            let result = scorer.score(&start);
            let dir = out_manager.create_run_directory("optimize", args.input_file, &label)?;
            out_manager.write_snapshot_artifacts(&dir, &start, &result, &config)?;
            out_manager.write_operation_info(
                &dir,
                &OperationInfo {
                    operation: "optimize".to_string(),
                    input_file: args.input_file.display().to_string(),
                    algorithm: label,
                    initial_score: Some(result.final_score),
                    final_score: Some(result.final_score),
                    duration: started.elapsed(),
                    iterations: Some(0),
                    constraints_satisfied: true,
                },
            )?;
            println!("✓ Artifacts written to {}", dir.display());
            Ok(())
        }
    }
}
