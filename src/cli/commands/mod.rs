//! CLI command handlers for Shibutz.
//!
//! Each command is implemented in its own submodule; the helpers here
//! cover the shared load-configure-initialize flow.

pub mod baseline;
pub mod config;
pub mod generate;
pub mod interactive;
pub mod optimize;
pub mod score;
pub mod validate;

use crate::args::CommonFlags;
use logger::info;
use shibutz::core::config::Config;
use shibutz::core::error::CoreError;
use shibutz::core::init::{InitStrategy, Initializer};
use shibutz::core::models::School;
use shibutz::core::output::OutputManager;
use shibutz::core::progress::IterationEvent;
use shibutz::core::roster::read_roster;
use std::path::{Path, PathBuf};

/// Load the configuration: an explicit `--config` file, or the stored
/// user configuration, or defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, CoreError> {
    match explicit {
        Some(path) => Config::load_from(path),
        None => Ok(Config::load()),
    }
}

/// Fold the shared CLI overrides into the configuration.
pub fn apply_common_overrides(config: &mut Config, flags: &CommonFlags) {
    if let Some(min_friends) = flags.min_friends {
        config.constraints.minimum_friends = min_friends;
    }
    if let Some(max_iterations) = flags.max_iterations {
        config.optimization.max_iterations = max_iterations;
    }
    if let Some(early_stop) = flags.early_stop {
        config.optimization.early_stop_threshold = early_stop;
    }
    if let Some(target_classes) = flags.target_classes {
        config.class_config.target_classes = Some(target_classes);
    }
}

/// Read a roster file and report its shape.
pub fn load_school(path: &Path, skip_validation: bool) -> Result<School, CoreError> {
    let school = read_roster(path, skip_validation)?;
    info!(
        "loaded {} students in {} classes from {}",
        school.roster().len(),
        school.num_classes(),
        path.display()
    );
    Ok(school)
}

/// Make sure the snapshot is fully assigned, initializing when needed.
/// Returns the assigned snapshot and whether initialization ran.
pub fn ensure_assigned(
    school: School,
    config: &Config,
    strategy: InitStrategy,
    seed: u64,
) -> Result<(School, bool), CoreError> {
    if school.is_fully_assigned() && school.num_classes() > 0 {
        return Ok((school, false));
    }
    info!(
        "{} unassigned students; initializing with the {} strategy",
        school.unassigned_count(),
        strategy
    );
    let initializer = Initializer::new(config);
    let mut rng = <rand_chacha::ChaCha8Rng as rand::SeedableRng>::seed_from_u64(seed);
    let assigned = initializer.initialize(&school, strategy, &mut rng)?;
    Ok((assigned, true))
}

/// The output manager for a command: `--output` or the working directory.
#[must_use]
pub fn output_manager(output: Option<&PathBuf>) -> OutputManager {
    match output {
        Some(base) => OutputManager::new(base),
        None => OutputManager::new("."),
    }
}

/// Progress callback printing one line per event.
pub fn print_progress(event: &IterationEvent) {
    if event.total_estimate > 0 {
        println!(
            "  iteration {}/{} score {:.2} best {:.2}",
            event.iteration, event.total_estimate, event.current_score, event.best_score
        );
    } else {
        println!(
            "  iteration {} score {:.2} best {:.2}",
            event.iteration, event.current_score, event.best_score
        );
    }
}
