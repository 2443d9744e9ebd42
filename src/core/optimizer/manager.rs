//! Optimization coordinator
//!
//! Composes algorithms into one user-visible result: a single run, a
//! sequential chain (each stage starting from the previous best), a
//! parallel race from one shared starting snapshot, or best-of (parallel,
//! best result only). Concurrency lives here and nowhere else: each
//! parallel run owns a deep-copied snapshot and its own rng, and joins at
//! the end of the scope. One failed run never fails its peers.

use crate::core::config::Config;
use crate::core::constraints::ConstraintChecker;
use crate::core::error::CoreError;
use crate::core::models::School;
use crate::core::optimizer::{AlgorithmKind, CancelToken, RunContext, RunResult};
use crate::core::progress::ProgressSink;
use crate::core::scorer::Scorer;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// How the coordinator composes its algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Run the first algorithm only.
    #[default]
    Single,
    /// Run all algorithms independently from the same snapshot.
    Parallel,
    /// Chain runs; each stage starts from the previous best.
    Sequential,
    /// Parallel, but only the best result is reported.
    BestOf,
}

impl Strategy {
    /// Canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
            Self::BestOf => "best_of",
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "single" => Ok(Self::Single),
            "parallel" => Ok(Self::Parallel),
            "sequential" => Ok(Self::Sequential),
            "best_of" | "bestof" => Ok(Self::BestOf),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Knobs shared by every composed run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Base rng seed.
    pub seed: u64,
    /// Give run `i` seed `seed + i` instead of the identical base seed.
    pub vary_seeds: bool,
    /// Total wall-clock budget across all composed runs.
    pub budget: Option<Duration>,
    /// Cancellation shared with the caller.
    pub cancel: CancelToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            vary_seeds: false,
            budget: None,
            cancel: CancelToken::new(),
        }
    }
}

/// The coordinator's outcome: completed runs, isolated failures and the
/// index of the best run.
#[derive(Debug)]
pub struct ManagerResult {
    /// Strategy that produced this result.
    pub strategy: Strategy,
    /// Completed runs, in execution (or submission) order.
    pub runs: Vec<RunResult>,
    /// Failed runs: algorithm name and the error, without their peers.
    pub failures: Vec<(String, CoreError)>,
    /// Index of the best run in `runs`.
    pub best_index: Option<usize>,
}

impl ManagerResult {
    /// The best completed run, if any.
    #[must_use]
    pub fn best(&self) -> Option<&RunResult> {
        self.best_index.map(|idx| &self.runs[idx])
    }
}

/// Pick the best run: highest score, ties by ascending (algorithm name,
/// seed) so parallel results are reproducible.
fn best_index(runs: &[RunResult]) -> Option<usize> {
    (0..runs.len()).reduce(|best, idx| {
        let a = &runs[best];
        let b = &runs[idx];
        if b.best_score > a.best_score
            || (b.best_score == a.best_score
                && (b.algorithm.as_str(), b.seed) < (a.algorithm.as_str(), a.seed))
        {
            idx
        } else {
            best
        }
    })
}

/// Single-, multi- and chained-algorithm coordination.
#[derive(Debug, Clone, Copy)]
pub struct OptimizationManager<'a> {
    config: &'a Config,
    scorer: Scorer,
    checker: ConstraintChecker,
}

impl<'a> OptimizationManager<'a> {
    /// Build a coordinator from configuration.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            scorer: Scorer::from_config(config),
            checker: ConstraintChecker::from_config(config),
        }
    }

    /// The scorer shared by all composed runs.
    #[must_use]
    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Run `algorithms` under `strategy`, all starting from `start`.
    ///
    /// Progress is reported through `progress` for strategies that run on
    /// the calling thread (single, sequential); parallel runs report
    /// start/end through the log only, since each owns its thread.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidConfig` when no algorithm is given.
    /// Individual run failures land in [`ManagerResult::failures`].
    pub fn optimize<'s>(
        &'s self,
        start: &School,
        algorithms: &[AlgorithmKind],
        strategy: Strategy,
        options: &RunOptions,
        progress: &mut ProgressSink<'s>,
    ) -> Result<ManagerResult, CoreError> {
        if algorithms.is_empty() {
            return Err(CoreError::InvalidConfig {
                key: "algorithms".to_string(),
                reason: "at least one algorithm is required".to_string(),
            });
        }
        let deadline = options.budget.map(|budget| Instant::now() + budget);

        match strategy {
            Strategy::Single => self.run_single(start, algorithms[0], options, deadline, progress),
            Strategy::Sequential => {
                self.run_sequential(start, algorithms, options, deadline, progress)
            }
            Strategy::Parallel => self.run_parallel(start, algorithms, options, deadline, false),
            Strategy::BestOf => self.run_parallel(start, algorithms, options, deadline, true),
        }
    }

    fn run_single<'s>(
        &'s self,
        start: &School,
        algorithm: AlgorithmKind,
        options: &RunOptions,
        deadline: Option<Instant>,
        progress: &mut ProgressSink<'s>,
    ) -> Result<ManagerResult, CoreError> {
        let mut runs = Vec::new();
        let mut failures = Vec::new();
        let mut ctx = RunContext::new(&self.scorer, &self.checker, self.config, options.seed)
            .with_cancel(options.cancel.clone())
            .with_deadline(deadline)
            .with_progress(std::mem::take(progress));
        match algorithm.build().run(start, &mut ctx) {
            Ok(result) => runs.push(result),
            Err(err) => failures.push((algorithm.name().to_string(), err)),
        }
        let best = best_index(&runs);
        Ok(ManagerResult {
            strategy: Strategy::Single,
            runs,
            failures,
            best_index: best,
        })
    }

    fn run_sequential<'s>(
        &'s self,
        start: &School,
        algorithms: &[AlgorithmKind],
        options: &RunOptions,
        deadline: Option<Instant>,
        progress: &mut ProgressSink<'s>,
    ) -> Result<ManagerResult, CoreError> {
        let mut runs: Vec<RunResult> = Vec::new();
        let mut failures = Vec::new();
        let mut current = start.clone();
        let mut sink = std::mem::take(progress);

        for (stage, &kind) in algorithms.iter().enumerate() {
            if stage > 0 && !kind.chainable() {
                logger::warn!(
                    "skipping {} at chain position {}: only chainable algorithms may follow the first stage",
                    kind.name(),
                    stage + 1
                );
                continue;
            }
            if options.cancel.is_cancelled() {
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }

            let seed = options.seed.wrapping_add(stage as u64);
            let mut ctx = RunContext::new(&self.scorer, &self.checker, self.config, seed)
                .with_cancel(options.cancel.clone())
                .with_deadline(deadline)
                .with_progress(std::mem::take(&mut sink));
            match kind.build().run(&current, &mut ctx) {
                Ok(result) => {
                    current = result.best_snapshot.clone();
                    runs.push(result);
                }
                Err(err) => {
                    // The chain continues from the last healthy snapshot.
                    failures.push((kind.name().to_string(), err));
                }
            }
            sink = std::mem::take(&mut ctx.progress);
        }

        let best = best_index(&runs);
        Ok(ManagerResult {
            strategy: Strategy::Sequential,
            runs,
            failures,
            best_index: best,
        })
    }

    fn run_parallel(
        &self,
        start: &School,
        algorithms: &[AlgorithmKind],
        options: &RunOptions,
        deadline: Option<Instant>,
        best_only: bool,
    ) -> Result<ManagerResult, CoreError> {
        let outcomes: Vec<(AlgorithmKind, Result<RunResult, CoreError>)> =
            std::thread::scope(|scope| {
                let handles: Vec<_> = algorithms
                    .iter()
                    .enumerate()
                    .map(|(index, &kind)| {
                        // Each run owns a deep-copied snapshot and rng; the
                        // cancel token and deadline are the only shared state.
                        let snapshot = start.clone();
                        let cancel = options.cancel.clone();
                        let seed = if options.vary_seeds {
                            options.seed.wrapping_add(index as u64)
                        } else {
                            options.seed
                        };
                        let scorer = &self.scorer;
                        let checker = &self.checker;
                        let config = self.config;
                        scope.spawn(move || {
                            let mut ctx = RunContext::new(scorer, checker, config, seed)
                                .with_cancel(cancel)
                                .with_deadline(deadline);
                            kind.build().run(&snapshot, &mut ctx)
                        })
                    })
                    .collect();
                algorithms
                    .iter()
                    .zip(handles)
                    .map(|(&kind, handle)| {
                        let outcome = handle.join().unwrap_or_else(|_| {
                            Err(CoreError::RunFailed {
                                algorithm: kind.name().to_string(),
                                reason: "worker thread panicked".to_string(),
                            })
                        });
                        (kind, outcome)
                    })
                    .collect()
            });

        let mut runs = Vec::new();
        let mut failures = Vec::new();
        for (kind, outcome) in outcomes {
            match outcome {
                Ok(result) => runs.push(result),
                Err(err) => failures.push((kind.name().to_string(), err)),
            }
        }

        let best = best_index(&runs);
        if best_only {
            if let Some(best) = best {
                let winner = runs.swap_remove(best);
                runs = vec![winner];
            }
            let best_index = if runs.is_empty() { None } else { Some(0) };
            return Ok(ManagerResult {
                strategy: Strategy::BestOf,
                runs,
                failures,
                best_index,
            });
        }
        Ok(ManagerResult {
            strategy: Strategy::Parallel,
            runs,
            failures,
            best_index: best,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ClassId, Gender, Rank, Roster, Student, StudentId};
    use std::sync::Arc;

    fn student(id: u32, gender: Gender) -> Student {
        Student {
            id: StudentId::new(id).unwrap(),
            first_name: "S".to_string(),
            last_name: format!("{id}"),
            gender,
            academic_score: 70.0,
            behavior_rank: Rank::A,
            studentiality_rank: Rank::A,
            assistance_package: false,
            school_of_origin: String::new(),
            preferred_friends: Vec::new(),
            disliked_peers: Vec::new(),
            force_class: None,
            force_friend: Vec::new(),
        }
    }

    fn segregated_school() -> School {
        let mut students = Vec::new();
        for n in 0..8 {
            students.push(student(100_000_001 + n, Gender::M));
        }
        for n in 8..16 {
            students.push(student(100_000_001 + n, Gender::F));
        }
        let roster = Arc::new(Roster::from_students(students).unwrap());
        let classes: Vec<Option<ClassId>> = (0..16)
            .map(|n| Some(ClassId::new(if n < 8 { "1" } else { "2" })))
            .collect();
        School::from_class_column(roster, &classes)
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.constraints.minimum_friends = 0;
        config.optimization.max_iterations = 150;
        config.optimization.algorithms.genetic.population_size = 10;
        config.optimization.algorithms.genetic.generations = 10;
        config.optimization.algorithms.genetic.elite_size = 2;
        config
    }

    #[test]
    fn test_empty_algorithm_list_is_invalid() {
        let config = config();
        let manager = OptimizationManager::new(&config);
        let school = segregated_school();
        let result = manager.optimize(
            &school,
            &[],
            Strategy::Single,
            &RunOptions::default(),
            &mut ProgressSink::disabled(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_single_strategy_runs_first_algorithm() {
        let config = config();
        let manager = OptimizationManager::new(&config);
        let school = segregated_school();
        let result = manager
            .optimize(
                &school,
                &[AlgorithmKind::RandomSwap, AlgorithmKind::LocalSearch],
                Strategy::Single,
                &RunOptions::default(),
                &mut ProgressSink::disabled(),
            )
            .unwrap();
        assert_eq!(result.runs.len(), 1);
        assert_eq!(result.runs[0].algorithm, "random_swap");
    }

    #[test]
    fn test_sequential_chains_snapshots() {
        let config = config();
        let manager = OptimizationManager::new(&config);
        let school = segregated_school();
        let result = manager
            .optimize(
                &school,
                &[AlgorithmKind::RandomSwap, AlgorithmKind::LocalSearch],
                Strategy::Sequential,
                &RunOptions::default(),
                &mut ProgressSink::disabled(),
            )
            .unwrap();
        assert_eq!(result.runs.len(), 2);
        // Each stage starts where the previous one ended.
        let first = &result.runs[0];
        let second = &result.runs[1];
        assert!((second.initial_score - first.best_score).abs() < 1e-9);
        // The chain never loses ground.
        let best = result.best().unwrap();
        assert!(best.best_score >= first.best_score);
    }

    #[test]
    fn test_sequential_skips_unchainable_random_swap() {
        let config = config();
        let manager = OptimizationManager::new(&config);
        let school = segregated_school();
        let result = manager
            .optimize(
                &school,
                &[AlgorithmKind::LocalSearch, AlgorithmKind::RandomSwap],
                Strategy::Sequential,
                &RunOptions::default(),
                &mut ProgressSink::disabled(),
            )
            .unwrap();
        assert_eq!(result.runs.len(), 1);
        assert_eq!(result.runs[0].algorithm, "local_search");
    }

    #[test]
    fn test_parallel_returns_all_runs_and_best() {
        let config = config();
        let manager = OptimizationManager::new(&config);
        let school = segregated_school();
        let result = manager
            .optimize(
                &school,
                &[AlgorithmKind::RandomSwap, AlgorithmKind::LocalSearch],
                Strategy::Parallel,
                &RunOptions::default(),
                &mut ProgressSink::disabled(),
            )
            .unwrap();
        assert_eq!(result.runs.len(), 2);
        let best = result.best().unwrap();
        for run in &result.runs {
            assert!(best.best_score >= run.best_score);
        }
    }

    #[test]
    fn test_best_of_keeps_only_winner() {
        let config = config();
        let manager = OptimizationManager::new(&config);
        let school = segregated_school();
        let result = manager
            .optimize(
                &school,
                &[AlgorithmKind::RandomSwap, AlgorithmKind::LocalSearch],
                Strategy::BestOf,
                &RunOptions::default(),
                &mut ProgressSink::disabled(),
            )
            .unwrap();
        assert_eq!(result.runs.len(), 1);
        assert!(result.best().is_some());
    }

    #[test]
    fn test_parallel_is_reproducible() {
        let config = config();
        let manager = OptimizationManager::new(&config);
        let school = segregated_school();
        let options = RunOptions {
            seed: 11,
            ..RunOptions::default()
        };
        let a = manager
            .optimize(
                &school,
                &[AlgorithmKind::RandomSwap, AlgorithmKind::SimulatedAnnealing],
                Strategy::Parallel,
                &options,
                &mut ProgressSink::disabled(),
            )
            .unwrap();
        let b = manager
            .optimize(
                &school,
                &[AlgorithmKind::RandomSwap, AlgorithmKind::SimulatedAnnealing],
                Strategy::Parallel,
                &options,
                &mut ProgressSink::disabled(),
            )
            .unwrap();
        let best_a = a.best().unwrap();
        let best_b = b.best().unwrap();
        assert_eq!(best_a.algorithm, best_b.algorithm);
        assert!((best_a.best_score - best_b.best_score).abs() < 1e-12);
    }

    #[test]
    fn test_cancelled_before_start_returns_unchanged_runs() {
        let config = config();
        let manager = OptimizationManager::new(&config);
        let school = segregated_school();
        let options = RunOptions::default();
        options.cancel.cancel();
        let result = manager
            .optimize(
                &school,
                &[AlgorithmKind::RandomSwap],
                Strategy::Single,
                &options,
                &mut ProgressSink::disabled(),
            )
            .unwrap();
        assert_eq!(result.runs.len(), 1);
        assert!(result.runs[0].cancelled);
        assert!((result.runs[0].best_score - result.runs[0].initial_score).abs() < 1e-12);
    }
}
