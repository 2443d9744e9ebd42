//! Optimization algorithms and their shared run contract
//!
//! Every algorithm implements [`Optimizer`]: it never mutates its input
//! snapshot, never scores an invalid snapshot, polls cancellation at
//! least once per iteration, and is fully reproducible from the starting
//! snapshot, the seed and the configuration.

pub mod annealing;
pub mod baseline;
pub mod genetic;
pub mod local_search;
pub mod manager;
pub mod random_swap;

pub use annealing::SimulatedAnnealingOptimizer;
pub use baseline::{BaselineGenerator, BaselineStatistics};
pub use genetic::GeneticOptimizer;
pub use local_search::LocalSearchOptimizer;
pub use manager::{ManagerResult, OptimizationManager, RunOptions, Strategy};
pub use random_swap::RandomSwapOptimizer;

use crate::core::config::Config;
use crate::core::constraints::ConstraintChecker;
use crate::core::error::CoreError;
use crate::core::models::School;
use crate::core::progress::ProgressSink;
use crate::core::scorer::Scorer;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation flag, shared between a coordinator and its
/// runs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, unsignalled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a run needs besides the starting snapshot. Nothing in the
/// core reads process-wide state: configuration, rng, cancellation and
/// the progress sink are all threaded through here.
pub struct RunContext<'a> {
    /// The scoring oracle.
    pub scorer: &'a Scorer,
    /// The hard-constraint checker.
    pub checker: &'a ConstraintChecker,
    /// Full configuration (capacity, optimization knobs).
    pub config: &'a Config,
    /// Per-run random source.
    pub rng: ChaCha8Rng,
    /// The seed `rng` was created from, echoed into results.
    pub seed: u64,
    /// Cooperative cancellation flag.
    pub cancel: CancelToken,
    /// Wall-clock budget, as an absolute deadline.
    pub deadline: Option<Instant>,
    /// Progress sink.
    pub progress: ProgressSink<'a>,
}

impl<'a> RunContext<'a> {
    /// Build a context with a seeded rng, no deadline and no progress.
    #[must_use]
    pub fn new(
        scorer: &'a Scorer,
        checker: &'a ConstraintChecker,
        config: &'a Config,
        seed: u64,
    ) -> Self {
        Self {
            scorer,
            checker,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            cancel: CancelToken::new(),
            deadline: None,
            progress: ProgressSink::disabled(),
        }
    }

    /// Attach a progress sink.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressSink<'a>) -> Self {
        self.progress = progress;
        self
    }

    /// Attach a shared cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Bound the run by a wall-clock budget.
    #[must_use]
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.deadline = Some(Instant::now() + budget);
        self
    }

    /// Bound the run by an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Poll the stop conditions: `(cancelled, timed_out)`.
    #[must_use]
    pub fn should_stop(&self) -> (bool, bool) {
        let cancelled = self.cancel.is_cancelled();
        let timed_out = self
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline);
        (cancelled, timed_out)
    }
}

/// Outcome of one algorithm run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Algorithm name.
    pub algorithm: String,
    /// Seed the run was started with.
    pub seed: u64,
    /// Score of the starting snapshot.
    pub initial_score: f64,
    /// Best score reached.
    pub best_score: f64,
    /// Best snapshot reached.
    pub best_snapshot: School,
    /// Iterations executed.
    pub iterations_used: usize,
    /// Stopped before the iteration cap for lack of improvement.
    pub early_stopped: bool,
    /// Proposal space exhausted without an accepted move.
    pub stuck: bool,
    /// Cooperative cancellation was observed.
    pub cancelled: bool,
    /// Wall-clock budget ran out.
    pub timed_out: bool,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
    /// Hard-constraint violations in the best snapshot (always 0 for a
    /// healthy run).
    pub constraint_violations_at_end: usize,
    /// Algorithm-specific counters for reports.
    pub extras: BTreeMap<String, f64>,
}

impl RunResult {
    /// Score gained over the starting snapshot.
    #[must_use]
    pub fn improvement(&self) -> f64 {
        self.best_score - self.initial_score
    }
}

/// The capability set every algorithm exposes.
pub trait Optimizer {
    /// Stable algorithm name (used in reports and tie-breaking).
    fn name(&self) -> &'static str;

    /// Run on a starting snapshot. The input is never mutated.
    ///
    /// # Errors
    /// Only `CoreError::RunFailed` aborts a run; stuck, cancelled and
    /// timed-out runs return a normal [`RunResult`] with the matching
    /// flag set.
    fn run(&self, start: &School, ctx: &mut RunContext<'_>) -> Result<RunResult, CoreError>;
}

/// The algorithms the coordinator can dispatch. New strategies plug in
/// here without touching the coordinator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlgorithmKind {
    /// Random-swap hill climbing (the reference baseline).
    RandomSwap,
    /// Greedy local search over single moves and swaps.
    LocalSearch,
    /// Simulated annealing with exponential cooling and reheating.
    SimulatedAnnealing,
    /// Population-based evolutionary search.
    Genetic,
}

impl AlgorithmKind {
    /// Canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::RandomSwap => "random_swap",
            Self::LocalSearch => "local_search",
            Self::SimulatedAnnealing => "simulated_annealing",
            Self::Genetic => "genetic",
        }
    }

    /// All kinds, for help output and the default parallel set.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::RandomSwap,
            Self::LocalSearch,
            Self::SimulatedAnnealing,
            Self::Genetic,
        ]
    }

    /// Whether the algorithm may appear in a non-initial position of a
    /// sequential chain. Random swap adds nothing on an already-improved
    /// snapshot and is excluded there.
    #[must_use]
    pub fn chainable(self) -> bool {
        !matches!(self, Self::RandomSwap)
    }

    /// Instantiate the optimizer behind this kind.
    #[must_use]
    pub fn build(self) -> Box<dyn Optimizer + Send + Sync> {
        match self {
            Self::RandomSwap => Box::new(RandomSwapOptimizer),
            Self::LocalSearch => Box::new(LocalSearchOptimizer),
            Self::SimulatedAnnealing => Box::new(SimulatedAnnealingOptimizer),
            Self::Genetic => Box::new(GeneticOptimizer),
        }
    }
}

impl FromStr for AlgorithmKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "random_swap" | "random" => Ok(Self::RandomSwap),
            "local_search" | "greedy" => Ok(Self::LocalSearch),
            "simulated_annealing" | "annealing" => Ok(Self::SimulatedAnnealing),
            "genetic" | "evolutionary" => Ok(Self::Genetic),
            other => Err(format!("unknown algorithm: {other}")),
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared bookkeeping for an in-flight run.
pub(crate) struct RunState {
    pub started: Instant,
    pub algorithm: &'static str,
    pub seed: u64,
    pub initial_score: f64,
    pub best_score: f64,
    pub best_snapshot: School,
    pub iterations: usize,
    pub early_stopped: bool,
    pub stuck: bool,
    pub cancelled: bool,
    pub timed_out: bool,
    pub extras: BTreeMap<String, f64>,
}

impl RunState {
    pub fn new(algorithm: &'static str, start: &School, initial_score: f64, seed: u64) -> Self {
        Self {
            started: Instant::now(),
            algorithm,
            seed,
            initial_score,
            best_score: initial_score,
            best_snapshot: start.clone(),
            iterations: 0,
            early_stopped: false,
            stuck: false,
            cancelled: false,
            timed_out: false,
            extras: BTreeMap::new(),
        }
    }

    /// Record a new best snapshot.
    pub fn record_best(&mut self, snapshot: &School, score: f64) {
        self.best_score = score;
        self.best_snapshot = snapshot.clone();
    }

    /// Poll the context; sets the matching flag and returns `true` when
    /// the run must wind down.
    pub fn poll_stop(&mut self, ctx: &RunContext<'_>) -> bool {
        let (cancelled, timed_out) = ctx.should_stop();
        if cancelled {
            self.cancelled = true;
        }
        if timed_out {
            self.timed_out = true;
        }
        cancelled || timed_out
    }

    /// Assemble the final result.
    pub fn finish(self, checker: &ConstraintChecker) -> RunResult {
        let constraint_violations_at_end = checker.validate(&self.best_snapshot).len();
        RunResult {
            algorithm: self.algorithm.to_string(),
            seed: self.seed,
            initial_score: self.initial_score,
            best_score: self.best_score,
            best_snapshot: self.best_snapshot,
            iterations_used: self.iterations,
            early_stopped: self.early_stopped,
            stuck: self.stuck,
            cancelled: self.cancelled,
            timed_out: self.timed_out,
            elapsed: self.started.elapsed(),
            constraint_violations_at_end,
            extras: self.extras,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names_round_trip() {
        for &kind in AlgorithmKind::all() {
            assert_eq!(kind.name().parse::<AlgorithmKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(
            "annealing".parse::<AlgorithmKind>().unwrap(),
            AlgorithmKind::SimulatedAnnealing
        );
        assert_eq!(
            "evolutionary".parse::<AlgorithmKind>().unwrap(),
            AlgorithmKind::Genetic
        );
        assert!("tabu".parse::<AlgorithmKind>().is_err());
    }

    #[test]
    fn test_random_swap_not_chainable() {
        assert!(!AlgorithmKind::RandomSwap.chainable());
        assert!(AlgorithmKind::LocalSearch.chainable());
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
