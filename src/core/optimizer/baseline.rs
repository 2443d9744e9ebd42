//! Baseline generator
//!
//! Runs the random-swap reference algorithm several times on the same
//! starting snapshot, each run with its own seed, and condenses the
//! final scores into a statistical reference distribution other
//! algorithms can be ranked against.

use crate::core::config::Config;
use crate::core::constraints::ConstraintChecker;
use crate::core::error::CoreError;
use crate::core::models::School;
use crate::core::optimizer::{
    CancelToken, Optimizer, RandomSwapOptimizer, RunContext, RunResult,
};
use crate::core::scorer::Scorer;
use std::time::{Duration, Instant};

/// Default number of baseline runs.
pub const DEFAULT_BASELINE_RUNS: usize = 10;

/// How seeds are assigned to baseline runs.
#[derive(Debug, Clone)]
pub enum SeedPlan {
    /// `base`, `base+1`, `base+2`, ...
    Sequential {
        /// First seed.
        base: u64,
    },
    /// One explicit seed per run.
    Explicit(Vec<u64>),
}

impl SeedPlan {
    fn seed_for(&self, run: usize) -> u64 {
        match self {
            Self::Sequential { base } => base.wrapping_add(run as u64),
            Self::Explicit(seeds) => seeds[run % seeds.len()],
        }
    }
}

/// Summary of one baseline run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineRun {
    /// 1-based run number.
    pub run_number: usize,
    /// Seed the run used.
    pub seed: u64,
    /// Score before optimization.
    pub initial_score: f64,
    /// Score after optimization.
    pub final_score: f64,
    /// Score gained.
    pub improvement: f64,
    /// Wall-clock duration.
    pub duration: Duration,
    /// Iterations executed.
    pub iterations_used: usize,
}

/// Statistics over a set of baseline runs.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineStatistics {
    /// The individual runs, in execution order.
    pub runs: Vec<BaselineRun>,
    /// Mean final score.
    pub mean: f64,
    /// Median final score.
    pub median: f64,
    /// Population standard deviation of final scores.
    pub std_dev: f64,
    /// Lowest final score.
    pub min: f64,
    /// Highest final score.
    pub max: f64,
}

impl BaselineStatistics {
    /// Condense per-run summaries into statistics.
    #[must_use]
    pub fn from_runs(runs: Vec<BaselineRun>) -> Self {
        let finals: Vec<f64> = runs.iter().map(|r| r.final_score).collect();
        let n = finals.len() as f64;
        let mean = if finals.is_empty() {
            0.0
        } else {
            finals.iter().sum::<f64>() / n
        };
        let mut sorted = finals.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = match sorted.len() {
            0 => 0.0,
            len if len % 2 == 1 => sorted[len / 2],
            len => (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0,
        };
        let std_dev = if finals.len() <= 1 {
            0.0
        } else {
            (finals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
        };
        let min = sorted.first().copied().unwrap_or(0.0);
        let max = sorted.last().copied().unwrap_or(0.0);
        Self {
            runs,
            mean,
            median,
            std_dev,
            min,
            max,
        }
    }

    /// Share of baseline runs (in percent) whose final score is at or
    /// below `score`. 100 means `score` beats the entire baseline.
    #[must_use]
    pub fn percentile_rank(&self, score: f64) -> f64 {
        if self.runs.is_empty() {
            return 0.0;
        }
        let at_or_below = self
            .runs
            .iter()
            .filter(|run| run.final_score <= score)
            .count();
        100.0 * at_or_below as f64 / self.runs.len() as f64
    }

    /// Render the summary text report.
    #[must_use]
    pub fn summary_report(&self) -> String {
        let mut out = String::new();
        out.push_str(&"=".repeat(60));
        out.push('\n');
        out.push_str("RANDOM SWAP BASELINE\n");
        out.push_str(&"=".repeat(60));
        out.push('\n');
        out.push_str(&format!("Runs: {}\n", self.runs.len()));
        out.push_str(&format!("Mean final score:   {:.2}\n", self.mean));
        out.push_str(&format!("Median final score: {:.2}\n", self.median));
        out.push_str(&format!("Std deviation:      {:.2}\n", self.std_dev));
        out.push_str(&format!("Min / Max:          {:.2} / {:.2}\n", self.min, self.max));
        out.push('\n');
        out.push_str("run,seed,initial,final,improvement,iterations,duration_ms\n");
        for run in &self.runs {
            out.push_str(&format!(
                "{},{},{:.2},{:.2},{:.2},{},{}\n",
                run.run_number,
                run.seed,
                run.initial_score,
                run.final_score,
                run.improvement,
                run.iterations_used,
                run.duration.as_millis()
            ));
        }
        out
    }
}

/// Outcome of a baseline generation: statistics plus the underlying runs
/// (including their snapshots, so the best can be exported).
#[derive(Debug)]
pub struct BaselineOutcome {
    /// Aggregate statistics.
    pub statistics: BaselineStatistics,
    /// The full run results, in execution order.
    pub runs: Vec<RunResult>,
}

impl BaselineOutcome {
    /// The run with the highest final score (earliest on ties).
    #[must_use]
    pub fn best_run(&self) -> Option<&RunResult> {
        self.runs.iter().reduce(|best, run| {
            if run.best_score > best.best_score {
                run
            } else {
                best
            }
        })
    }
}

/// Repeated-run baseline generation.
#[derive(Debug, Clone, Copy)]
pub struct BaselineGenerator<'a> {
    config: &'a Config,
    scorer: Scorer,
    checker: ConstraintChecker,
}

impl<'a> BaselineGenerator<'a> {
    /// Build a generator from configuration.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            scorer: Scorer::from_config(config),
            checker: ConstraintChecker::from_config(config),
        }
    }

    /// Run the baseline: `num_runs` random-swap runs over `start`.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidConfig` for zero runs or an empty
    /// explicit seed list, and propagates a failed run.
    pub fn generate(
        &self,
        start: &School,
        num_runs: usize,
        seeds: &SeedPlan,
        budget: Option<Duration>,
        cancel: &CancelToken,
    ) -> Result<BaselineOutcome, CoreError> {
        if num_runs == 0 {
            return Err(CoreError::InvalidConfig {
                key: "num_runs".to_string(),
                reason: "at least one baseline run is required".to_string(),
            });
        }
        if let SeedPlan::Explicit(list) = seeds {
            if list.is_empty() {
                return Err(CoreError::InvalidConfig {
                    key: "random_seeds".to_string(),
                    reason: "explicit seed list must not be empty".to_string(),
                });
            }
        }
        let deadline = budget.map(|b| Instant::now() + b);

        let mut results = Vec::with_capacity(num_runs);
        let mut summaries = Vec::with_capacity(num_runs);
        for run_number in 1..=num_runs {
            if cancel.is_cancelled() {
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            let seed = seeds.seed_for(run_number - 1);
            let mut ctx = RunContext::new(&self.scorer, &self.checker, self.config, seed)
                .with_cancel(cancel.clone())
                .with_deadline(deadline);
            let result = RandomSwapOptimizer.run(start, &mut ctx)?;
            summaries.push(BaselineRun {
                run_number,
                seed,
                initial_score: result.initial_score,
                final_score: result.best_score,
                improvement: result.improvement(),
                duration: result.elapsed,
                iterations_used: result.iterations_used,
            });
            results.push(result);
        }

        Ok(BaselineOutcome {
            statistics: BaselineStatistics::from_runs(summaries),
            runs: results,
        })
    }
}
