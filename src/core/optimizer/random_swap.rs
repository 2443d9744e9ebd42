//! Random-swap optimization (the reference baseline)
//!
//! Repeatedly swaps one movable student from each of two random classes
//! and keeps the result only when it beats the best score seen so far.
//! Simple, fast, and the yardstick the baseline generator measures other
//! algorithms against.

use crate::core::error::CoreError;
use crate::core::models::School;
use crate::core::ops::Neighborhood;
use crate::core::optimizer::{Optimizer, RunContext, RunResult, RunState};
use crate::core::progress::IterationEvent;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::BTreeMap;

/// Random-swap hill climbing.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSwapOptimizer;

impl Optimizer for RandomSwapOptimizer {
    fn name(&self) -> &'static str {
        "random_swap"
    }

    fn run(&self, start: &School, ctx: &mut RunContext<'_>) -> Result<RunResult, CoreError> {
        let opt = &ctx.config.optimization;
        let ops = Neighborhood::new(ctx.checker, ctx.config.class_config.max_class_size);
        let initial_score = ctx.scorer.evaluate(start);
        let mut state = RunState::new(self.name(), start, initial_score, ctx.seed);
        let mut current = start.clone();
        let mut current_score = initial_score;
        let mut no_improvement = 0usize;
        let mut attempted = 0u64;
        let mut accepted = 0u64;
        let mut rejected = 0u64;

        ctx.progress.start(&IterationEvent {
            iteration: 0,
            total_estimate: opt.max_iterations,
            current_score,
            best_score: state.best_score,
            extras: BTreeMap::new(),
        });

        'outer: while state.iterations < opt.max_iterations {
            if state.poll_stop(ctx) {
                break;
            }

            // Find one legal swap, retrying up to the attempt budget.
            let mut candidate = None;
            for _ in 0..opt.max_swap_attempts.max(1) {
                let Some((a, b)) = pick_swap_pair(&current, ctx) else {
                    state.stuck = true;
                    break 'outer;
                };
                attempted += 1;
                match ops.swap(&current, a, b) {
                    Ok(next) => {
                        candidate = Some(next);
                        break;
                    }
                    Err(_) => {
                        rejected += 1;
                        ctx.progress.proposal(&IterationEvent {
                            iteration: state.iterations,
                            total_estimate: opt.max_iterations,
                            current_score,
                            best_score: state.best_score,
                            extras: BTreeMap::new(),
                        });
                    }
                }
            }
            let Some(next) = candidate else {
                // The attempt budget produced nothing legal.
                state.stuck = true;
                state.early_stopped = true;
                break;
            };

            let next_score = ctx.scorer.evaluate(&next);
            state.iterations += 1;
            let improves = next_score > state.best_score
                || (opt.accept_neutral_moves && next_score == state.best_score);
            if improves {
                accepted += 1;
                if next_score > state.best_score {
                    no_improvement = 0;
                } else {
                    no_improvement += 1;
                }
                current = next;
                current_score = next_score;
                state.record_best(&current, next_score);
                ctx.progress.accepted(&IterationEvent {
                    iteration: state.iterations,
                    total_estimate: opt.max_iterations,
                    current_score,
                    best_score: state.best_score,
                    extras: BTreeMap::new(),
                });
            } else {
                no_improvement += 1;
                ctx.progress.proposal(&IterationEvent {
                    iteration: state.iterations,
                    total_estimate: opt.max_iterations,
                    current_score,
                    best_score: state.best_score,
                    extras: BTreeMap::new(),
                });
            }

            if opt.early_stop_threshold > 0 && no_improvement >= opt.early_stop_threshold {
                state.early_stopped = true;
                break;
            }
        }

        state.extras.insert("swaps_attempted".to_string(), attempted as f64);
        state.extras.insert("swaps_accepted".to_string(), accepted as f64);
        state.extras.insert("swaps_rejected".to_string(), rejected as f64);

        ctx.progress.finish(&IterationEvent {
            iteration: state.iterations,
            total_estimate: opt.max_iterations,
            current_score,
            best_score: state.best_score,
            extras: state.extras.clone(),
        });

        Ok(state.finish(ctx.checker))
    }
}

/// Pick one movable student from each of two distinct random classes.
/// Returns `None` when fewer than two classes hold movable students.
fn pick_swap_pair(school: &School, ctx: &mut RunContext<'_>) -> Option<(usize, usize)> {
    let mut classes_with_movable: Vec<Vec<usize>> = Vec::new();
    for class in 0..school.num_classes() {
        let movable: Vec<usize> = school
            .members(class)
            .iter()
            .copied()
            .filter(|&s| ctx.checker.is_movable(school, s))
            .collect();
        if !movable.is_empty() {
            classes_with_movable.push(movable);
        }
    }
    if classes_with_movable.len() < 2 {
        return None;
    }
    let first = ctx.rng.random_range(0..classes_with_movable.len());
    let second = {
        let pick = ctx.rng.random_range(0..classes_with_movable.len() - 1);
        if pick >= first {
            pick + 1
        } else {
            pick
        }
    };
    let a = *classes_with_movable[first]
        .choose(&mut ctx.rng)
        .expect("class has movable students");
    let b = *classes_with_movable[second]
        .choose(&mut ctx.rng)
        .expect("class has movable students");
    Some((a, b))
}
