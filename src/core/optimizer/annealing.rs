//! Simulated annealing
//!
//! Random single moves and swaps, accepted unconditionally when they do
//! not hurt and with probability `exp(Δ/T)` when they do. The temperature
//! cools exponentially and is re-raised to T0/2 when the search has gone
//! cold without progress. The best snapshot is tracked independently of
//! the wandering current one.

use crate::core::error::CoreError;
use crate::core::models::School;
use crate::core::ops::Neighborhood;
use crate::core::optimizer::{Optimizer, RunContext, RunResult, RunState};
use crate::core::progress::IterationEvent;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::BTreeMap;

/// Simulated annealing with exponential cooling and reheating.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedAnnealingOptimizer;

enum Proposal {
    Move { student: usize, target: usize },
    Swap { a: usize, b: usize },
}

impl Optimizer for SimulatedAnnealingOptimizer {
    fn name(&self) -> &'static str {
        "simulated_annealing"
    }

    fn run(&self, start: &School, ctx: &mut RunContext<'_>) -> Result<RunResult, CoreError> {
        let opt = &ctx.config.optimization;
        let params = opt.algorithms.simulated_annealing;
        let ops = Neighborhood::new(ctx.checker, ctx.config.class_config.max_class_size);
        let initial_score = ctx.scorer.evaluate(start);
        let mut state = RunState::new(self.name(), start, initial_score, ctx.seed);
        let mut current = start.clone();
        let mut current_score = initial_score;
        let mut temperature = params.initial_temperature;
        let mut no_improvement = 0usize;
        let mut reheats = 0usize;
        let mut accepted_count = 0u64;

        ctx.progress.start(&IterationEvent {
            iteration: 0,
            total_estimate: opt.max_iterations,
            current_score,
            best_score: state.best_score,
            extras: BTreeMap::from([("temperature".to_string(), temperature)]),
        });

        'steps: while state.iterations < opt.max_iterations {
            if state.poll_stop(ctx) {
                break;
            }

            // Propose one legal neighbor, retrying within the budget.
            let mut candidate = None;
            for _ in 0..opt.max_swap_attempts.max(1) {
                let Some(proposal) = propose(&current, ctx) else {
                    state.stuck = true;
                    break 'steps;
                };
                let attempt = match proposal {
                    Proposal::Move { student, target } => ops.move_student(&current, student, target),
                    Proposal::Swap { a, b } => ops.swap(&current, a, b),
                };
                ctx.progress.proposal(&IterationEvent {
                    iteration: state.iterations,
                    total_estimate: opt.max_iterations,
                    current_score,
                    best_score: state.best_score,
                    extras: BTreeMap::from([("temperature".to_string(), temperature)]),
                });
                if let Ok(next) = attempt {
                    candidate = Some(next);
                    break;
                }
            }
            let Some(next) = candidate else {
                state.stuck = true;
                state.early_stopped = true;
                break;
            };

            let next_score = ctx.scorer.evaluate(&next);
            let delta = next_score - current_score;
            let accept = delta >= 0.0 || ctx.rng.random::<f64>() < (delta / temperature).exp();
            state.iterations += 1;

            if accept {
                accepted_count += 1;
                current = next;
                current_score = next_score;
                if current_score > state.best_score {
                    state.record_best(&current, current_score);
                    no_improvement = 0;
                } else {
                    no_improvement += 1;
                }
                ctx.progress.accepted(&IterationEvent {
                    iteration: state.iterations,
                    total_estimate: opt.max_iterations,
                    current_score,
                    best_score: state.best_score,
                    extras: BTreeMap::from([("temperature".to_string(), temperature)]),
                });
            } else {
                no_improvement += 1;
            }

            temperature = (temperature * params.cooling_rate).max(params.min_temperature);
            if params.reheat_threshold > 0
                && no_improvement >= params.reheat_threshold
                && temperature < params.initial_temperature / 10.0
            {
                temperature = params.initial_temperature / 2.0;
                no_improvement = 0;
                reheats += 1;
            }
        }

        state.extras.insert("reheats".to_string(), reheats as f64);
        state
            .extras
            .insert("accepted_steps".to_string(), accepted_count as f64);
        state
            .extras
            .insert("final_temperature".to_string(), temperature);

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

/// Propose a random move (half the time) or swap. `None` when no movable
/// student exists or there is a single class.
fn propose(school: &School, ctx: &mut RunContext<'_>) -> Option<Proposal> {
    if school.num_classes() < 2 {
        return None;
    }
    let movable: Vec<usize> = (0..school.roster().len())
        .filter(|&s| school.class_of(s).is_some() && ctx.checker.is_movable(school, s))
        .collect();
    if movable.is_empty() {
        return None;
    }
    let student = *movable.choose(&mut ctx.rng).expect("movable is non-empty");
    let own_class = school.class_of(student).expect("student is assigned");

    let relocate = |ctx: &mut RunContext<'_>| {
        let offset = ctx.rng.random_range(1..school.num_classes());
        let target = (own_class + offset) % school.num_classes();
        Proposal::Move { student, target }
    };

    if ctx.rng.random::<bool>() {
        Some(relocate(ctx))
    } else {
        let partners: Vec<usize> = movable
            .iter()
            .copied()
            .filter(|&p| school.class_of(p) != Some(own_class))
            .collect();
        match partners.choose(&mut ctx.rng) {
            Some(&partner) => Some(Proposal::Swap {
                a: student,
                b: partner,
            }),
            // No cross-class partner available; fall back to relocation.
            None => Some(relocate(ctx)),
        }
    }
}
