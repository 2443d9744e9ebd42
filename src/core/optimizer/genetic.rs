//! Evolutionary population search
//!
//! A population of snapshots evolves by elitism, tournament selection,
//! uniform per-student crossover with constraint repair, and swap
//! mutation. Fitness is the scorer's final score. Children that cannot
//! be repaired back into feasibility fall back to a parent clone, so
//! every individual ever scored satisfies the hard constraints.

use crate::core::error::CoreError;
use crate::core::models::School;
use crate::core::ops::Neighborhood;
use crate::core::optimizer::{Optimizer, RunContext, RunResult, RunState};
use crate::core::progress::IterationEvent;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

const MUTATION_SWAPS_MAX: usize = 3;
const MUTATION_ATTEMPTS_PER_SWAP: usize = 8;
const REPAIR_PASSES: usize = 3;

/// Population-based evolutionary optimizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneticOptimizer;

struct Individual {
    school: School,
    score: f64,
}

impl Optimizer for GeneticOptimizer {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn run(&self, start: &School, ctx: &mut RunContext<'_>) -> Result<RunResult, CoreError> {
        let params = ctx.config.optimization.algorithms.genetic;
        // The global iteration cap bounds generations too, so a
        // zero-iteration run is an identity for this algorithm as well.
        let generations = params.generations.min(ctx.config.optimization.max_iterations);
        let ops = Neighborhood::new(ctx.checker, ctx.config.class_config.max_class_size);
        let initial_score = ctx.scorer.evaluate(start);
        let mut state = RunState::new(self.name(), start, initial_score, ctx.seed);
        if generations == 0 {
            return Ok(state.finish(ctx.checker));
        }

        ctx.progress.start(&IterationEvent {
            iteration: 0,
            total_estimate: generations,
            current_score: initial_score,
            best_score: state.best_score,
            extras: BTreeMap::new(),
        });

        // Seed population: the start snapshot plus mutated variants.
        let mut population: Vec<Individual> = Vec::with_capacity(params.population_size);
        population.push(Individual {
            school: start.clone(),
            score: initial_score,
        });
        while population.len() < params.population_size {
            let mut variant = start.clone();
            mutate(&mut variant, &ops, ctx);
            let score = ctx.scorer.evaluate(&variant);
            population.push(Individual {
                school: variant,
                score,
            });
        }
        sort_by_fitness(&mut population);
        if population[0].score > state.best_score {
            let top = &population[0];
            state.record_best(&top.school, top.score);
        }

        let mut stagnation = 0usize;
        while state.iterations < generations {
            if state.poll_stop(ctx) {
                break;
            }

            let mut next: Vec<Individual> = Vec::with_capacity(params.population_size);
            for elite in population.iter().take(params.elite_size) {
                next.push(Individual {
                    school: elite.school.clone(),
                    score: elite.score,
                });
            }

            while next.len() < params.population_size {
                let parent_a = tournament(&population, params.tournament_size, &mut ctx.rng);
                let parent_b = tournament(&population, params.tournament_size, &mut ctx.rng);
                let mut child = if ctx.rng.random::<f64>() < params.crossover_rate {
                    crossover(
                        &population[parent_a].school,
                        &population[parent_b].school,
                        ctx,
                    )
                    .unwrap_or_else(|| population[parent_a].school.clone())
                } else {
                    population[parent_a].school.clone()
                };
                if ctx.rng.random::<f64>() < params.mutation_rate {
                    mutate(&mut child, &ops, ctx);
                }
                let score = ctx.scorer.evaluate(&child);
                next.push(Individual {
                    school: child,
                    score,
                });
            }

            population = next;
            sort_by_fitness(&mut population);
            state.iterations += 1;

            let generation_best = population[0].score;
            if generation_best > state.best_score {
                let top = &population[0];
                state.record_best(&top.school, top.score);
                stagnation = 0;
            } else {
                stagnation += 1;
            }

            ctx.progress.accepted(&IterationEvent {
                iteration: state.iterations,
                total_estimate: generations,
                current_score: generation_best,
                best_score: state.best_score,
                extras: BTreeMap::from([("stagnation".to_string(), stagnation as f64)]),
            });

            if params.stagnation_limit > 0 && stagnation >= params.stagnation_limit {
                state.early_stopped = true;
                break;
            }
        }

        state
            .extras
            .insert("generations".to_string(), state.iterations as f64);
        state
            .extras
            .insert("population_size".to_string(), params.population_size as f64);
        ctx.progress.finish(&IterationEvent {
            iteration: state.iterations,
            total_estimate: generations,
            current_score: state.best_score,
            best_score: state.best_score,
            extras: state.extras.clone(),
        });
        Ok(state.finish(ctx.checker))
    }
}

fn sort_by_fitness(population: &mut [Individual]) {
    population.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Tournament selection; score ties are broken uniformly at random.
fn tournament(population: &[Individual], size: usize, rng: &mut ChaCha8Rng) -> usize {
    let sampled: Vec<usize> = (0..size.max(1))
        .map(|_| rng.random_range(0..population.len()))
        .collect();
    let best_score = sampled
        .iter()
        .map(|&i| population[i].score)
        .fold(f64::NEG_INFINITY, f64::max);
    let winners: Vec<usize> = sampled
        .into_iter()
        .filter(|&i| population[i].score == best_score)
        .collect();
    winners[rng.random_range(0..winners.len())]
}

/// Uniform per-student crossover followed by constraint repair. `None`
/// when the child cannot be made feasible.
fn crossover(parent_a: &School, parent_b: &School, ctx: &mut RunContext<'_>) -> Option<School> {
    let roster = parent_a.roster_arc();
    let mut child = School::new_unassigned(roster, parent_a.class_ids().to_vec());
    for student in 0..child.roster().len() {
        let from_a = ctx.rng.random::<bool>();
        let class = if from_a {
            parent_a.class_of(student)
        } else {
            parent_b.class_of(student)
        };
        if let Some(class) = class {
            child.assign(student, class);
        }
    }
    repair(&mut child, ctx)?;
    Some(child)
}

/// Reinstate force locks, drain over-capacity classes, then patch
/// minimum-friends shortfalls. Returns `None` when violations remain.
fn repair(child: &mut School, ctx: &mut RunContext<'_>) -> Option<()> {
    let checker = ctx.checker;
    let max_size = ctx.config.class_config.max_class_size;

    // Locks first: force_class pins, then group co-location.
    if checker.respects_force() {
        for student in 0..child.roster().len() {
            let Some(required) = child.roster().student(student).force_class.clone() else {
                continue;
            };
            let target = child.class_index(&required)?;
            match child.class_of(student) {
                Some(class) if class == target => {}
                Some(_) => child.move_to(student, target),
                None => child.assign(student, target),
            }
        }
        let groups = child.roster().groups().to_vec();
        for group in &groups {
            let host = group
                .members
                .iter()
                .find_map(|&m| child.class_of(m))
                .unwrap_or(0);
            for &member in &group.members {
                match child.class_of(member) {
                    Some(class) if class == host => {}
                    Some(_) => child.move_to(member, host),
                    None => child.assign(member, host),
                }
            }
        }
    }

    // Anyone the crossover left unassigned joins the smallest class.
    for student in child.unassigned_students() {
        let smallest = (0..child.num_classes())
            .min_by_key(|&c| (child.stats(c).size, c))?;
        child.assign(student, smallest);
    }

    // Capacity: drain overflowing classes into the best legal class.
    if max_size > 0 {
        loop {
            let Some(over) = (0..child.num_classes()).find(|&c| child.stats(c).size > max_size)
            else {
                break;
            };
            let mover = child
                .members(over)
                .iter()
                .rev()
                .copied()
                .find(|&s| checker.is_movable(child, s))?;
            let mut best: Option<(f64, usize)> = None;
            for target in 0..child.num_classes() {
                if target == over || child.stats(target).size >= max_size {
                    continue;
                }
                let mut trial = child.clone();
                trial.move_to(mover, target);
                let score = ctx.scorer.evaluate(&trial);
                if best.is_none_or(|(s, _)| score > s) {
                    best = Some((score, target));
                }
            }
            let (_, target) = best?;
            child.move_to(mover, target);
        }
    }

    // Minimum-friends: walk violators toward their friends.
    if checker.minimum_friends() > 0 {
        for _ in 0..REPAIR_PASSES {
            let shortfalls = checker.friend_shortfalls(child);
            if shortfalls.is_empty() {
                break;
            }
            let mut progressed = false;
            for (student, _, _) in shortfalls {
                if !checker.is_movable(child, student) {
                    continue;
                }
                let mut candidates: Vec<(usize, usize)> = (0..child.num_classes())
                    .map(|class| {
                        let friends_there = child
                            .roster()
                            .friends_of(student)
                            .iter()
                            .filter(|&&f| child.class_of(f) == Some(class))
                            .count();
                        (class, friends_there)
                    })
                    .filter(|&(class, count)| {
                        count > 0
                            && Some(class) != child.class_of(student)
                            && (max_size == 0 || child.stats(class).size < max_size)
                    })
                    .collect();
                candidates.sort_by_key(|&(class, count)| (std::cmp::Reverse(count), class));
                if let Some(&(class, _)) = candidates.first() {
                    child.move_to(student, class);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
    }

    if child.is_fully_assigned() && checker.validate(child).is_empty() {
        Some(())
    } else {
        None
    }
}

/// Apply a small number of random legal swaps in place.
fn mutate(school: &mut School, ops: &Neighborhood<'_>, ctx: &mut RunContext<'_>) {
    let swaps = ctx.rng.random_range(1..=MUTATION_SWAPS_MAX);
    for _ in 0..swaps {
        for _ in 0..MUTATION_ATTEMPTS_PER_SWAP {
            let Some((a, b)) = random_cross_class_pair(school, ctx) else {
                return;
            };
            if let Ok(next) = ops.swap(school, a, b) {
                *school = next;
                break;
            }
        }
    }
}

fn random_cross_class_pair(school: &School, ctx: &mut RunContext<'_>) -> Option<(usize, usize)> {
    let movable: Vec<usize> = (0..school.roster().len())
        .filter(|&s| school.class_of(s).is_some() && ctx.checker.is_movable(school, s))
        .collect();
    if movable.len() < 2 {
        return None;
    }
    let a = movable[ctx.rng.random_range(0..movable.len())];
    let partners: Vec<usize> = movable
        .iter()
        .copied()
        .filter(|&p| school.class_of(p) != school.class_of(a))
        .collect();
    if partners.is_empty() {
        return None;
    }
    let b = partners[ctx.rng.random_range(0..partners.len())];
    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::constraints::ConstraintChecker;
    use crate::core::models::{ClassId, Gender, Rank, Roster, Student, StudentId};
    use crate::core::scorer::Scorer;
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

    fn segregated_school(with_group: bool) -> School {
        let mut students = Vec::new();
        for n in 0..8 {
            students.push(student(100_000_001 + n, Gender::M));
        }
        for n in 8..16 {
            students.push(student(100_000_001 + n, Gender::F));
        }
        if with_group {
            let buddy = students[1].id;
            students[0].force_friend = vec![buddy];
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
        config.optimization.algorithms.genetic.population_size = 12;
        config.optimization.algorithms.genetic.generations = 15;
        config.optimization.algorithms.genetic.elite_size = 2;
        config
    }

    #[test]
    fn test_population_search_improves() {
        let school = segregated_school(false);
        let config = config();
        let scorer = Scorer::from_config(&config);
        let checker = ConstraintChecker::from_config(&config);
        let mut ctx = RunContext::new(&scorer, &checker, &config, 13);

        let result = GeneticOptimizer.run(&school, &mut ctx).unwrap();
        assert!(result.best_score > result.initial_score);
        assert_eq!(result.constraint_violations_at_end, 0);
    }

    #[test]
    fn test_children_respect_force_groups() {
        let school = segregated_school(true);
        let config = config();
        let scorer = Scorer::from_config(&config);
        let checker = ConstraintChecker::from_config(&config);
        let mut ctx = RunContext::new(&scorer, &checker, &config, 29);

        let result = GeneticOptimizer.run(&school, &mut ctx).unwrap();
        let best = &result.best_snapshot;
        assert_eq!(best.class_of(0), best.class_of(1));
        assert_eq!(result.constraint_violations_at_end, 0);
    }

    #[test]
    fn test_reproducible_with_seed() {
        let school = segregated_school(false);
        let config = config();
        let scorer = Scorer::from_config(&config);
        let checker = ConstraintChecker::from_config(&config);

        let mut ctx_a = RunContext::new(&scorer, &checker, &config, 4);
        let mut ctx_b = RunContext::new(&scorer, &checker, &config, 4);
        let a = GeneticOptimizer.run(&school, &mut ctx_a).unwrap();
        let b = GeneticOptimizer.run(&school, &mut ctx_b).unwrap();
        assert!((a.best_score - b.best_score).abs() < 1e-12);
        assert_eq!(a.best_snapshot, b.best_snapshot);
    }

    #[test]
    fn test_zero_generations_is_identity_score() {
        let school = segregated_school(false);
        let mut config = config();
        config.optimization.algorithms.genetic.generations = 0;
        let scorer = Scorer::from_config(&config);
        let checker = ConstraintChecker::from_config(&config);
        let mut ctx = RunContext::new(&scorer, &checker, &config, 4);

        let result = GeneticOptimizer.run(&school, &mut ctx).unwrap();
        assert_eq!(result.iterations_used, 0);
        assert!((result.best_score - result.initial_score).abs() < 1e-12);
        assert_eq!(result.best_snapshot, school);
    }
}
