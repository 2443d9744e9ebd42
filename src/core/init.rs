//! Assignment initialization
//!
//! Turns a snapshot with unassigned students into a fully assigned one
//! that satisfies every hard constraint, or fails with
//! `infeasible_initialization`. Force-locked students and force groups are
//! placed first, then the chosen strategy deals the remaining students,
//! and a short repair phase resolves minimum-friends shortfalls.

use crate::core::config::Config;
use crate::core::constraints::ConstraintChecker;
use crate::core::error::CoreError;
use crate::core::models::{ClassId, Roster, School};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

const REPAIR_PASSES: usize = 4;

/// Strategy used to produce the starting assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InitStrategy {
    /// Shuffle and deal round-robin.
    Random,
    /// Random dealing followed by a size-levelling pass.
    Balanced,
    /// Serpentine distribution by descending academic score.
    AcademicBalanced,
    /// Greedy placement minimizing marginal cost.
    #[default]
    ConstraintAware,
}

impl InitStrategy {
    /// Canonical name used on the CLI and in reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Balanced => "balanced",
            Self::AcademicBalanced => "academic_balanced",
            Self::ConstraintAware => "constraint_aware",
        }
    }

    /// All strategies, for help output.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::Random,
            Self::Balanced,
            Self::AcademicBalanced,
            Self::ConstraintAware,
        ]
    }
}

impl FromStr for InitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "balanced" => Ok(Self::Balanced),
            "academic_balanced" | "academic-balanced" => Ok(Self::AcademicBalanced),
            "constraint_aware" | "constraint-aware" => Ok(Self::ConstraintAware),
            other => Err(format!("unknown initialization strategy: {other}")),
        }
    }
}

impl fmt::Display for InitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Derive the number of classes from the roster size.
#[must_use]
pub fn derive_target_classes(students: usize) -> usize {
    match students {
        0..=25 => 1,
        26..=50 => 2,
        51..=75 => 3,
        76..=100 => 4,
        n => n.div_ceil(25).clamp(4, 8),
    }
}

/// Produces feasible starting assignments.
#[derive(Debug, Clone, Copy)]
pub struct Initializer<'a> {
    config: &'a Config,
    checker: ConstraintChecker,
}

impl<'a> Initializer<'a> {
    /// Build an initializer from configuration.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            checker: ConstraintChecker::from_config(config),
        }
    }

    /// Number of classes to create: the configured override or the
    /// roster-size derivation.
    #[must_use]
    pub fn target_classes(&self, roster: &Roster) -> usize {
        self.config
            .class_config
            .target_classes
            .unwrap_or_else(|| derive_target_classes(roster.len()))
    }

    /// Produce a fully assigned snapshot.
    ///
    /// Existing class assignments are kept; classes are created (ids
    /// `"1"..="K"`) only when the snapshot has none.
    ///
    /// # Errors
    /// Returns `CoreError::InfeasibleInitialization` when no snapshot can
    /// satisfy the hard constraints (oversized force group, conflicting
    /// locks inside a group, insufficient capacity, or an unresolvable
    /// minimum-friends shortfall).
    pub fn initialize<R: Rng>(
        &self,
        school: &School,
        strategy: InitStrategy,
        rng: &mut R,
    ) -> Result<School, CoreError> {
        let mut school = if school.num_classes() == 0 {
            let count = self.target_classes(school.roster());
            let ids = (1..=count).map(|n| ClassId::new(n.to_string())).collect();
            School::new_unassigned(school.roster_arc(), ids)
        } else {
            school.clone()
        };

        let max_size = self.config.class_config.max_class_size;
        let capacity = school.num_classes() * max_size;
        if max_size > 0 && school.roster().len() > capacity {
            return Err(CoreError::InfeasibleInitialization {
                reason: format!(
                    "{} students exceed the capacity of {} classes of at most {max_size}",
                    school.roster().len(),
                    school.num_classes()
                ),
            });
        }

        self.place_force_class_students(&mut school)?;
        self.place_force_groups(&mut school, strategy)?;

        let mut free: Vec<usize> = school
            .unassigned_students()
            .into_iter()
            .filter(|&s| {
                school.roster().student(s).force_class.is_none()
                    && school.roster().group_of(s).is_none()
            })
            .collect();

        match strategy {
            InitStrategy::Random => {
                free.shuffle(rng);
                self.deal_round_robin(&mut school, &free)?;
            }
            InitStrategy::Balanced => {
                free.shuffle(rng);
                self.deal_round_robin(&mut school, &free)?;
                self.level_sizes(&mut school);
            }
            InitStrategy::AcademicBalanced => {
                free.sort_by(|&a, &b| {
                    let sa = school.roster().student(a).academic_score;
                    let sb = school.roster().student(b).academic_score;
                    sb.partial_cmp(&sa)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| school.roster().student(a).id.cmp(&school.roster().student(b).id))
                });
                self.deal_serpentine(&mut school, &free)?;
            }
            InitStrategy::ConstraintAware => {
                self.deal_marginal_cost(&mut school, &free)?;
            }
        }

        self.repair_min_friends(&mut school);

        if !school.is_fully_assigned() {
            return Err(CoreError::InfeasibleInitialization {
                reason: format!("{} students could not be placed", school.unassigned_count()),
            });
        }
        let violations = self.checker.validate(&school);
        if !violations.is_empty() {
            return Err(CoreError::InfeasibleInitialization {
                reason: format!(
                    "{} hard-constraint violations remain after initialization (first: {})",
                    violations.len(),
                    violations[0]
                ),
            });
        }
        Ok(school)
    }

    /// Pin every `force_class` student to their class.
    fn place_force_class_students(&self, school: &mut School) -> Result<(), CoreError> {
        if !self.checker.respects_force() {
            return Ok(());
        }
        for student in 0..school.roster().len() {
            let Some(required) = school.roster().student(student).force_class.clone() else {
                continue;
            };
            let Some(target) = school.class_index(&required) else {
                return Err(CoreError::InfeasibleInitialization {
                    reason: format!(
                        "student {} is locked to unknown class {required}",
                        school.roster().student(student).id
                    ),
                });
            };
            match school.class_of(student) {
                Some(class) if class == target => {}
                Some(_) => school.move_to(student, target),
                None => school.assign(student, target),
            }
        }
        Ok(())
    }

    /// Co-locate every force group, preferring locked classes, then the
    /// strategy's choice of host class.
    fn place_force_groups(
        &self,
        school: &mut School,
        strategy: InitStrategy,
    ) -> Result<(), CoreError> {
        if !self.checker.respects_force() {
            return Ok(());
        }
        let max_size = self.config.class_config.max_class_size;
        let groups = school.roster().groups().to_vec();
        for group in &groups {
            if max_size > 0 && group.members.len() > max_size {
                return Err(CoreError::InfeasibleInitialization {
                    reason: format!(
                        "force group {} has {} members, more than the class limit {max_size}",
                        group.tag,
                        group.members.len()
                    ),
                });
            }

            // A lock inside the group decides the class for everyone.
            let mut locked_target: Option<usize> = None;
            for &member in &group.members {
                if let Some(required) = &school.roster().student(member).force_class {
                    let target = school.class_index(required).ok_or_else(|| {
                        CoreError::InfeasibleInitialization {
                            reason: format!("force group {} references unknown class {required}", group.tag),
                        }
                    })?;
                    if locked_target.is_some_and(|t| t != target) {
                        return Err(CoreError::InfeasibleInitialization {
                            reason: format!(
                                "force group {} members are locked to different classes",
                                group.tag
                            ),
                        });
                    }
                    locked_target = Some(target);
                }
            }

            let incoming = |school: &School, class: usize| {
                group
                    .members
                    .iter()
                    .filter(|&&m| school.class_of(m) != Some(class))
                    .count()
            };
            let target = match locked_target {
                Some(target) => target,
                None => {
                    let fits = |class: usize| {
                        max_size == 0
                            || school.stats(class).size + incoming(school, class) <= max_size
                    };
                    let candidates: Vec<usize> =
                        (0..school.num_classes()).filter(|&c| fits(c)).collect();
                    if candidates.is_empty() {
                        return Err(CoreError::InfeasibleInitialization {
                            reason: format!("no class can hold force group {}", group.tag),
                        });
                    }
                    match strategy {
                        InitStrategy::ConstraintAware => *candidates
                            .iter()
                            .min_by_key(|&&c| self.group_disruption(school, &group.members, c))
                            .expect("candidates are non-empty"),
                        _ => *candidates
                            .iter()
                            .min_by_key(|&&c| (school.stats(c).size, c))
                            .expect("candidates are non-empty"),
                    }
                }
            };
            if max_size > 0 && school.stats(target).size + incoming(school, target) > max_size {
                return Err(CoreError::InfeasibleInitialization {
                    reason: format!("class cannot hold force group {}", group.tag),
                });
            }
            for &member in &group.members {
                match school.class_of(member) {
                    Some(class) if class == target => {}
                    Some(_) => school.move_to(member, target),
                    None => school.assign(member, target),
                }
            }
        }
        Ok(())
    }

    /// Disruption of dropping a group into a class: predicted conflict
    /// edges plus overflow beyond the preferred size.
    fn group_disruption(&self, school: &School, members: &[usize], class: usize) -> usize {
        let roster = school.roster();
        let mut conflicts = 0usize;
        for &member in members {
            for &peer in school.members(class) {
                if roster.dislikes_of(member).contains(&peer)
                    || roster.dislikes_of(peer).contains(&member)
                {
                    conflicts += 1;
                }
            }
        }
        let new_size = school.stats(class).size + members.len();
        let overflow = new_size.saturating_sub(self.config.class_config.preferred_class_size);
        conflicts + overflow
    }

    /// Deal students into classes round-robin, skipping full classes.
    fn deal_round_robin(&self, school: &mut School, students: &[usize]) -> Result<(), CoreError> {
        let max_size = self.config.class_config.max_class_size;
        let classes = school.num_classes();
        let mut cursor = 0usize;
        for &student in students {
            let mut placed = false;
            for offset in 0..classes {
                let class = (cursor + offset) % classes;
                if max_size == 0 || school.stats(class).size < max_size {
                    school.assign(student, class);
                    cursor = (class + 1) % classes;
                    placed = true;
                    break;
                }
            }
            if !placed {
                return Err(CoreError::InfeasibleInitialization {
                    reason: "all classes are full".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Deal students in serpentine order (0..K-1, K-1..0, ...), skipping
    /// full classes, to equalize the means of a sorted sequence.
    fn deal_serpentine(&self, school: &mut School, students: &[usize]) -> Result<(), CoreError> {
        let max_size = self.config.class_config.max_class_size;
        let classes = school.num_classes();
        let mut order: Vec<usize> = (0..classes).collect();
        order.extend((0..classes).rev());
        let mut cursor = 0usize;
        for &student in students {
            let mut placed = false;
            for _ in 0..order.len() {
                let class = order[cursor % order.len()];
                cursor += 1;
                if max_size == 0 || school.stats(class).size < max_size {
                    school.assign(student, class);
                    placed = true;
                    break;
                }
            }
            if !placed {
                return Err(CoreError::InfeasibleInitialization {
                    reason: "all classes are full".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Greedy constraint-aware dealing: each student goes to the class
    /// with the lowest marginal cost (fill pressure plus weighted
    /// conflict edges minus friend edges), ties to the lowest class id.
    fn deal_marginal_cost(&self, school: &mut School, students: &[usize]) -> Result<(), CoreError> {
        let max_size = self.config.class_config.max_class_size;
        for &student in students {
            let mut best: Option<(f64, usize)> = None;
            for class in 0..school.num_classes() {
                if max_size > 0 && school.stats(class).size >= max_size {
                    continue;
                }
                let cost = self.marginal_cost(school, student, class);
                if best.is_none_or(|(best_cost, _)| cost < best_cost) {
                    best = Some((cost, class));
                }
            }
            let Some((_, class)) = best else {
                return Err(CoreError::InfeasibleInitialization {
                    reason: "all classes are full".to_string(),
                });
            };
            school.assign(student, class);
        }
        Ok(())
    }

    fn marginal_cost(&self, school: &School, student: usize, class: usize) -> f64 {
        let roster = school.roster();
        let mut conflicts = 0usize;
        let mut friendships = 0usize;
        for &peer in school.members(class) {
            if roster.dislikes_of(student).contains(&peer)
                || roster.dislikes_of(peer).contains(&student)
            {
                conflicts += 1;
            }
            if roster.friends_of(student).contains(&peer)
                || roster.friends_of(peer).contains(&student)
            {
                friendships += 1;
            }
        }
        school.stats(class).size as f64 + 2.0 * conflicts as f64 - friendships as f64
    }

    /// Move students from the largest to the smallest class until the
    /// size range is at most one. Locked students stay put.
    fn level_sizes(&self, school: &mut School) {
        let classes = school.num_classes();
        if classes < 2 {
            return;
        }
        for _ in 0..school.roster().len() * classes {
            let largest = (0..classes)
                .max_by_key(|&c| (school.stats(c).size, c))
                .expect("at least two classes");
            let smallest = (0..classes)
                .min_by_key(|&c| (school.stats(c).size, c))
                .expect("at least two classes");
            if school.stats(largest).size - school.stats(smallest).size <= 1 {
                break;
            }
            let candidate = school
                .members(largest)
                .iter()
                .copied()
                .find(|&s| self.checker.is_movable(school, s));
            match candidate {
                Some(student) => school.move_to(student, smallest),
                None => break,
            }
        }
    }

    /// Resolve minimum-friends shortfalls: movable students walk toward
    /// their friends, and movable friends are pulled into the classes of
    /// locked students. A move is kept only when it strictly shrinks the
    /// total shortfall count, so repair cannot thrash. Bounded number of
    /// passes; anything left after that surfaces as an infeasibility in
    /// `initialize`.
    fn repair_min_friends(&self, school: &mut School) {
        if self.checker.minimum_friends() == 0 {
            return;
        }
        let max_size = self.config.class_config.max_class_size;
        for _ in 0..REPAIR_PASSES {
            let shortfalls = self.checker.friend_shortfalls(school);
            if shortfalls.is_empty() {
                return;
            }
            let mut progressed = false;
            for (student, _, _) in shortfalls {
                let movers: Vec<(usize, usize)> = if self.checker.is_movable(school, student) {
                    // Candidate classes ranked by how many of the
                    // student's friends they already hold.
                    let mut candidates: Vec<(usize, usize)> = (0..school.num_classes())
                        .filter(|&class| school.class_of(student) != Some(class))
                        .map(|class| {
                            let friends_there = school
                                .roster()
                                .friends_of(student)
                                .iter()
                                .filter(|&&f| school.class_of(f) == Some(class))
                                .count();
                            (class, friends_there)
                        })
                        .filter(|&(_, count)| count > 0)
                        .collect();
                    candidates.sort_by_key(|&(class, count)| (std::cmp::Reverse(count), class));
                    candidates
                        .into_iter()
                        .map(|(class, _)| (student, class))
                        .collect()
                } else if let Some(class) = school.class_of(student) {
                    // Locked student: pull a movable friend in instead.
                    school
                        .roster()
                        .friends_of(student)
                        .iter()
                        .copied()
                        .filter(|&friend| self.checker.is_movable(school, friend))
                        .map(|friend| (friend, class))
                        .collect()
                } else {
                    Vec::new()
                };

                if self.try_repair_moves(school, &movers, max_size) {
                    progressed = true;
                }
            }
            if !progressed {
                return;
            }
        }
    }

    /// Apply the first candidate move that strictly reduces the total
    /// shortfall count without breaking capacity.
    fn try_repair_moves(
        &self,
        school: &mut School,
        movers: &[(usize, usize)],
        max_size: usize,
    ) -> bool {
        let before = self.checker.friend_shortfalls(school).len();
        for &(mover, target) in movers {
            if school.class_of(mover) == Some(target) {
                continue;
            }
            if max_size > 0 && school.stats(target).size >= max_size {
                continue;
            }
            let mut trial = school.clone();
            trial.move_to(mover, target);
            if self.checker.friend_shortfalls(&trial).len() < before {
                *school = trial;
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Gender, Rank, Student, StudentId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    fn student(id: u32, academic: f64) -> Student {
        Student {
            id: StudentId::new(id).unwrap(),
            first_name: "S".to_string(),
            last_name: format!("{id}"),
            gender: if id % 2 == 0 { Gender::F } else { Gender::M },
            academic_score: academic,
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

    fn unassigned_school(students: Vec<Student>) -> School {
        let roster = Arc::new(Roster::from_students(students).unwrap());
        let classes: Vec<Option<ClassId>> = vec![None; roster.len()];
        School::from_class_column(roster, &classes)
    }

    #[test]
    fn test_derive_target_classes() {
        assert_eq!(derive_target_classes(10), 1);
        assert_eq!(derive_target_classes(25), 1);
        assert_eq!(derive_target_classes(26), 2);
        assert_eq!(derive_target_classes(75), 3);
        assert_eq!(derive_target_classes(100), 4);
        assert_eq!(derive_target_classes(130), 6);
        assert_eq!(derive_target_classes(1000), 8);
    }

    #[test]
    fn test_random_initialization_assigns_everyone() {
        let students: Vec<Student> =
            (0..30).map(|n| student(100_000_001 + n, 70.0)).collect();
        let school = unassigned_school(students);
        let mut config = Config::default();
        config.constraints.minimum_friends = 0;
        let init = Initializer::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let assigned = init
            .initialize(&school, InitStrategy::Random, &mut rng)
            .unwrap();
        assert!(assigned.is_fully_assigned());
        assert_eq!(assigned.num_classes(), 2);
    }

    #[test]
    fn test_balanced_initialization_levels_sizes() {
        let students: Vec<Student> =
            (0..31).map(|n| student(100_000_001 + n, 70.0)).collect();
        let school = unassigned_school(students);
        let mut config = Config::default();
        config.constraints.minimum_friends = 0;
        let init = Initializer::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let assigned = init
            .initialize(&school, InitStrategy::Balanced, &mut rng)
            .unwrap();
        let sizes: Vec<usize> = (0..assigned.num_classes())
            .map(|c| assigned.stats(c).size)
            .collect();
        let spread = sizes.iter().max().unwrap() - sizes.iter().min().unwrap();
        assert!(spread <= 1, "sizes {sizes:?} are not level");
    }

    #[test]
    fn test_academic_balanced_equalizes_means() {
        let students: Vec<Student> = (0..40)
            .map(|n| student(100_000_001 + n, f64::from(n) * 2.5))
            .collect();
        let school = unassigned_school(students);
        let mut config = Config::default();
        config.constraints.minimum_friends = 0;
        let init = Initializer::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let assigned = init
            .initialize(&school, InitStrategy::AcademicBalanced, &mut rng)
            .unwrap();
        let means: Vec<f64> = (0..assigned.num_classes())
            .map(|c| assigned.stats(c).mean_academic())
            .collect();
        assert!((means[0] - means[1]).abs() < 3.0, "means {means:?} diverge");
    }

    #[test]
    fn test_force_group_placed_together() {
        let mut students: Vec<Student> =
            (0..30).map(|n| student(100_000_001 + n, 70.0)).collect();
        let buddy = students[1].id;
        students[0].force_friend = vec![buddy];
        let school = unassigned_school(students);
        let mut config = Config::default();
        config.constraints.minimum_friends = 0;
        let init = Initializer::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let assigned = init
            .initialize(&school, InitStrategy::ConstraintAware, &mut rng)
            .unwrap();
        assert_eq!(assigned.class_of(0), assigned.class_of(1));
    }

    #[test]
    fn test_force_class_respected() {
        let mut students: Vec<Student> =
            (0..30).map(|n| student(100_000_001 + n, 70.0)).collect();
        students[5].force_class = Some(ClassId::new("2"));
        let school = unassigned_school(students);
        let mut config = Config::default();
        config.constraints.minimum_friends = 0;
        config.class_config.target_classes = Some(2);
        let init = Initializer::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let assigned = init
            .initialize(&school, InitStrategy::Random, &mut rng)
            .unwrap();
        let class = assigned.class_of(5).unwrap();
        assert_eq!(assigned.class_id(class).as_str(), "2");
    }

    #[test]
    fn test_oversized_group_is_infeasible() {
        let mut students: Vec<Student> =
            (0..10).map(|n| student(100_000_001 + n, 70.0)).collect();
        let ids: Vec<StudentId> = students.iter().map(|s| s.id).collect();
        for s in &mut students {
            s.force_friend = ids.clone();
        }
        let school = unassigned_school(students);
        let mut config = Config::default();
        config.constraints.minimum_friends = 0;
        config.class_config.max_class_size = 5;
        config.class_config.target_classes = Some(2);
        let init = Initializer::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let err = init
            .initialize(&school, InitStrategy::ConstraintAware, &mut rng)
            .unwrap_err();
        assert!(matches!(err, CoreError::InfeasibleInitialization { .. }));
    }

    #[test]
    fn test_min_friend_repair_places_friends_together() {
        let mut students: Vec<Student> =
            (0..30).map(|n| student(100_000_001 + n, 70.0)).collect();
        // Chain of mutual preferences across the roster.
        for n in 0..15 {
            let friend = students[29 - n].id;
            students[n].preferred_friends = vec![friend];
        }
        let school = unassigned_school(students);
        let config = Config::default();
        let init = Initializer::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let assigned = init
            .initialize(&school, InitStrategy::ConstraintAware, &mut rng)
            .unwrap();
        let checker = ConstraintChecker::from_config(&config);
        assert!(checker.validate(&assigned).is_empty());
    }

    #[test]
    fn test_initialization_is_seed_reproducible() {
        let students: Vec<Student> =
            (0..40).map(|n| student(100_000_001 + n, 70.0)).collect();
        let school = unassigned_school(students);
        let mut config = Config::default();
        config.constraints.minimum_friends = 0;
        let init = Initializer::new(&config);

        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        let a = init
            .initialize(&school, InitStrategy::Random, &mut rng_a)
            .unwrap();
        let b = init
            .initialize(&school, InitStrategy::Random, &mut rng_b)
            .unwrap();
        assert_eq!(a, b);
    }
}
