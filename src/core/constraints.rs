//! Hard-constraint checking
//!
//! Two categories exist: placement locks (`force_class` and force groups)
//! and the minimum-friends requirement. Violations are reported, never
//! repaired: optimizers reject candidate moves that would produce them.

use crate::core::config::Config;
use crate::core::models::{ClassId, School, StudentId};
use std::fmt;

/// Assignment state of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentStatus {
    /// Every student has a class.
    FullyAssigned,
    /// Some students have classes, the rest are unassigned.
    PartiallyAssigned,
    /// No student has a class.
    Unassigned,
    /// Some students are placed but force-locked students are still
    /// unassigned or sit in the wrong class; the manual assignment and
    /// the locks need to be reconciled before optimizing.
    Mixed,
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FullyAssigned => "fully_assigned",
            Self::PartiallyAssigned => "partially_assigned",
            Self::Unassigned => "unassigned",
            Self::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

/// One hard-constraint violation.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// A student sits outside their `force_class`.
    ForceClass {
        /// The constrained student.
        student: StudentId,
        /// The class the lock demands.
        required: ClassId,
        /// Where the student actually is (`None` = unassigned).
        actual: Option<ClassId>,
    },
    /// A force group is spread over more than one class.
    ForceGroupSplit {
        /// Group tag.
        tag: String,
        /// The distinct classes currently holding members.
        classes: Vec<ClassId>,
    },
    /// A student has fewer placed friends than required.
    MinimumFriends {
        /// The short-changed student.
        student: StudentId,
        /// Friends currently sharing the class.
        placed: usize,
        /// Friends the constraint demands.
        required: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForceClass {
                student,
                required,
                actual,
            } => match actual {
                Some(actual) => write!(
                    f,
                    "student {student} must be in class {required} but is in {actual}"
                ),
                None => write!(f, "student {student} must be in class {required} but is unassigned"),
            },
            Self::ForceGroupSplit { tag, classes } => {
                let spread: Vec<&str> = classes.iter().map(ClassId::as_str).collect();
                write!(f, "force group {tag} is split across classes {}", spread.join(", "))
            }
            Self::MinimumFriends {
                student,
                placed,
                required,
            } => write!(
                f,
                "student {student} has {placed} of {required} required friends in class"
            ),
        }
    }
}

/// Hard-constraint checker.
///
/// The lock predicates (`is_move_allowed`, `is_swap_allowed`) treat force
/// groups as atomic: moving a single member is never allowed, only whole
/// groups move (see [`crate::core::ops::move_group`]). Minimum-friends is
/// validated per snapshot; the neighborhood operations re-check it for
/// every student a move affects.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintChecker {
    minimum_friends: usize,
    respect_force: bool,
}

impl ConstraintChecker {
    /// Build a checker from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            minimum_friends: config.constraints.minimum_friends,
            respect_force: config.constraints.respect_force_constraints,
        }
    }

    /// Build a checker from raw knobs.
    #[must_use]
    pub fn new(minimum_friends: usize, respect_force: bool) -> Self {
        Self {
            minimum_friends,
            respect_force,
        }
    }

    /// The configured minimum-friends threshold m.
    #[must_use]
    pub fn minimum_friends(&self) -> usize {
        self.minimum_friends
    }

    /// Whether force locks apply.
    #[must_use]
    pub fn respects_force(&self) -> bool {
        self.respect_force
    }

    /// Friends required for one student: min(m, |preferred_friends|),
    /// zero when the student listed nobody.
    #[must_use]
    pub fn required_friends(&self, school: &School, student: usize) -> usize {
        self.minimum_friends
            .min(school.roster().friends_of(student).len())
    }

    /// Whether a student may leave their class at all (no `force_class`
    /// lock and not part of a force group).
    #[must_use]
    pub fn is_movable(&self, school: &School, student: usize) -> bool {
        if !self.respect_force {
            return true;
        }
        let record = school.roster().student(student);
        record.force_class.is_none() && school.roster().group_of(student).is_none()
    }

    /// Whether moving `student` into `target` breaks a placement lock.
    #[must_use]
    pub fn is_move_allowed(&self, school: &School, student: usize, target: usize) -> bool {
        if !self.respect_force {
            return true;
        }
        if school.roster().group_of(student).is_some() {
            // Single members of a force group never move alone.
            return false;
        }
        match &school.roster().student(student).force_class {
            None => true,
            Some(required) => school.class_index(required) == Some(target),
        }
    }

    /// Whether swapping two students breaks a placement lock.
    #[must_use]
    pub fn is_swap_allowed(&self, school: &School, a: usize, b: usize) -> bool {
        if !self.respect_force {
            return true;
        }
        let (Some(class_a), Some(class_b)) = (school.class_of(a), school.class_of(b)) else {
            return false;
        };
        self.is_move_allowed(school, a, class_b) && self.is_move_allowed(school, b, class_a)
    }

    /// Per-student minimum-friends shortfalls: `(roster index, placed,
    /// required)` for every assigned student below their requirement.
    #[must_use]
    pub fn friend_shortfalls(&self, school: &School) -> Vec<(usize, usize, usize)> {
        if self.minimum_friends == 0 {
            return Vec::new();
        }
        let mut shortfalls = Vec::new();
        for student in 0..school.roster().len() {
            if school.class_of(student).is_none() {
                continue;
            }
            let required = self.required_friends(school, student);
            if required == 0 {
                continue;
            }
            let placed = school.placed_friends(student);
            if placed < required {
                shortfalls.push((student, placed, required));
            }
        }
        shortfalls
    }

    /// Validate a snapshot against all hard constraints.
    ///
    /// Ordering is stable: `force_class` violations by student id, then
    /// force-group splits by tag, then minimum-friends by student id.
    #[must_use]
    pub fn validate(&self, school: &School) -> Vec<Violation> {
        let mut violations = Vec::new();
        let roster = school.roster();

        if self.respect_force {
            let mut lock_violations = Vec::new();
            for (idx, student) in roster.students().iter().enumerate() {
                let Some(required) = &student.force_class else {
                    continue;
                };
                let actual = school.class_of(idx).map(|c| school.class_id(c).clone());
                if actual.as_ref() != Some(required) {
                    lock_violations.push((
                        student.id,
                        Violation::ForceClass {
                            student: student.id,
                            required: required.clone(),
                            actual,
                        },
                    ));
                }
            }
            lock_violations.sort_by_key(|(id, _)| *id);
            violations.extend(lock_violations.into_iter().map(|(_, v)| v));

            for group in roster.groups() {
                let mut classes: Vec<ClassId> = group
                    .members
                    .iter()
                    .filter_map(|&m| school.class_of(m))
                    .map(|c| school.class_id(c).clone())
                    .collect();
                classes.sort();
                classes.dedup();
                if classes.len() > 1 {
                    violations.push(Violation::ForceGroupSplit {
                        tag: group.tag.clone(),
                        classes,
                    });
                }
            }
        }

        let mut shortfalls: Vec<(StudentId, usize, usize)> = self
            .friend_shortfalls(school)
            .into_iter()
            .map(|(student, placed, required)| (roster.student(student).id, placed, required))
            .collect();
        shortfalls.sort_by_key(|(id, _, _)| *id);
        violations.extend(
            shortfalls
                .into_iter()
                .map(|(student, placed, required)| Violation::MinimumFriends {
                    student,
                    placed,
                    required,
                }),
        );

        violations
    }

    /// Classify the assignment state of a snapshot.
    #[must_use]
    pub fn classify(&self, school: &School) -> AssignmentStatus {
        let total = school.roster().len();
        let unassigned = school.unassigned_count();
        if unassigned == total {
            return AssignmentStatus::Unassigned;
        }
        if unassigned == 0 {
            return AssignmentStatus::FullyAssigned;
        }
        if self.respect_force {
            let misplaced_lock = school.roster().students().iter().enumerate().any(
                |(idx, student)| match &student.force_class {
                    None => false,
                    Some(required) => {
                        school.class_of(idx).map(|c| school.class_id(c)) != Some(required)
                    }
                },
            );
            if misplaced_lock {
                return AssignmentStatus::Mixed;
            }
        }
        AssignmentStatus::PartiallyAssigned
    }
}
