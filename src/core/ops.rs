//! Neighborhood operations
//!
//! The only way optimizers change an assignment. Every operation is pure:
//! it takes a snapshot by reference and returns either a new snapshot or
//! an explicit [`Rejection`]. Rejections are predicates, not errors: a
//! rejected proposal is simply retried with a different one, and is never
//! turned into a constraint violation.

use crate::core::constraints::ConstraintChecker;
use crate::core::models::{ClassId, School, StudentId};
use std::fmt;

/// Why a proposed operation was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The student has no class yet.
    Unassigned,
    /// Source and target class are the same.
    SameClass,
    /// The class index does not exist in this snapshot.
    UnknownClass,
    /// No force group carries the given tag.
    UnknownGroup {
        /// The unmatched tag.
        tag: String,
    },
    /// The student is locked to a different class.
    ForceClassLock {
        /// The locked student.
        student: StudentId,
    },
    /// The student belongs to a force group and cannot move alone.
    ForceGroupMember {
        /// The group member.
        student: StudentId,
    },
    /// A group member's `force_class` contradicts the target class.
    ForceClassConflict {
        /// The conflicting member.
        student: StudentId,
    },
    /// The target class cannot take more students.
    ClassFull {
        /// The full class.
        class: ClassId,
    },
    /// The result would leave a student below their friend requirement.
    MinimumFriends {
        /// The student who would fall short.
        student: StudentId,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unassigned => f.write_str("student is unassigned"),
            Self::SameClass => f.write_str("source and target class are identical"),
            Self::UnknownClass => f.write_str("unknown class"),
            Self::UnknownGroup { tag } => write!(f, "unknown force group '{tag}'"),
            Self::ForceClassLock { student } => {
                write!(f, "student {student} is locked to another class")
            }
            Self::ForceGroupMember { student } => {
                write!(f, "student {student} can only move with their force group")
            }
            Self::ForceClassConflict { student } => {
                write!(f, "group member {student} is force-locked to a different class")
            }
            Self::ClassFull { class } => write!(f, "class {class} is full"),
            Self::MinimumFriends { student } => {
                write!(f, "student {student} would drop below their required friends")
            }
        }
    }
}

/// Checked operations parameterized by the active constraints.
#[derive(Debug, Clone, Copy)]
pub struct Neighborhood<'a> {
    checker: &'a ConstraintChecker,
    /// Hard class-capacity bound; 0 disables the check.
    max_class_size: usize,
}

impl<'a> Neighborhood<'a> {
    /// Build a neighborhood with an explicit capacity bound.
    #[must_use]
    pub fn new(checker: &'a ConstraintChecker, max_class_size: usize) -> Self {
        Self {
            checker,
            max_class_size,
        }
    }

    /// The active checker.
    #[must_use]
    pub fn checker(&self) -> &ConstraintChecker {
        self.checker
    }

    /// Move one student into `target`.
    ///
    /// # Errors
    /// Rejected when the student is unassigned, force-locked elsewhere,
    /// part of a force group, the target is full, or any affected student
    /// would fall below their friend requirement.
    pub fn move_student(
        &self,
        school: &School,
        student: usize,
        target: usize,
    ) -> Result<School, Rejection> {
        if target >= school.num_classes() {
            return Err(Rejection::UnknownClass);
        }
        let source = school.class_of(student).ok_or(Rejection::Unassigned)?;
        if source == target {
            return Err(Rejection::SameClass);
        }
        let record = school.roster().student(student);
        if self.checker.respects_force() {
            if school.roster().group_of(student).is_some() {
                return Err(Rejection::ForceGroupMember { student: record.id });
            }
            if !self.checker.is_move_allowed(school, student, target) {
                return Err(Rejection::ForceClassLock { student: record.id });
            }
        }
        if self.max_class_size > 0 && school.stats(target).size + 1 > self.max_class_size {
            return Err(Rejection::ClassFull {
                class: school.class_id(target).clone(),
            });
        }

        let mut next = school.clone();
        next.move_to(student, target);
        self.check_min_friends(&next, &[source, target])?;
        Ok(next)
    }

    /// Exchange the classes of two students.
    ///
    /// Rejected outright when either student is force-locked or belongs
    /// to a force group; swaps preserve class sizes, so no capacity check
    /// applies.
    ///
    /// # Errors
    /// See above, plus the minimum-friends re-check on both classes.
    pub fn swap(&self, school: &School, a: usize, b: usize) -> Result<School, Rejection> {
        let class_a = school.class_of(a).ok_or(Rejection::Unassigned)?;
        let class_b = school.class_of(b).ok_or(Rejection::Unassigned)?;
        if class_a == class_b {
            return Err(Rejection::SameClass);
        }
        if self.checker.respects_force() {
            for student in [a, b] {
                let record = school.roster().student(student);
                if record.force_class.is_some() {
                    return Err(Rejection::ForceClassLock { student: record.id });
                }
                if school.roster().group_of(student).is_some() {
                    return Err(Rejection::ForceGroupMember { student: record.id });
                }
            }
        }

        let mut next = school.clone();
        next.swap_raw(a, b);
        self.check_min_friends(&next, &[class_a, class_b])?;
        Ok(next)
    }

    /// Move a whole force group into `target`, atomically.
    ///
    /// # Errors
    /// Rejected when the tag is unknown, a member is force-locked to a
    /// different class, the target cannot hold the group, or the result
    /// violates minimum-friends for any affected student.
    pub fn move_group(
        &self,
        school: &School,
        tag: &str,
        target: usize,
    ) -> Result<School, Rejection> {
        if target >= school.num_classes() {
            return Err(Rejection::UnknownClass);
        }
        let group = school
            .roster()
            .group_by_tag(tag)
            .ok_or_else(|| Rejection::UnknownGroup {
                tag: tag.to_string(),
            })?;

        let mut sources: Vec<usize> = Vec::new();
        let mut incoming = 0usize;
        for &member in &group.members {
            let record = school.roster().student(member);
            if self.checker.respects_force() {
                if let Some(required) = &record.force_class {
                    if school.class_index(required) != Some(target) {
                        return Err(Rejection::ForceClassConflict { student: record.id });
                    }
                }
            }
            match school.class_of(member) {
                Some(class) if class == target => {}
                Some(class) => {
                    incoming += 1;
                    if !sources.contains(&class) {
                        sources.push(class);
                    }
                }
                None => incoming += 1,
            }
        }
        if incoming == 0 {
            return Err(Rejection::SameClass);
        }
        if self.max_class_size > 0 && school.stats(target).size + incoming > self.max_class_size {
            return Err(Rejection::ClassFull {
                class: school.class_id(target).clone(),
            });
        }

        let mut next = school.clone();
        for &member in &group.members {
            match next.class_of(member) {
                Some(class) if class == target => {}
                Some(_) => next.move_to(member, target),
                None => next.assign(member, target),
            }
        }
        sources.push(target);
        self.check_min_friends(&next, &sources)?;
        Ok(next)
    }

    /// Re-check minimum-friends for every student whose class changed
    /// membership. Only the listed classes can have lost a friend, so the
    /// scan is bounded by two (or a group's worth of) class sizes.
    fn check_min_friends(&self, school: &School, classes: &[usize]) -> Result<(), Rejection> {
        if self.checker.minimum_friends() == 0 {
            return Ok(());
        }
        for &class in classes {
            for &member in school.members(class) {
                let required = self.checker.required_friends(school, member);
                if required > 0 && school.placed_friends(member) < required {
                    return Err(Rejection::MinimumFriends {
                        student: school.roster().student(member).id,
                    });
                }
            }
        }
        Ok(())
    }
}
