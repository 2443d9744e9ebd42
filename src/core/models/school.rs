//! Roster arena and the school snapshot
//!
//! The roster is the immutable part of a run: students, their resolved
//! relation indices, interned origins and force groups. A [`School`]
//! snapshot is the mutable assignment on top of a shared roster: packed
//! `class_of` / `members` arrays plus incrementally maintained per-class
//! aggregates, so a deep copy is two flat vector clones and an `Arc` bump.

use crate::core::error::CoreError;
use crate::core::models::{ClassId, ClassStats, Student, StudentId};
use std::collections::HashMap;
use std::sync::Arc;

/// The canonical column order for rosters built in code (file-backed
/// rosters keep their own input order).
pub const STANDARD_COLUMNS: &[&str] = &[
    "student_id",
    "first_name",
    "last_name",
    "gender",
    "class",
    "academic_score",
    "behavior_rank",
    "studentiality_rank",
    "assistance_package",
    "school",
    "preferred_friend_1",
    "preferred_friend_2",
    "preferred_friend_3",
    "disliked_peer_1",
    "disliked_peer_2",
    "disliked_peer_3",
    "disliked_peer_4",
    "disliked_peer_5",
    "force_class",
    "force_friend",
];

/// A group of students locked to one (shared) class.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceGroup {
    /// Canonical tag: the smallest member id, rendered as 9 digits.
    pub tag: String,
    /// Member indices into the roster, ascending.
    pub members: Vec<usize>,
}

/// Immutable roster: students plus the derived lookup structures the
/// engine needs on every scoring pass.
#[derive(Debug, PartialEq)]
pub struct Roster {
    students: Vec<Student>,
    index_of: HashMap<StudentId, usize>,
    /// Resolved `preferred_friends` as roster indices, per student.
    friends: Vec<Vec<usize>>,
    /// Resolved `disliked_peers` as roster indices, per student.
    dislikes: Vec<Vec<usize>>,
    /// Interned origin per student (`None` when unknown).
    origin_of: Vec<Option<usize>>,
    origin_names: Vec<String>,
    origin_totals: Vec<usize>,
    groups: Vec<ForceGroup>,
    /// Force-group index per student.
    group_of: Vec<Option<usize>>,
    /// Input column names, in input order.
    columns: Vec<String>,
    /// Unknown-column values per student, re-emitted verbatim on export.
    extras: Vec<HashMap<String, String>>,
}

impl Roster {
    /// Build a roster, resolving references and deriving force groups.
    ///
    /// Relation lists are normalized first (self references and
    /// duplicates dropped, dislikes winning over preferences). Force
    /// groups are the connected components of the `force_friend` lists.
    ///
    /// # Errors
    /// Returns `CoreError::Validation` for duplicate ids and
    /// `CoreError::UnknownReference` when a preference, dislike or
    /// force-friend entry names a student missing from the roster.
    pub fn build(
        mut students: Vec<Student>,
        columns: Vec<String>,
        extras: Vec<HashMap<String, String>>,
    ) -> Result<Self, CoreError> {
        debug_assert_eq!(students.len(), extras.len());

        let mut index_of = HashMap::with_capacity(students.len());
        for (idx, student) in students.iter().enumerate() {
            if index_of.insert(student.id, idx).is_some() {
                return Err(CoreError::Validation {
                    column: "student_id".to_string(),
                    row: idx + 1,
                    reason: format!("duplicate student id {}", student.id),
                });
            }
        }

        for student in &mut students {
            student.normalize_relations();
        }

        let resolve = |list: &[StudentId], kind: &str| -> Result<Vec<usize>, CoreError> {
            list.iter()
                .map(|id| {
                    index_of.get(id).copied().ok_or_else(|| CoreError::UnknownReference {
                        kind: kind.to_string(),
                        id: id.to_string(),
                    })
                })
                .collect()
        };

        let mut friends = Vec::with_capacity(students.len());
        let mut dislikes = Vec::with_capacity(students.len());
        for student in &students {
            friends.push(resolve(&student.preferred_friends, "preferred_friends")?);
            dislikes.push(resolve(&student.disliked_peers, "disliked_peers")?);
        }

        // Force groups: connected components of the force_friend lists.
        let mut parent: Vec<usize> = (0..students.len()).collect();
        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }
        for (idx, student) in students.iter().enumerate() {
            for peer in resolve(&student.force_friend, "force_friend")? {
                let a = find(&mut parent, idx);
                let b = find(&mut parent, peer);
                if a != b {
                    parent[a.max(b)] = a.min(b);
                }
            }
        }
        let mut component_members: HashMap<usize, Vec<usize>> = HashMap::new();
        for idx in 0..students.len() {
            let root = find(&mut parent, idx);
            component_members.entry(root).or_default().push(idx);
        }
        let mut groups: Vec<ForceGroup> = component_members
            .into_values()
            .filter(|members| members.len() > 1)
            .map(|mut members| {
                members.sort_unstable();
                let tag = members
                    .iter()
                    .map(|&m| students[m].id)
                    .min()
                    .expect("group has members")
                    .to_string();
                ForceGroup { tag, members }
            })
            .collect();
        groups.sort_by(|a, b| a.tag.cmp(&b.tag));
        let mut group_of = vec![None; students.len()];
        for (group_idx, group) in groups.iter().enumerate() {
            for &member in &group.members {
                group_of[member] = Some(group_idx);
            }
        }

        // Intern non-empty origins in first-seen order.
        let mut origin_names: Vec<String> = Vec::new();
        let mut origin_index: HashMap<String, usize> = HashMap::new();
        let mut origin_of = Vec::with_capacity(students.len());
        for student in &students {
            let origin = student.school_of_origin.trim();
            if origin.is_empty() {
                origin_of.push(None);
            } else {
                let idx = *origin_index.entry(origin.to_string()).or_insert_with(|| {
                    origin_names.push(origin.to_string());
                    origin_names.len() - 1
                });
                origin_of.push(Some(idx));
            }
        }
        let mut origin_totals = vec![0usize; origin_names.len()];
        for origin in origin_of.iter().flatten() {
            origin_totals[*origin] += 1;
        }

        Ok(Self {
            students,
            index_of,
            friends,
            dislikes,
            origin_of,
            origin_names,
            origin_totals,
            groups,
            group_of,
            columns,
            extras,
        })
    }

    /// Build a roster from students alone, with the standard column set.
    ///
    /// # Errors
    /// Same as [`Roster::build`].
    pub fn from_students(students: Vec<Student>) -> Result<Self, CoreError> {
        let extras = vec![HashMap::new(); students.len()];
        let columns = STANDARD_COLUMNS.iter().map(ToString::to_string).collect();
        Self::build(students, columns, extras)
    }

    /// Number of students.
    #[must_use]
    pub fn len(&self) -> usize {
        self.students.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// All students, in roster order.
    #[must_use]
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    /// One student by roster index.
    #[must_use]
    pub fn student(&self, idx: usize) -> &Student {
        &self.students[idx]
    }

    /// Roster index of a student id.
    #[must_use]
    pub fn index_of(&self, id: StudentId) -> Option<usize> {
        self.index_of.get(&id).copied()
    }

    /// Resolved preferred friends of a student, as roster indices.
    #[must_use]
    pub fn friends_of(&self, idx: usize) -> &[usize] {
        &self.friends[idx]
    }

    /// Resolved disliked peers of a student, as roster indices.
    #[must_use]
    pub fn dislikes_of(&self, idx: usize) -> &[usize] {
        &self.dislikes[idx]
    }

    /// Interned origin of a student.
    #[must_use]
    pub fn origin_of(&self, idx: usize) -> Option<usize> {
        self.origin_of[idx]
    }

    /// Interned origin names.
    #[must_use]
    pub fn origin_names(&self) -> &[String] {
        &self.origin_names
    }

    /// Roster-wide size of one origin.
    #[must_use]
    pub fn origin_total(&self, origin: usize) -> usize {
        self.origin_totals[origin]
    }

    /// All force groups.
    #[must_use]
    pub fn groups(&self) -> &[ForceGroup] {
        &self.groups
    }

    /// Force group of a student, if any.
    #[must_use]
    pub fn group_of(&self, idx: usize) -> Option<usize> {
        self.group_of[idx]
    }

    /// Find a force group by tag.
    #[must_use]
    pub fn group_by_tag(&self, tag: &str) -> Option<&ForceGroup> {
        self.groups.iter().find(|g| g.tag == tag)
    }

    /// Input column names, in input order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Unknown-column values of one student.
    #[must_use]
    pub fn extras(&self, idx: usize) -> &HashMap<String, String> {
        &self.extras[idx]
    }
}

/// A complete assignment snapshot: shared roster plus packed class state.
///
/// Cloning a snapshot is O(N); algorithms clone freely to compare and
/// revert. All mutation goes through the primitives below, which keep the
/// per-class aggregates consistent: optimizers must use the checked
/// operations in [`crate::core::ops`] instead of calling these directly.
#[derive(Debug, Clone)]
pub struct School {
    roster: Arc<Roster>,
    class_ids: Vec<ClassId>,
    class_index: HashMap<ClassId, usize>,
    class_of: Vec<Option<usize>>,
    members: Vec<Vec<usize>>,
    stats: Vec<ClassStats>,
}

impl School {
    /// Create a snapshot with the given classes and every student
    /// unassigned. Class ids are deduplicated and sorted.
    #[must_use]
    pub fn new_unassigned(roster: Arc<Roster>, mut class_ids: Vec<ClassId>) -> Self {
        class_ids.sort();
        class_ids.dedup();
        let class_index = class_ids
            .iter()
            .cloned()
            .enumerate()
            .map(|(idx, id)| (id, idx))
            .collect();
        let students = roster.len();
        let classes = class_ids.len();
        Self {
            roster,
            class_ids,
            class_index,
            class_of: vec![None; students],
            members: vec![Vec::new(); classes],
            stats: vec![ClassStats::default(); classes],
        }
    }

    /// Create a snapshot from a per-student class column. Classes are the
    /// distinct non-`None` ids, sorted.
    #[must_use]
    pub fn from_class_column(roster: Arc<Roster>, classes: &[Option<ClassId>]) -> Self {
        debug_assert_eq!(roster.len(), classes.len());
        let mut ids: Vec<ClassId> = classes.iter().flatten().cloned().collect();
        ids.sort();
        ids.dedup();
        let mut school = Self::new_unassigned(roster, ids);
        for (student, class) in classes.iter().enumerate() {
            if let Some(class_id) = class {
                let class_idx = school.class_index[class_id];
                school.assign(student, class_idx);
            }
        }
        school
    }

    /// The shared roster.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Clone the roster handle.
    #[must_use]
    pub fn roster_arc(&self) -> Arc<Roster> {
        Arc::clone(&self.roster)
    }

    /// Number of classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.class_ids.len()
    }

    /// Class ids in stable ascending order.
    #[must_use]
    pub fn class_ids(&self) -> &[ClassId] {
        &self.class_ids
    }

    /// Index of a class id.
    #[must_use]
    pub fn class_index(&self, id: &ClassId) -> Option<usize> {
        self.class_index.get(id).copied()
    }

    /// Id of a class index.
    #[must_use]
    pub fn class_id(&self, class: usize) -> &ClassId {
        &self.class_ids[class]
    }

    /// Class of a student, by roster index.
    #[must_use]
    pub fn class_of(&self, student: usize) -> Option<usize> {
        self.class_of[student]
    }

    /// Members of a class, in insertion order.
    #[must_use]
    pub fn members(&self, class: usize) -> &[usize] {
        &self.members[class]
    }

    /// Aggregates of a class.
    #[must_use]
    pub fn stats(&self, class: usize) -> &ClassStats {
        &self.stats[class]
    }

    /// Count of students without a class.
    #[must_use]
    pub fn unassigned_count(&self) -> usize {
        self.class_of.iter().filter(|c| c.is_none()).count()
    }

    /// Roster indices of unassigned students, ascending.
    #[must_use]
    pub fn unassigned_students(&self) -> Vec<usize> {
        (0..self.roster.len())
            .filter(|&s| self.class_of[s].is_none())
            .collect()
    }

    /// Whether every student has a class.
    #[must_use]
    pub fn is_fully_assigned(&self) -> bool {
        self.class_of.iter().all(Option::is_some)
    }

    /// Place an unassigned student into a class.
    ///
    /// # Panics
    /// Panics when the student is already assigned (use [`Self::move_to`]).
    pub fn assign(&mut self, student: usize, class: usize) {
        assert!(
            self.class_of[student].is_none(),
            "student {student} is already assigned"
        );
        self.class_of[student] = Some(class);
        self.members[class].push(student);
        let origin = self.roster.origin_of(student);
        // Split borrow: aggregates update needs the student record.
        let record = self.roster.student(student);
        self.stats[class].add(record, origin);
    }

    /// Remove a student from their class, leaving them unassigned.
    pub fn unassign(&mut self, student: usize) {
        if let Some(class) = self.class_of[student].take() {
            self.members[class].retain(|&s| s != student);
            let origin = self.roster.origin_of(student);
            let record = self.roster.student(student);
            self.stats[class].remove(record, origin);
        }
    }

    /// Move a student between classes (no constraint checking).
    pub fn move_to(&mut self, student: usize, class: usize) {
        self.unassign(student);
        self.assign(student, class);
    }

    /// Exchange the classes of two students (no constraint checking).
    ///
    /// # Panics
    /// Panics when either student is unassigned.
    pub fn swap_raw(&mut self, a: usize, b: usize) {
        let class_a = self.class_of[a].expect("swap of unassigned student");
        let class_b = self.class_of[b].expect("swap of unassigned student");
        if class_a == class_b {
            return;
        }
        self.move_to(a, class_b);
        self.move_to(b, class_a);
    }

    /// Number of preferred friends of `student` placed in their class.
    #[must_use]
    pub fn placed_friends(&self, student: usize) -> usize {
        match self.class_of[student] {
            None => 0,
            Some(class) => self
                .roster
                .friends_of(student)
                .iter()
                .filter(|&&friend| self.class_of[friend] == Some(class))
                .count(),
        }
    }

    /// Number of disliked peers of `student` sharing their class.
    #[must_use]
    pub fn present_dislikes(&self, student: usize) -> usize {
        match self.class_of[student] {
            None => 0,
            Some(class) => self
                .roster
                .dislikes_of(student)
                .iter()
                .filter(|&&peer| self.class_of[peer] == Some(class))
                .count(),
        }
    }
}

impl PartialEq for School {
    /// Snapshot equality: same roster data, same classes, same placement.
    /// Members and aggregates are derived from `class_of` and excluded.
    fn eq(&self, other: &Self) -> bool {
        *self.roster == *other.roster
            && self.class_ids == other.class_ids
            && self.class_of == other.class_of
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Gender, Rank};

    fn student(id: u32) -> Student {
        Student {
            id: StudentId::new(id).unwrap(),
            first_name: "S".to_string(),
            last_name: format!("{id}"),
            gender: if id % 2 == 0 { Gender::F } else { Gender::M },
            academic_score: 75.0,
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

    fn roster_of(count: u32) -> Arc<Roster> {
        let students = (0..count).map(|n| student(100_000_001 + n)).collect();
        Arc::new(Roster::from_students(students).unwrap())
    }

    #[test]
    fn test_build_rejects_duplicate_ids() {
        let students = vec![student(100_000_001), student(100_000_001)];
        assert!(Roster::from_students(students).is_err());
    }

    #[test]
    fn test_build_rejects_unknown_friend() {
        let mut a = student(100_000_001);
        a.preferred_friends = vec![StudentId::new(999_999_999).unwrap()];
        let err = Roster::from_students(vec![a]).unwrap_err();
        assert!(err.to_string().contains("999999999"));
    }

    #[test]
    fn test_force_groups_are_connected_components() {
        let mut a = student(100_000_001);
        let mut b = student(100_000_002);
        let c = student(100_000_003);
        let mut d = student(100_000_004);
        // a<->b and b<->d chain into one group; c stays alone.
        a.force_friend = vec![b.id];
        b.force_friend = vec![d.id];
        d.force_friend = vec![];
        let roster = Roster::from_students(vec![a, b, c, d]).unwrap();

        assert_eq!(roster.groups().len(), 1);
        let group = &roster.groups()[0];
        assert_eq!(group.tag, "100000001");
        assert_eq!(group.members, vec![0, 1, 3]);
        assert_eq!(roster.group_of(2), None);
        assert_eq!(roster.group_of(3), Some(0));
    }

    #[test]
    fn test_assign_and_move_keep_stats_consistent() {
        let roster = roster_of(4);
        let classes = vec![ClassId::new("1"), ClassId::new("2")];
        let mut school = School::new_unassigned(roster, classes);

        school.assign(0, 0);
        school.assign(1, 0);
        school.assign(2, 1);
        school.assign(3, 1);
        assert_eq!(school.stats(0).size, 2);

        school.move_to(0, 1);
        assert_eq!(school.stats(0).size, 1);
        assert_eq!(school.stats(1).size, 3);
        assert_eq!(school.class_of(0), Some(1));
        assert_eq!(school.members(1), &[2, 3, 0]);
    }

    #[test]
    fn test_swap_raw_restores_snapshot() {
        let roster = roster_of(4);
        let mut school = School::from_class_column(
            roster,
            &[
                Some(ClassId::new("1")),
                Some(ClassId::new("1")),
                Some(ClassId::new("2")),
                Some(ClassId::new("2")),
            ],
        );
        let before = school.clone();
        school.swap_raw(0, 2);
        assert_ne!(school, before);
        school.swap_raw(0, 2);
        assert_eq!(school, before);
    }

    #[test]
    fn test_from_class_column_sorts_classes() {
        let roster = roster_of(3);
        let school = School::from_class_column(
            roster,
            &[
                Some(ClassId::new("10")),
                Some(ClassId::new("2")),
                None,
            ],
        );
        let ids: Vec<&str> = school.class_ids().iter().map(ClassId::as_str).collect();
        assert_eq!(ids, vec!["2", "10"]);
        assert_eq!(school.unassigned_count(), 1);
    }

    #[test]
    fn test_placed_friends_and_dislikes() {
        let mut a = student(100_000_001);
        let b = student(100_000_002);
        let c = student(100_000_003);
        a.preferred_friends = vec![b.id];
        a.disliked_peers = vec![c.id];
        let roster = Arc::new(Roster::from_students(vec![a, b, c]).unwrap());
        let school = School::from_class_column(
            roster,
            &[
                Some(ClassId::new("1")),
                Some(ClassId::new("1")),
                Some(ClassId::new("1")),
            ],
        );
        assert_eq!(school.placed_friends(0), 1);
        assert_eq!(school.present_dislikes(0), 1);
    }
}
