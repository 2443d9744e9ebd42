//! Class identity and incrementally maintained per-class aggregates

use crate::core::models::{Gender, Student};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// A class identifier.
///
/// Ids compare numerically when both sides parse as integers (so "2"
/// sorts before "10") and lexicographically otherwise, giving the stable
/// class order the engine relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassId(String);

impl ClassId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as written in tables.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl Ord for ClassId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<u64>(), other.0.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            _ => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ClassId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Aggregates of one class, updated in O(1) on every move so the scorer
/// never has to re-aggregate members from scratch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassStats {
    /// Number of students.
    pub size: usize,
    /// Male count.
    pub male: usize,
    /// Female count.
    pub female: usize,
    /// Sum of academic scores.
    pub academic_sum: f64,
    /// Sum of numeric behavior ranks.
    pub behavior_sum: f64,
    /// Sum of numeric studentiality ranks.
    pub studentiality_sum: f64,
    /// Students with an assistance package.
    pub assistance: usize,
    /// Origin multiset: interned origin index → member count.
    pub origins: HashMap<usize, usize>,
}

impl ClassStats {
    /// Fold one student into the aggregates.
    pub fn add(&mut self, student: &Student, origin: Option<usize>) {
        self.size += 1;
        match student.gender {
            Gender::M => self.male += 1,
            Gender::F => self.female += 1,
        }
        self.academic_sum += student.academic_score;
        self.behavior_sum += student.behavior_rank.numeric();
        self.studentiality_sum += student.studentiality_rank.numeric();
        if student.assistance_package {
            self.assistance += 1;
        }
        if let Some(origin) = origin {
            *self.origins.entry(origin).or_insert(0) += 1;
        }
    }

    /// Remove one student from the aggregates.
    pub fn remove(&mut self, student: &Student, origin: Option<usize>) {
        debug_assert!(self.size > 0, "removing from an empty class");
        self.size -= 1;
        match student.gender {
            Gender::M => self.male -= 1,
            Gender::F => self.female -= 1,
        }
        self.academic_sum -= student.academic_score;
        self.behavior_sum -= student.behavior_rank.numeric();
        self.studentiality_sum -= student.studentiality_rank.numeric();
        if student.assistance_package {
            self.assistance -= 1;
        }
        if let Some(origin) = origin {
            if let Some(count) = self.origins.get_mut(&origin) {
                *count -= 1;
                if *count == 0 {
                    self.origins.remove(&origin);
                }
            }
        }
    }

    /// Mean academic score; 0 for an empty class.
    #[must_use]
    pub fn mean_academic(&self) -> f64 {
        if self.size == 0 {
            0.0
        } else {
            self.academic_sum / self.size as f64
        }
    }

    /// Mean numeric behavior rank; 1 (all-A) for an empty class.
    #[must_use]
    pub fn mean_behavior(&self) -> f64 {
        if self.size == 0 {
            1.0
        } else {
            self.behavior_sum / self.size as f64
        }
    }

    /// Mean numeric studentiality rank; 1 (all-A) for an empty class.
    #[must_use]
    pub fn mean_studentiality(&self) -> f64 {
        if self.size == 0 {
            1.0
        } else {
            self.studentiality_sum / self.size as f64
        }
    }

    /// Largest single-origin share of the class, in [0, 1].
    /// Only students with a known origin count toward the numerator.
    #[must_use]
    pub fn origin_dominance(&self) -> f64 {
        if self.size == 0 {
            return 0.0;
        }
        let max_count = self.origins.values().copied().max().unwrap_or(0);
        max_count as f64 / self.size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Rank;

    fn student(id: u32, gender: Gender, academic: f64, behavior: Rank) -> Student {
        Student {
            id: crate::core::models::StudentId::new(id).unwrap(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            gender,
            academic_score: academic,
            behavior_rank: behavior,
            studentiality_rank: Rank::A,
            assistance_package: false,
            school_of_origin: String::new(),
            preferred_friends: Vec::new(),
            disliked_peers: Vec::new(),
            force_class: None,
            force_friend: Vec::new(),
        }
    }

    #[test]
    fn test_class_id_numeric_order() {
        let mut ids = vec![ClassId::new("10"), ClassId::new("2"), ClassId::new("1")];
        ids.sort();
        let rendered: Vec<&str> = ids.iter().map(ClassId::as_str).collect();
        assert_eq!(rendered, vec!["1", "2", "10"]);
    }

    #[test]
    fn test_class_id_lexicographic_fallback() {
        assert!(ClassId::new("alef") < ClassId::new("bet"));
    }

    #[test]
    fn test_stats_add_remove_round_trip() {
        let a = student(100_000_001, Gender::M, 90.0, Rank::B);
        let b = student(100_000_002, Gender::F, 70.0, Rank::A);

        let mut stats = ClassStats::default();
        stats.add(&a, Some(0));
        stats.add(&b, None);
        assert_eq!(stats.size, 2);
        assert_eq!(stats.male, 1);
        assert!((stats.mean_academic() - 80.0).abs() < 1e-9);
        assert!((stats.mean_behavior() - 1.5).abs() < 1e-9);

        stats.remove(&a, Some(0));
        assert_eq!(stats.size, 1);
        assert!(stats.origins.is_empty());
        stats.remove(&b, None);
        assert_eq!(stats, ClassStats::default());
    }

    #[test]
    fn test_origin_dominance() {
        let mut stats = ClassStats::default();
        let a = student(100_000_001, Gender::M, 90.0, Rank::A);
        let b = student(100_000_002, Gender::M, 90.0, Rank::A);
        let c = student(100_000_003, Gender::M, 90.0, Rank::A);
        stats.add(&a, Some(0));
        stats.add(&b, Some(0));
        stats.add(&c, Some(1));
        assert!((stats.origin_dominance() - 2.0 / 3.0).abs() < 1e-9);
    }
}
