//! Student model

use crate::core::models::ClassId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 9-digit student identifier, unique within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentId(u32);

impl StudentId {
    /// Build an id from its numeric value.
    ///
    /// # Errors
    /// Returns a message when the value has more than nine digits.
    pub fn new(value: u32) -> Result<Self, String> {
        if value > 999_999_999 {
            return Err(format!("student id must have at most 9 digits, got {value}"));
        }
        Ok(Self(value))
    }

    /// Numeric value of the id.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl FromStr for StudentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != 9 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("student id must be exactly 9 digits, got: {s}"));
        }
        let value = trimmed
            .parse::<u32>()
            .map_err(|_| format!("student id out of range: {s}"))?;
        Ok(Self(value))
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:09}", self.0)
    }
}

impl TryFrom<String> for StudentId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StudentId> for String {
    fn from(id: StudentId) -> Self {
        id.to_string()
    }
}

/// Student gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male.
    M,
    /// Female.
    F,
}

impl Gender {
    /// Single-letter representation used in tables.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::M => "M",
            Self::F => "F",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M" => Ok(Self::M),
            "F" => Ok(Self::F),
            other => Err(format!("gender must be 'M' or 'F', got: {other}")),
        }
    }
}

/// Ordinal rank from A (best) to D, used for behavior and studentiality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    /// Best rank; also the fallback for a missing cell.
    #[default]
    A,
    /// Second rank.
    B,
    /// Third rank.
    C,
    /// Worst rank.
    D,
}

impl Rank {
    /// Numeric conversion used by the balance metrics: A=1 .. D=4.
    #[must_use]
    pub fn numeric(self) -> f64 {
        match self {
            Self::A => 1.0,
            Self::B => 2.0,
            Self::C => 3.0,
            Self::D => 4.0,
        }
    }

    /// Letter representation used in tables.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl FromStr for Rank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" => Ok(Self::A),
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            other => Err(format!("rank must be A-D, got: {other}")),
        }
    }
}

/// A single student with social preferences and placement constraints.
///
/// Students are immutable once the roster is built; the assignment lives in
/// the [`School`](crate::core::models::School) snapshot, never on the
/// student itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Unique 9-digit identifier.
    pub id: StudentId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Gender.
    pub gender: Gender,
    /// Academic score in [0, 100].
    pub academic_score: f64,
    /// Behavior rank.
    pub behavior_rank: Rank,
    /// Studentiality rank.
    pub studentiality_rank: Rank,
    /// Whether the student receives an assistance package.
    pub assistance_package: bool,
    /// School of origin; empty means unknown.
    pub school_of_origin: String,
    /// Up to three peers the student wants in class.
    pub preferred_friends: Vec<StudentId>,
    /// Up to five peers the student wants out of class.
    pub disliked_peers: Vec<StudentId>,
    /// Class the student must be placed in, if any.
    pub force_class: Option<ClassId>,
    /// Peers forming a must-stay-together group with this student.
    pub force_friend: Vec<StudentId>,
}

impl Student {
    /// Full display name.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether a `force_class` lock applies.
    #[must_use]
    pub fn has_force_class(&self) -> bool {
        self.force_class.is_some()
    }

    /// Whether this student is part of a force group.
    #[must_use]
    pub fn has_force_friend(&self) -> bool {
        !self.force_friend.is_empty()
    }

    /// Clean the relation lists in place: drop self-references and
    /// duplicates, cap friends at three and dislikes at five, and let a
    /// dislike win over a preference for the same peer.
    pub fn normalize_relations(&mut self) {
        dedup_keep_order(&mut self.disliked_peers, self.id, 5);
        dedup_keep_order(&mut self.preferred_friends, self.id, 3);
        let dislikes = self.disliked_peers.clone();
        self.preferred_friends.retain(|id| !dislikes.contains(id));
        dedup_keep_order(&mut self.force_friend, self.id, usize::MAX);
    }
}

fn dedup_keep_order(list: &mut Vec<StudentId>, own_id: StudentId, cap: usize) {
    let mut seen = Vec::with_capacity(list.len());
    list.retain(|id| {
        if *id == own_id || seen.contains(id) || seen.len() >= cap {
            return false;
        }
        seen.push(*id);
        true
    });
}
