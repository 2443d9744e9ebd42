//! Student layer: individual satisfaction
//!
//! Two metrics per student: friend satisfaction and conflict avoidance -
//! combined by the student-layer sub-weights and averaged over the roster.

use crate::core::config::StudentLayerWeights;
use crate::core::models::School;
use serde::Serialize;

/// Per-student satisfaction breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentBreakdown {
    /// Weighted student score, 0..=100.
    pub score: f64,
    /// 100 · placed / requested; 100 when nobody was requested.
    pub friend_satisfaction: f64,
    /// 100 · avoided / listed; 100 when nobody was listed.
    pub conflict_avoidance: f64,
    /// Number of preferred friends listed.
    pub friends_requested: usize,
    /// Preferred friends sharing the class.
    pub friends_placed: usize,
    /// Number of disliked peers listed.
    pub dislikes_listed: usize,
    /// Disliked peers kept out of the class.
    pub dislikes_avoided: usize,
}

/// Compute the satisfaction breakdown of one student.
#[must_use]
pub fn breakdown(school: &School, student: usize, weights: &StudentLayerWeights) -> StudentBreakdown {
    let friends_requested = school.roster().friends_of(student).len();
    let friends_placed = school.placed_friends(student);
    let dislikes_listed = school.roster().dislikes_of(student).len();
    let dislikes_present = school.present_dislikes(student);
    let dislikes_avoided = dislikes_listed - dislikes_present;

    let friend_satisfaction = if friends_requested == 0 {
        100.0
    } else {
        100.0 * friends_placed as f64 / friends_requested as f64
    };
    let conflict_avoidance = if dislikes_listed == 0 {
        100.0
    } else {
        100.0 * dislikes_avoided as f64 / dislikes_listed as f64
    };

    let weight_sum = weights.friends + weights.dislikes;
    let score = if weight_sum > 0.0 {
        (weights.friends * friend_satisfaction + weights.dislikes * conflict_avoidance) / weight_sum
    } else {
        0.0
    };

    StudentBreakdown {
        score,
        friend_satisfaction,
        conflict_avoidance,
        friends_requested,
        friends_placed,
        dislikes_listed,
        dislikes_avoided,
    }
}

/// Weighted score of one student, without the full breakdown.
#[must_use]
pub fn student_score(school: &School, student: usize, weights: &StudentLayerWeights) -> f64 {
    breakdown(school, student, weights).score
}

/// Arithmetic mean of student scores; `None` when both sub-weights are
/// zero (the layer drops out of the final normalization) or the roster is
/// empty.
#[must_use]
pub fn layer_score(school: &School, weights: &StudentLayerWeights) -> Option<f64> {
    if weights.friends + weights.dislikes <= 0.0 {
        return None;
    }
    let count = school.roster().len();
    if count == 0 {
        return None;
    }
    let sum: f64 = (0..count)
        .map(|student| student_score(school, student, weights))
        .sum();
    Some(sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ClassId, Gender, Rank, Roster, Student, StudentId};
    use std::sync::Arc;

    fn student(id: u32) -> Student {
        Student {
            id: StudentId::new(id).unwrap(),
            first_name: "S".to_string(),
            last_name: format!("{id}"),
            gender: Gender::M,
            academic_score: 80.0,
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

    #[test]
    fn test_no_relations_scores_hundred() {
        let roster = Arc::new(Roster::from_students(vec![student(100_000_001)]).unwrap());
        let school = School::from_class_column(roster, &[Some(ClassId::new("1"))]);
        let weights = StudentLayerWeights::default();
        let b = breakdown(&school, 0, &weights);
        assert!((b.score - 100.0).abs() < 1e-9);
        assert!((b.friend_satisfaction - 100.0).abs() < 1e-9);
        assert!((b.conflict_avoidance - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_friend_placement() {
        let mut a = student(100_000_001);
        let b = student(100_000_002);
        let c = student(100_000_003);
        a.preferred_friends = vec![b.id, c.id];
        let roster = Arc::new(Roster::from_students(vec![a, b, c]).unwrap());
        let school = School::from_class_column(
            roster,
            &[
                Some(ClassId::new("1")),
                Some(ClassId::new("1")),
                Some(ClassId::new("2")),
            ],
        );
        let weights = StudentLayerWeights::default();
        let b = breakdown(&school, 0, &weights);
        assert!((b.friend_satisfaction - 50.0).abs() < 1e-9);
        assert_eq!(b.friends_placed, 1);
        // 0.7 * 50 + 0.3 * 100 = 65
        assert!((b.score - 65.0).abs() < 1e-9);
    }

    #[test]
    fn test_dislike_presence_lowers_avoidance() {
        let mut a = student(100_000_001);
        let b = student(100_000_002);
        a.disliked_peers = vec![b.id];
        let roster = Arc::new(Roster::from_students(vec![a, b]).unwrap());
        let school = School::from_class_column(
            roster,
            &[Some(ClassId::new("1")), Some(ClassId::new("1"))],
        );
        let weights = StudentLayerWeights::default();
        let b = breakdown(&school, 0, &weights);
        assert!((b.conflict_avoidance - 0.0).abs() < 1e-9);
        // 0.7 * 100 + 0.3 * 0 = 70
        assert!((b.score - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weights_disable_layer() {
        let roster = Arc::new(Roster::from_students(vec![student(100_000_001)]).unwrap());
        let school = School::from_class_column(roster, &[Some(ClassId::new("1"))]);
        let weights = StudentLayerWeights {
            friends: 0.0,
            dislikes: 0.0,
        };
        assert_eq!(layer_score(&school, &weights), None);
    }
}
