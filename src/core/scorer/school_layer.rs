//! School layer: inter-class equity
//!
//! Five deviation metrics (academic, behavior, studentiality, size,
//! assistance) score `max(0, 100 − σ · factor)` over the per-class value
//! vector, and the school-origin metric combines representation with
//! non-dominance. Enabled metrics are combined by weight-normalized mean.

use crate::core::config::{Normalization, SchoolLayerWeights};
use crate::core::models::School;
use serde::Serialize;

/// Share of the origin metric carried by representation.
const REPRESENTATION_SHARE: f64 = 0.7;
/// Share of the origin metric carried by non-dominance.
const NON_DOMINANCE_SHARE: f64 = 0.3;
/// A single origin may fill at most this share of a class before the
/// non-dominance score starts dropping.
const DOMINANCE_CEILING: f64 = 0.6;

/// One deviation metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricBreakdown {
    /// Metric score, 0..=100.
    pub score: f64,
    /// Population standard deviation of the per-class vector.
    pub std_dev: f64,
    /// Configured weight (0 = disabled).
    pub weight: f64,
}

/// The school-origin distribution metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OriginBreakdown {
    /// Combined metric score, 0..=100.
    pub score: f64,
    /// Mean representation over origins.
    pub representation: f64,
    /// Mean per-class non-dominance.
    pub non_dominance: f64,
    /// Configured weight (0 = disabled).
    pub weight: f64,
}

/// School-layer breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SchoolBreakdown {
    /// Weight-normalized school-layer score, 0..=100.
    pub score: f64,
    /// Academic-mean balance.
    pub academic_balance: MetricBreakdown,
    /// Behavior-rank balance.
    pub behavior_balance: MetricBreakdown,
    /// Studentiality-rank balance.
    pub studentiality_balance: MetricBreakdown,
    /// Class-size balance.
    pub size_balance: MetricBreakdown,
    /// Assistance-count balance.
    pub assistance_balance: MetricBreakdown,
    /// Origin-distribution balance.
    pub school_origin_balance: OriginBreakdown,
}

/// Population standard deviation; 0 for vectors shorter than two.
#[must_use]
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// `max(0, 100 − σ · factor)`; vectors of length ≤ 1 score 100.
fn deviation_score(values: &[f64], factor: f64) -> (f64, f64) {
    if values.len() <= 1 {
        return (100.0, 0.0);
    }
    let sigma = population_std_dev(values);
    ((100.0 - sigma * factor).max(0.0), sigma)
}

fn metric(values: &[f64], factor: f64, weight: f64) -> MetricBreakdown {
    let (score, std_dev) = deviation_score(values, factor);
    MetricBreakdown {
        score,
        std_dev,
        weight,
    }
}

/// Representation sub-score: how widely each origin is spread over the
/// classes, relative to a size-dependent target presence.
#[must_use]
pub fn origin_representation(school: &School) -> f64 {
    let roster = school.roster();
    let origins = roster.origin_names().len();
    if origins == 0 || school.num_classes() == 0 {
        return 100.0;
    }
    let classes = school.num_classes() as f64;
    let mut total = 0.0;
    for origin in 0..origins {
        let size = roster.origin_total(origin);
        let target = if size > 40 {
            0.8
        } else if size >= 20 {
            0.6
        } else {
            0.4
        };
        let present = (0..school.num_classes())
            .filter(|&class| school.stats(class).origins.contains_key(&origin))
            .count() as f64;
        let presence = present / classes;
        total += 100.0 * (presence / target).min(1.0);
    }
    total / origins as f64
}

/// Non-dominance sub-score: mean over non-empty classes of how far the
/// largest single-origin share stays below the ceiling.
#[must_use]
pub fn origin_non_dominance(school: &School) -> f64 {
    let populated: Vec<usize> = (0..school.num_classes())
        .filter(|&class| school.stats(class).size > 0)
        .collect();
    if populated.is_empty() {
        return 100.0;
    }
    let total: f64 = populated
        .iter()
        .map(|&class| {
            let dominance = school.stats(class).origin_dominance();
            100.0 * ((DOMINANCE_CEILING - dominance) / DOMINANCE_CEILING).clamp(0.0, 1.0)
        })
        .sum();
    total / populated.len() as f64
}

fn origin_metric(school: &School, weight: f64) -> OriginBreakdown {
    let representation = origin_representation(school);
    let non_dominance = origin_non_dominance(school);
    OriginBreakdown {
        score: REPRESENTATION_SHARE * representation + NON_DOMINANCE_SHARE * non_dominance,
        representation,
        non_dominance,
        weight,
    }
}

fn class_vectors(school: &School) -> [Vec<f64>; 5] {
    let classes = school.num_classes();
    let mut academic = Vec::with_capacity(classes);
    let mut behavior = Vec::with_capacity(classes);
    let mut studentiality = Vec::with_capacity(classes);
    let mut size = Vec::with_capacity(classes);
    let mut assistance = Vec::with_capacity(classes);
    for class in 0..classes {
        let stats = school.stats(class);
        academic.push(stats.mean_academic());
        behavior.push(stats.mean_behavior());
        studentiality.push(stats.mean_studentiality());
        size.push(stats.size as f64);
        assistance.push(stats.assistance as f64);
    }
    [academic, behavior, studentiality, size, assistance]
}

/// Compute the full school-layer breakdown.
#[must_use]
pub fn breakdown(
    school: &School,
    weights: &SchoolLayerWeights,
    normalization: &Normalization,
) -> SchoolBreakdown {
    let [academic, behavior, studentiality, size, assistance] = class_vectors(school);

    let academic_balance = metric(
        &academic,
        normalization.academic_score_factor,
        weights.academic_balance,
    );
    let behavior_balance = metric(
        &behavior,
        normalization.behavior_rank_factor,
        weights.behavior_balance,
    );
    let studentiality_balance = metric(
        &studentiality,
        normalization.studentiality_rank_factor,
        weights.studentiality_balance,
    );
    let size_balance = metric(&size, normalization.class_size_factor, weights.size_balance);
    let assistance_balance = metric(
        &assistance,
        normalization.assistance_count_factor,
        weights.assistance_balance,
    );
    let school_origin_balance = origin_metric(school, weights.school_origin_balance);

    let weighted = [
        (academic_balance.score, academic_balance.weight),
        (behavior_balance.score, behavior_balance.weight),
        (studentiality_balance.score, studentiality_balance.weight),
        (size_balance.score, size_balance.weight),
        (assistance_balance.score, assistance_balance.weight),
        (school_origin_balance.score, school_origin_balance.weight),
    ];
    let weight_sum: f64 = weighted.iter().filter(|(_, w)| *w > 0.0).map(|(_, w)| w).sum();
    let score = if weight_sum > 0.0 {
        weighted
            .iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(s, w)| s * w)
            .sum::<f64>()
            / weight_sum
    } else {
        0.0
    };

    SchoolBreakdown {
        score,
        academic_balance,
        behavior_balance,
        studentiality_balance,
        size_balance,
        assistance_balance,
        school_origin_balance,
    }
}

/// Weight-normalized school-layer score; `None` when every sub-weight is
/// zero.
#[must_use]
pub fn layer_score(
    school: &School,
    weights: &SchoolLayerWeights,
    normalization: &Normalization,
) -> Option<f64> {
    let enabled = weights.academic_balance > 0.0
        || weights.behavior_balance > 0.0
        || weights.studentiality_balance > 0.0
        || weights.size_balance > 0.0
        || weights.assistance_balance > 0.0
        || weights.school_origin_balance > 0.0;
    if !enabled {
        return None;
    }
    Some(breakdown(school, weights, normalization).score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ClassId, Gender, Rank, Roster, Student, StudentId};
    use std::sync::Arc;

    fn student(id: u32, academic: f64, origin: &str) -> Student {
        Student {
            id: StudentId::new(id).unwrap(),
            first_name: "S".to_string(),
            last_name: format!("{id}"),
            gender: Gender::M,
            academic_score: academic,
            behavior_rank: Rank::A,
            studentiality_rank: Rank::A,
            assistance_package: false,
            school_of_origin: origin.to_string(),
            preferred_friends: Vec::new(),
            disliked_peers: Vec::new(),
            force_class: None,
            force_friend: Vec::new(),
        }
    }

    fn school_of(students: Vec<Student>, classes: &[&str]) -> School {
        let roster = Arc::new(Roster::from_students(students).unwrap());
        let column: Vec<Option<ClassId>> =
            classes.iter().map(|c| Some(ClassId::new(*c))).collect();
        School::from_class_column(roster, &column)
    }

    #[test]
    fn test_population_std_dev() {
        assert!((population_std_dev(&[2.0, 1.0]) - 0.5).abs() < 1e-9);
        assert!((population_std_dev(&[5.0]) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_size_deviation_score() {
        // Sizes (2, 1): σ = 0.5, factor 5 → 97.5.
        let school = school_of(
            vec![
                student(100_000_001, 80.0, ""),
                student(100_000_002, 80.0, ""),
                student(100_000_003, 80.0, ""),
            ],
            &["1", "1", "2"],
        );
        let weights = SchoolLayerWeights {
            size_balance: 1.0,
            academic_balance: 0.0,
            behavior_balance: 0.0,
            studentiality_balance: 0.0,
            assistance_balance: 0.0,
            school_origin_balance: 0.0,
        };
        let layer = layer_score(&school, &weights, &Normalization::default()).unwrap();
        assert!((layer - 97.5).abs() < 1e-9);
    }

    #[test]
    fn test_single_class_scores_hundred() {
        let school = school_of(
            vec![student(100_000_001, 90.0, ""), student(100_000_002, 10.0, "")],
            &["1", "1"],
        );
        let b = breakdown(
            &school,
            &SchoolLayerWeights::default(),
            &Normalization::default(),
        );
        assert!((b.academic_balance.score - 100.0).abs() < 1e-9);
        assert!((b.score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_weights_disable_layer() {
        let school = school_of(vec![student(100_000_001, 80.0, "")], &["1"]);
        let weights = SchoolLayerWeights {
            academic_balance: 0.0,
            behavior_balance: 0.0,
            studentiality_balance: 0.0,
            size_balance: 0.0,
            assistance_balance: 0.0,
            school_origin_balance: 0.0,
        };
        assert_eq!(layer_score(&school, &weights, &Normalization::default()), None);
    }

    #[test]
    fn test_origin_representation_targets() {
        // One origin with 2 students spread over both classes: target for a
        // small origin is 0.4, presence 1.0 → capped at 100.
        let school = school_of(
            vec![
                student(100_000_001, 80.0, "North"),
                student(100_000_002, 80.0, "North"),
            ],
            &["1", "2"],
        );
        assert!((origin_representation(&school) - 100.0).abs() < 1e-9);

        // Same origin concentrated in one of two classes: presence 0.5,
        // target 0.4 → still capped at 100.
        let school = school_of(
            vec![
                student(100_000_001, 80.0, "North"),
                student(100_000_002, 80.0, "North"),
                student(100_000_003, 80.0, ""),
            ],
            &["1", "1", "2"],
        );
        assert!((origin_representation(&school) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_origin_dominance_penalty() {
        // Class 1 is fully dominated by one origin → non-dominance 0 for
        // it; class 2 has no origins → dominance 0, non-dominance 100.
        let school = school_of(
            vec![
                student(100_000_001, 80.0, "North"),
                student(100_000_002, 80.0, "North"),
                student(100_000_003, 80.0, ""),
            ],
            &["1", "1", "2"],
        );
        assert!((origin_non_dominance(&school) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_origin_ignored() {
        let school = school_of(
            vec![student(100_000_001, 80.0, ""), student(100_000_002, 80.0, "")],
            &["1", "2"],
        );
        assert!((origin_representation(&school) - 100.0).abs() < 1e-9);
        assert!((origin_non_dominance(&school) - 100.0).abs() < 1e-9);
    }
}
