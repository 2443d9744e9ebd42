//! Class layer: intra-class composition
//!
//! Gender balance is the only metric today. The weighted-mean shape is
//! kept so further class metrics can be added without touching the
//! final-score formula.

use crate::core::config::ClassLayerWeights;
use crate::core::models::{ClassStats, School};
use serde::Serialize;

/// Per-class balance breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassBreakdown {
    /// Weighted class score, 0..=100.
    pub score: f64,
    /// Gender-balance metric, 0..=100.
    pub gender_balance: f64,
    /// Male count.
    pub male: usize,
    /// Female count.
    pub female: usize,
    /// Class size.
    pub size: usize,
}

/// Gender balance of one class: 100 − 100·|male share − female share|.
/// An empty class is perfectly balanced.
#[must_use]
pub fn gender_balance(stats: &ClassStats) -> f64 {
    if stats.size == 0 {
        return 100.0;
    }
    let male_ratio = stats.male as f64 / stats.size as f64;
    let female_ratio = stats.female as f64 / stats.size as f64;
    100.0 - 100.0 * (male_ratio - female_ratio).abs()
}

/// Compute the balance breakdown of one class.
#[must_use]
pub fn breakdown(school: &School, class: usize, weights: &ClassLayerWeights) -> ClassBreakdown {
    let stats = school.stats(class);
    let balance = gender_balance(stats);
    let weight_sum = weights.gender_balance;
    let score = if weight_sum > 0.0 {
        weights.gender_balance * balance / weight_sum
    } else {
        0.0
    };
    ClassBreakdown {
        score,
        gender_balance: balance,
        male: stats.male,
        female: stats.female,
        size: stats.size,
    }
}

/// Arithmetic mean of class scores; `None` when every sub-weight is zero
/// or the snapshot has no classes.
#[must_use]
pub fn layer_score(school: &School, weights: &ClassLayerWeights) -> Option<f64> {
    if weights.gender_balance <= 0.0 {
        return None;
    }
    let classes = school.num_classes();
    if classes == 0 {
        return None;
    }
    let sum: f64 = (0..classes)
        .map(|class| gender_balance(school.stats(class)))
        .sum();
    Some(sum / classes as f64)
}
