//! End-to-end scorer scenarios

mod common;

use approx::assert_relative_eq;
use common::{school_of, student};
use shibutz::core::config::{Config, SchoolLayerWeights};
use shibutz::core::models::Gender;
use shibutz::core::scorer::Scorer;

/// Two mutually preferring students sharing one class: the student layer
/// is perfect, the (all-male) class layer bottoms out, and with a single
/// class every school vector scores 100.
#[test]
fn test_two_student_single_class_scenario() {
    let mut a = student(101_000_001);
    let mut b = student(101_000_002);
    a.gender = Gender::M;
    b.gender = Gender::M;
    a.academic_score = 90.0;
    b.academic_score = 80.0;
    a.preferred_friends = vec![b.id];
    b.preferred_friends = vec![a.id];
    let school = school_of(vec![a, b], &["1", "1"]);

    let result = Scorer::from_config(&Config::default()).score(&school);
    assert_relative_eq!(result.student_layer, 100.0);
    assert_relative_eq!(result.class_layer, 0.0);
    assert_relative_eq!(result.school_layer, 100.0);
    // 0.75·100 + 0.05·0 + 0.20·100
    assert_relative_eq!(result.final_score, 95.0);
}

/// Friend placed, dislike avoided, single-gender classes, uneven sizes.
#[test]
fn test_friend_versus_dislike_scenario() {
    let mut a = student(200_000_001);
    let mut b = student(200_000_002);
    let mut c = student(200_000_003);
    for s in [&mut a, &mut b, &mut c] {
        s.gender = Gender::M;
    }
    a.preferred_friends = vec![b.id];
    c.disliked_peers = vec![a.id];
    let school = school_of(vec![a, b, c], &["1", "1", "2"]);

    let config = Config::default();
    let result = Scorer::from_config(&config).score(&school);

    // Every student is fully satisfied.
    assert_relative_eq!(result.student_layer, 100.0);
    // Both classes are single-gender.
    assert_relative_eq!(result.class_layer, 0.0);
    // With the default sub-weights the size vector is disabled and all
    // enabled school metrics are perfect.
    assert_relative_eq!(result.school_layer, 100.0);
    assert_relative_eq!(result.final_score, 95.0);

    // Sizes (2, 1) under a size-only weighting: σ=0.5, factor 5 → 97.5.
    let mut size_only = config.clone();
    size_only.weights.school_layer = SchoolLayerWeights {
        academic_balance: 0.0,
        behavior_balance: 0.0,
        studentiality_balance: 0.0,
        size_balance: 1.0,
        assistance_balance: 0.0,
        school_origin_balance: 0.0,
    };
    let sized = Scorer::from_config(&size_only).score(&school);
    assert_relative_eq!(sized.school_layer, 97.5);
}

/// The scorer only looks at snapshot contents, not at input ordering.
#[test]
fn test_permutation_invariance() {
    let mut a = student(300_000_001);
    let mut b = student(300_000_002);
    let c = student(300_000_003);
    let d = student(300_000_004);
    a.preferred_friends = vec![c.id];
    b.disliked_peers = vec![d.id];

    let forward = school_of(
        vec![a.clone(), b.clone(), c.clone(), d.clone()],
        &["1", "2", "1", "2"],
    );
    let reversed = school_of(vec![d, c, b, a], &["2", "1", "2", "1"]);

    let scorer = Scorer::from_config(&Config::default());
    let lhs = scorer.score(&forward);
    let rhs = scorer.score(&reversed);
    assert_relative_eq!(lhs.final_score, rhs.final_score);
    assert_relative_eq!(lhs.student_layer, rhs.student_layer);
    assert_relative_eq!(lhs.class_layer, rhs.class_layer);
    assert_relative_eq!(lhs.school_layer, rhs.school_layer);
}

#[test]
fn test_scoring_is_repeatable() {
    let school = common::segregated_school(6);
    let scorer = Scorer::from_config(&Config::default());
    assert_eq!(scorer.score(&school), scorer.score(&school));
}

/// All-zero sub-weights collapse a layer without dividing by zero, and
/// the remaining layers re-normalize.
#[test]
fn test_zero_weight_layer_collapses() {
    let school = common::segregated_school(4);
    let mut config = Config::default();
    config.weights.class_layer.gender_balance = 0.0;
    let result = Scorer::from_config(&config).score(&school);
    // Student and school layers are perfect here; without the class
    // layer the final score is their weighted mean = 100.
    assert_relative_eq!(result.final_score, 100.0);
}

/// Students with an empty origin never count toward origin metrics.
#[test]
fn test_empty_origin_is_ignored() {
    let mut a = student(400_000_001);
    let mut b = student(400_000_002);
    let c = student(400_000_003);
    a.school_of_origin = "North".to_string();
    b.school_of_origin = "North".to_string();
    // c has no origin.
    let school = school_of(vec![a, b, c], &["1", "2", "2"]);

    let mut config = Config::default();
    config.weights.school_layer.school_origin_balance = 1.0;
    let result = Scorer::from_config(&config).score(&school);
    let origin = result.school.school_origin_balance;
    // "North" is small (target 0.4) and present in both classes.
    assert_relative_eq!(origin.representation, 100.0);
    // Class 1 is 100% North (dominance 1.0 → 0); class 2 is half North
    // (dominance 0.5 → 100·(0.1/0.6)).
    assert_relative_eq!(origin.non_dominance, (0.0 + 100.0 * (0.1 / 0.6)) / 2.0, epsilon = 1e-9);
}

/// An empty class is perfectly gender balanced and never dominates.
#[test]
fn test_empty_class_boundaries() {
    use shibutz::core::models::{ClassId, Roster, School};
    use std::sync::Arc;

    let roster = Arc::new(Roster::from_students(vec![student(500_000_001)]).unwrap());
    let mut school = School::new_unassigned(
        roster,
        vec![ClassId::new("1"), ClassId::new("2")],
    );
    school.assign(0, 0);

    let result = Scorer::from_config(&Config::default()).score(&school);
    let empty = result.per_class.get(&ClassId::new("2")).unwrap();
    assert_relative_eq!(empty.gender_balance, 100.0);
    assert_eq!(empty.size, 0);
}
