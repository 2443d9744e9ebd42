//! Configuration document tests

use shibutz::core::config::Config;

#[test]
fn test_defaults_match_spec_table() {
    let config = Config::default();

    assert!((config.weights.layers.student - 0.75).abs() < 1e-12);
    assert!((config.weights.layers.class - 0.05).abs() < 1e-12);
    assert!((config.weights.layers.school - 0.20).abs() < 1e-12);

    assert!((config.weights.student_layer.friends - 0.7).abs() < 1e-12);
    assert!((config.weights.student_layer.dislikes - 0.3).abs() < 1e-12);
    assert!((config.weights.class_layer.gender_balance - 1.0).abs() < 1e-12);

    let school = &config.weights.school_layer;
    assert!((school.academic_balance - 0.05).abs() < 1e-12);
    assert!((school.behavior_balance - 0.4).abs() < 1e-12);
    assert!((school.studentiality_balance - 0.4).abs() < 1e-12);
    assert!((school.size_balance - 0.0).abs() < 1e-12);
    assert!((school.assistance_balance - 0.15).abs() < 1e-12);
    assert!((school.school_origin_balance - 0.0).abs() < 1e-12);

    let normalization = &config.normalization;
    assert!((normalization.academic_score_factor - 2.0).abs() < 1e-12);
    assert!((normalization.behavior_rank_factor - 35.0).abs() < 1e-12);
    assert!((normalization.studentiality_rank_factor - 35.0).abs() < 1e-12);
    assert!((normalization.class_size_factor - 5.0).abs() < 1e-12);
    assert!((normalization.assistance_count_factor - 10.0).abs() < 1e-12);
    assert!((normalization.school_origin_factor - 20.0).abs() < 1e-12);

    assert_eq!(config.class_config.target_classes, None);
    assert_eq!(config.class_config.min_class_size, 15);
    assert_eq!(config.class_config.max_class_size, 30);
    assert_eq!(config.class_config.preferred_class_size, 25);
    assert!(config.class_config.allow_uneven_classes);

    assert_eq!(config.constraints.minimum_friends, 1);
    assert!(config.constraints.respect_force_constraints);

    assert_eq!(config.optimization.max_iterations, 1000);
    assert_eq!(config.optimization.early_stop_threshold, 100);
    assert!(!config.optimization.accept_neutral_moves);
}

#[test]
fn test_partial_document_fills_missing_sections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[constraints]\nminimum_friends = 2\n",
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.constraints.minimum_friends, 2);
    // Everything else falls back to defaults.
    assert!((config.weights.layers.student - 0.75).abs() < 1e-12);
    assert_eq!(config.optimization.max_iterations, 1000);
}

#[test]
fn test_out_of_range_values_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[weights.layers]\nstudent = -0.5\n",
    )
    .unwrap();
    assert!(Config::load_from(&path).is_err());

    std::fs::write(
        &path,
        "[optimization.algorithms.genetic]\ncrossover_rate = 1.7\n",
    )
    .unwrap();
    assert!(Config::load_from(&path).is_err());
}

#[test]
fn test_dotted_key_set_and_get() {
    let mut config = Config::default();
    config
        .set("optimization.algorithms.simulated_annealing.cooling_rate", "0.9")
        .unwrap();
    assert_eq!(
        config
            .get("optimization.algorithms.simulated_annealing.cooling_rate")
            .unwrap(),
        "0.9"
    );
    assert!(config.set("weights.nonsense", "1").is_err());
}

#[test]
fn test_save_and_reload_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut config = Config::default();
    config.set("weights.layers.school", "0.3").unwrap();
    config.set("class_config.max_class_size", "28").unwrap();
    config.save_to(&path).unwrap();

    let reloaded = Config::load_from(&path).unwrap();
    assert_eq!(reloaded, config);
}
