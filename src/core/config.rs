//! Configuration module for Shibutz
//!
//! One structured document covers scoring weights, normalization factors,
//! class-capacity constraints, hard-constraint knobs and per-algorithm
//! optimization parameters. Defaults are embedded at compile time and a
//! user copy lives under the platform configuration directory.

use crate::core::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Embedded configuration defaults.
pub const CONFIG_DEFAULTS: &str = include_str!("../assets/default_config.toml");

const CONFIG_FILE_NAME: &str = "config.toml";

/// Relative weights of the three scoring layers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayerWeights {
    /// Weight of the per-student satisfaction layer.
    pub student: f64,
    /// Weight of the intra-class balance layer.
    pub class: f64,
    /// Weight of the inter-class balance layer.
    pub school: f64,
}

impl Default for LayerWeights {
    fn default() -> Self {
        Self {
            student: 0.75,
            class: 0.05,
            school: 0.20,
        }
    }
}

/// Sub-weights inside the student layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StudentLayerWeights {
    /// Weight of friend satisfaction.
    pub friends: f64,
    /// Weight of conflict (dislike) avoidance.
    pub dislikes: f64,
}

impl Default for StudentLayerWeights {
    fn default() -> Self {
        Self {
            friends: 0.7,
            dislikes: 0.3,
        }
    }
}

/// Sub-weights inside the class layer.
///
/// Gender balance is the only metric today; the weighted-mean structure is
/// kept so additional class metrics can be added without reshaping the
/// final-score formula.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassLayerWeights {
    /// Weight of the gender-balance metric.
    pub gender_balance: f64,
}

impl Default for ClassLayerWeights {
    fn default() -> Self {
        Self { gender_balance: 1.0 }
    }
}

/// Sub-weights inside the school layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchoolLayerWeights {
    /// Weight of academic-mean balance across classes.
    pub academic_balance: f64,
    /// Weight of behavior-rank balance across classes.
    pub behavior_balance: f64,
    /// Weight of studentiality-rank balance across classes.
    pub studentiality_balance: f64,
    /// Weight of class-size balance.
    pub size_balance: f64,
    /// Weight of assistance-package balance.
    pub assistance_balance: f64,
    /// Weight of school-of-origin distribution balance.
    pub school_origin_balance: f64,
}

impl Default for SchoolLayerWeights {
    fn default() -> Self {
        Self {
            academic_balance: 0.05,
            behavior_balance: 0.4,
            studentiality_balance: 0.4,
            size_balance: 0.0,
            assistance_balance: 0.15,
            school_origin_balance: 0.0,
        }
    }
}

/// All scoring weights.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Weights {
    /// Layer weights combined into the final score.
    pub layers: LayerWeights,
    /// Student-layer sub-weights.
    pub student_layer: StudentLayerWeights,
    /// Class-layer sub-weights.
    pub class_layer: ClassLayerWeights,
    /// School-layer sub-weights.
    pub school_layer: SchoolLayerWeights,
}

/// Multipliers converting a per-class standard deviation into a 0-100
/// penalty for the school layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Normalization {
    /// Factor for the academic-mean vector.
    pub academic_score_factor: f64,
    /// Factor for the behavior-rank vector.
    pub behavior_rank_factor: f64,
    /// Factor for the studentiality-rank vector.
    pub studentiality_rank_factor: f64,
    /// Factor for the class-size vector.
    pub class_size_factor: f64,
    /// Factor for the assistance-count vector.
    pub assistance_count_factor: f64,
    /// Factor reserved for origin-distribution penalties.
    pub school_origin_factor: f64,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            academic_score_factor: 2.0,
            behavior_rank_factor: 35.0,
            studentiality_rank_factor: 35.0,
            class_size_factor: 5.0,
            assistance_count_factor: 10.0,
            school_origin_factor: 20.0,
        }
    }
}

/// Class-capacity configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassConfig {
    /// Number of classes to create; derived from roster size when `None`.
    pub target_classes: Option<usize>,
    /// Smallest acceptable class.
    pub min_class_size: usize,
    /// Largest acceptable class; moves that would exceed it are rejected.
    pub max_class_size: usize,
    /// Preferred class size used by initialization heuristics.
    pub preferred_class_size: usize,
    /// Whether class sizes may differ by more than one.
    pub allow_uneven_classes: bool,
}

impl Default for ClassConfig {
    fn default() -> Self {
        Self {
            target_classes: None,
            min_class_size: 15,
            max_class_size: 30,
            preferred_class_size: 25,
            allow_uneven_classes: true,
        }
    }
}

/// Hard-constraint knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Constraints {
    /// Minimum number of preferred friends that must share the class
    /// (capped at the number the student actually listed). Zero disables
    /// the constraint.
    pub minimum_friends: usize,
    /// Whether `force_class` / force-group locks apply.
    pub respect_force_constraints: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            minimum_friends: 1,
            respect_force_constraints: true,
        }
    }
}

/// Greedy local-search parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocalSearchParams {
    /// Maximum number of full passes over the roster.
    pub max_passes: usize,
    /// Stop when a whole pass improves the score by less than this.
    pub min_improvement: f64,
}

impl Default for LocalSearchParams {
    fn default() -> Self {
        Self {
            max_passes: 10,
            min_improvement: 0.01,
        }
    }
}

/// Simulated-annealing parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnnealingParams {
    /// Starting temperature T0.
    pub initial_temperature: f64,
    /// Exponential cooling rate in (0, 1).
    pub cooling_rate: f64,
    /// Temperature floor.
    pub min_temperature: f64,
    /// Steps without improvement before a reheat is considered.
    pub reheat_threshold: usize,
}

impl Default for AnnealingParams {
    fn default() -> Self {
        Self {
            initial_temperature: 100.0,
            cooling_rate: 0.95,
            min_temperature: 0.01,
            reheat_threshold: 200,
        }
    }
}

/// Evolutionary-search parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneticParams {
    /// Population size P.
    pub population_size: usize,
    /// Generation cap.
    pub generations: usize,
    /// Per-child mutation probability.
    pub mutation_rate: f64,
    /// Crossover probability.
    pub crossover_rate: f64,
    /// Number of elites copied unchanged each generation.
    pub elite_size: usize,
    /// Tournament size for parent selection.
    pub tournament_size: usize,
    /// Generations without best-score improvement before stopping.
    pub stagnation_limit: usize,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            mutation_rate: 0.1,
            crossover_rate: 0.8,
            elite_size: 5,
            tournament_size: 3,
            stagnation_limit: 20,
        }
    }
}

/// Per-algorithm parameter blocks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlgorithmParams {
    /// Greedy local search.
    pub local_search: LocalSearchParams,
    /// Simulated annealing.
    pub simulated_annealing: AnnealingParams,
    /// Evolutionary search.
    pub genetic: GeneticParams,
}

/// Optimization loop configuration shared by all algorithms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Optimization {
    /// Per-algorithm iteration cap.
    pub max_iterations: usize,
    /// Consecutive non-improving iterations before early stop.
    pub early_stop_threshold: usize,
    /// Whether equal-score moves are accepted.
    pub accept_neutral_moves: bool,
    /// Consecutive rejected proposals before a run reports `stuck`.
    pub max_swap_attempts: usize,
    /// Per-algorithm knobs.
    pub algorithms: AlgorithmParams,
}

impl Default for Optimization {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            early_stop_threshold: 100,
            accept_neutral_moves: false,
            max_swap_attempts: 50,
            algorithms: AlgorithmParams::default(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Scoring weights.
    pub weights: Weights,
    /// σ-to-penalty multipliers.
    pub normalization: Normalization,
    /// Class-capacity constraints.
    pub class_config: ClassConfig,
    /// Hard-constraint knobs.
    pub constraints: Constraints,
    /// Optimization parameters.
    pub optimization: Optimization,
}

impl Config {
    /// Directory holding the user configuration file.
    ///
    /// - Linux: `~/.config/shibutz`
    /// - macOS: `~/Library/Application Support/shibutz`
    /// - Windows: `%APPDATA%\shibutz`
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shibutz")
    }

    /// Full path of the user configuration file.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE_NAME)
    }

    /// Parse the embedded defaults.
    ///
    /// # Panics
    /// Never in practice; the embedded document is validated by tests.
    #[must_use]
    pub fn from_defaults() -> Self {
        toml::from_str(CONFIG_DEFAULTS).expect("embedded default configuration is valid TOML")
    }

    /// Load the user configuration, falling back to defaults when no file
    /// exists or it cannot be parsed.
    #[must_use]
    pub fn load() -> Self {
        let path = Self::config_file_path();
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from an explicit file.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidConfig` when the document cannot be
    /// parsed or fails validation, `CoreError::Io` when unreadable.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw).map_err(|err| CoreError::InvalidConfig {
            key: path.display().to_string(),
            reason: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Persist this configuration to the user configuration file.
    ///
    /// # Errors
    /// Returns `CoreError::Io` when the directory or file cannot be written.
    pub fn save(&self) -> Result<PathBuf, CoreError> {
        let path = Self::config_file_path();
        self.save_to(&path)?;
        Ok(path)
    }

    /// Persist this configuration to an explicit file.
    ///
    /// # Errors
    /// Returns `CoreError::Io` when the directory or file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered =
            toml::to_string_pretty(self).expect("configuration always serializes to TOML");
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Check ranges and weight sanity.
    ///
    /// All-zero sub-weights inside one layer are legal (the layer drops out
    /// of the final-score normalization); all-zero *layer* weights are not.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidConfig` naming the offending key.
    pub fn validate(&self) -> Result<(), CoreError> {
        let weight_keys = [
            ("weights.layers.student", self.weights.layers.student),
            ("weights.layers.class", self.weights.layers.class),
            ("weights.layers.school", self.weights.layers.school),
            ("weights.student_layer.friends", self.weights.student_layer.friends),
            ("weights.student_layer.dislikes", self.weights.student_layer.dislikes),
            (
                "weights.class_layer.gender_balance",
                self.weights.class_layer.gender_balance,
            ),
            (
                "weights.school_layer.academic_balance",
                self.weights.school_layer.academic_balance,
            ),
            (
                "weights.school_layer.behavior_balance",
                self.weights.school_layer.behavior_balance,
            ),
            (
                "weights.school_layer.studentiality_balance",
                self.weights.school_layer.studentiality_balance,
            ),
            (
                "weights.school_layer.size_balance",
                self.weights.school_layer.size_balance,
            ),
            (
                "weights.school_layer.assistance_balance",
                self.weights.school_layer.assistance_balance,
            ),
            (
                "weights.school_layer.school_origin_balance",
                self.weights.school_layer.school_origin_balance,
            ),
        ];
        for (key, value) in weight_keys {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::InvalidConfig {
                    key: key.to_string(),
                    reason: format!("weight must be a finite non-negative number, got {value}"),
                });
            }
        }
        let layer_sum =
            self.weights.layers.student + self.weights.layers.class + self.weights.layers.school;
        if layer_sum <= 0.0 {
            return Err(CoreError::InvalidConfig {
                key: "weights.layers".to_string(),
                reason: "all layer weights are zero".to_string(),
            });
        }

        let factor_keys = [
            (
                "normalization.academic_score_factor",
                self.normalization.academic_score_factor,
            ),
            (
                "normalization.behavior_rank_factor",
                self.normalization.behavior_rank_factor,
            ),
            (
                "normalization.studentiality_rank_factor",
                self.normalization.studentiality_rank_factor,
            ),
            (
                "normalization.class_size_factor",
                self.normalization.class_size_factor,
            ),
            (
                "normalization.assistance_count_factor",
                self.normalization.assistance_count_factor,
            ),
            (
                "normalization.school_origin_factor",
                self.normalization.school_origin_factor,
            ),
        ];
        for (key, value) in factor_keys {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::InvalidConfig {
                    key: key.to_string(),
                    reason: format!("normalization factor must be positive, got {value}"),
                });
            }
        }

        if self.class_config.min_class_size > self.class_config.max_class_size {
            return Err(CoreError::InvalidConfig {
                key: "class_config.min_class_size".to_string(),
                reason: "min_class_size exceeds max_class_size".to_string(),
            });
        }
        if self.class_config.max_class_size == 0 {
            return Err(CoreError::InvalidConfig {
                key: "class_config.max_class_size".to_string(),
                reason: "max_class_size must be at least 1".to_string(),
            });
        }
        if self.class_config.target_classes == Some(0) {
            return Err(CoreError::InvalidConfig {
                key: "class_config.target_classes".to_string(),
                reason: "target_classes must be at least 1".to_string(),
            });
        }

        let genetic = &self.optimization.algorithms.genetic;
        for (key, rate) in [
            (
                "optimization.algorithms.genetic.mutation_rate",
                genetic.mutation_rate,
            ),
            (
                "optimization.algorithms.genetic.crossover_rate",
                genetic.crossover_rate,
            ),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(CoreError::InvalidConfig {
                    key: key.to_string(),
                    reason: format!("rate must lie in [0, 1], got {rate}"),
                });
            }
        }
        if genetic.population_size == 0 {
            return Err(CoreError::InvalidConfig {
                key: "optimization.algorithms.genetic.population_size".to_string(),
                reason: "population must not be empty".to_string(),
            });
        }
        if genetic.elite_size >= genetic.population_size {
            return Err(CoreError::InvalidConfig {
                key: "optimization.algorithms.genetic.elite_size".to_string(),
                reason: "elite_size must be smaller than population_size".to_string(),
            });
        }
        if genetic.tournament_size == 0 {
            return Err(CoreError::InvalidConfig {
                key: "optimization.algorithms.genetic.tournament_size".to_string(),
                reason: "tournament_size must be at least 1".to_string(),
            });
        }

        let annealing = &self.optimization.algorithms.simulated_annealing;
        if !(annealing.cooling_rate > 0.0 && annealing.cooling_rate < 1.0) {
            return Err(CoreError::InvalidConfig {
                key: "optimization.algorithms.simulated_annealing.cooling_rate".to_string(),
                reason: format!("cooling rate must lie in (0, 1), got {}", annealing.cooling_rate),
            });
        }
        if annealing.initial_temperature <= 0.0 {
            return Err(CoreError::InvalidConfig {
                key: "optimization.algorithms.simulated_annealing.initial_temperature".to_string(),
                reason: "initial temperature must be positive".to_string(),
            });
        }

        Ok(())
    }

    /// Read one value by dotted key (e.g. `weights.layers.student`).
    ///
    /// # Errors
    /// Returns `CoreError::InvalidConfig` for unknown keys.
    pub fn get(&self, key: &str) -> Result<String, CoreError> {
        let root = toml::Value::try_from(self).expect("configuration converts to TOML");
        let mut cursor = &root;
        for part in key.split('.') {
            cursor = cursor
                .get(part)
                .ok_or_else(|| CoreError::InvalidConfig {
                    key: key.to_string(),
                    reason: "unknown configuration key".to_string(),
                })?;
        }
        Ok(render_value(cursor))
    }

    /// Set one value by dotted key, parsing `value` as TOML scalar.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidConfig` for unknown keys, type
    /// mismatches and values that fail validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut root = toml::Value::try_from(&*self).expect("configuration converts to TOML");

        {
            let mut cursor = &mut root;
            for part in key.split('.') {
                cursor = cursor
                    .get_mut(part)
                    .ok_or_else(|| CoreError::InvalidConfig {
                        key: key.to_string(),
                        reason: "unknown configuration key".to_string(),
                    })?;
            }
            *cursor = parse_scalar(key, value, cursor)?;
        }

        let updated: Self = root.try_into().map_err(|err: toml::de::Error| {
            CoreError::InvalidConfig {
                key: key.to_string(),
                reason: err.to_string(),
            }
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// Parse a scalar the same shape as the value it replaces.
fn parse_scalar(
    key: &str,
    value: &str,
    previous: &toml::Value,
) -> Result<toml::Value, CoreError> {
    let mismatch = |expected: &str| CoreError::InvalidConfig {
        key: key.to_string(),
        reason: format!("expected a {expected} value, got '{value}'"),
    };
    match previous {
        toml::Value::Float(_) => value
            .parse::<f64>()
            .map(toml::Value::Float)
            .map_err(|_| mismatch("numeric")),
        toml::Value::Integer(_) => value
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|_| mismatch("integer")),
        toml::Value::Boolean(_) => match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(toml::Value::Boolean(true)),
            "false" | "0" | "no" => Ok(toml::Value::Boolean(false)),
            _ => Err(mismatch("boolean")),
        },
        toml::Value::String(_) => Ok(toml::Value::String(value.to_string())),
        _ => Err(CoreError::InvalidConfig {
            key: key.to_string(),
            reason: "key does not name a scalar value".to_string(),
        }),
    }
}

fn render_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
