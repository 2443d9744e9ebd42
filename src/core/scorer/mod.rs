//! Three-layer scorer
//!
//! Evaluates a complete snapshot: a student satisfaction layer, a class
//! composition layer and a school equity layer, each 0..=100, combined by
//! normalized layer weights. The scorer is deterministic and side-effect
//! free; its output depends only on the snapshot and the configuration.

pub mod class_layer;
pub mod school_layer;
pub mod student_layer;

pub use class_layer::ClassBreakdown;
pub use school_layer::{MetricBreakdown, OriginBreakdown, SchoolBreakdown};
pub use student_layer::StudentBreakdown;

use crate::core::config::{Config, LayerWeights, Normalization, Weights};
use crate::core::models::{ClassId, School, StudentId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Complete scoring result with per-layer decomposition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    /// Final weighted score, 0..=100.
    pub final_score: f64,
    /// Student-layer score.
    pub student_layer: f64,
    /// Class-layer score.
    pub class_layer: f64,
    /// School-layer score.
    pub school_layer: f64,
    /// Per-student breakdowns, keyed and ordered by id.
    pub per_student: BTreeMap<StudentId, StudentBreakdown>,
    /// Per-class breakdowns, keyed and ordered by class id.
    pub per_class: BTreeMap<ClassId, ClassBreakdown>,
    /// School-layer breakdown.
    pub school: SchoolBreakdown,
    /// The (raw) layer weights the score was computed with.
    pub layer_weights: LayerWeights,
    /// Roster size.
    pub total_students: usize,
    /// Number of classes.
    pub total_classes: usize,
}

impl ScoreResult {
    /// Render the human-readable scoring report.
    #[must_use]
    pub fn detailed_report(&self) -> String {
        let mut out = String::new();
        let push = |out: &mut String, line: String| {
            out.push_str(&line);
            out.push('\n');
        };

        push(&mut out, "=".repeat(60));
        push(&mut out, "SHIBUTZ SCORING REPORT".to_string());
        push(&mut out, "=".repeat(60));
        push(&mut out, String::new());
        push(&mut out, "OVERVIEW".to_string());
        push(&mut out, format!("Total Students: {}", self.total_students));
        push(&mut out, format!("Total Classes: {}", self.total_classes));
        push(&mut out, format!("Final Score: {:.2}/100", self.final_score));
        push(&mut out, String::new());
        push(&mut out, "LAYER SCORES".to_string());
        push(
            &mut out,
            format!(
                "Student Layer: {:.2}/100 (weight: {})",
                self.student_layer, self.layer_weights.student
            ),
        );
        push(
            &mut out,
            format!(
                "Class Layer:   {:.2}/100 (weight: {})",
                self.class_layer, self.layer_weights.class
            ),
        );
        push(
            &mut out,
            format!(
                "School Layer:  {:.2}/100 (weight: {})",
                self.school_layer, self.layer_weights.school
            ),
        );

        push(&mut out, String::new());
        push(&mut out, "STUDENT SATISFACTION".to_string());
        let highly = self
            .per_student
            .values()
            .filter(|b| b.score >= 75.0)
            .count();
        let low = self.per_student.values().filter(|b| b.score < 50.0).count();
        push(
            &mut out,
            format!(
                "Highly Satisfied (>=75): {highly}/{}",
                self.total_students
            ),
        );
        push(
            &mut out,
            format!("Low Satisfaction (<50): {low}/{}", self.total_students),
        );

        push(&mut out, String::new());
        push(&mut out, "CLASS BALANCE".to_string());
        for (class_id, class) in &self.per_class {
            push(
                &mut out,
                format!(
                    "Class {class_id}: {:.1}/100 (M:{}/F:{}, size {})",
                    class.score, class.male, class.female, class.size
                ),
            );
        }

        push(&mut out, String::new());
        push(&mut out, "SCHOOL BALANCE".to_string());
        let deviations = [
            ("Academic", &self.school.academic_balance),
            ("Behavior", &self.school.behavior_balance),
            ("Studentiality", &self.school.studentiality_balance),
            ("Size", &self.school.size_balance),
            ("Assistance", &self.school.assistance_balance),
        ];
        for (name, m) in deviations {
            push(
                &mut out,
                format!(
                    "{name} Balance: {:.1}/100 (sigma={:.2}, weight {})",
                    m.score, m.std_dev, m.weight
                ),
            );
        }
        let origin = &self.school.school_origin_balance;
        push(
            &mut out,
            format!(
                "Origin Balance: {:.1}/100 (representation {:.1}, non-dominance {:.1}, weight {})",
                origin.score, origin.representation, origin.non_dominance, origin.weight
            ),
        );

        out
    }
}

/// The scoring oracle every algorithm is graded by.
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    weights: Weights,
    normalization: Normalization,
}

impl Scorer {
    /// Build a scorer from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            weights: config.weights,
            normalization: config.normalization,
        }
    }

    /// The weights in effect.
    #[must_use]
    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Final score only. This is the optimizer hot path: no per-student
    /// or per-class maps are allocated.
    #[must_use]
    pub fn evaluate(&self, school: &School) -> f64 {
        let student = student_layer::layer_score(school, &self.weights.student_layer);
        let class = class_layer::layer_score(school, &self.weights.class_layer);
        let school_score =
            school_layer::layer_score(school, &self.weights.school_layer, &self.normalization);
        self.combine(student, class, school_score)
    }

    /// Full scoring result with per-layer decomposition.
    #[must_use]
    pub fn score(&self, school: &School) -> ScoreResult {
        let student = student_layer::layer_score(school, &self.weights.student_layer);
        let class = class_layer::layer_score(school, &self.weights.class_layer);
        let school_breakdown =
            school_layer::breakdown(school, &self.weights.school_layer, &self.normalization);
        let school_enabled = school_layer::layer_score(
            school,
            &self.weights.school_layer,
            &self.normalization,
        );

        let per_student: BTreeMap<StudentId, StudentBreakdown> = school
            .roster()
            .students()
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                (
                    record.id,
                    student_layer::breakdown(school, idx, &self.weights.student_layer),
                )
            })
            .collect();
        let per_class: BTreeMap<ClassId, ClassBreakdown> = (0..school.num_classes())
            .map(|class| {
                (
                    school.class_id(class).clone(),
                    class_layer::breakdown(school, class, &self.weights.class_layer),
                )
            })
            .collect();

        ScoreResult {
            final_score: self.combine(student, class, school_enabled),
            student_layer: student.unwrap_or(0.0),
            class_layer: class.unwrap_or(0.0),
            school_layer: school_breakdown.score,
            per_student,
            per_class,
            school: school_breakdown,
            layer_weights: self.weights.layers,
            total_students: school.roster().len(),
            total_classes: school.num_classes(),
        }
    }

    /// Combine layer scores by normalized layer weights. A layer is
    /// omitted when its weight is zero or it has no enabled metric, and
    /// the denominator shrinks accordingly.
    fn combine(&self, student: Option<f64>, class: Option<f64>, school: Option<f64>) -> f64 {
        let layers = [
            (student, self.weights.layers.student),
            (class, self.weights.layers.class),
            (school, self.weights.layers.school),
        ];
        let mut weighted = 0.0;
        let mut weight_sum = 0.0;
        for (score, weight) in layers {
            if let Some(score) = score {
                if weight > 0.0 {
                    weighted += score * weight;
                    weight_sum += weight;
                }
            }
        }
        if weight_sum > 0.0 {
            (weighted / weight_sum).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Gender, Rank, Roster, Student};
    use std::sync::Arc;

    fn student(id: u32, gender: Gender, academic: f64) -> Student {
        Student {
            id: StudentId::new(id).unwrap(),
            first_name: "S".to_string(),
            last_name: format!("{id}"),
            gender,
            academic_score: academic,
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

    fn school_of(students: Vec<Student>, classes: &[&str]) -> School {
        let roster = Arc::new(Roster::from_students(students).unwrap());
        let column: Vec<Option<ClassId>> =
            classes.iter().map(|c| Some(ClassId::new(*c))).collect();
        School::from_class_column(roster, &column)
    }

    #[test]
    fn test_mutual_friends_single_class_is_perfect() {
        // Two students, one class, mutual preference, same gender.
        let mut a = student(101_000_001, Gender::M, 90.0);
        let mut b = student(101_000_002, Gender::M, 80.0);
        a.preferred_friends = vec![b.id];
        b.preferred_friends = vec![a.id];
        let school = school_of(vec![a, b], &["1", "1"]);

        let scorer = Scorer::from_config(&Config::default());
        let result = scorer.score(&school);
        assert!((result.student_layer - 100.0).abs() < 1e-9);
        assert!((result.class_layer - 0.0).abs() < 1e-9, "two M, no F");
        assert!((result.school_layer - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_matches_full_score() {
        let mut a = student(101_000_001, Gender::M, 90.0);
        let b = student(101_000_002, Gender::F, 60.0);
        let c = student(101_000_003, Gender::M, 75.0);
        a.preferred_friends = vec![b.id];
        let school = school_of(vec![a, b, c], &["1", "2", "1"]);

        let scorer = Scorer::from_config(&Config::default());
        assert!((scorer.evaluate(&school) - scorer.score(&school).final_score).abs() < 1e-12);
    }

    #[test]
    fn test_scorer_is_deterministic() {
        let school = school_of(
            vec![
                student(101_000_001, Gender::M, 90.0),
                student(101_000_002, Gender::F, 60.0),
            ],
            &["1", "2"],
        );
        let scorer = Scorer::from_config(&Config::default());
        assert_eq!(scorer.score(&school), scorer.score(&school));
    }

    #[test]
    fn test_disabled_layer_drops_from_normalization() {
        let school = school_of(
            vec![
                student(101_000_001, Gender::M, 90.0),
                student(101_000_002, Gender::M, 60.0),
            ],
            &["1", "1"],
        );
        // Gender balance would be 0 for an all-male class; disabling the
        // class layer must lift the final score to the remaining layers.
        let mut config = Config::default();
        config.weights.class_layer.gender_balance = 0.0;
        let scorer = Scorer::from_config(&config);
        let result = scorer.score(&school);
        assert!((result.final_score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_layers_disabled_scores_zero_without_panic() {
        let school = school_of(vec![student(101_000_001, Gender::M, 90.0)], &["1"]);
        let mut config = Config::default();
        config.weights.student_layer.friends = 0.0;
        config.weights.student_layer.dislikes = 0.0;
        config.weights.class_layer.gender_balance = 0.0;
        config.weights.school_layer = crate::core::config::SchoolLayerWeights {
            academic_balance: 0.0,
            behavior_balance: 0.0,
            studentiality_balance: 0.0,
            size_balance: 0.0,
            assistance_balance: 0.0,
            school_origin_balance: 0.0,
        };
        let scorer = Scorer::from_config(&config);
        assert!((scorer.evaluate(&school) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_detailed_report_mentions_layers() {
        let school = school_of(vec![student(101_000_001, Gender::M, 90.0)], &["1"]);
        let scorer = Scorer::from_config(&Config::default());
        let report = scorer.score(&school).detailed_report();
        assert!(report.contains("Student Layer"));
        assert!(report.contains("Final Score"));
    }
}
