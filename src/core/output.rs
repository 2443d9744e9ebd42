//! Run-directory layout
//!
//! Each artifact-producing invocation gets its own directory named
//! `{operation}_{input_stem}_{algorithm_or_strategy}_{timestamp}`,
//! holding the assignment table, scoring summary, per-student and
//! per-class breakdowns, a configuration snapshot, and an
//! `operation_info.txt` file describing the run.

use crate::core::config::Config;
use crate::core::error::CoreError;
use crate::core::models::School;
use crate::core::roster::write_roster;
use crate::core::scorer::ScoreResult;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Facts recorded in `operation_info.txt`.
#[derive(Debug, Clone)]
pub struct OperationInfo {
    /// Operation name (score, optimize, baseline, generate).
    pub operation: String,
    /// Input file path as given by the user.
    pub input_file: String,
    /// Algorithm or strategy label.
    pub algorithm: String,
    /// Score before the operation.
    pub initial_score: Option<f64>,
    /// Score after the operation.
    pub final_score: Option<f64>,
    /// Wall-clock duration.
    pub duration: Duration,
    /// Iterations executed, when applicable.
    pub iterations: Option<usize>,
    /// Whether every hard constraint holds in the emitted snapshot.
    pub constraints_satisfied: bool,
}

/// Creates run directories and writes the standard artifact set.
#[derive(Debug, Clone)]
pub struct OutputManager {
    base_dir: PathBuf,
}

impl OutputManager {
    /// Artifacts land under `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create the directory for one operation:
    /// `{operation}_{input_stem}_{label}_{timestamp}`.
    ///
    /// # Errors
    /// Returns `CoreError::Io` when the directory cannot be created.
    pub fn create_run_directory(
        &self,
        operation: &str,
        input_file: &Path,
        label: &str,
    ) -> Result<PathBuf, CoreError> {
        let stem = input_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("input");
        let clean_stem: String = stem
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        let name = format!("{operation}_{clean_stem}_{label}_{timestamp}");
        let dir = self.base_dir.join(name);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Write the standard artifact set for a scored snapshot.
    ///
    /// # Errors
    /// Returns `CoreError::Io`/`CoreError::Csv` on write failure.
    pub fn write_snapshot_artifacts(
        &self,
        dir: &Path,
        school: &School,
        result: &ScoreResult,
        config: &Config,
    ) -> Result<(), CoreError> {
        write_roster(school, &dir.join("assignment.csv"))?;
        fs::write(dir.join("scoring_summary.txt"), result.detailed_report())?;
        self.write_student_breakdown(dir, result)?;
        self.write_class_breakdown(dir, result)?;
        config.save_to(&dir.join("config_snapshot.toml"))?;
        Ok(())
    }

    fn write_student_breakdown(&self, dir: &Path, result: &ScoreResult) -> Result<(), CoreError> {
        let mut writer = csv::Writer::from_path(dir.join("student_scores.csv"))?;
        writer.write_record([
            "student_id",
            "score",
            "friend_satisfaction",
            "conflict_avoidance",
            "friends_requested",
            "friends_placed",
            "dislikes_listed",
            "dislikes_avoided",
        ])?;
        for (id, breakdown) in &result.per_student {
            writer.write_record([
                id.to_string(),
                format!("{:.2}", breakdown.score),
                format!("{:.2}", breakdown.friend_satisfaction),
                format!("{:.2}", breakdown.conflict_avoidance),
                breakdown.friends_requested.to_string(),
                breakdown.friends_placed.to_string(),
                breakdown.dislikes_listed.to_string(),
                breakdown.dislikes_avoided.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_class_breakdown(&self, dir: &Path, result: &ScoreResult) -> Result<(), CoreError> {
        let mut writer = csv::Writer::from_path(dir.join("class_scores.csv"))?;
        writer.write_record(["class", "score", "gender_balance", "male", "female", "size"])?;
        for (id, breakdown) in &result.per_class {
            writer.write_record([
                id.as_str().to_string(),
                format!("{:.2}", breakdown.score),
                format!("{:.2}", breakdown.gender_balance),
                breakdown.male.to_string(),
                breakdown.female.to_string(),
                breakdown.size.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write `operation_info.txt`.
    ///
    /// # Errors
    /// Returns `CoreError::Io` on write failure.
    pub fn write_operation_info(&self, dir: &Path, info: &OperationInfo) -> Result<(), CoreError> {
        let mut text = String::new();
        text.push_str("Shibutz Operation Information\n");
        text.push_str(&"=".repeat(40));
        text.push('\n');
        text.push_str(&format!("operation: {}\n", info.operation));
        text.push_str(&format!("input_file: {}\n", info.input_file));
        text.push_str(&format!("algorithm: {}\n", info.algorithm));
        if let Some(score) = info.initial_score {
            text.push_str(&format!("initial_score: {score:.2}\n"));
        }
        if let Some(score) = info.final_score {
            text.push_str(&format!("final_score: {score:.2}\n"));
        }
        text.push_str(&format!("duration_ms: {}\n", info.duration.as_millis()));
        if let Some(iterations) = info.iterations {
            text.push_str(&format!("iterations: {iterations}\n"));
        }
        text.push_str(&format!(
            "constraints_satisfied: {}\n",
            info.constraints_satisfied
        ));
        fs::write(dir.join("operation_info.txt"), text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ClassId, Gender, Rank, Roster, Student, StudentId};
    use crate::core::scorer::Scorer;
    use std::sync::Arc;

    fn sample_school() -> School {
        let students = vec![Student {
            id: StudentId::new(100_000_001).unwrap(),
            first_name: "Noa".to_string(),
            last_name: "Peretz".to_string(),
            gender: Gender::F,
            academic_score: 88.0,
            behavior_rank: Rank::A,
            studentiality_rank: Rank::A,
            assistance_package: false,
            school_of_origin: String::new(),
            preferred_friends: Vec::new(),
            disliked_peers: Vec::new(),
            force_class: None,
            force_friend: Vec::new(),
        }];
        let roster = Arc::new(Roster::from_students(students).unwrap());
        School::from_class_column(roster, &[Some(ClassId::new("1"))])
    }

    #[test]
    fn test_run_directory_name_shape() {
        let base = tempfile::tempdir().unwrap();
        let manager = OutputManager::new(base.path());
        let dir = manager
            .create_run_directory("optimize", Path::new("data/roster 2025.csv"), "genetic")
            .unwrap();
        let name = dir.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("optimize_roster2025_genetic_"));
        assert!(dir.is_dir());
    }

    #[test]
    fn test_artifact_set_is_written() {
        let base = tempfile::tempdir().unwrap();
        let manager = OutputManager::new(base.path());
        let dir = manager
            .create_run_directory("score", Path::new("roster.csv"), "scorer")
            .unwrap();

        let school = sample_school();
        let config = Config::default();
        let result = Scorer::from_config(&config).score(&school);
        manager
            .write_snapshot_artifacts(&dir, &school, &result, &config)
            .unwrap();
        manager
            .write_operation_info(
                &dir,
                &OperationInfo {
                    operation: "score".to_string(),
                    input_file: "roster.csv".to_string(),
                    algorithm: "scorer".to_string(),
                    initial_score: Some(result.final_score),
                    final_score: Some(result.final_score),
                    duration: Duration::from_millis(5),
                    iterations: None,
                    constraints_satisfied: true,
                },
            )
            .unwrap();

        for artifact in [
            "assignment.csv",
            "scoring_summary.txt",
            "student_scores.csv",
            "class_scores.csv",
            "config_snapshot.toml",
            "operation_info.txt",
        ] {
            assert!(dir.join(artifact).exists(), "{artifact} missing");
        }

        let info = std::fs::read_to_string(dir.join("operation_info.txt")).unwrap();
        assert!(info.contains("operation: score"));
        assert!(info.contains("constraints_satisfied: true"));
    }
}
