//! Roster table ingestion
//!
//! Reads the tabular roster format: a header row with required, optional
//! and unknown columns. Unknown columns are preserved per student and
//! re-emitted verbatim on export. A missing `class` column produces an
//! unassigned snapshot.

use crate::core::error::CoreError;
use crate::core::models::{ClassId, Roster, School, Student, StudentId};
use crate::core::roster::validator;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Columns that must be present.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "student_id",
    "first_name",
    "last_name",
    "gender",
    "academic_score",
    "behavior_rank",
    "studentiality_rank",
    "assistance_package",
];

/// Known optional columns (everything else is preserved opaquely).
pub const OPTIONAL_COLUMNS: &[&str] = &[
    "class",
    "school",
    "preferred_friend_1",
    "preferred_friend_2",
    "preferred_friend_3",
    "disliked_peer_1",
    "disliked_peer_2",
    "disliked_peer_3",
    "disliked_peer_4",
    "disliked_peer_5",
    "force_class",
    "force_friend",
];

/// Whether a column name carries engine-interpreted data.
#[must_use]
pub fn is_known_column(name: &str) -> bool {
    REQUIRED_COLUMNS.contains(&name) || OPTIONAL_COLUMNS.contains(&name)
}

/// Read a roster file into a snapshot.
///
/// # Errors
/// Returns `CoreError::Validation` for structural and cell problems
/// (suppressed by `skip_validation`, which normalizes cells instead),
/// `CoreError::UnknownReference` for dangling peer references in strict
/// mode, and `CoreError::Io`/`CoreError::Csv` for unreadable input.
pub fn read_roster(path: &Path, skip_validation: bool) -> Result<School, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    // The BOM written for spreadsheet compatibility must not leak into
    // the first column name.
    let mut columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    for required in REQUIRED_COLUMNS {
        if !columns.iter().any(|c| c == required) {
            return Err(CoreError::Validation {
                column: (*required).to_string(),
                row: 0,
                reason: "required column is missing".to_string(),
            });
        }
    }
    let had_class_column = columns.iter().any(|c| c == "class");
    if !had_class_column {
        columns.push("class".to_string());
    }

    let mut students: Vec<Student> = Vec::new();
    let mut classes: Vec<Option<ClassId>> = Vec::new();
    let mut extras: Vec<HashMap<String, String>> = Vec::new();
    let mut taken: HashSet<StudentId> = HashSet::new();

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = index + 1;
        let cell = |name: &str| -> &str {
            columns
                .iter()
                .position(|c| c == name)
                .and_then(|idx| record.get(idx))
                .unwrap_or("")
        };

        let id = validator::parse_student_id(cell("student_id"), row, &taken, skip_validation)?;
        taken.insert(id);

        let mut preferred_friends = Vec::new();
        for n in 1..=3 {
            let column = format!("preferred_friend_{n}");
            if let Some(peer) =
                validator::parse_peer_ref(cell(&column), &column, row, skip_validation)?
            {
                preferred_friends.push(peer);
            }
        }
        let mut disliked_peers = Vec::new();
        for n in 1..=5 {
            let column = format!("disliked_peer_{n}");
            if let Some(peer) =
                validator::parse_peer_ref(cell(&column), &column, row, skip_validation)?
            {
                disliked_peers.push(peer);
            }
        }

        let force_class = {
            let raw = cell("force_class").trim();
            if raw.is_empty() {
                None
            } else {
                Some(ClassId::new(raw))
            }
        };
        let force_friend = validator::parse_force_friend(cell("force_friend"), row, skip_validation)?;

        let student = Student {
            id,
            first_name: validator::parse_name(
                cell("first_name"),
                "first_name",
                "Unknown",
                row,
                skip_validation,
            )?,
            last_name: validator::parse_name(
                cell("last_name"),
                "last_name",
                "Student",
                row,
                skip_validation,
            )?,
            gender: validator::parse_gender(cell("gender"), row, skip_validation)?,
            academic_score: validator::parse_academic_score(
                cell("academic_score"),
                row,
                skip_validation,
            )?,
            behavior_rank: validator::parse_rank(
                cell("behavior_rank"),
                "behavior_rank",
                row,
                skip_validation,
            )?,
            studentiality_rank: validator::parse_rank(
                cell("studentiality_rank"),
                "studentiality_rank",
                row,
                skip_validation,
            )?,
            assistance_package: validator::parse_bool(
                cell("assistance_package"),
                "assistance_package",
                row,
                skip_validation,
            )?,
            school_of_origin: cell("school").trim().to_string(),
            preferred_friends,
            disliked_peers,
            force_class,
            force_friend,
        };

        let class_cell = cell("class").trim();
        classes.push(if class_cell.is_empty() {
            None
        } else {
            Some(ClassId::new(class_cell))
        });

        let mut extra = HashMap::new();
        for (idx, column) in columns.iter().enumerate() {
            if !is_known_column(column) {
                extra.insert(
                    column.clone(),
                    record.get(idx).unwrap_or("").to_string(),
                );
            }
        }
        extras.push(extra);
        students.push(student);
    }

    if skip_validation {
        drop_unknown_references(&mut students, &taken);
    }

    let roster = Arc::new(Roster::build(students, columns, extras)?);
    Ok(School::from_class_column(roster, &classes))
}

/// Skip-validation cleanup: references to students that are not in the
/// roster are silently dropped instead of failing the build.
fn drop_unknown_references(students: &mut [Student], known: &HashSet<StudentId>) {
    for student in students {
        student.preferred_friends.retain(|id| known.contains(id));
        student.disliked_peers.retain(|id| known.contains(id));
        student.force_friend.retain(|id| known.contains(id));
    }
}
