//! Roster table emission
//!
//! Writes a snapshot back out with exactly the input columns, in input
//! order, `class` populated from the assignment and unknown columns
//! restored verbatim. The file starts with a UTF-8 byte-order mark so
//! spreadsheets render non-ASCII names correctly.

use crate::core::error::CoreError;
use crate::core::models::School;
use crate::core::roster::reader::is_known_column;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Write the snapshot as a roster table.
///
/// # Errors
/// Returns `CoreError::Io`/`CoreError::Csv` when the file cannot be
/// written.
pub fn write_roster(school: &School, path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;
    let mut writer = csv::Writer::from_writer(file);

    let columns = school.roster().columns();
    writer.write_record(columns)?;

    for student in 0..school.roster().len() {
        let record: Vec<String> = columns
            .iter()
            .map(|column| cell_value(school, student, column))
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Render one cell: known columns from the model, unknown columns from
/// the preserved extras.
fn cell_value(school: &School, student: usize, column: &str) -> String {
    let record = school.roster().student(student);
    match column {
        "student_id" => record.id.to_string(),
        "first_name" => record.first_name.clone(),
        "last_name" => record.last_name.clone(),
        "gender" => record.gender.as_str().to_string(),
        "class" => school
            .class_of(student)
            .map(|class| school.class_id(class).as_str().to_string())
            .unwrap_or_default(),
        "academic_score" => format!("{}", record.academic_score),
        "behavior_rank" => record.behavior_rank.as_str().to_string(),
        "studentiality_rank" => record.studentiality_rank.as_str().to_string(),
        "assistance_package" => record.assistance_package.to_string(),
        "school" => record.school_of_origin.clone(),
        "force_class" => record
            .force_class
            .as_ref()
            .map(|c| c.as_str().to_string())
            .unwrap_or_default(),
        "force_friend" => record
            .force_friend
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
        _ if column.starts_with("preferred_friend_") => {
            indexed_ref(&record.preferred_friends, column, "preferred_friend_")
        }
        _ if column.starts_with("disliked_peer_") => {
            indexed_ref(&record.disliked_peers, column, "disliked_peer_")
        }
        _ if !is_known_column(column) => school
            .roster()
            .extras(student)
            .get(column)
            .cloned()
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn indexed_ref(
    list: &[crate::core::models::StudentId],
    column: &str,
    prefix: &str,
) -> String {
    column
        .strip_prefix(prefix)
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| list.get(idx))
        .map(ToString::to_string)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::roster::reader::read_roster;

    const HEADER: &str = "student_id,first_name,last_name,gender,class,academic_score,behavior_rank,studentiality_rank,assistance_package,school,preferred_friend_1,force_friend,bus_route";

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_round_trip_preserves_snapshot() {
        let input = write_file(&format!(
            "{HEADER}\n\
             100000001,Noa,Peretz,F,1,88.5,A,B,false,North,100000002,,R7\n\
             100000002,Avi,Cohen,M,2,71,B,A,true,,,100000001,R8\n"
        ));
        let school = read_roster(input.path(), false).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        write_roster(&school, &out).unwrap();

        let reloaded = read_roster(&out, false).unwrap();
        assert_eq!(reloaded, school);

        // And the second export is byte-identical to the first.
        let out_again = dir.path().join("out2.csv");
        write_roster(&reloaded, &out_again).unwrap();
        assert_eq!(
            std::fs::read(&out).unwrap(),
            std::fs::read(&out_again).unwrap()
        );
    }

    #[test]
    fn test_output_starts_with_bom() {
        let input = write_file(&format!(
            "{HEADER}\n100000001,Noa,Peretz,F,1,88.5,A,B,false,,,,\n"
        ));
        let school = read_roster(input.path(), false).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        write_roster(&school, &out).unwrap();
        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[..3], UTF8_BOM);
    }

    #[test]
    fn test_unknown_column_values_re_emitted_in_order() {
        let input = write_file(&format!(
            "{HEADER}\n100000001,Noa,Peretz,F,1,88.5,A,B,false,,,,R7\n"
        ));
        let school = read_roster(input.path(), false).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        write_roster(&school, &out).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap().trim_start_matches('\u{feff}');
        assert!(header.ends_with("bus_route"));
        assert!(lines.next().unwrap().ends_with("R7"));
    }

    #[test]
    fn test_class_column_populated_after_assignment() {
        let input = write_file(
            "student_id,first_name,last_name,gender,academic_score,behavior_rank,studentiality_rank,assistance_package\n\
             100000001,Noa,Peretz,F,88.5,A,B,false\n",
        );
        let mut school = read_roster(input.path(), false).unwrap();
        // Assign manually into a fresh class layout.
        let roster = school.roster_arc();
        school = crate::core::models::School::new_unassigned(
            roster,
            vec![crate::core::models::ClassId::new("1")],
        );
        school.assign(0, 0);

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        write_roster(&school, &out).unwrap();
        let reloaded = read_roster(&out, false).unwrap();
        assert_eq!(reloaded.unassigned_count(), 0);
        assert_eq!(reloaded.num_classes(), 1);
    }
}
