//! Shared fixtures for the integration suites

use shibutz::core::models::{ClassId, Gender, Rank, Roster, School, Student, StudentId};
use std::sync::Arc;

/// A plain student with no relations or locks.
#[must_use]
pub fn student(id: u32) -> Student {
    Student {
        id: StudentId::new(id).unwrap(),
        first_name: "Student".to_string(),
        last_name: format!("{id}"),
        gender: if id % 2 == 0 { Gender::F } else { Gender::M },
        academic_score: 70.0,
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

/// Build a snapshot from students and a parallel list of class labels
/// (empty string = unassigned).
#[must_use]
pub fn school_of(students: Vec<Student>, classes: &[&str]) -> School {
    assert_eq!(students.len(), classes.len());
    let roster = Arc::new(Roster::from_students(students).unwrap());
    let column: Vec<Option<ClassId>> = classes
        .iter()
        .map(|c| {
            if c.is_empty() {
                None
            } else {
                Some(ClassId::new(*c))
            }
        })
        .collect();
    School::from_class_column(roster, &column)
}

/// Two classes with gender fully segregated: plenty of improving swaps.
#[must_use]
pub fn segregated_school(per_class: u32) -> School {
    let mut students = Vec::new();
    for n in 0..per_class {
        let mut s = student(200_000_001 + n);
        s.gender = Gender::M;
        students.push(s);
    }
    for n in per_class..(2 * per_class) {
        let mut s = student(200_000_001 + n);
        s.gender = Gender::F;
        students.push(s);
    }
    let labels: Vec<&str> = (0..2 * per_class)
        .map(|n| if n < per_class { "1" } else { "2" })
        .collect();
    school_of(students, &labels)
}
