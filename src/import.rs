//! CSV readers for the three registries. This is the only place where raw
//! spreadsheet values are turned into typed records.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{EbdError, Result};
use crate::models::{AgeGroup, AttendanceEvent, Class, ClassName, Student};

#[derive(Debug, Deserialize)]
struct StudentRow {
    id: Uuid,
    name: String,
    age_group: String,
    class_name: String,
    enrollment_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct ClassRow {
    id: Option<Uuid>,
    name: String,
    teacher_name: Option<String>,
    age_group_criterion: String,
}

#[derive(Debug, Deserialize)]
struct AttendanceRow {
    id: Uuid,
    date: NaiveDate,
    class_name: String,
    present_student_ids: Option<String>,
}

pub fn open_csv(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| EbdError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn read_students_csv<R: Read>(reader: R) -> Result<Vec<Student>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut students = Vec::new();

    for result in csv_reader.deserialize::<StudentRow>() {
        let row = result?;
        students.push(Student {
            id: row.id,
            name: row.name,
            age_group: row.age_group.parse::<AgeGroup>()?,
            class_name: ClassName::new(row.class_name),
            enrollment_date: row.enrollment_date,
        });
    }

    Ok(students)
}

pub fn read_classes_csv<R: Read>(reader: R) -> Result<Vec<Class>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut classes = Vec::new();

    for result in csv_reader.deserialize::<ClassRow>() {
        let row = result?;
        classes.push(Class {
            id: row.id,
            name: ClassName::new(row.name),
            teacher_name: row.teacher_name.filter(|name| !name.is_empty()),
            age_group_criterion: row.age_group_criterion.parse::<AgeGroup>()?,
        });
    }

    Ok(classes)
}

pub fn read_attendance_csv<R: Read>(reader: R) -> Result<Vec<AttendanceEvent>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut events = Vec::new();

    for result in csv_reader.deserialize::<AttendanceRow>() {
        let row = result?;
        let present_student_ids =
            parse_present_ids(&row.id, row.present_student_ids.as_deref().unwrap_or(""))?;
        events.push(AttendanceEvent {
            id: row.id,
            date: row.date,
            class_name: ClassName::new(row.class_name),
            present_student_ids,
        });
    }

    Ok(events)
}

/// Splits a `;`-separated list of student ids. Membership in the event's
/// class is not checked.
fn parse_present_ids(event_id: &Uuid, raw: &str) -> Result<HashSet<Uuid>> {
    raw.split(';')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            Uuid::parse_str(value).map_err(|_| EbdError::InvalidStudentId {
                row: event_id.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANA: &str = "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2";
    const LUCAS: &str = "0c22f1f1-9184-4fd4-9b21-28c68a6a89dc";

    #[test]
    fn reads_students_with_optional_enrollment() {
        let data = format!(
            "id,name,age_group,class_name,enrollment_date\n\
             {ANA},Ana Lima,Adulto,Adultos,2024-01-01\n\
             {LUCAS},Lucas Rocha,Jovem,Jovens,\n"
        );

        let students = read_students_csv(data.as_bytes()).unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].age_group, AgeGroup::Adult);
        assert_eq!(
            students[0].enrollment_date,
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(students[1].class_name, ClassName::new("Jovens"));
        assert_eq!(students[1].enrollment_date, None);
    }

    #[test]
    fn rejects_unknown_age_group() {
        let data = format!(
            "id,name,age_group,class_name,enrollment_date\n{ANA},Ana Lima,Idoso,Adultos,\n"
        );

        let err = read_students_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, EbdError::UnknownAgeGroup(_)));
    }

    #[test]
    fn reads_implicit_classes_without_id() {
        let data = "id,name,teacher_name,age_group_criterion\n\
                    ,Kids,,Criança de 6 a 11 anos\n\
                    d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2,Adultos,Pr. João,Adulto\n";

        let classes = read_classes_csv(data.as_bytes()).unwrap();
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].id, None);
        assert_eq!(classes[0].teacher_name, None);
        assert_eq!(classes[0].age_group_criterion, AgeGroup::Child);
        assert!(classes[1].id.is_some());
        assert_eq!(classes[1].teacher_name.as_deref(), Some("Pr. João"));
    }

    #[test]
    fn reads_attendance_with_present_lists() {
        let data = format!(
            "id,date,class_name,present_student_ids\n\
             b1f0c3aa-0f5e-4f0e-9a57-0d6b1f1d2a01,2024-02-04,Adultos,{ANA}; {LUCAS}\n\
             b1f0c3aa-0f5e-4f0e-9a57-0d6b1f1d2a02,2024-02-11,Adultos,\n"
        );

        let events = read_attendance_csv(data.as_bytes()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].present_student_ids.len(), 2);
        assert!(events[0]
            .present_student_ids
            .contains(&Uuid::parse_str(LUCAS).unwrap()));
        assert!(events[1].present_student_ids.is_empty());
    }

    #[test]
    fn rejects_malformed_present_id() {
        let data = "id,date,class_name,present_student_ids\n\
                    b1f0c3aa-0f5e-4f0e-9a57-0d6b1f1d2a01,2024-02-04,Adultos,not-a-uuid\n";

        let err = read_attendance_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            EbdError::InvalidStudentId { ref value, .. } if value == "not-a-uuid"
        ));
    }

    #[test]
    fn open_csv_reports_missing_file() {
        let path = std::env::temp_dir().join(format!("ebd-{}.csv", Uuid::new_v4()));

        let err = open_csv(&path).unwrap_err();
        match err {
            EbdError::Io { path: reported, source } => {
                assert_eq!(reported, path.display().to_string());
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_bad_date() {
        let data = "id,date,class_name,present_student_ids\n\
                    b1f0c3aa-0f5e-4f0e-9a57-0d6b1f1d2a01,04/02/2024,Adultos,\n";

        let err = read_attendance_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, EbdError::Csv(_)));
    }
}
