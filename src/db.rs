use std::collections::HashSet;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{AgeGroup, AttendanceEvent, Class, ClassName, Student};
use crate::registry;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("migrations applied");
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let classes = vec![
        Class {
            id: Some(Uuid::parse_str("6a1c9f4e-0b7d-4c1e-9f3a-2d5e8b7c1a01")?),
            name: ClassName::new("Adultos"),
            teacher_name: Some("Pr. João Batista".to_string()),
            age_group_criterion: AgeGroup::Adult,
        },
        Class {
            id: Some(Uuid::parse_str("6a1c9f4e-0b7d-4c1e-9f3a-2d5e8b7c1a02")?),
            name: ClassName::new("Jovens"),
            teacher_name: Some("Débora Nunes".to_string()),
            age_group_criterion: AgeGroup::Youth,
        },
        Class {
            id: Some(Uuid::parse_str("6a1c9f4e-0b7d-4c1e-9f3a-2d5e8b7c1a03")?),
            name: ClassName::new("Kids"),
            teacher_name: None,
            age_group_criterion: AgeGroup::Child,
        },
    ];

    let maria = Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?;
    let paulo = Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?;
    let ester = Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?;
    let samuel = Uuid::parse_str("8e4b2c7a-5d1f-4a3b-b6c9-1f0e2d3c4b5a")?;
    let noemi = Uuid::parse_str("9f5c3d8b-6e2a-4b4c-87da-2a1f3e4d5c6b")?;

    let students = vec![
        Student {
            id: maria,
            name: "Maria Souza".to_string(),
            age_group: AgeGroup::Adult,
            class_name: ClassName::new("Adultos"),
            enrollment_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        },
        Student {
            id: paulo,
            name: "Paulo Ferreira".to_string(),
            age_group: AgeGroup::Adult,
            class_name: ClassName::new("Adultos"),
            enrollment_date: NaiveDate::from_ymd_opt(2024, 2, 4),
        },
        Student {
            id: ester,
            name: "Ester Gomes".to_string(),
            age_group: AgeGroup::Youth,
            class_name: ClassName::new("Jovens"),
            enrollment_date: None,
        },
        Student {
            id: samuel,
            name: "Samuel Costa".to_string(),
            age_group: AgeGroup::Child,
            class_name: ClassName::new("Kids"),
            enrollment_date: NaiveDate::from_ymd_opt(2024, 3, 3),
        },
        Student {
            id: noemi,
            name: "Noemi Ribeiro".to_string(),
            age_group: AgeGroup::Adult,
            class_name: ClassName::new("Discipulado"),
            enrollment_date: NaiveDate::from_ymd_opt(2023, 8, 6),
        },
    ];

    let sessions = vec![
        ("b1f0c3aa-0f5e-4f0e-9a57-0d6b1f1d2a01", (2023, 12, 3), "Adultos", vec![maria]),
        ("b1f0c3aa-0f5e-4f0e-9a57-0d6b1f1d2a02", (2024, 2, 4), "Adultos", vec![maria, paulo]),
        ("b1f0c3aa-0f5e-4f0e-9a57-0d6b1f1d2a03", (2024, 3, 3), "Adultos", vec![paulo]),
        ("b1f0c3aa-0f5e-4f0e-9a57-0d6b1f1d2a04", (2024, 3, 10), "Adultos", vec![paulo]),
        ("b1f0c3aa-0f5e-4f0e-9a57-0d6b1f1d2a05", (2024, 2, 4), "Jovens", vec![ester]),
        ("b1f0c3aa-0f5e-4f0e-9a57-0d6b1f1d2a06", (2024, 3, 3), "Jovens", vec![ester]),
        ("b1f0c3aa-0f5e-4f0e-9a57-0d6b1f1d2a07", (2024, 3, 10), "Jovens", vec![]),
    ];

    let mut events = Vec::new();
    for (id, (year, month, day), class_name, present) in sessions {
        events.push(AttendanceEvent {
            id: Uuid::parse_str(id)?,
            date: NaiveDate::from_ymd_opt(year, month, day).context("invalid date")?,
            class_name: ClassName::new(class_name),
            present_student_ids: present.into_iter().collect(),
        });
    }

    upsert_classes(pool, &classes).await?;
    upsert_students(pool, &students).await?;
    insert_events(pool, &events).await?;

    Ok(())
}

/// Upserts by name; classes without an id receive a fresh one. The batch is
/// written in one transaction and rejected whole when a row would rename an
/// existing class id.
pub async fn upsert_classes(pool: &PgPool, classes: &[Class]) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    let existing: Vec<(Uuid, ClassName)> = sqlx::query("SELECT id, name FROM ebd.classes")
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|row| (row.get::<Uuid, _>("id"), ClassName::new(row.get::<String, _>("name"))))
        .collect();
    registry::check_class_ids(&existing, classes)?;

    let mut written = 0usize;

    for class in classes {
        sqlx::query(
            r#"
            INSERT INTO ebd.classes (id, name, teacher_name, age_group_criterion)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE
            SET teacher_name = EXCLUDED.teacher_name,
                age_group_criterion = EXCLUDED.age_group_criterion
            "#,
        )
        .bind(class.id.unwrap_or_else(Uuid::new_v4))
        .bind(class.name.as_str())
        .bind(class.teacher_name.as_deref())
        .bind(class.age_group_criterion.label())
        .execute(&mut *tx)
        .await?;
        written += 1;
    }

    tx.commit().await?;
    tracing::info!(count = written, "classes upserted");
    Ok(written)
}

/// Re-enrollment overwrites the class name and enrollment date in place.
pub async fn upsert_students(pool: &PgPool, students: &[Student]) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    let mut written = 0usize;

    for student in students {
        sqlx::query(
            r#"
            INSERT INTO ebd.students (id, full_name, age_group, class_name, enrollment_date)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                age_group = EXCLUDED.age_group,
                class_name = EXCLUDED.class_name,
                enrollment_date = EXCLUDED.enrollment_date
            "#,
        )
        .bind(student.id)
        .bind(&student.name)
        .bind(student.age_group.label())
        .bind(student.class_name.as_str())
        .bind(student.enrollment_date)
        .execute(&mut *tx)
        .await?;
        written += 1;
    }

    tx.commit().await?;
    tracing::info!(count = written, "students upserted");
    Ok(written)
}

/// Attendance is append-only: an event id that already exists is skipped.
pub async fn insert_events(pool: &PgPool, events: &[AttendanceEvent]) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for event in events {
        let present: Vec<Uuid> = event.present_student_ids.iter().copied().collect();
        let result = sqlx::query(
            r#"
            INSERT INTO ebd.attendance_events (id, event_date, class_name, present_student_ids)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(event.id)
        .bind(event.date)
        .bind(event.class_name.as_str())
        .bind(present)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        } else {
            tracing::debug!(event_id = %event.id, "attendance event already recorded");
        }
    }

    tx.commit().await?;
    tracing::info!(count = inserted, skipped = events.len() - inserted, "attendance events inserted");
    Ok(inserted)
}

pub async fn fetch_classes(pool: &PgPool) -> anyhow::Result<Vec<Class>> {
    let rows = sqlx::query(
        "SELECT id, name, teacher_name, age_group_criterion FROM ebd.classes ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    let mut classes = Vec::with_capacity(rows.len());
    for row in rows {
        classes.push(Class {
            id: Some(row.get("id")),
            name: ClassName::new(row.get::<String, _>("name")),
            teacher_name: row.get("teacher_name"),
            age_group_criterion: row.get::<String, _>("age_group_criterion").parse()?,
        });
    }

    tracing::debug!(count = classes.len(), "classes loaded");
    Ok(classes)
}

pub async fn fetch_students(pool: &PgPool, class_name: Option<&str>) -> anyhow::Result<Vec<Student>> {
    let mut query = String::from(
        "SELECT id, full_name, age_group, class_name, enrollment_date FROM ebd.students",
    );
    if class_name.is_some() {
        query.push_str(" WHERE class_name = $1");
    }
    query.push_str(" ORDER BY full_name");

    let mut rows = sqlx::query(&query);
    if let Some(value) = class_name {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let students = records
        .iter()
        .map(student_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;

    tracing::debug!(count = students.len(), "students loaded");
    Ok(students)
}

pub async fn fetch_student(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Student>> {
    let row = sqlx::query(
        "SELECT id, full_name, age_group, class_name, enrollment_date FROM ebd.students WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(student_from_row).transpose()
}

/// The whole ledger, in session order.
pub async fn fetch_events(pool: &PgPool) -> anyhow::Result<Vec<AttendanceEvent>> {
    let rows = sqlx::query(
        "SELECT id, event_date, class_name, present_student_ids \
         FROM ebd.attendance_events ORDER BY event_date, class_name",
    )
    .fetch_all(pool)
    .await?;

    let events: Vec<AttendanceEvent> = rows
        .into_iter()
        .map(|row| AttendanceEvent {
            id: row.get("id"),
            date: row.get("event_date"),
            class_name: ClassName::new(row.get::<String, _>("class_name")),
            present_student_ids: row
                .get::<Vec<Uuid>, _>("present_student_ids")
                .into_iter()
                .collect::<HashSet<_>>(),
        })
        .collect();

    tracing::debug!(count = events.len(), "attendance events loaded");
    Ok(events)
}

fn student_from_row(row: &PgRow) -> anyhow::Result<Student> {
    let age_group: AgeGroup = row
        .get::<String, _>("age_group")
        .parse()
        .context("student has an unrecognised age group")?;

    Ok(Student {
        id: row.get("id"),
        name: row.get("full_name"),
        age_group,
        class_name: ClassName::new(row.get::<String, _>("class_name")),
        enrollment_date: row.get("enrollment_date"),
    })
}
