use uuid::Uuid;

use crate::models::{
    AttendanceEvent, AttendanceStats, AttendanceStatus, ClassName, ClassSummary, SessionOutcome,
    Student,
};
use crate::registry;

const CRITICAL_BELOW: f64 = 50.0;
const ATTENTION_BELOW: f64 = 75.0;

impl AttendanceStatus {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage < CRITICAL_BELOW {
            AttendanceStatus::Critical
        } else if percentage < ATTENTION_BELOW {
            AttendanceStatus::Attention
        } else {
            AttendanceStatus::Regular
        }
    }
}

/// Events of the student's current class dated on or after their enrollment.
/// A student without an enrollment date is eligible for every class event.
/// A blank class name matches nothing.
pub fn eligible_events<'a>(
    student: &'a Student,
    all_events: &'a [AttendanceEvent],
) -> impl Iterator<Item = &'a AttendanceEvent> + 'a {
    let has_class = !student.class_name.as_str().trim().is_empty();
    all_events.iter().filter(move |event| {
        has_class
            && event.class_name == student.class_name
            && student
                .enrollment_date
                .map_or(true, |enrolled| event.date >= enrolled)
    })
}

pub fn compute_attendance_stats(student: &Student, all_events: &[AttendanceEvent]) -> AttendanceStats {
    let events: Vec<AttendanceEvent> = eligible_events(student, all_events).cloned().collect();
    let total_eligible_sessions = events.len();
    let present_count = events
        .iter()
        .filter(|event| event.present_student_ids.contains(&student.id))
        .count();

    // Zero eligible sessions reports 0%, never an unearned 100%.
    let percentage = if total_eligible_sessions > 0 {
        present_count as f64 / total_eligible_sessions as f64 * 100.0
    } else {
        0.0
    };

    AttendanceStats {
        total_eligible_sessions,
        present_count,
        percentage,
        status: AttendanceStatus::from_percentage(percentage),
        events,
    }
}

impl AttendanceStats {
    /// Session-by-session outcomes for the detail view, most recent first.
    pub fn history(&self, student_id: Uuid) -> Vec<SessionOutcome> {
        let mut outcomes: Vec<SessionOutcome> = self
            .events
            .iter()
            .map(|event| SessionOutcome {
                event_id: event.id,
                date: event.date,
                present: event.present_student_ids.contains(&student_id),
            })
            .collect();
        outcomes.sort_by(|a, b| b.date.cmp(&a.date));
        outcomes
    }
}

pub fn summarize_class(
    class_name: &ClassName,
    students: &[Student],
    events: &[AttendanceEvent],
) -> ClassSummary {
    let roster = registry::roster(class_name, students);
    let sessions = events
        .iter()
        .filter(|event| &event.class_name == class_name)
        .count();

    let mut summary = ClassSummary {
        class_name: class_name.clone(),
        enrolled: roster.len(),
        sessions,
        average_percentage: 0.0,
        critical: 0,
        attention: 0,
        regular: 0,
    };

    let mut total_percentage = 0.0;
    for student in &roster {
        let stats = compute_attendance_stats(student, events);
        total_percentage += stats.percentage;
        match stats.status {
            AttendanceStatus::Critical => summary.critical += 1,
            AttendanceStatus::Attention => summary.attention += 1,
            AttendanceStatus::Regular => summary.regular += 1,
        }
    }

    if !roster.is_empty() {
        summary.average_percentage = total_percentage / roster.len() as f64;
    }

    summary
}

/// Stats for every student, worst attendance first.
pub fn rank_students<'a>(
    students: &'a [Student],
    events: &[AttendanceEvent],
) -> Vec<(&'a Student, AttendanceStats)> {
    let mut ranked: Vec<(&Student, AttendanceStats)> = students
        .iter()
        .map(|student| (student, compute_attendance_stats(student, events)))
        .collect();
    ranked.sort_by(|a, b| {
        a.1.percentage
            .partial_cmp(&b.1.percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.name.cmp(&b.0.name))
    });
    ranked
}
