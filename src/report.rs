use std::fmt::Write;

use crate::attendance;
use crate::models::{AttendanceEvent, AttendanceStats, AttendanceStatus, Class, ClassName, Student};
use crate::registry;

pub fn build_report(
    class_filter: Option<&ClassName>,
    classes: &[Class],
    students: &[Student],
    events: &[AttendanceEvent],
) -> String {
    let class_names: Vec<ClassName> = registry::available_classes(classes, students)
        .into_iter()
        .filter(|name| class_filter.map_or(true, |wanted| wanted == name))
        .collect();
    let in_scope: Vec<Student> = students
        .iter()
        .filter(|student| class_filter.map_or(true, |wanted| wanted == &student.class_name))
        .cloned()
        .collect();
    let class_registry = registry::ClassRegistry::from_classes(classes);

    let mut output = String::new();
    let scope_label = class_filter.map_or("all classes".to_string(), |name| name.to_string());

    let _ = writeln!(output, "# EBD Attendance Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} students, {} sessions on record)",
        scope_label,
        in_scope.len(),
        events
            .iter()
            .filter(|event| class_filter.map_or(true, |wanted| wanted == &event.class_name))
            .count()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Classes");

    if class_names.is_empty() {
        let _ = writeln!(output, "No classes recorded.");
    } else {
        for name in &class_names {
            let summary = attendance::summarize_class(name, students, events);
            let teacher = class_registry
                .get(name)
                .and_then(|class| class.teacher_name.as_deref())
                .unwrap_or("no teacher");
            let _ = writeln!(
                output,
                "- {} ({}): {} enrolled, {} sessions, avg {:.1}% ({} {}, {} {}, {} {})",
                summary.class_name,
                teacher,
                summary.enrolled,
                summary.sessions,
                summary.average_percentage,
                summary.critical,
                AttendanceStatus::Critical,
                summary.attention,
                AttendanceStatus::Attention,
                summary.regular,
                AttendanceStatus::Regular
            );
        }
    }

    let flagged: Vec<(&Student, AttendanceStats)> = attendance::rank_students(&in_scope, events)
        .into_iter()
        .filter(|(_, stats)| stats.status != AttendanceStatus::Regular)
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Students Needing Attention");

    if flagged.is_empty() {
        let _ = writeln!(output, "All students are regular.");
    } else {
        for (student, stats) in &flagged {
            let _ = writeln!(output, "- {}", format_student_line(student, stats));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Age Groups");
    for (group, count) in registry::count_by_age_group(&in_scope) {
        let _ = writeln!(output, "- {}: {}", group, count);
    }

    let orphans = registry::find_orphaned_students(classes, &in_scope);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Orphaned Class References");

    if orphans.is_empty() {
        let _ = writeln!(output, "None.");
    } else {
        for student in orphans {
            tracing::warn!(
                student_id = %student.id,
                class_name = %student.class_name,
                "orphaned class reference"
            );
            let _ = writeln!(
                output,
                "- {} references missing class \"{}\"",
                student.name, student.class_name
            );
        }
    }

    output
}

pub fn format_student_line(student: &Student, stats: &AttendanceStats) -> String {
    format!(
        "{} ({}): {}/{} sessions, {:.1}% [{}]",
        student.name,
        student.class_name,
        stats.present_count,
        stats.total_eligible_sessions,
        stats.percentage,
        stats.status
    )
}
