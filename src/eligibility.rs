//! Per-student eligibility engine: personalized deadline, calendar-day
//! countdown, and the notification-window comparison.

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::deadlines::assignment_number;
use crate::models::{AssignmentReminder, Student};
use crate::resources::ResourceCatalog;

/// Fallback for loosely-typed numeric fields. Defaults: assignment offset 0,
/// notification window 0.
pub fn int_or_default(value: &str, default: i64) -> i64 {
    value.trim().parse().unwrap_or(default)
}

/// Notification window in days for one assignment. The single-column config
/// wins when present; otherwise the legacy per-ordinal list is indexed by
/// the first integer in the code (ordinal 1 when the code has none).
/// Negative values floor at 0.
pub fn notification_window(student: &Student, code: &str) -> i64 {
    if let Some(freq) = student.notif_freq_days {
        return freq.max(0);
    }
    if student.legacy_freqs.is_empty() {
        return 0;
    }

    let ordinal = assignment_number(code).unwrap_or(1);
    let last = student.legacy_freqs.len() as i64 - 1;
    let position = (ordinal - 1).clamp(0, last) as usize;
    student.legacy_freqs[position].max(0)
}

/// Decide whether one assignment should trigger a reminder for one student
/// today. Every "no" here is a skip, not an error.
pub fn evaluate(
    student: &Student,
    code: &str,
    catalog: &ResourceCatalog,
    today: NaiveDate,
) -> Option<AssignmentReminder> {
    let entry = match catalog.lookup(&student.course_code, code) {
        Some(entry) => entry,
        None => {
            debug!(student = %student.id, code, "no assignment data for code");
            return None;
        }
    };
    let base_deadline = match entry.deadline {
        Some(deadline) => deadline,
        None => {
            debug!(student = %student.id, code, "no deadline resolved; skipping");
            return None;
        }
    };

    let offset_days = student.offsets.get(code).copied().unwrap_or(0);
    let personal_deadline = base_deadline + Duration::days(offset_days);
    let window = notification_window(student, code);
    // Calendar-day countdown: time of day never participates.
    let delta_days = (personal_deadline.date() - today).num_days();
    debug!(
        student = %student.id,
        code,
        scope = entry.course_code.as_str(),
        offset = offset_days,
        window,
        delta = delta_days,
        "evaluated assignment"
    );

    if delta_days < 0 {
        debug!(student = %student.id, code, "past personal deadline; skipping");
        return None;
    }
    // Fires only on the exact day the countdown equals the window; a run
    // skipped on that day sends nothing later.
    if delta_days != window {
        return None;
    }

    Some(AssignmentReminder {
        assignment_code: code.to_string(),
        assignment_name: entry.assignment_name.clone(),
        base_deadline,
        personal_deadline,
        offset_days,
        notification_window_days: window,
        resources: entry.resources.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadlines::{DeadlineCatalog, DeadlineRow};
    use crate::models::ResourceRow;

    fn catalog(code: &str, due: &str) -> ResourceCatalog {
        let deadlines = DeadlineCatalog::from_rows([DeadlineRow {
            assignment_code: code.to_string(),
            due: due.to_string(),
            ..Default::default()
        }]);
        let rows = vec![ResourceRow {
            assignment_code: code.to_string(),
            resource_name: Some("Walkthrough".to_string()),
            link: Some("https://x".to_string()),
            ..Default::default()
        }];
        ResourceCatalog::build(&rows, &deadlines)
    }

    fn student_with(code: &str, offset: i64, freq: i64) -> Student {
        let mut student = Student {
            opt_in: true,
            notif_freq_days: Some(freq),
            ..Default::default()
        };
        student.offsets.insert(code.to_string(), offset);
        student
    }

    fn day(value: &str) -> NaiveDate {
        value.parse().unwrap()
    }

    #[test]
    fn fires_on_the_exact_window_day() {
        // Class deadline 2025-11-01, +1 day personal offset, 3-day window:
        // the one trigger day is 2025-10-30.
        let catalog = catalog("PROJ1", "2025-11-01T23:59:00");
        let student = student_with("PROJ1", 1, 3);

        let reminder = evaluate(&student, "PROJ1", &catalog, day("2025-10-30")).unwrap();
        assert_eq!(reminder.personal_deadline.date(), day("2025-11-02"));
        assert_eq!(reminder.offset_days, 1);
        assert_eq!(reminder.notification_window_days, 3);
        assert_eq!(reminder.resources.len(), 1);
    }

    #[test]
    fn exact_window_only_no_earlier_no_later() {
        // Documented behavior: the countdown must equal the window exactly,
        // so a run on any other day (even inside the window) sends nothing.
        let catalog = catalog("PROJ1", "2025-11-01T23:59:00");
        let student = student_with("PROJ1", 1, 3);

        assert!(evaluate(&student, "PROJ1", &catalog, day("2025-10-31")).is_none());
        assert!(evaluate(&student, "PROJ1", &catalog, day("2025-10-29")).is_none());
    }

    #[test]
    fn past_personal_deadline_never_fires() {
        let catalog = catalog("PROJ1", "2025-11-01T23:59:00");
        let mut student = student_with("PROJ1", 0, 0);

        assert!(evaluate(&student, "PROJ1", &catalog, day("2025-11-02")).is_none());

        // A negative offset moves the deadline earlier as well.
        student.offsets.insert("PROJ1".to_string(), -2);
        assert!(evaluate(&student, "PROJ1", &catalog, day("2025-10-31")).is_none());
        let reminder = evaluate(&student, "PROJ1", &catalog, day("2025-10-30")).unwrap();
        assert_eq!(reminder.personal_deadline.date(), day("2025-10-30"));
    }

    #[test]
    fn unknown_code_never_fires() {
        let catalog = catalog("PROJ1", "2025-11-01T23:59:00");
        let student = student_with("PROJ5", 0, 3);

        for today in ["2025-10-29", "2025-10-30", "2025-11-01"] {
            assert!(evaluate(&student, "PROJ5", &catalog, day(today)).is_none());
        }
    }

    #[test]
    fn entry_without_deadline_never_fires() {
        // Resource rows exist for HW1 but no deadline matches it anywhere.
        let deadlines = DeadlineCatalog::from_rows([]);
        let rows = vec![ResourceRow {
            assignment_code: "HW1".to_string(),
            ..Default::default()
        }];
        let catalog = ResourceCatalog::build(&rows, &deadlines);
        let student = student_with("HW1", 0, 0);

        assert!(evaluate(&student, "HW1", &catalog, day("2025-10-30")).is_none());
    }

    #[test]
    fn alias_resolves_when_exact_code_missing() {
        let catalog = catalog("PROJ1", "2025-11-01T23:59:00");
        let student = student_with("PROJ1B", 0, 2);

        let reminder = evaluate(&student, "PROJ1B", &catalog, day("2025-10-30")).unwrap();
        assert_eq!(reminder.assignment_code, "PROJ1B");
    }

    #[test]
    fn window_prefers_single_column_and_floors_at_zero() {
        let mut student = student_with("PROJ1", 0, 0);
        student.notif_freq_days = Some(-4);
        student.legacy_freqs = vec![9, 9, 9];
        assert_eq!(notification_window(&student, "PROJ1"), 0);

        student.notif_freq_days = Some(5);
        assert_eq!(notification_window(&student, "PROJ1"), 5);
    }

    #[test]
    fn window_falls_back_to_legacy_list_by_ordinal() {
        let mut student = Student::default();
        student.legacy_freqs = vec![7, 3, 1];

        assert_eq!(notification_window(&student, "PROJ1"), 7);
        assert_eq!(notification_window(&student, "PROJ2"), 3);
        // Ordinal past the end clamps to the last entry.
        assert_eq!(notification_window(&student, "PROJ9"), 1);
        // No integer in the code defaults to ordinal 1.
        assert_eq!(notification_window(&student, "FINAL"), 7);
        // Negative legacy values floor at 0.
        student.legacy_freqs = vec![-2];
        assert_eq!(notification_window(&student, "PROJ1"), 0);

        student.legacy_freqs = Vec::new();
        assert_eq!(notification_window(&student, "PROJ1"), 0);
    }

    #[test]
    fn int_or_default_table() {
        assert_eq!(int_or_default("3", 0), 3);
        assert_eq!(int_or_default(" -2 ", 0), -2);
        assert_eq!(int_or_default("+4", 0), 4);
        assert_eq!(int_or_default("", 0), 0);
        assert_eq!(int_or_default("n/a", 0), 0);
        assert_eq!(int_or_default("3.5", 7), 7);
    }
}
