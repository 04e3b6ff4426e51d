//! Assembles one run: every opted-in student is evaluated against the
//! resource catalog and the winners become ReminderBundles for the
//! delivery services.

use std::fmt::Write;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDateTime;
use tracing::debug;

use crate::compose::{compose_message, format_due, select_channels};
use crate::eligibility;
use crate::models::{ChannelKind, ReminderBundle, Student};
use crate::resources::ResourceCatalog;

/// Evaluate the whole batch against a single "today" captured by the
/// caller, so every comparison in the run shares the same cutoff.
pub fn gather_reminders(
    students: &[Student],
    catalog: &ResourceCatalog,
    today: NaiveDateTime,
) -> Vec<ReminderBundle> {
    let today = today.date();
    let mut bundles = Vec::new();

    for student in students {
        if !student.opt_in {
            debug!(student = %student.id, "opted out; skipping");
            continue;
        }

        let mut assignments = Vec::new();
        for code in student.offsets.keys() {
            if let Some(reminder) = eligibility::evaluate(student, code, catalog, today) {
                assignments.push(reminder);
            }
        }
        if assignments.is_empty() {
            continue;
        }

        let channels = select_channels(student);
        let message = compose_message(student, &assignments);
        bundles.push(ReminderBundle {
            student_id: student.id,
            student_name: student.full_name(),
            channels,
            assignments,
            message,
        });
    }

    bundles
}

pub fn render_summary(bundles: &[ReminderBundle]) -> String {
    let mut output = String::new();

    if bundles.is_empty() {
        let _ = writeln!(
            output,
            "No students currently fall within their notification windows."
        );
        return output;
    }

    for bundle in bundles {
        let name = if bundle.student_name.is_empty() {
            format!("Student #{}", bundle.student_id)
        } else {
            bundle.student_name.clone()
        };
        let _ = writeln!(output, "{}", "=".repeat(60));
        let _ = writeln!(output, "Reminder for: {name}");
        let _ = writeln!(output, "Channels:");
        for channel in &bundle.channels {
            let _ = writeln!(output, "  - {}: {}", channel.kind.as_str(), channel.target);
        }
        let _ = writeln!(output, "Assignments:");
        for assignment in &bundle.assignments {
            let offset_note = if assignment.offset_days != 0 {
                format!(" (offset {:+}d)", assignment.offset_days)
            } else {
                String::new()
            };
            let _ = writeln!(
                output,
                "  • {} [{}] → {}{}",
                assignment.assignment_name,
                assignment.assignment_code,
                format_due(assignment.personal_deadline),
                offset_note
            );
        }
        let _ = writeln!(output);
        let _ = writeln!(output, "{}", bundle.message);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Summary: {} students ready for reminders.", bundles.len());
    output
}

/// Write the `target,message` hand-off CSV for one channel. The file is
/// always written, even with zero qualifying bundles, so the sender service
/// never reads a stale run.
pub fn write_channel_csv(
    bundles: &[ReminderBundle],
    kind: ChannelKind,
    path: &Path,
) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("cannot write channel CSV: {}", path.display()))?;
    writer.write_record([kind.target_column(), "message"])?;

    let mut written = 0usize;
    for bundle in bundles {
        let target = bundle
            .channels
            .iter()
            .find(|channel| channel.kind == kind)
            .map(|channel| channel.target.trim())
            .filter(|target| !target.is_empty());
        if let Some(target) = target {
            writer.write_record([target, bundle.message.as_str()])?;
            written += 1;
        }
    }

    writer.flush()?;
    Ok(written)
}
