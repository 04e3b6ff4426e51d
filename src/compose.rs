//! Message composition and channel selection. Pure functions of their
//! inputs; delivery itself belongs to the downstream channel services.

use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::models::{AssignmentReminder, Channel, ChannelKind, Student};

pub fn format_due(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

fn greeting_name(student: &Student) -> &str {
    if let Some(name) = non_empty(&student.preferred_first_name) {
        return name;
    }
    let first = student.first_name.trim();
    if first.is_empty() {
        "there"
    } else {
        first
    }
}

/// Render the reminder body for one student. One line per assignment, an
/// offset note only when the student has one, and only resources that carry
/// a name.
pub fn compose_message(student: &Student, assignments: &[AssignmentReminder]) -> String {
    let mut message = String::new();
    let _ = writeln!(message, "Hey {},", greeting_name(student));
    let _ = writeln!(message);
    let _ = writeln!(message, "Heads-up: you have upcoming assignments due soon:");

    for assignment in assignments {
        let _ = writeln!(
            message,
            "- {} ({}) → due {}",
            assignment.assignment_name,
            assignment.assignment_code,
            format_due(assignment.personal_deadline)
        );
        if assignment.offset_days != 0 {
            let _ = writeln!(
                message,
                "  (Class deadline {:+} day offset for you.)",
                assignment.offset_days
            );
        }

        let named: Vec<_> = assignment
            .resources
            .iter()
            .filter(|resource| non_empty(&resource.resource_name).is_some())
            .collect();
        if !named.is_empty() {
            let _ = writeln!(message, "  Helpful resources:");
            for resource in named {
                let _ = write!(message, "    • {}", resource.resource_name.as_deref().unwrap_or(""));
                if let Some(resource_type) = non_empty(&resource.resource_type) {
                    let _ = write!(message, " [{resource_type}]");
                }
                if let Some(link) = non_empty(&resource.link) {
                    let _ = write!(message, ": {link}");
                }
                let _ = writeln!(message);
            }
        }
    }

    let _ = writeln!(message);
    message.push_str("Let us know if you need any support!");
    message
}

/// Channels to notify, in fixed order: phone, email, discord. A channel
/// qualifies only when its preference flag is set and its target is
/// non-empty. The sentinel entry keeps the list non-empty for consumers.
pub fn select_channels(student: &Student) -> Vec<Channel> {
    let mut channels = Vec::new();
    if student.phone_pref {
        if let Some(target) = non_empty(&student.phone_number) {
            channels.push(Channel {
                kind: ChannelKind::Sms,
                target: target.to_string(),
            });
        }
    }
    if student.email_pref {
        if let Some(target) = non_empty(&student.email) {
            channels.push(Channel {
                kind: ChannelKind::Email,
                target: target.to_string(),
            });
        }
    }
    if student.discord_pref {
        if let Some(target) = non_empty(&student.discord_id) {
            channels.push(Channel {
                kind: ChannelKind::Discord,
                target: target.to_string(),
            });
        }
    }

    if channels.is_empty() {
        channels.push(Channel {
            kind: ChannelKind::None,
            target: "(no opted-in channels)".to_string(),
        });
    }
    channels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resource;

    fn reminder(offset_days: i64, resources: Vec<Resource>) -> AssignmentReminder {
        let base = "2026-10-02T23:59:00".parse().unwrap();
        AssignmentReminder {
            assignment_code: "PROJ2".to_string(),
            assignment_name: "Project 2: Spelling Bee".to_string(),
            base_deadline: base,
            personal_deadline: base + chrono::Duration::days(offset_days),
            offset_days,
            notification_window_days: 3,
            resources,
        }
    }

    fn named_resource(name: &str) -> Resource {
        Resource {
            resource_type: Some("guide".to_string()),
            resource_name: Some(name.to_string()),
            link: Some("https://x".to_string()),
        }
    }

    #[test]
    fn greeting_falls_back_preferred_first_literal() {
        let mut student = Student {
            first_name: "Jordan".to_string(),
            preferred_first_name: Some("JJ".to_string()),
            ..Default::default()
        };
        assert!(compose_message(&student, &[]).starts_with("Hey JJ,"));

        student.preferred_first_name = Some("  ".to_string());
        assert!(compose_message(&student, &[]).starts_with("Hey Jordan,"));

        student.first_name = String::new();
        assert!(compose_message(&student, &[]).starts_with("Hey there,"));
    }

    #[test]
    fn renders_assignment_line_with_personal_deadline() {
        let student = Student::default();
        let message = compose_message(&student, &[reminder(0, vec![])]);
        assert!(message.contains("- Project 2: Spelling Bee (PROJ2) → due 2026-10-02 23:59"));
        assert!(!message.contains("offset"));
        assert!(message.ends_with("Let us know if you need any support!"));
    }

    #[test]
    fn offset_note_appears_only_when_nonzero() {
        let student = Student::default();

        let message = compose_message(&student, &[reminder(1, vec![])]);
        assert!(message.contains("(Class deadline +1 day offset for you.)"));

        let message = compose_message(&student, &[reminder(-2, vec![])]);
        assert!(message.contains("(Class deadline -2 day offset for you.)"));
    }

    #[test]
    fn unnamed_resources_are_dropped_at_composition() {
        let student = Student::default();
        let resources = vec![
            named_resource("Walkthrough"),
            Resource {
                resource_type: Some("video".to_string()),
                resource_name: None,
                link: Some("https://y".to_string()),
            },
        ];
        let message = compose_message(&student, &[reminder(0, resources)]);
        assert!(message.contains("    • Walkthrough [guide]: https://x"));
        assert!(!message.contains("https://y"));
    }

    #[test]
    fn channels_follow_fixed_order_and_require_flag_plus_target() {
        let student = Student {
            phone_pref: true,
            phone_number: Some("5551234567".to_string()),
            email_pref: true,
            email: Some("student@example.com".to_string()),
            discord_pref: false,
            discord_id: Some("gamer".to_string()),
            ..Default::default()
        };
        let channels = select_channels(&student);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].kind, ChannelKind::Sms);
        assert_eq!(channels[1].kind, ChannelKind::Email);
    }

    #[test]
    fn flag_without_target_does_not_qualify() {
        let student = Student {
            email_pref: true,
            email: Some("   ".to_string()),
            ..Default::default()
        };
        let channels = select_channels(&student);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].kind, ChannelKind::None);
        assert_eq!(channels[0].target, "(no opted-in channels)");
    }
}
