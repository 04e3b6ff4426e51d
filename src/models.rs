use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub resource_type: Option<String>,
    pub resource_name: Option<String>,
    pub link: Option<String>,
}

/// Raw row from the assignment_resources table, before folding.
#[derive(Debug, Clone, Default)]
pub struct ResourceRow {
    pub course_code: String,
    pub assignment_code: String,
    pub assignment_name: Option<String>,
    pub resource_type: Option<String>,
    pub resource_name: Option<String>,
    pub link: Option<String>,
}

/// Accumulated resources for one (course, assignment code) pair. The
/// deadline is attached by the catalog join, never written by resource rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub course_code: String,
    pub assignment_code: String,
    pub assignment_name: String,
    pub resources: Vec<Resource>,
    pub deadline: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct Student {
    pub id: Uuid,
    pub course_code: String,
    pub first_name: String,
    pub last_name: String,
    pub preferred_first_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub discord_id: Option<String>,
    pub opt_in: bool,
    pub phone_pref: bool,
    pub email_pref: bool,
    pub discord_pref: bool,
    /// Single-column window config; None falls back to the legacy
    /// per-ordinal list.
    pub notif_freq_days: Option<i64>,
    pub legacy_freqs: Vec<i64>,
    /// Per-assignment day offsets, keyed by assignment code.
    pub offsets: BTreeMap<String, i64>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// One assignment that cleared the eligibility check for one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentReminder {
    pub assignment_code: String,
    pub assignment_name: String,
    pub base_deadline: NaiveDateTime,
    pub personal_deadline: NaiveDateTime,
    pub offset_days: i64,
    pub notification_window_days: i64,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Sms,
    Email,
    Discord,
    None,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Sms => "sms",
            ChannelKind::Email => "email",
            ChannelKind::Discord => "discord",
            ChannelKind::None => "none",
        }
    }

    /// Header for the target column in this channel's hand-off CSV.
    pub fn target_column(self) -> &'static str {
        match self {
            ChannelKind::Sms => "phone_number",
            ChannelKind::Email => "email",
            ChannelKind::Discord => "discord_id",
            ChannelKind::None => "target",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub kind: ChannelKind,
    pub target: String,
}

/// Everything a delivery adapter needs for one student.
#[derive(Debug, Clone, Serialize)]
pub struct ReminderBundle {
    pub student_id: Uuid,
    pub student_name: String,
    pub channels: Vec<Channel>,
    pub assignments: Vec<AssignmentReminder>,
    pub message: String,
}
