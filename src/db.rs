use std::collections::BTreeMap;

use anyhow::Context;
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row};
use uuid::Uuid;

use crate::deadlines::assignment_number;
use crate::eligibility::int_or_default;
use crate::models::{ResourceRow, Student};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("7c5e1d2a-41b8-4f37-9d92-6a2f30c5e8b1")?,
            "Ana",
            "Nguyen",
            Some("Ana"),
            Some("ana.nguyen@example.edu"),
            Some("5105550101"),
            Some("ana#0001"),
            true,
            (true, true, false),
            Some(3),
            (Some(0), Some(0), Some(1)),
        ),
        (
            Uuid::parse_str("f3b9a8c4-7d61-45e2-8f13-9c0d2b4a6e57")?,
            "Benjamin",
            "Okafor",
            Some("Ben"),
            Some("ben.okafor@example.edu"),
            None,
            Some("benito"),
            true,
            (false, false, true),
            None,
            (Some(2), None, Some(0)),
        ),
        (
            Uuid::parse_str("1a6d4e9f-2c83-47b5-b0e4-5f7a8d913c26")?,
            "Kiara",
            "Patel",
            None,
            Some("kiara.patel@example.edu"),
            Some("5105550188"),
            None,
            false,
            (true, true, false),
            Some(7),
            (None, None, None),
        ),
    ];

    for (
        id,
        first_name,
        last_name,
        preferred,
        email,
        phone,
        discord,
        opt_in,
        (phone_pref, email_pref, discord_pref),
        freq_days,
        (proj1, proj2, proj3),
    ) in students
    {
        sqlx::query(
            r#"
            INSERT INTO autoremind.students
            (id, course_code, first_name, last_name, preferred_first_name, email,
             phone_number, discord_id, opt_in, phone_pref, email_pref, discord_pref,
             notif_freq_days, notif_freq_1, notif_freq_2, "PROJ1", "PROJ2", "PROJ3")
            VALUES ($1, '', $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 7, 3, $13, $14, $15)
            ON CONFLICT (email) DO UPDATE
            SET first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                opt_in = EXCLUDED.opt_in
            "#,
        )
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(preferred)
        .bind(email)
        .bind(phone)
        .bind(discord)
        .bind(opt_in)
        .bind(phone_pref)
        .bind(email_pref)
        .bind(discord_pref)
        .bind(freq_days)
        .bind(proj1)
        .bind(proj2)
        .bind(proj3)
        .execute(pool)
        .await?;
    }

    let resources = vec![
        ("", "PROJ1", "Project 1: Wordle", "guide", "Starter walkthrough", "https://example.edu/proj1/walkthrough"),
        ("", "PROJ1", "Project 1: Wordle", "video", "Lecture recording", "https://example.edu/proj1/lecture"),
        ("", "PROJ2", "Project 2: Spelling Bee", "guide", "Walkthrough", "https://example.edu/proj2/walkthrough"),
        ("", "PROJ2B", "Project 2: Spelling Bee (part B)", "slides", "Recursion slides", "https://example.edu/proj2b/slides"),
        ("CS10", "PROJ3", "Project 3: 2048", "guide", "Board-state notes", "https://example.edu/cs10/proj3/notes"),
    ];

    for (course_code, code, name, resource_type, resource_name, link) in resources {
        sqlx::query(
            r#"
            INSERT INTO autoremind.assignment_resources
            (id, course_code, assignment_code, assignment_name, resource_type, resource_name, link)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (course_code, assignment_code, resource_name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_code)
        .bind(code)
        .bind(name)
        .bind(resource_type)
        .bind(resource_name)
        .bind(link)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_students(pool: &PgPool, limit: Option<i64>) -> anyhow::Result<Vec<Student>> {
    let mut query =
        String::from("SELECT * FROM autoremind.students ORDER BY last_name, first_name");
    if limit.is_some() {
        query.push_str(" LIMIT $1");
    }

    let mut rows = sqlx::query(&query);
    if let Some(limit) = limit {
        rows = rows.bind(limit);
    }

    let records = rows
        .fetch_all(pool)
        .await
        .context("failed to fetch students")?;

    records.iter().map(student_from_row).collect()
}

pub async fn fetch_resource_rows(pool: &PgPool) -> anyhow::Result<Vec<ResourceRow>> {
    let records = sqlx::query(
        "SELECT course_code, assignment_code, assignment_name, resource_type, resource_name, link \
         FROM autoremind.assignment_resources \
         ORDER BY course_code, assignment_code",
    )
    .fetch_all(pool)
    .await
    .context("failed to fetch assignment resources")?;

    let mut rows = Vec::new();
    for record in records {
        rows.push(ResourceRow {
            course_code: record
                .get::<Option<String>, _>("course_code")
                .unwrap_or_default(),
            assignment_code: record
                .get::<Option<String>, _>("assignment_code")
                .unwrap_or_default(),
            assignment_name: record.get("assignment_name"),
            resource_type: record.get("resource_type"),
            resource_name: record.get("resource_name"),
            link: record.get("link"),
        });
    }

    Ok(rows)
}

/// Project one loosely-shaped student row into the typed record the engine
/// consumes. Assignment-offset columns are discovered by their PROJ prefix
/// (case-insensitive, normalized to uppercase keys); legacy frequency
/// columns by `notif_freq_<n>`, ordered by n.
fn student_from_row(row: &PgRow) -> anyhow::Result<Student> {
    let mut offsets = BTreeMap::new();
    let mut legacy: Vec<(i64, i64)> = Vec::new();

    for column in row.columns() {
        let name = column.name();
        let upper = name.to_ascii_uppercase();
        if upper.starts_with("PROJ") {
            offsets.insert(upper, loose_int(row, name).unwrap_or(0));
        } else if name.starts_with("notif_freq_") && name != "notif_freq_days" {
            if let Some(ordinal) = assignment_number(name) {
                legacy.push((ordinal, loose_int(row, name).unwrap_or(0)));
            }
        }
    }
    legacy.sort_by_key(|&(ordinal, _)| ordinal);
    let legacy_freqs = legacy.into_iter().map(|(_, value)| value).collect();

    Ok(Student {
        id: row.try_get("id").context("student row missing id")?,
        course_code: text(row, "course_code"),
        first_name: text(row, "first_name"),
        last_name: text(row, "last_name"),
        preferred_first_name: opt_text(row, "preferred_first_name"),
        email: opt_text(row, "email"),
        phone_number: opt_text(row, "phone_number"),
        discord_id: opt_text(row, "discord_id"),
        opt_in: flag(row, "opt_in"),
        phone_pref: flag(row, "phone_pref"),
        email_pref: flag(row, "email_pref"),
        discord_pref: flag(row, "discord_pref"),
        notif_freq_days: loose_int(row, "notif_freq_days"),
        legacy_freqs,
        offsets,
    })
}

/// Integer column that may be stored as int4, int8, or text. NULL and
/// missing columns read as None; unparsable text falls back to 0.
fn loose_int(row: &PgRow, column: &str) -> Option<i64> {
    if let Ok(value) = row.try_get::<Option<i32>, _>(column) {
        return value.map(i64::from);
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(column) {
        return value;
    }
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .map(|raw| int_or_default(&raw, 0))
}

fn opt_text(row: &PgRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column).ok().flatten()
}

fn text(row: &PgRow, column: &str) -> String {
    opt_text(row, column).unwrap_or_default()
}

fn flag(row: &PgRow, column: &str) -> bool {
    row.try_get::<Option<bool>, _>(column)
        .ok()
        .flatten()
        .unwrap_or(false)
}
