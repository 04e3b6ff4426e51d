//! Canonical deadline catalog: class-wide due dates keyed by course scope,
//! looked up by assignment code, base-alias code, exact name, or as a last
//! resort by "Project N" phrase.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

static BASE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]+\d+").expect("valid regex"));
static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

/// One row of the deadlines source. The name column appears as either
/// `assignment_name` or the older `assignment` header.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeadlineRow {
    #[serde(default)]
    pub course_code: String,
    #[serde(default)]
    pub assignment_code: String,
    #[serde(default, alias = "assignment")]
    pub assignment_name: String,
    #[serde(default)]
    pub due: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseDeadlines {
    pub by_code: BTreeMap<String, NaiveDateTime>,
    pub by_name: BTreeMap<String, NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeadlineCatalog {
    scopes: HashMap<String, CourseDeadlines>,
}

impl DeadlineCatalog {
    /// Read the deadlines CSV. A missing file is fatal; a row whose due
    /// value is empty or unparsable contributes nothing.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("deadlines CSV not found: {}", path.display()))?;

        let mut rows = Vec::new();
        for result in reader.deserialize::<DeadlineRow>() {
            rows.push(result.context("malformed deadlines CSV row")?);
        }
        Ok(Self::from_rows(rows))
    }

    pub fn from_rows(rows: impl IntoIterator<Item = DeadlineRow>) -> Self {
        let mut scopes: HashMap<String, CourseDeadlines> = HashMap::new();

        for row in rows {
            let due = match parse_due(&row.due) {
                Some(due) => due,
                None => {
                    debug!(due = row.due.as_str(), "dropping row with unparsable due");
                    continue;
                }
            };
            let course_code = row.course_code.trim().to_string();
            let assignment_code = row.assignment_code.trim();
            let assignment_name = row.assignment_name.trim();

            let course = scopes.entry(course_code).or_default();
            if !assignment_code.is_empty() {
                course.by_code.insert(assignment_code.to_string(), due);
            }
            if !assignment_name.is_empty() {
                course.by_name.insert(assignment_name.to_string(), due);
            }
        }

        scopes.retain(|_, course| !course.by_code.is_empty() || !course.by_name.is_empty());
        DeadlineCatalog { scopes }
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Scopes to consult, in order: the course itself, then the default ""
    /// scope. Each is consulted at most once and no other scope is ever
    /// searched.
    fn scope_order<'a>(&'a self, course_code: &'a str) -> Vec<(&'a str, &'a CourseDeadlines)> {
        let mut order = Vec::new();
        if let Some(course) = self.scopes.get(course_code) {
            order.push((course_code, course));
        }
        if !course_code.is_empty() {
            if let Some(course) = self.scopes.get("") {
                order.push(("", course));
            }
        }
        order
    }

    /// Resolve the canonical deadline for an assignment. Search order:
    /// exact code, base-alias code, exact name, then any name containing
    /// "Project N" where N is the first integer in the code. No match is a
    /// skip, not an error.
    pub fn find(
        &self,
        course_code: &str,
        assignment_name: Option<&str>,
        assignment_code: Option<&str>,
    ) -> Option<NaiveDateTime> {
        let candidates = self.scope_order(course_code);
        if candidates.is_empty() {
            return None;
        }

        let code = assignment_code.map(str::trim).filter(|code| !code.is_empty());
        if let Some(code) = code {
            let mut search_codes = vec![code.to_string()];
            if let Some(base) = base_code(code) {
                if base != code {
                    search_codes.push(base);
                }
            }
            for &(scope, course) in &candidates {
                for key in &search_codes {
                    if let Some(due) = course.by_code.get(key) {
                        debug!(code = key.as_str(), scope, "matched deadline by code");
                        return Some(*due);
                    }
                }
            }
        }

        let name = assignment_name.map(str::trim).filter(|name| !name.is_empty());
        if let Some(name) = name {
            for &(scope, course) in &candidates {
                if let Some(due) = course.by_name.get(name) {
                    debug!(name, scope, "matched deadline by name");
                    return Some(*due);
                }
            }
        }

        let number = assignment_number(code.unwrap_or(""))?;
        let phrase = format!("Project {number}");
        for &(scope, course) in &candidates {
            for (candidate, due) in &course.by_name {
                if candidate.contains(&phrase) {
                    debug!(phrase = phrase.as_str(), scope, "matched deadline by phrase");
                    return Some(*due);
                }
            }
        }

        None
    }
}

/// Accepts the ISO-8601-ish spellings the deadlines sheet has used over
/// time; a bare date lands at midnight.
pub fn parse_due(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Leading letters+digits prefix of an assignment code, used to group
/// sub-parts ("PROJ1A", "PROJ1B") under one umbrella code ("PROJ1").
pub fn base_code(code: &str) -> Option<String> {
    BASE_CODE.find(code).map(|m| m.as_str().to_string())
}

/// First integer appearing anywhere in the code.
pub fn assignment_number(code: &str) -> Option<i64> {
    FIRST_NUMBER.find(code).and_then(|m| m.as_str().parse().ok())
}
