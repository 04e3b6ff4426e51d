//! Per-assignment resource catalog. Rows are folded into one entry per
//! (course scope, assignment code); each row also fans out to the code's
//! base alias so "PROJ1" lookups see resources filed under "PROJ1B".

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::deadlines::{base_code, DeadlineCatalog};
use crate::models::{Resource, ResourceEntry, ResourceRow};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceCatalog {
    scopes: HashMap<String, BTreeMap<String, ResourceEntry>>,
}

impl ResourceCatalog {
    /// Fold resource rows into entries, then attach a resolved deadline to
    /// each entry. Rows without an assignment code are ignored.
    ///
    /// Alias fan-out is one-directional: every row also appends to its base
    /// alias entry, but exact-code entries never pull from sibling codes
    /// that happen to share the alias.
    pub fn build(rows: &[ResourceRow], deadlines: &DeadlineCatalog) -> Self {
        let mut scopes: HashMap<String, BTreeMap<String, ResourceEntry>> = HashMap::new();

        for row in rows {
            let code = row.assignment_code.trim();
            if code.is_empty() {
                continue;
            }
            let course_code = row.course_code.trim().to_string();
            let entries = scopes.entry(course_code.clone()).or_default();

            let entry = entries.entry(code.to_string()).or_insert_with(|| ResourceEntry {
                course_code: course_code.clone(),
                assignment_code: code.to_string(),
                assignment_name: row.assignment_name.clone().unwrap_or_else(|| code.to_string()),
                resources: Vec::new(),
                deadline: None,
            });
            if let Some(name) = &row.assignment_name {
                entry.assignment_name = name.clone();
            }
            entry.resources.push(resource_from_row(row));
            let entry_name = entry.assignment_name.clone();

            if let Some(alias) = base_code(code).filter(|alias| alias != code) {
                let alias_entry = entries.entry(alias.clone()).or_insert_with(|| ResourceEntry {
                    course_code: course_code.clone(),
                    assignment_code: alias.clone(),
                    assignment_name: entry_name,
                    resources: Vec::new(),
                    deadline: None,
                });
                // The alias keeps its first real name; refresh only while it
                // still carries the placeholder code.
                if let Some(name) = &row.assignment_name {
                    if alias_entry.assignment_name == alias_entry.assignment_code {
                        alias_entry.assignment_name = name.clone();
                    }
                }
                alias_entry.resources.push(resource_from_row(row));
            }
        }

        for (course_code, entries) in &mut scopes {
            for entry in entries.values_mut() {
                entry.deadline = deadlines.find(
                    course_code,
                    Some(&entry.assignment_name),
                    Some(&entry.assignment_code),
                );
            }
        }

        let total_codes: usize = scopes.values().map(BTreeMap::len).sum();
        debug!(
            codes = total_codes,
            scopes = scopes.len(),
            "built assignment resource catalog"
        );
        ResourceCatalog { scopes }
    }

    /// Find the entry for an assignment code in the student's course scope.
    /// Falls back to the default scope only when the course has no entries
    /// at all, and to the code's base alias only within the chosen scope.
    pub fn lookup(&self, course_code: &str, code: &str) -> Option<&ResourceEntry> {
        let entries = match self.scopes.get(course_code) {
            Some(entries) => entries,
            None if !course_code.is_empty() => self.scopes.get("")?,
            None => return None,
        };

        if let Some(entry) = entries.get(code) {
            return Some(entry);
        }
        base_code(code).and_then(|alias| entries.get(&alias))
    }
}

fn resource_from_row(row: &ResourceRow) -> Resource {
    Resource {
        resource_type: row.resource_type.clone(),
        resource_name: row.resource_name.clone(),
        link: row.link.clone(),
    }
}
