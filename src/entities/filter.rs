use std::collections::BTreeSet;

use super::trial::TrialRecord;

/// Selection value meaning "do not filter on this column".
pub const ALL: &str = "All";

/// Status and condition predicates over a trials table, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPredicate {
    pub status: Option<String>,
    pub conditions: Option<BTreeSet<String>>,
}

impl FilterPredicate {
    /// Builds a predicate from UI-style selections where [`ALL`] (or nothing)
    /// disables the corresponding filter.
    pub fn from_selection<S: AsRef<str>>(status: Option<&str>, conditions: &[S]) -> Self {
        let status = status
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != ALL)
            .map(str::to_string);

        let selected: BTreeSet<String> = conditions
            .iter()
            .map(|c| c.as_ref().trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        let conditions = (!selected.is_empty() && !selected.contains(ALL)).then_some(selected);

        Self { status, conditions }
    }

    pub fn matches(&self, row: &TrialRecord) -> bool {
        let status_ok = self
            .status
            .as_deref()
            .is_none_or(|status| row.status == status);
        let conditions_ok = self
            .conditions
            .as_ref()
            .is_none_or(|selected| row.condition_tokens().any(|c| selected.contains(c)));
        status_ok && conditions_ok
    }

    /// Matching rows, in input order. The input table is left untouched.
    pub fn apply(&self, rows: &[TrialRecord]) -> Vec<TrialRecord> {
        rows.iter().filter(|row| self.matches(row)).cloned().collect()
    }
}

/// Status choices for a trials table: [`ALL`] then distinct statuses, sorted.
pub fn status_options(rows: &[TrialRecord]) -> Vec<String> {
    let distinct: BTreeSet<&str> = rows.iter().map(|r| r.status.as_str()).collect();
    std::iter::once(ALL)
        .chain(distinct)
        .map(str::to_string)
        .collect()
}

/// Condition choices for a trials table: [`ALL`] then distinct tokens, sorted.
pub fn condition_options(rows: &[TrialRecord]) -> Vec<String> {
    let distinct: BTreeSet<&str> = rows.iter().flat_map(|r| r.condition_tokens()).collect();
    std::iter::once(ALL)
        .chain(distinct)
        .map(str::to_string)
        .collect()
}
