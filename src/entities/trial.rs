use std::fmt;

use serde::{Serialize, Serializer};

use super::NOT_AVAILABLE;

/// Enrollment count of a study; zero is a real count, distinct from unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Enrollment {
    Count(u64),
    NotAvailable,
}

impl fmt::Display for Enrollment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl Serialize for Enrollment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Count(n) => serializer.serialize_u64(*n),
            Self::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

/// One study returned by a trial search for one drug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TrialRecord {
    pub drug_name: String,
    pub nct_id: String,
    pub title: String,
    pub title_link: String,
    pub status: String,
    pub start_date: String,
    pub completion_date: String,
    pub conditions: String,
    pub study_type: String,
    pub phase: String,
    pub enrollment: Enrollment,
}

impl TrialRecord {
    /// Column headers in schema order, as used by table displays and export.
    pub const COLUMNS: [&'static str; 11] = [
        "Drug Name",
        "NCT ID",
        "Title",
        "Title Link",
        "Status",
        "Start Date",
        "Completion Date",
        "Conditions",
        "Study Type",
        "Phase",
        "Enrollment",
    ];

    /// Cell values in [`Self::COLUMNS`] order.
    pub fn cells(&self) -> [String; 11] {
        [
            self.drug_name.clone(),
            self.nct_id.clone(),
            self.title.clone(),
            self.title_link.clone(),
            self.status.clone(),
            self.start_date.clone(),
            self.completion_date.clone(),
            self.conditions.clone(),
            self.study_type.clone(),
            self.phase.clone(),
            self.enrollment.to_string(),
        ]
    }

    /// Comma-split, trimmed condition tokens, empty tokens dropped.
    pub fn condition_tokens(&self) -> impl Iterator<Item = &str> {
        self.conditions
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}
