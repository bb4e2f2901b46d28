//! Normalized drug records and the workflows that aggregate, filter and enrich them.

pub mod aggregate;
pub mod class_index;
pub mod facet;
pub mod filter;
pub mod reference;
pub mod tooltip;
pub mod trial;

/// Placeholder for a field the upstream response did not carry.
pub const NOT_AVAILABLE: &str = "N/A";

/// Outcome of aggregating one table across a drug selection.
///
/// `NoResults` is distinct from an empty, not-yet-run table: it means every
/// selected drug was queried and none produced a row.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", content = "rows", rename_all = "snake_case")]
pub enum FacetTable<T> {
    Rows(Vec<T>),
    NoResults,
}

impl<T> FacetTable<T> {
    pub(crate) fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            Self::NoResults
        } else {
            Self::Rows(rows)
        }
    }

    pub fn rows(&self) -> &[T] {
        match self {
            Self::Rows(rows) => rows,
            Self::NoResults => &[],
        }
    }

    pub fn is_no_results(&self) -> bool {
        matches!(self, Self::NoResults)
    }
}
