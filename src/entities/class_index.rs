//! Therapeutic-class membership index.
//!
//! Built once from a two-column reference table (`Therapeutic Class`,
//! `Drug Name`) and shared read-only for the rest of the process. The crate
//! embeds a default table; a CSV path with the same headers can replace it.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::DrugDashError;

const EMBEDDED_CLASSES: &str = include_str!("../../data/therapeutic_classes.csv");
const EMBEDDED_ORIGIN: &str = "<embedded therapeutic_classes.csv>";

#[derive(Debug, Deserialize)]
struct ClassMembershipRow {
    #[serde(rename = "Therapeutic Class")]
    class: String,
    #[serde(rename = "Drug Name")]
    drug: String,
}

/// Immutable label → drug-name-set lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMembershipIndex {
    members: BTreeMap<String, BTreeSet<String>>,
}

impl ClassMembershipIndex {
    /// Loads the reference table bundled with the crate.
    pub fn embedded() -> Result<Self, DrugDashError> {
        Self::from_reader(EMBEDDED_CLASSES.as_bytes(), Path::new(EMBEDDED_ORIGIN))
    }

    pub fn from_path(path: &Path) -> Result<Self, DrugDashError> {
        let file = std::fs::File::open(path).map_err(|e| DrugDashError::Csv {
            path: path.to_path_buf(),
            source: csv::Error::from(e),
        })?;
        Self::from_reader(file, path)
    }

    /// Parses CSV rows from `reader`; `origin` only labels errors.
    pub fn from_reader<R: Read>(reader: R, origin: &Path) -> Result<Self, DrugDashError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut members: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for result in reader.deserialize::<ClassMembershipRow>() {
            let row = result.map_err(|source| DrugDashError::Csv {
                path: PathBuf::from(origin),
                source,
            })?;
            if row.class.is_empty() || row.drug.is_empty() {
                continue;
            }
            members.entry(row.class).or_default().insert(row.drug);
        }

        debug!(
            origin = %origin.display(),
            classes = members.len(),
            "loaded class membership index"
        );
        Ok(Self { members })
    }

    pub fn from_pairs<I, L, D>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, D)>,
        L: Into<String>,
        D: Into<String>,
    {
        let mut members: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (label, drug) in pairs {
            members.entry(label.into()).or_default().insert(drug.into());
        }
        Self { members }
    }

    /// Drug names recorded under `label`, if the label is known.
    pub fn members(&self, label: &str) -> Option<&BTreeSet<String>> {
        self.members.get(label)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
}
