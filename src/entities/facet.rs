use std::fmt;

use serde::Serialize;

use crate::sources::rxnav::{self, RxClassQuery};

/// One category of identifier-keyed drug metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Brand,
    MechanismOfAction,
    Indication,
    TherapeuticClass,
}

impl Facet {
    pub const ALL: [Facet; 4] = [
        Facet::Brand,
        Facet::MechanismOfAction,
        Facet::Indication,
        Facet::TherapeuticClass,
    ];

    /// Header of the value column for this facet.
    pub fn value_column(self) -> &'static str {
        match self {
            Self::Brand => "Brand Name",
            Self::MechanismOfAction => "Mechanism of Action",
            Self::Indication => "Indication",
            Self::TherapeuticClass => "Therapeutic Class",
        }
    }

    /// Section title used when a facet table is displayed.
    pub fn title(self) -> &'static str {
        match self {
            Self::Brand => "Brand Names",
            Self::MechanismOfAction => "Mechanism of Action",
            Self::Indication => "Indications",
            Self::TherapeuticClass => "Therapeutic Class",
        }
    }

    /// RxClass relation for class-backed facets; `None` for brand names, which
    /// come from the related-concepts endpoint.
    pub fn class_query(self) -> Option<RxClassQuery> {
        match self {
            Self::Brand => None,
            Self::MechanismOfAction => Some(rxnav::MECHANISM_OF_ACTION),
            Self::Indication => Some(rxnav::MAY_TREAT),
            Self::TherapeuticClass => Some(rxnav::THERAPEUTIC_CLASS),
        }
    }

    pub fn has_class_type(self) -> bool {
        self.class_query().is_some()
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A single (drug, value) row of a facet table.
///
/// `class_type` is populated for class-backed facets and `None` for brands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FacetRecord {
    pub drug_name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_type: Option<String>,
}
