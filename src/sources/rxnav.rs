use std::borrow::Cow;

use serde::Deserialize;

use crate::error::DrugDashError;
use crate::sources::pacing::Upstream;

pub(crate) const RXNAV_BASE: &str = "https://rxnav.nlm.nih.gov/REST";
pub(crate) const RXNAV_API: &str = "rxnav";

/// A `rela` / `classTypes` pair accepted by the RxClass `byRxcui` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxClassQuery {
    pub rela: &'static str,
    pub class_types: &'static str,
}

pub const MECHANISM_OF_ACTION: RxClassQuery = RxClassQuery {
    rela: "has_mechanism_of_action",
    class_types: "MOA",
};

pub const MAY_TREAT: RxClassQuery = RxClassQuery {
    rela: "may_treat",
    class_types: "DISEASE",
};

pub const THERAPEUTIC_CLASS: RxClassQuery = RxClassQuery {
    rela: "has_therapeutic_class",
    class_types: "ATC1-4,VA",
};

/// Term type of brand-name concepts in `allrelated.json`.
pub const BRAND_NAME_TTY: &str = "BN";

pub struct RxNavClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

impl RxNavClient {
    pub fn new() -> Result<Self, DrugDashError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Borrowed(RXNAV_BASE),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String) -> Result<Self, DrugDashError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
        })
    }

    fn get(&self, url: &str) -> reqwest_middleware::RequestBuilder {
        self.client.get(url).with_extension(Upstream::RxNav)
    }

    /// Resolves a drug name to its first RxNorm concept id, `None` when RxNorm
    /// has no match.
    pub async fn rxcui(&self, name: &str) -> Result<Option<String>, DrugDashError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DrugDashError::InvalidArgument(
                "Drug name is required for an RxCUI lookup".into(),
            ));
        }

        let url = crate::sources::join_endpoint(&self.base, "rxcui.json");
        let resp: RxCuiResponse = crate::sources::get_json(
            RXNAV_API,
            self.get(&url).query(&[("name", name)]),
        )
        .await?;

        Ok(resp
            .id_group
            .and_then(|g| g.rxnorm_id.into_iter().next())
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty()))
    }

    pub async fn all_related(&self, rxcui: &str) -> Result<AllRelatedResponse, DrugDashError> {
        let rxcui = require_rxcui(rxcui)?;
        let url = crate::sources::join_endpoint(
            &self.base,
            &format!("rxcui/{rxcui}/allrelated.json"),
        );
        crate::sources::get_json(RXNAV_API, self.get(&url)).await
    }

    pub async fn classes_by_rxcui(
        &self,
        rxcui: &str,
        query: RxClassQuery,
    ) -> Result<RxClassResponse, DrugDashError> {
        let rxcui = require_rxcui(rxcui)?;
        let url = crate::sources::join_endpoint(&self.base, "rxclass/class/byRxcui.json");
        crate::sources::get_json(
            RXNAV_API,
            self.get(&url).query(&[
                ("rxcui", rxcui),
                ("rela", query.rela),
                ("classTypes", query.class_types),
            ]),
        )
        .await
    }
}

fn require_rxcui(rxcui: &str) -> Result<&str, DrugDashError> {
    let rxcui = rxcui.trim();
    if rxcui.is_empty() {
        return Err(DrugDashError::InvalidArgument("RxCUI is required".into()));
    }
    Ok(rxcui)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RxCuiResponse {
    id_group: Option<RxIdGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RxIdGroup {
    #[serde(default)]
    rxnorm_id: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllRelatedResponse {
    pub all_related_group: Option<AllRelatedGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllRelatedGroup {
    #[serde(default)]
    pub concept_group: Vec<ConceptGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptGroup {
    pub tty: Option<String>,
    #[serde(default)]
    pub concept_properties: Vec<ConceptProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConceptProperties {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxClassResponse {
    pub rxclass_drug_info_list: Option<RxClassDrugInfoList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxClassDrugInfoList {
    #[serde(default)]
    pub rxclass_drug_info: Vec<RxClassDrugInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxClassDrugInfo {
    pub rxclass_min_concept_item: Option<RxClassMinConcept>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxClassMinConcept {
    pub class_name: Option<String>,
    pub class_type: Option<String>,
}
