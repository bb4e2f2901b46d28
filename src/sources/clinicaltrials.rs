use std::borrow::Cow;

use serde::Deserialize;

use crate::error::DrugDashError;
use crate::sources::pacing::Upstream;

pub(crate) const CTGOV_BASE: &str = "https://clinicaltrials.gov/api/v2";
pub(crate) const CTGOV_API: &str = "clinicaltrials.gov";

/// Fixed page size; only the first page is ever requested.
pub(crate) const CTGOV_PAGE_SIZE: u32 = 100;

pub struct CtGovClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

impl CtGovClient {
    pub fn new() -> Result<Self, DrugDashError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Borrowed(CTGOV_BASE),
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
        self.client.get(url).with_extension(Upstream::ClinicalTrials)
    }

    /// Full-text study search for one drug name.
    pub async fn search_studies(&self, drug: &str) -> Result<CtGovSearchResponse, DrugDashError> {
        let drug = drug.trim();
        if drug.is_empty() {
            return Err(DrugDashError::InvalidArgument(
                "Drug name is required for a trial search".into(),
            ));
        }

        let url = crate::sources::join_endpoint(&self.base, "studies");
        let page_size = CTGOV_PAGE_SIZE.to_string();
        crate::sources::get_json(
            CTGOV_API,
            self.get(&url).query(&[
                ("query.term", drug),
                ("pageSize", page_size.as_str()),
                ("format", "json"),
            ]),
        )
        .await
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovSearchResponse {
    #[serde(default)]
    pub studies: Vec<CtGovStudy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovStudy {
    pub protocol_section: Option<CtGovProtocolSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovProtocolSection {
    pub identification_module: Option<CtGovIdentificationModule>,
    pub status_module: Option<CtGovStatusModule>,
    pub conditions_module: Option<CtGovConditionsModule>,
    pub design_module: Option<CtGovDesignModule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovIdentificationModule {
    pub nct_id: Option<String>,
    pub brief_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovStatusModule {
    pub overall_status: Option<String>,
    pub start_date_struct: Option<CtGovDateStruct>,
    pub completion_date_struct: Option<CtGovDateStruct>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CtGovDateStruct {
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CtGovConditionsModule {
    #[serde(default)]
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovDesignModule {
    pub study_type: Option<String>,
    #[serde(default)]
    pub phases: Vec<String>,
    pub enrollment_info: Option<CtGovEnrollmentInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CtGovEnrollmentInfo {
    pub count: Option<u64>,
}
