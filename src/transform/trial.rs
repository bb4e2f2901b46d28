use crate::entities::NOT_AVAILABLE;
use crate::entities::trial::{Enrollment, TrialRecord};
use crate::sources::clinicaltrials::{CtGovSearchResponse, CtGovStudy};

const STUDY_LINK_BASE: &str = "https://clinicaltrials.gov/study";

fn or_na(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

fn join_display(values: &[String]) -> String {
    values
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn title_link(nct_id: &str) -> String {
    format!("{STUDY_LINK_BASE}/{nct_id}?term={nct_id}&rank=1")
}

pub fn from_ctgov_study(drug_name: &str, study: &CtGovStudy) -> TrialRecord {
    let protocol = study.protocol_section.as_ref();
    let ident = protocol.and_then(|p| p.identification_module.as_ref());
    let status = protocol.and_then(|p| p.status_module.as_ref());
    let conditions = protocol.and_then(|p| p.conditions_module.as_ref());
    let design = protocol.and_then(|p| p.design_module.as_ref());

    let nct_id = or_na(ident.and_then(|m| m.nct_id.as_deref()));
    let title_link = title_link(&nct_id);

    TrialRecord {
        drug_name: drug_name.to_string(),
        title: or_na(ident.and_then(|m| m.brief_title.as_deref())),
        title_link,
        nct_id,
        status: or_na(status.and_then(|m| m.overall_status.as_deref())),
        start_date: or_na(
            status
                .and_then(|m| m.start_date_struct.as_ref())
                .and_then(|d| d.date.as_deref()),
        ),
        completion_date: or_na(
            status
                .and_then(|m| m.completion_date_struct.as_ref())
                .and_then(|d| d.date.as_deref()),
        ),
        conditions: conditions
            .map(|m| join_display(&m.conditions))
            .unwrap_or_default(),
        study_type: or_na(design.and_then(|m| m.study_type.as_deref())),
        phase: design.map(|m| join_display(&m.phases)).unwrap_or_default(),
        enrollment: design
            .and_then(|m| m.enrollment_info.as_ref())
            .and_then(|e| e.count)
            .map_or(Enrollment::NotAvailable, Enrollment::Count),
    }
}

/// One record per study, in response order.
pub fn from_ctgov_search(drug_name: &str, resp: &CtGovSearchResponse) -> Vec<TrialRecord> {
    resp.studies
        .iter()
        .map(|study| from_ctgov_study(drug_name, study))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: serde_json::Value) -> CtGovSearchResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn full_study_maps_every_column() {
        let resp = parse(serde_json::json!({
            "studies": [{
                "protocolSection": {
                    "identificationModule": {"nctId": "NCT001", "briefTitle": "Adalimumab in RA"},
                    "statusModule": {
                        "overallStatus": "RECRUITING",
                        "startDateStruct": {"date": "2021-03"},
                        "completionDateStruct": {"date": "2024-12-31"}
                    },
                    "conditionsModule": {"conditions": ["Asthma", "Eczema"]},
                    "designModule": {
                        "studyType": "INTERVENTIONAL",
                        "phases": ["PHASE2", "PHASE3"],
                        "enrollmentInfo": {"count": 0}
                    }
                }
            }]
        }));

        let rows = from_ctgov_search("adalimumab", &resp);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.drug_name, "adalimumab");
        assert_eq!(row.nct_id, "NCT001");
        assert_eq!(row.title, "Adalimumab in RA");
        assert_eq!(
            row.title_link,
            "https://clinicaltrials.gov/study/NCT001?term=NCT001&rank=1"
        );
        assert_eq!(row.status, "RECRUITING");
        assert_eq!(row.start_date, "2021-03");
        assert_eq!(row.completion_date, "2024-12-31");
        assert_eq!(row.conditions, "Asthma, Eczema");
        assert_eq!(row.study_type, "INTERVENTIONAL");
        assert_eq!(row.phase, "PHASE2, PHASE3");
        assert_eq!(row.enrollment, Enrollment::Count(0));
    }

    #[test]
    fn absent_modules_fall_back_to_sentinels() {
        let shapes = [
            serde_json::json!({"studies": [{}]}),
            serde_json::json!({"studies": [{"protocolSection": {}}]}),
            serde_json::json!({"studies": [{"protocolSection": {
                "identificationModule": {},
                "statusModule": {"startDateStruct": {}},
                "designModule": {"enrollmentInfo": {}}
            }}]}),
        ];

        for shape in shapes {
            let rows = from_ctgov_search("tofacitinib", &parse(shape));
            assert_eq!(rows.len(), 1);
            let row = &rows[0];
            assert_eq!(row.drug_name, "tofacitinib");
            assert_eq!(row.nct_id, NOT_AVAILABLE);
            assert_eq!(row.title, NOT_AVAILABLE);
            assert_eq!(row.status, NOT_AVAILABLE);
            assert_eq!(row.start_date, NOT_AVAILABLE);
            assert_eq!(row.completion_date, NOT_AVAILABLE);
            assert_eq!(row.study_type, NOT_AVAILABLE);
            assert_eq!(row.conditions, "");
            assert_eq!(row.phase, "");
            assert_eq!(row.enrollment, Enrollment::NotAvailable);
            assert!(row.title_link.ends_with("/N/A?term=N/A&rank=1"));
        }
    }

    #[test]
    fn studies_keep_response_order() {
        let resp = parse(serde_json::json!({
            "studies": [
                {"protocolSection": {"identificationModule": {"nctId": "NCT002"}}},
                {"protocolSection": {"identificationModule": {"nctId": "NCT001"}}}
            ]
        }));
        let ids: Vec<_> = from_ctgov_search("x", &resp)
            .into_iter()
            .map(|r| r.nct_id)
            .collect();
        assert_eq!(ids, vec!["NCT002", "NCT001"]);
    }
}
