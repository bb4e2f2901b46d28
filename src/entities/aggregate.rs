//! Multi-drug fetch → normalize → aggregate pipeline.
//!
//! Drugs are processed in selection order and every upstream call is awaited
//! before the next is issued. Each (drug, source) call fails independently: a
//! failure becomes a [`Warning`] plus an empty contribution, never an abort.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use serde::Serialize;
use tracing::{debug, warn};

use super::FacetTable;
use super::facet::{Facet, FacetRecord};
use super::trial::TrialRecord;
use crate::error::DrugDashError;
use crate::sources::clinicaltrials::CtGovClient;
use crate::sources::rxnav::RxNavClient;
use crate::transform;

/// Result of one upstream call after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Data(T),
    Empty,
    Failed(Warning),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network error or non-2xx status.
    Transport,
    /// Body could not be decoded into the expected shape.
    Decode,
}

/// Operator-facing report of a failed upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub drug_name: String,
    pub source: String,
    pub kind: FailureKind,
    pub message: String,
}

impl Warning {
    fn from_error(drug_name: &str, source: &str, err: &DrugDashError) -> Self {
        let kind = if err.is_decode() {
            FailureKind::Decode
        } else {
            FailureKind::Transport
        };
        Self {
            drug_name: drug_name.to_string(),
            source: source.to_string(),
            kind,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Transport => write!(
                f,
                "Failed to fetch {} for {}. Error: {}",
                self.source, self.drug_name, self.message
            ),
            FailureKind::Decode => write!(
                f,
                "Unexpected error while fetching {} for {}: {}",
                self.source, self.drug_name, self.message
            ),
        }
    }
}

fn into_outcome<T>(
    drug_name: &str,
    source: &str,
    result: Result<Vec<T>, DrugDashError>,
) -> FetchOutcome<Vec<T>> {
    match result {
        Ok(rows) if rows.is_empty() => FetchOutcome::Empty,
        Ok(rows) => FetchOutcome::Data(rows),
        Err(err) => {
            let warning = Warning::from_error(drug_name, source, &err);
            warn!(drug = drug_name, source, "{warning}");
            FetchOutcome::Failed(warning)
        }
    }
}

/// Drops exact duplicate rows, keeping first occurrences in order.
pub fn dedup_rows<T: Eq + Hash + Clone>(rows: Vec<T>) -> Vec<T> {
    let mut seen: HashSet<T> = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect()
}

trait DrugKeyed {
    fn drug_name(&self) -> &str;
}

impl DrugKeyed for TrialRecord {
    fn drug_name(&self) -> &str {
        &self.drug_name
    }
}

impl DrugKeyed for FacetRecord {
    fn drug_name(&self) -> &str {
        &self.drug_name
    }
}

fn sort_by_drug<T: DrugKeyed>(rows: &mut [T]) {
    // Stable: rows of one drug keep their union order.
    rows.sort_by(|a, b| a.drug_name().cmp(b.drug_name()));
}

fn clean_selection(drugs: &[String]) -> Result<Vec<&str>, DrugDashError> {
    let selection: Vec<&str> = drugs
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .collect();
    if selection.is_empty() {
        return Err(DrugDashError::InvalidArgument(
            "Please select at least one drug to search.".into(),
        ));
    }
    Ok(selection)
}

#[derive(Debug, Clone)]
struct Collector<T> {
    rows: Vec<T>,
    warnings: Vec<Warning>,
}

impl<T> Default for Collector<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl<T> Collector<T> {
    fn absorb(&mut self, outcome: FetchOutcome<Vec<T>>) {
        match outcome {
            FetchOutcome::Data(rows) => self.rows.extend(rows),
            FetchOutcome::Empty => {}
            FetchOutcome::Failed(warning) => self.warnings.push(warning),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialAggregation {
    pub trials: FacetTable<TrialRecord>,
    pub warnings: Vec<Warning>,
}

/// The four identifier-keyed facet tables of one aggregation pass.
#[derive(Debug, Clone, Serialize)]
pub struct FacetAggregation {
    pub brand: FacetTable<FacetRecord>,
    pub mechanism_of_action: FacetTable<FacetRecord>,
    pub indication: FacetTable<FacetRecord>,
    pub therapeutic_class: FacetTable<FacetRecord>,
    pub warnings: Vec<Warning>,
}

impl FacetAggregation {
    pub fn table(&self, facet: Facet) -> &FacetTable<FacetRecord> {
        match facet {
            Facet::Brand => &self.brand,
            Facet::MechanismOfAction => &self.mechanism_of_action,
            Facet::Indication => &self.indication,
            Facet::TherapeuticClass => &self.therapeutic_class,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Aggregation {
    pub trials: TrialAggregation,
    pub facets: FacetAggregation,
}

async fn fetch_trials(client: &CtGovClient, drug: &str) -> FetchOutcome<Vec<TrialRecord>> {
    let result = client
        .search_studies(drug)
        .await
        .map(|resp| transform::trial::from_ctgov_search(drug, &resp));
    into_outcome(drug, "clinical trials", result)
}

async fn fetch_facet(
    client: &RxNavClient,
    drug: &str,
    rxcui: &str,
    facet: Facet,
) -> FetchOutcome<Vec<FacetRecord>> {
    let result = match facet.class_query() {
        None => client
            .all_related(rxcui)
            .await
            .map(|resp| transform::facet::brands_from_all_related(drug, &resp)),
        Some(query) => client
            .classes_by_rxcui(rxcui, query)
            .await
            .map(|resp| transform::facet::classes_from_rxclass(drug, &resp)),
    };
    into_outcome(drug, facet.title(), result)
}

/// Trial search for every selected drug, unioned and sorted by drug name.
pub async fn aggregate_trials(
    client: &CtGovClient,
    drugs: &[String],
) -> Result<TrialAggregation, DrugDashError> {
    let selection = clean_selection(drugs)?;

    let mut collector: Collector<TrialRecord> = Collector::default();
    for drug in selection {
        debug!(drug, "fetching clinical trials");
        collector.absorb(fetch_trials(client, drug).await);
    }

    let mut rows = collector.rows;
    sort_by_drug(&mut rows);
    Ok(TrialAggregation {
        trials: FacetTable::from_rows(rows),
        warnings: collector.warnings,
    })
}

/// Identifier lookup, then every facet, for each selected drug.
///
/// A drug without an RxCUI contributes nothing to any facet table and raises
/// no warning.
pub async fn aggregate_facets(
    client: &RxNavClient,
    drugs: &[String],
) -> Result<FacetAggregation, DrugDashError> {
    let selection = clean_selection(drugs)?;

    let mut collectors: [Collector<FacetRecord>; 4] = Default::default();
    let mut warnings = Vec::new();

    for drug in selection {
        let rxcui = match client.rxcui(drug).await {
            Ok(Some(rxcui)) => rxcui,
            Ok(None) => {
                debug!(drug, "no RxCUI found; skipping facet lookups");
                continue;
            }
            Err(err) => {
                let warning = Warning::from_error(drug, "RxCUI", &err);
                warn!(drug, "{warning}");
                warnings.push(warning);
                continue;
            }
        };

        debug!(drug, rxcui = %rxcui, "fetching drug facets");
        for (facet, collector) in Facet::ALL.into_iter().zip(collectors.iter_mut()) {
            collector.absorb(fetch_facet(client, drug, &rxcui, facet).await);
        }
    }

    let [brand, moa, indication, therapeutic] = collectors.map(|collector| {
        warnings.extend(collector.warnings);
        let mut rows = dedup_rows(collector.rows);
        sort_by_drug(&mut rows);
        FacetTable::from_rows(rows)
    });

    Ok(FacetAggregation {
        brand,
        mechanism_of_action: moa,
        indication,
        therapeutic_class: therapeutic,
        warnings,
    })
}

/// Runs the trial and facet aggregations for one selection.
pub async fn aggregate(
    ctgov: &CtGovClient,
    rxnav: &RxNavClient,
    drugs: &[String],
) -> Result<Aggregation, DrugDashError> {
    let trials = aggregate_trials(ctgov, drugs).await?;
    let facets = aggregate_facets(rxnav, drugs).await?;
    Ok(Aggregation { trials, facets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn names(drugs: &[&str]) -> Vec<String> {
        drugs.iter().map(|d| d.to_string()).collect()
    }

    fn study(nct: &str, status: &str) -> serde_json::Value {
        serde_json::json!({
            "protocolSection": {
                "identificationModule": {"nctId": nct, "briefTitle": format!("Study {nct}")},
                "statusModule": {"overallStatus": status}
            }
        })
    }

    async fn mount_studies(server: &MockServer, drug: &str, studies: Vec<serde_json::Value>) {
        Mock::given(method("GET"))
            .and(path("/studies"))
            .and(query_param("query.term", drug))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"studies": studies})),
            )
            .mount(server)
            .await;
    }

    async fn mount_rxcui(server: &MockServer, drug: &str, rxcui: Option<&str>) {
        let body = match rxcui {
            Some(id) => serde_json::json!({"idGroup": {"name": drug, "rxnormId": [id]}}),
            None => serde_json::json!({"idGroup": {"name": drug}}),
        };
        Mock::given(method("GET"))
            .and(path("/rxcui.json"))
            .and(query_param("name", drug))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_brands(server: &MockServer, rxcui: &str, brands: &[&str]) {
        let props: Vec<_> = brands
            .iter()
            .map(|b| serde_json::json!({"name": b}))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/rxcui/{rxcui}/allrelated.json")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "allRelatedGroup": {"conceptGroup": [{"tty": "BN", "conceptProperties": props}]}
            })))
            .mount(server)
            .await;
    }

    async fn mount_classes(server: &MockServer, rxcui: &str, rela: &str, classes: &[(&str, &str)]) {
        let infos: Vec<_> = classes
            .iter()
            .map(|(name, class_type)| {
                serde_json::json!({
                    "rxclassMinConceptItem": {"className": name, "classType": class_type}
                })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path("/rxclass/class/byRxcui.json"))
            .and(query_param("rxcui", rxcui))
            .and(query_param("rela", rela))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "rxclassDrugInfoList": {"rxclassDrugInfo": infos}
            })))
            .mount(server)
            .await;
    }

    async fn mount_full_drug(server: &MockServer, drug: &str, rxcui: &str, brand: &str) {
        mount_rxcui(server, drug, Some(rxcui)).await;
        mount_brands(server, rxcui, &[brand]).await;
        mount_classes(
            server,
            rxcui,
            "has_mechanism_of_action",
            &[("Cytokine Inhibitor", "MOA")],
        )
        .await;
        mount_classes(server, rxcui, "may_treat", &[("Psoriasis", "DISEASE")]).await;
        mount_classes(
            server,
            rxcui,
            "has_therapeutic_class",
            &[("IMMUNOSUPPRESSANTS", "ATC1-4")],
        )
        .await;
    }

    #[test]
    fn dedup_is_idempotent_and_keeps_first_occurrence() {
        let row = |drug: &str, value: &str| FacetRecord {
            drug_name: drug.into(),
            value: value.into(),
            class_type: Some("MOA".into()),
        };
        let rows = vec![
            row("b", "x"),
            row("a", "y"),
            row("b", "x"),
            row("a", "y"),
            row("a", "z"),
        ];
        let once = dedup_rows(rows);
        assert_eq!(once, vec![row("b", "x"), row("a", "y"), row("a", "z")]);
        assert_eq!(dedup_rows(once.clone()), once);
    }

    #[test]
    fn sort_by_drug_is_stable() {
        let row = |drug: &str, value: &str| FacetRecord {
            drug_name: drug.into(),
            value: value.into(),
            class_type: None,
        };
        let mut rows = vec![row("b", "1"), row("a", "2"), row("b", "0"), row("a", "1")];
        sort_by_drug(&mut rows);
        let order: Vec<_> = rows
            .iter()
            .map(|r| format!("{}{}", r.drug_name, r.value))
            .collect();
        assert_eq!(order, vec!["a2", "a1", "b1", "b0"]);
    }

    #[test]
    fn warning_display_names_drug_and_source() {
        let err = DrugDashError::Api {
            api: "rxnav".into(),
            message: "HTTP 500".into(),
        };
        let warning = Warning::from_error("adalimumab", "Brand Names", &err);
        assert_eq!(warning.kind, FailureKind::Transport);
        let text = warning.to_string();
        assert!(text.starts_with("Failed to fetch Brand Names for adalimumab"));
        assert!(text.contains("HTTP 500"));
    }

    #[tokio::test]
    async fn empty_selection_is_rejected_without_requests() {
        let client = CtGovClient::new_for_test("http://127.0.0.1:9".into()).unwrap();
        let err = aggregate_trials(&client, &names(&["  "])).await.unwrap_err();
        assert!(matches!(err, DrugDashError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn single_known_drug_yields_sorted_trials_with_links() {
        let server = MockServer::start().await;
        mount_studies(
            &server,
            "adalimumab",
            vec![study("NCT001", "RECRUITING"), study("NCT002", "COMPLETED")],
        )
        .await;

        let client = CtGovClient::new_for_test(server.uri()).unwrap();
        let agg = aggregate_trials(&client, &names(&["adalimumab"]))
            .await
            .unwrap();

        assert!(agg.warnings.is_empty());
        let rows = agg.trials.rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.drug_name == "adalimumab"));
        let ids: Vec<_> = rows.iter().map(|r| r.nct_id.as_str()).collect();
        assert_eq!(ids, vec!["NCT001", "NCT002"]);
        assert!(
            rows[0]
                .title_link
                .ends_with("/study/NCT001?term=NCT001&rank=1")
        );
    }

    #[tokio::test]
    async fn trials_are_sorted_by_drug_across_selection() {
        let server = MockServer::start().await;
        mount_studies(&server, "upadacitinib", vec![study("NCT100", "RECRUITING")]).await;
        mount_studies(&server, "abatacept", vec![study("NCT200", "COMPLETED")]).await;

        let client = CtGovClient::new_for_test(server.uri()).unwrap();
        let agg = aggregate_trials(&client, &names(&["upadacitinib", "abatacept"]))
            .await
            .unwrap();
        let drugs: Vec<_> = agg.trials.rows().iter().map(|r| r.drug_name.as_str()).collect();
        assert_eq!(drugs, vec!["abatacept", "upadacitinib"]);
    }

    #[tokio::test]
    async fn no_studies_anywhere_is_an_explicit_no_results() {
        let server = MockServer::start().await;
        mount_studies(&server, "madeupdrugxyz", Vec::new()).await;

        let client = CtGovClient::new_for_test(server.uri()).unwrap();
        let agg = aggregate_trials(&client, &names(&["madeupdrugxyz"]))
            .await
            .unwrap();
        assert!(agg.trials.is_no_results());
        assert!(agg.warnings.is_empty());
    }

    #[tokio::test]
    async fn trial_failure_for_one_drug_leaves_others_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/studies"))
            .and(query_param("query.term", "infliximab"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/studies"))
            .and(query_param("query.term", "etanercept"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"studies\": ["))
            .mount(&server)
            .await;
        mount_studies(&server, "golimumab", vec![study("NCT300", "RECRUITING")]).await;

        let client = CtGovClient::new_for_test(server.uri()).unwrap();
        let mixed = aggregate_trials(
            &client,
            &names(&["infliximab", "golimumab", "etanercept"]),
        )
        .await
        .unwrap();
        let alone = aggregate_trials(&client, &names(&["golimumab"]))
            .await
            .unwrap();

        assert_eq!(mixed.trials, alone.trials);
        assert_eq!(mixed.warnings.len(), 2);
        assert_eq!(mixed.warnings[0].drug_name, "infliximab");
        assert_eq!(mixed.warnings[0].kind, FailureKind::Transport);
        assert_eq!(mixed.warnings[1].drug_name, "etanercept");
        assert_eq!(mixed.warnings[1].kind, FailureKind::Decode);
        assert!(mixed.warnings[1].to_string().starts_with("Unexpected error"));
    }

    #[tokio::test]
    async fn unknown_identifier_yields_empty_facets_without_warnings() {
        let server = MockServer::start().await;
        mount_rxcui(&server, "madeupdrugxyz", None).await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let agg = aggregate_facets(&client, &names(&["madeupdrugxyz"]))
            .await
            .unwrap();

        for facet in Facet::ALL {
            assert!(agg.table(facet).is_no_results(), "{facet} should be empty");
        }
        assert!(agg.warnings.is_empty());
    }

    #[tokio::test]
    async fn facets_are_unioned_deduplicated_and_sorted() {
        let server = MockServer::start().await;
        mount_full_drug(&server, "secukinumab", "1599788", "Cosentyx").await;
        mount_full_drug(&server, "ixekizumab", "1745099", "Taltz").await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let agg = aggregate_facets(&client, &names(&["secukinumab", "ixekizumab"]))
            .await
            .unwrap();

        assert!(agg.warnings.is_empty());
        let brands: Vec<_> = agg
            .brand
            .rows()
            .iter()
            .map(|r| (r.drug_name.as_str(), r.value.as_str()))
            .collect();
        assert_eq!(brands, vec![("ixekizumab", "Taltz"), ("secukinumab", "Cosentyx")]);

        let classes = agg.therapeutic_class.rows();
        assert_eq!(classes.len(), 2);
        assert!(classes.iter().all(|r| r.value == "IMMUNOSUPPRESSANTS"));
        assert!(classes.iter().all(|r| r.class_type.as_deref() == Some("ATC1-4")));
    }

    #[tokio::test]
    async fn duplicate_class_entries_collapse_after_union() {
        let server = MockServer::start().await;
        mount_rxcui(&server, "tofacitinib", Some("1357536")).await;
        mount_brands(&server, "1357536", &["Xeljanz", "Xeljanz"]).await;
        mount_classes(
            &server,
            "1357536",
            "has_mechanism_of_action",
            &[("Janus Kinase Inhibitors", "MOA"), ("Janus Kinase Inhibitors", "MOA")],
        )
        .await;
        mount_classes(&server, "1357536", "may_treat", &[]).await;
        mount_classes(&server, "1357536", "has_therapeutic_class", &[]).await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let agg = aggregate_facets(&client, &names(&["tofacitinib"]))
            .await
            .unwrap();

        assert_eq!(agg.brand.rows().len(), 1);
        assert_eq!(agg.mechanism_of_action.rows().len(), 1);
        assert!(agg.indication.is_no_results());
        assert!(agg.therapeutic_class.is_no_results());
    }

    #[tokio::test]
    async fn facet_failure_for_one_drug_leaves_others_untouched() {
        let server = MockServer::start().await;
        mount_full_drug(&server, "ustekinumab", "847083", "Stelara").await;
        mount_rxcui(&server, "rituximab", Some("121191")).await;
        Mock::given(method("GET"))
            .and(path("/rxcui/121191/allrelated.json"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rxclass/class/byRxcui.json"))
            .and(query_param("rxcui", "121191"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rxcui.json"))
            .and(query_param("name", "natalizumab"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let mixed = aggregate_facets(
            &client,
            &names(&["rituximab", "ustekinumab", "natalizumab"]),
        )
        .await
        .unwrap();
        let alone = aggregate_facets(&client, &names(&["ustekinumab"]))
            .await
            .unwrap();

        for facet in Facet::ALL {
            assert_eq!(mixed.table(facet), alone.table(facet), "{facet} differs");
        }
        // Four facet failures for rituximab, one identifier failure for natalizumab.
        assert_eq!(mixed.warnings.len(), 5);
        assert!(
            mixed
                .warnings
                .iter()
                .any(|w| w.drug_name == "natalizumab" && w.source == "RxCUI")
        );
    }
}
