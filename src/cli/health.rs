use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::entities::class_index::ClassMembershipIndex;
use crate::error::DrugDashError;
use crate::sources::{clinicaltrials, join_endpoint, rxnav};

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthRow {
    pub api: String,
    pub status: String,
    pub latency: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    pub rows: Vec<HealthRow>,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# drugdash Health Check\n\n");
        out.push_str("| API | Status | Latency |\n");
        out.push_str("|-----|--------|---------|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                row.api, row.status, row.latency
            ));
        }
        out.push_str(&format!(
            "\nStatus: {}/{} checks healthy\n",
            self.healthy, self.total
        ));
        out
    }
}

async fn check_one(client: &reqwest::Client, api: &str, url: &str) -> HealthRow {
    let start = Instant::now();
    let resp = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await;

    match resp {
        Ok(resp) => {
            let status = resp.status();
            let elapsed = start.elapsed().as_millis();
            if status.is_success() {
                HealthRow {
                    api: api.to_string(),
                    status: "ok".into(),
                    latency: format!("{elapsed}ms"),
                }
            } else {
                HealthRow {
                    api: api.to_string(),
                    status: "error".into(),
                    latency: format!("{elapsed}ms (HTTP {})", status.as_u16()),
                }
            }
        }
        Err(err) => {
            let reason = if err.is_timeout() {
                "timeout"
            } else if err.is_connect() {
                "connect"
            } else {
                "error"
            };
            HealthRow {
                api: api.to_string(),
                status: "error".into(),
                latency: reason.into(),
            }
        }
    }
}

fn health_http_client() -> Result<reqwest::Client, DrugDashError> {
    static HEALTH_HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

    if let Some(client) = HEALTH_HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .user_agent(concat!("drugdash/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(DrugDashError::HttpClientInit)?;

    match HEALTH_HTTP_CLIENT.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => HEALTH_HTTP_CLIENT
            .get()
            .cloned()
            .ok_or_else(|| DrugDashError::Api {
                api: "health".into(),
                message: "Health HTTP client initialization race".into(),
            }),
    }
}

fn check_class_index() -> HealthRow {
    let start = Instant::now();
    match ClassMembershipIndex::embedded() {
        Ok(index) => HealthRow {
            api: format!("Class index ({} classes)", index.len()),
            status: "ok".into(),
            latency: format!("{}ms", start.elapsed().as_millis()),
        },
        Err(err) => HealthRow {
            api: "Class index".into(),
            status: "error".into(),
            latency: err.to_string(),
        },
    }
}

fn probe_urls(ctgov_base: &str, rxnav_base: &str) -> [(&'static str, String); 3] {
    [
        (
            "ClinicalTrials.gov",
            join_endpoint(ctgov_base, "studies?query.term=adalimumab&pageSize=1"),
        ),
        (
            "RxNorm",
            join_endpoint(rxnav_base, "rxcui.json?name=adalimumab"),
        ),
        (
            "RxClass",
            join_endpoint(
                rxnav_base,
                "rxclass/class/byRxcui.json?rxcui=327361&rela=may_treat&classTypes=DISEASE",
            ),
        ),
    ]
}

async fn check_with(
    client: &reqwest::Client,
    ctgov_base: &str,
    rxnav_base: &str,
    apis_only: bool,
) -> HealthReport {
    let mut rows = Vec::new();
    for (api, url) in probe_urls(ctgov_base, rxnav_base) {
        rows.push(check_one(client, api, &url).await);
    }
    if !apis_only {
        rows.push(check_class_index());
    }
    let healthy = rows.iter().filter(|r| r.status == "ok").count();
    HealthReport {
        healthy,
        total: rows.len(),
        rows,
    }
}

/// Runs one connectivity probe per upstream API, one at a time, plus a load
/// check of the embedded class index.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be created.
pub async fn check(apis_only: bool) -> Result<HealthReport, DrugDashError> {
    let client = health_http_client()?;
    Ok(check_with(
        &client,
        clinicaltrials::CTGOV_BASE,
        rxnav::RXNAV_BASE,
        apis_only,
    )
    .await)
}
