//! Source clients and shared HTTP utilities for the upstream drug and trial APIs.

use std::sync::OnceLock;

use reqwest::header::HeaderValue;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use tracing::warn;

use crate::error::DrugDashError;

pub(crate) mod clinicaltrials;
pub(crate) mod pacing;
pub(crate) mod rxnav;

const ERROR_BODY_MAX_BYTES: usize = 2048;
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

static HTTP_CLIENT: OnceLock<ClientWithMiddleware> = OnceLock::new();

pub(crate) fn join_endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Returns the shared HTTP client.
///
/// Every call is a single attempt with the transport's default timeouts.
/// Requests tagged with a [`pacing::Upstream`] are spaced by
/// [`pacing::PacingMiddleware`].
pub(crate) fn shared_client() -> Result<ClientWithMiddleware, DrugDashError> {
    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let base_client = reqwest::Client::builder()
        .user_agent(concat!("drugdash/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(DrugDashError::HttpClientInit)?;

    let client = ClientBuilder::new(base_client)
        .with(pacing::PacingMiddleware::default())
        .build();

    match HTTP_CLIENT.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => HTTP_CLIENT.get().cloned().ok_or_else(|| DrugDashError::Api {
            api: "http-client".into(),
            message: "Shared HTTP client initialization race".into(),
        }),
    }
}

pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    let full = String::from_utf8_lossy(bytes);

    let truncated: &str = if full.len() > ERROR_BODY_MAX_BYTES {
        let mut end = ERROR_BODY_MAX_BYTES;
        while end > 0 && !full.is_char_boundary(end) {
            end -= 1;
        }
        &full[..end]
    } else {
        full.as_ref()
    };

    let mut s = truncated.trim().replace(['\n', '\r', '\t'], " ");
    if full.len() > ERROR_BODY_MAX_BYTES {
        s.push_str(" …");
    }
    s
}

pub(crate) fn ensure_json_content_type(
    api: &str,
    content_type: Option<&HeaderValue>,
    body: &[u8],
) -> Result<(), DrugDashError> {
    let Some(content_type) = content_type else {
        return Ok(());
    };

    let raw = match content_type.to_str() {
        Ok(v) => v.trim(),
        Err(_) => {
            warn!(
                source = api,
                "Response content-type header was not valid UTF-8; attempting JSON parse"
            );
            return Ok(());
        }
    };
    if raw.is_empty() {
        return Ok(());
    }

    let media_type = raw
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .to_ascii_lowercase();
    if matches!(media_type.as_str(), "text/html" | "application/xhtml+xml") {
        return Err(DrugDashError::Api {
            api: api.to_string(),
            message: format!(
                "Unexpected HTML response (content-type: {raw}): {}",
                body_excerpt(body)
            ),
        });
    }

    Ok(())
}

pub(crate) async fn read_limited_body(
    mut resp: reqwest::Response,
    api: &str,
) -> Result<Vec<u8>, DrugDashError> {
    let mut body: Vec<u8> = Vec::new();

    while let Some(chunk) = resp.chunk().await? {
        let next_len = body.len().saturating_add(chunk.len());
        if next_len > DEFAULT_MAX_BODY_BYTES {
            return Err(DrugDashError::Api {
                api: api.to_string(),
                message: format!("Response body exceeded {DEFAULT_MAX_BODY_BYTES} bytes"),
            });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

/// Sends one GET and decodes the JSON body.
///
/// Non-2xx statuses become [`DrugDashError::Api`], undecodable bodies become
/// [`DrugDashError::ApiJson`].
pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    api: &str,
    req: reqwest_middleware::RequestBuilder,
) -> Result<T, DrugDashError> {
    let resp = req.send().await?;
    let status = resp.status();
    let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE).cloned();
    let bytes = read_limited_body(resp, api).await?;
    if !status.is_success() {
        let excerpt = body_excerpt(&bytes);
        return Err(DrugDashError::Api {
            api: api.to_string(),
            message: format!("HTTP {status}: {excerpt}"),
        });
    }
    ensure_json_content_type(api, content_type.as_ref(), &bytes)?;
    serde_json::from_slice(&bytes).map_err(|source| DrugDashError::ApiJson {
        api: api.to_string(),
        source,
    })
}
