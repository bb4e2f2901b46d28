use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum DrugDashError {
    #[error("HTTP client initialization failed: {0}")]
    HttpClientInit(reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    #[error("API error from {api}: {message}")]
    Api { api: String, message: String },

    #[error("API JSON error from {api}: {source}")]
    ApiJson {
        api: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read class reference data from {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV export failed: {0}")]
    CsvWrite(#[from] csv::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DrugDashError {
    /// True when the failure came from decoding a response body rather than
    /// from the transport or the upstream status.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::ApiJson { .. } | Self::Json(_))
    }
}

#[cfg(test)]
mod tests {
    use super::DrugDashError;

    #[test]
    fn api_error_display_includes_api_name() {
        let err = DrugDashError::Api {
            api: "rxnav".to_string(),
            message: "HTTP 500".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("rxnav"));
        assert!(msg.contains("HTTP 500"));
        assert!(!err.is_decode());
    }

    #[test]
    fn api_json_error_is_decode_failure() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = DrugDashError::ApiJson {
            api: "clinicaltrials.gov".to_string(),
            source,
        };

        assert!(err.is_decode());
        assert!(err.to_string().contains("clinicaltrials.gov"));
    }

    #[test]
    fn csv_error_display_includes_path() {
        let source = csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = DrugDashError::Csv {
            path: "classes.csv".into(),
            source,
        };

        assert!(err.to_string().contains("classes.csv"));
    }
}
