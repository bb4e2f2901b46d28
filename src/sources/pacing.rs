//! Fixed minimum spacing between consecutive calls to the same upstream API.
//!
//! Clients tag each request with an [`Upstream`] extension; untagged requests
//! are sent immediately.

use std::sync::Arc;
use std::time::Duration;

use http::Extensions;
use reqwest_middleware::{Middleware, Next};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Upstream {
    ClinicalTrials,
    RxNav,
}

impl Upstream {
    /// NLM allows 20 requests per second against RxNav.
    pub(crate) fn min_interval(self) -> Duration {
        match self {
            Self::ClinicalTrials => Duration::from_millis(250),
            Self::RxNav => Duration::from_millis(50),
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::ClinicalTrials => 0,
            Self::RxNav => 1,
        }
    }
}

/// Earliest instant the next call to each upstream may go out.
#[derive(Debug, Default)]
pub(crate) struct Pacer {
    next_allowed: [Mutex<Option<Instant>>; 2],
}

impl Pacer {
    pub(crate) async fn wait(&self, upstream: Upstream) {
        let mut next_allowed = self.next_allowed[upstream.slot()].lock().await;
        if let Some(at) = *next_allowed {
            sleep_until(at).await;
        }
        *next_allowed = Some(Instant::now() + upstream.min_interval());
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PacingMiddleware {
    pacer: Arc<Pacer>,
}

#[async_trait::async_trait]
impl Middleware for PacingMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        if let Some(upstream) = extensions.get::<Upstream>().copied() {
            self.pacer.wait(upstream).await;
        }
        next.run(req, extensions).await
    }
}
