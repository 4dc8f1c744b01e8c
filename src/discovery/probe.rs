//! Liveness probing.
//!
//! # Responsibilities
//! - GET the clear-text localhost URL of a site
//! - Present the site's server name as Host so the right server block answers
//! - Classify the outcome
//!
//! # Design Decisions
//! - 2xx and 3xx are alive; redirects are not followed
//! - Connection errors, timeouts and other statuses are inactive
//! - Never returns `Unknown`; that state belongs to callers that lost contact

use std::time::Duration;

use reqwest::header::HOST;
use serde::Serialize;

use crate::observability::metrics;

/// Probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Active,
    Inactive,
    Unknown,
}

impl Liveness {
    pub fn is_active(self) -> bool {
        self == Liveness::Active
    }
}

/// HTTP client configured for liveness checks.
#[derive(Debug, Clone)]
pub struct Prober {
    client: reqwest::Client,
}

impl Prober {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .no_proxy()
            .user_agent("nginx-manager-probe")
            .build()?;
        Ok(Self { client })
    }

    /// Probe `url`, sending `host` as the Host header when known.
    pub async fn probe(&self, url: &str, host: Option<&str>) -> Liveness {
        let mut request = self.client.get(url);
        if let Some(host) = host {
            request = request.header(HOST, host);
        }

        let liveness = match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() || status.is_redirection() {
                    Liveness::Active
                } else {
                    tracing::debug!(url = %url, status = %status, "Probe failed: non-success status");
                    Liveness::Inactive
                }
            }
            Err(e) if e.is_timeout() => {
                tracing::debug!(url = %url, "Probe failed: timeout");
                Liveness::Inactive
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Probe failed: connection error");
                Liveness::Inactive
            }
        };

        metrics::record_probe(liveness);
        liveness
    }
}
