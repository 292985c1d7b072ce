use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::db::entities::application;

/// Request timeout for a single probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Failed to build health check request: {0}")]
    InvalidRequest(String),
}

/// Result of probing one application.
///
/// A transport failure (DNS, TLS, refused connection, timeout) is reported
/// with `status_code` 0 and the error text in `detail`, never as an `Err`.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub healthy: bool,
    pub status_code: u16,
    pub detail: String,
    pub response_time_ms: Option<i32>,
}

impl CheckOutcome {
    pub fn is_transport_failure(&self) -> bool {
        self.status_code == 0
    }
}

/// Probes application URLs with a bounded per-request timeout.
pub struct HttpHealthChecker {
    client: reqwest::Client,
}

impl Default for HttpHealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpHealthChecker {
    pub fn new() -> Self {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap(); // Should not fail with default settings
        Self { client }
    }

    /// Issues one GET against the application's effective monitor URL and
    /// classifies the result. Healthy means the transport call succeeded and
    /// the status code equals the application's `expected_http_code`.
    pub async fn check(&self, application: &application::Model) -> Result<CheckOutcome, CheckError> {
        let url = application.effective_monitor_url();

        let request = self
            .client
            .get(url)
            .build()
            .map_err(|e| CheckError::InvalidRequest(e.to_string()))?;

        let start_time = Instant::now();
        let result = self.client.execute(request).await;
        let response_time_ms = start_time.elapsed().as_millis() as i32;

        let outcome = match result {
            Ok(response) => {
                let status = response.status();
                CheckOutcome {
                    healthy: i32::from(status.as_u16()) == application.expected_http_code,
                    status_code: status.as_u16(),
                    detail: status.to_string(),
                    response_time_ms: Some(response_time_ms),
                }
            }
            Err(e) => {
                let detail = if e.is_timeout() {
                    "Request timed out".to_string()
                } else {
                    e.to_string()
                };
                CheckOutcome {
                    healthy: false,
                    status_code: 0,
                    detail,
                    response_time_ms: None,
                }
            }
        };

        debug!(
            application_id = application.id,
            healthy = outcome.healthy,
            status_code = outcome.status_code,
            "Health check completed."
        );

        Ok(outcome)
    }
}
