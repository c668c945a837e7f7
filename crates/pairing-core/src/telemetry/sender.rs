//! HTTP delivery of telemetry batches

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{CoreError, Result};

/// Default request timeout for [`ReqwestSender`]
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a delivered request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendResponse {
    pub ok: bool,
    pub status: u16,
}

/// One-shot POST of a JSON body
#[async_trait]
pub trait TelemetrySender: Send + Sync {
    async fn send(&self, url: &str, body: &Value) -> Result<SendResponse>;
}

/// [`TelemetrySender`] backed by `reqwest`
pub struct ReqwestSender {
    client: Client,
}

impl ReqwestSender {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_SEND_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::HttpError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TelemetrySender for ReqwestSender {
    async fn send(&self, url: &str, body: &Value) -> Result<SendResponse> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| CoreError::HttpError(e.to_string()))?;

        let status = response.status();
        debug!("Telemetry endpoint responded with {}", status);

        Ok(SendResponse {
            ok: status.is_success(),
            status: status.as_u16(),
        })
    }
}
