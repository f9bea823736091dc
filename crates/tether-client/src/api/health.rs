//! Health API.

use crate::client::TetherClient;
use crate::error::{Error, Result};
use crate::types::HealthResponse;

/// Health API client.
pub struct HealthApi {
    client: TetherClient,
}

impl HealthApi {
    pub(crate) fn new(client: TetherClient) -> Self {
        Self { client }
    }

    /// Check basic health.
    pub async fn check(&self) -> Result<HealthResponse> {
        let inner = self.client.inner();
        let url = self.client.url("global/health")?;

        let response: reqwest::Response = inner
            .http
            .get(url)
            .timeout(inner.timeout)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Error::Api {
                status: response.status().as_u16(),
                code: "health_check_failed".to_string(),
                message: "Health check failed".to_string(),
            })
        }
    }

    /// Simple connectivity check - returns true if server is reachable.
    pub async fn is_healthy(&self) -> bool {
        matches!(self.check().await, Ok(health) if health.healthy)
    }
}
