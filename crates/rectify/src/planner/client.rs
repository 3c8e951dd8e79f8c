//! HTTP client for the student-information system (SIS).
//!
//! Two read-only feeds back a planning run: the availability feed (nested
//! course -> group -> session catalog) and the occupancy feed (seat counts
//! per group of one course). Both return loosely-shaped JSON; normalization
//! happens in the catalog and capacity modules, not here.

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use super::error::PlanError;

/// Configuration for the SIS client.
#[derive(Debug, Clone)]
pub struct SisConfig {
    /// Base URL of the SIS API
    pub base_url: String,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for SisConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9050".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: format!("rectify/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Client for the SIS availability and occupancy feeds.
pub struct SisClient {
    http: Client,
    config: SisConfig,
}

impl SisClient {
    pub fn new() -> Result<Self, PlanError> {
        Self::with_config(SisConfig::default())
    }

    pub fn with_config(config: SisConfig) -> Result<Self, PlanError> {
        // Validate the base URL up front so a bad deployment fails at boot
        Url::parse(&config.base_url)?;

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PlanError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { http, config })
    }

    /// Fetches the raw availability catalog for one academic period.
    pub async fn fetch_catalog(&self, period: &str) -> Result<Value, PlanError> {
        let url = format!("{}/academic/{}/availability", self.config.base_url, period);
        info!(url = %url, "fetching availability catalog");
        self.get_json(&url).await
    }

    /// Fetches raw occupancy rows for one course in one period.
    pub async fn fetch_capacity_rows(
        &self,
        period: &str,
        course_code: &str,
    ) -> Result<Value, PlanError> {
        let url = format!(
            "{}/academic/{}/occupancy/{}",
            self.config.base_url, period, course_code
        );
        self.get_json(&url).await
    }

    async fn get_json(&self, url: &str) -> Result<Value, PlanError> {
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(url = %url, status = %status, "SIS request failed");
            return Err(PlanError::UnexpectedResponse {
                message: format!("{} returned status {}", url, status),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| PlanError::MalformedPayload {
            message: format!("{}: {}", url, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_base_url_rejected_at_construction() {
        let config = SisConfig {
            base_url: "not a url".to_string(),
            ..SisConfig::default()
        };
        assert!(matches!(
            SisClient::with_config(config),
            Err(PlanError::UrlError { .. })
        ));
    }

    #[test]
    fn test_default_config_builds() {
        assert!(SisClient::new().is_ok());
    }
}
