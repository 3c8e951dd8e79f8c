//! Runtime configuration, environment-driven with sensible defaults.

use std::env;
use std::time::Duration;

use crate::planner::SisConfig;

#[derive(Debug, Clone)]
pub struct RectifyConfig {
    /// Base URL of the SIS API
    pub sis_base_url: String,
    /// Address the portal backend listens on
    pub bind_addr: String,
    /// Path to the request store
    pub db_path: String,
    /// SIS connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// SIS per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            sis_base_url: "http://localhost:9050".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            db_path: "rectify.db".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl RectifyConfig {
    /// Builds the configuration from `RECTIFY_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sis_base_url: env_or("RECTIFY_SIS_BASE_URL", defaults.sis_base_url),
            bind_addr: env_or("RECTIFY_BIND_ADDR", defaults.bind_addr),
            db_path: env_or("RECTIFY_DB_PATH", defaults.db_path),
            connect_timeout_secs: env_or_parsed(
                "RECTIFY_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            ),
            request_timeout_secs: env_or_parsed(
                "RECTIFY_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            ),
        }
    }

    pub fn sis_config(&self) -> SisConfig {
        SisConfig {
            base_url: self.sis_base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..SisConfig::default()
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_or_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RectifyConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_sis_config_carries_timeouts() {
        let config = RectifyConfig {
            request_timeout_secs: 5,
            ..RectifyConfig::default()
        };
        assert_eq!(config.sis_config().request_timeout, Duration::from_secs(5));
    }
}
