//! Console configuration.
//!
//! Loaded from a YAML file and overridable through the environment:
//! - `RULEBOARD_SERVICE_URL` replaces `service_url`
//! - `RULEBOARD_SERVICE_TOKEN` replaces `auth.token`

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RuleboardError};

pub const SERVICE_URL_ENV: &str = "RULEBOARD_SERVICE_URL";
pub const SERVICE_TOKEN_ENV: &str = "RULEBOARD_SERVICE_TOKEN";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the rule-collection service
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Bearer token for the service, if it requires one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<ServiceAuth>,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Quiet window for search input in milliseconds (default: 400)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Default rows per page (default: 25)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Bounded page size used when resolving conflicting addresses to row
    /// ids during conflict resolution (default: 1000)
    #[serde(default = "default_resolve_scan_limit")]
    pub resolve_scan_limit: u32,
}

fn default_service_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    400
}

fn default_page_size() -> u32 {
    25
}

fn default_resolve_scan_limit() -> u32 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            auth: None,
            request_timeout: default_request_timeout(),
            debounce_ms: default_debounce_ms(),
            page_size: default_page_size(),
            resolve_scan_limit: default_resolve_scan_limit(),
        }
    }
}

/// Service authentication
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceAuth {
    pub token: String,
}

impl fmt::Debug for ServiceAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAuth")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Config {
    /// Load from a YAML file, then apply environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RuleboardError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config: Config = serde_yaml_ng::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides; for setups with no config file.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var(SERVICE_URL_ENV)
            && !url.is_empty()
        {
            self.service_url = url;
        }
        if let Ok(token) = env::var(SERVICE_TOKEN_ENV)
            && !token.is_empty()
        {
            self.auth = Some(ServiceAuth { token });
        }
    }

    fn validate(&self) -> Result<()> {
        if self.service_url.is_empty() {
            return Err(RuleboardError::Config("service_url is empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(RuleboardError::Config("page_size must be >= 1".to_string()));
        }
        if self.resolve_scan_limit == 0 {
            return Err(RuleboardError::Config(
                "resolve_scan_limit must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serial_test::serial;
    use tempfile::NamedTempFile;

    use super::*;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write config");
        file
    }

    #[test]
    #[serial]
    fn test_load_minimal() {
        let file = write_config("service_url: http://rules.internal:9000\n");
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.service_url, "http://rules.internal:9000");
        assert_eq!(config.request_timeout, 30);
        assert_eq!(config.debounce_ms, 400);
        assert_eq!(config.page_size, 25);
        assert!(config.auth.is_none());
    }

    #[test]
    #[serial]
    fn test_load_full() {
        let file = write_config(
            "service_url: http://rules.internal:9000\n\
             auth:\n  token: sekrit\n\
             request_timeout: 10\n\
             debounce_ms: 300\n\
             page_size: 50\n\
             resolve_scan_limit: 500\n",
        );
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.page_size, 50);
        assert_eq!(config.resolve_scan_limit, 500);
        assert_eq!(config.auth.unwrap().token, "sekrit");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let file = write_config("service_url: http://stale.example\n");
        unsafe {
            env::set_var(SERVICE_URL_ENV, "http://fresh.example");
            env::set_var(SERVICE_TOKEN_ENV, "env-token");
        }
        let config = Config::load_from(file.path()).unwrap();
        unsafe {
            env::remove_var(SERVICE_URL_ENV);
            env::remove_var(SERVICE_TOKEN_ENV);
        }
        assert_eq!(config.service_url, "http://fresh.example");
        assert_eq!(config.auth.unwrap().token, "env-token");
    }

    #[test]
    #[serial]
    fn test_missing_file_is_config_error() {
        let result = Config::load_from("/nonexistent/ruleboard.yaml");
        assert!(matches!(result, Err(RuleboardError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_zero_page_size_rejected() {
        let file = write_config("page_size: 0\n");
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_auth_debug_redacted() {
        let auth = ServiceAuth {
            token: "sekrit".to_string(),
        };
        let debug = format!("{auth:?}");
        assert!(!debug.contains("sekrit"));
        assert!(debug.contains("REDACTED"));
    }
}
