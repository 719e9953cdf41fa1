//! Host-level settings for synchronization and networking.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Plugin settings, loadable from TOML.
///
/// ```toml
/// isAutoSyncEnabled = true
/// autoSyncDelayMs = 1000
/// batchSize = 100
///
/// [http]
/// requestTimeoutSecs = 300
/// maxIdlePerHost = 100
/// maxConcurrentRequests = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Synchronize saved files without a user action.
    pub is_auto_sync_enabled: bool,
    /// Pause between two automatic synchronizations.
    pub auto_sync_delay_ms: u64,
    /// Number of items requested per page by fetch providers.
    pub batch_size: usize,
    /// HTTP client limits.
    pub http: HttpSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            is_auto_sync_enabled: false,
            auto_sync_delay_ms: 1000,
            batch_size: 100,
            http: HttpSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML, filling missing keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed input or invalid values.
    pub fn from_toml(input: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(input).map_err(|e| Error::configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::validation("batchSize must be greater than 0"));
        }
        if self.http.max_concurrent_requests == 0 {
            return Err(Error::validation(
                "http.maxConcurrentRequests must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Delay between automatic synchronizations.
    #[must_use]
    pub const fn auto_sync_delay(&self) -> Duration {
        Duration::from_millis(self.auto_sync_delay_ms)
    }
}

/// Limits applied to each of the strict and relaxed HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpSettings {
    /// Connect and read timeout.
    pub request_timeout_secs: u64,
    /// Idle pooled connections kept per host.
    pub max_idle_per_host: usize,
    /// Idle pooled connection lifetime.
    pub idle_timeout_secs: u64,
    /// Requests in flight per client.
    pub max_concurrent_requests: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 300,
            max_idle_per_host: 100,
            idle_timeout_secs: 300,
            max_concurrent_requests: 100,
        }
    }
}

impl HttpSettings {
    /// Connect and read timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Idle pooled connection lifetime.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
