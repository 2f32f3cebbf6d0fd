//! Global configuration parsing and validation.
//!
//! All timing thresholds of the coordination layer are deployment
//! tunables loaded from a TOML file. Every field carries a default so an
//! empty configuration produces a working single-node deployment.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

use crate::{AppError, Result};

/// Liveness monitoring thresholds (milliseconds).
///
/// Classification cutoffs must be ordered: a peer is `Active` up to
/// `standby_threshold_ms`, `Standby` up to `inactive_threshold_ms`, and
/// `Inactive` beyond that.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LivenessConfig {
    /// Minimum elapsed time since the last sign of life before a fresh
    /// probe is issued.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    /// Elapsed-time cutoff for the `Active` → `Standby` transition.
    #[serde(default = "default_standby_threshold_ms")]
    pub standby_threshold_ms: u64,
    /// Elapsed-time cutoff for the `Standby` → `Inactive` transition.
    #[serde(default = "default_inactive_threshold_ms")]
    pub inactive_threshold_ms: u64,
    /// How often the classification cycle runs.
    #[serde(default = "default_check_period_ms")]
    pub check_period_ms: u64,
}

fn default_ping_interval_ms() -> u64 {
    500
}

fn default_standby_threshold_ms() -> u64 {
    5000
}

fn default_inactive_threshold_ms() -> u64 {
    15_000
}

fn default_check_period_ms() -> u64 {
    1000
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: default_ping_interval_ms(),
            standby_threshold_ms: default_standby_threshold_ms(),
            inactive_threshold_ms: default_inactive_threshold_ms(),
            check_period_ms: default_check_period_ms(),
        }
    }
}

impl LivenessConfig {
    /// Probe cadence floor as a [`Duration`].
    #[must_use]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    /// Standby cutoff as a [`Duration`].
    #[must_use]
    pub fn standby_threshold(&self) -> Duration {
        Duration::from_millis(self.standby_threshold_ms)
    }

    /// Inactive cutoff as a [`Duration`].
    #[must_use]
    pub fn inactive_threshold(&self) -> Duration {
        Duration::from_millis(self.inactive_threshold_ms)
    }

    /// Classification cycle period as a [`Duration`].
    #[must_use]
    pub fn check_period(&self) -> Duration {
        Duration::from_millis(self.check_period_ms)
    }
}

/// Session orchestration tunables.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Window within which every remote processing module must confirm
    /// its start before a start-failure notification fires.
    #[serde(default = "default_remote_start_timeout_seconds")]
    pub remote_start_timeout_seconds: u64,
}

fn default_remote_start_timeout_seconds() -> u64 {
    10
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            remote_start_timeout_seconds: default_remote_start_timeout_seconds(),
        }
    }
}

impl SessionConfig {
    /// Remote-start confirmation window as a [`Duration`].
    #[must_use]
    pub fn remote_start_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_start_timeout_seconds)
    }
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Identifier of this master node. Generated when unset.
    #[serde(default = "default_node_id")]
    pub node_id: String,
    /// Display name of this master node.
    #[serde(default = "default_node_name")]
    pub node_name: String,
    /// Liveness monitoring thresholds.
    #[serde(default)]
    pub liveness: LivenessConfig,
    /// Session orchestration tunables.
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_node_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_node_name() -> String {
    "interplex-master".into()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            node_name: default_node_name(),
            liveness: LivenessConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.node_id.is_empty() {
            return Err(AppError::Config("node_id must not be empty".into()));
        }

        if self.liveness.check_period_ms == 0 {
            return Err(AppError::Config(
                "liveness.check_period_ms must be greater than zero".into(),
            ));
        }

        if self.liveness.standby_threshold_ms >= self.liveness.inactive_threshold_ms {
            return Err(AppError::Config(format!(
                "liveness.standby_threshold_ms ({}) must be below inactive_threshold_ms ({})",
                self.liveness.standby_threshold_ms, self.liveness.inactive_threshold_ms
            )));
        }

        if self.session.remote_start_timeout_seconds == 0 {
            return Err(AppError::Config(
                "session.remote_start_timeout_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
