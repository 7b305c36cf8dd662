//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the observatory.
//! All types derive Serde traits for deserialization from config files.
//! The classifier and selector sections have no defaults and must be present.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::probe::target::DEFAULT_PROBE_URL;
use crate::selection::SwitchMargin;

/// Root configuration for the observatory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservatoryConfig {
    /// Probe scheduling (interval, timeout, concurrency).
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Health classification thresholds.
    pub classifier: ClassifierConfig,

    /// Selection hysteresis.
    pub selector: SelectorConfig,

    /// Connection draining.
    #[serde(default)]
    pub drain: DrainConfig,

    /// Observability settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Read-only admin API.
    #[serde(default)]
    pub admin: AdminConfig,

    /// Initial candidate set.
    #[serde(default)]
    pub candidates: Vec<CandidateConfig>,
}

impl ObservatoryConfig {
    /// Build a config with the required sections and defaults elsewhere.
    pub fn new(classifier: ClassifierConfig, selector: SelectorConfig) -> Self {
        Self {
            probe: ProbeConfig::default(),
            classifier,
            selector,
            drain: DrainConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
            candidates: Vec::new(),
        }
    }
}

/// Probe scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Interval between two probes of the same candidate, in milliseconds.
    pub interval_ms: u64,

    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Maximum number of probes in flight across all candidates.
    pub concurrency: usize,

    /// Random jitter applied to each interval, as a fraction of it.
    pub jitter_ratio: f64,
}

impl ProbeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            timeout_ms: 5_000,
            concurrency: 8,
            jitter_ratio: 0.1,
        }
    }
}

/// Classifier thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    /// Consecutive failures before a reachable candidate is marked failed.
    pub failure_threshold: u32,

    /// Latency above which a reachable candidate is unqualified, in milliseconds.
    pub quality_ceiling_ms: u64,
}

/// Selector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectorConfig {
    /// Margin a challenger must beat the held best by before switching.
    pub switch_margin: SwitchMargin,
}

/// Drain configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DrainConfig {
    /// Grace period for open connections on shutdown, in seconds.
    pub grace_secs: u64,
}

impl DrainConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self { grace_secs: 10 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// A candidate outbound to observe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CandidateConfig {
    /// Unique, stable identity.
    pub tag: String,

    /// How to probe it.
    pub target: TargetConfig,
}

/// Probe target definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetConfig {
    /// TCP connect to `host:port`.
    Tcp { address: String },

    /// HTTP GET of a URL.
    Http {
        #[serde(default = "default_probe_url")]
        url: String,
    },

    /// HTTP GET of a URL through a SOCKS5 or HTTP proxy endpoint.
    Proxy {
        proxy: String,
        #[serde(default = "default_probe_url")]
        url: String,
    },
}

fn default_probe_url() -> String {
    DEFAULT_PROBE_URL.to_string()
}
