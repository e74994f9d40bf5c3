// =============================================================================
// Runtime Configuration — typed, validated, hot-reloadable engine settings
// =============================================================================
//
// Central configuration hub for the payment risk engine. Every tunable
// parameter enumerated in the specification lives here so the engine can be
// reconfigured without touching code.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields never
// breaks loading an older config file.
//
// Validation is strict: `RuntimeConfig::validate` is the single gate between
// a loaded config and a running engine. A config that fails validation is a
// fatal startup error (§7 kind 6) — the process must not start in a
// half-sane state.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_window_duration_ms() -> u64 {
    300_000
}

fn default_velocity_1m_ms() -> u64 {
    60_000
}

fn default_risk_threshold() -> f64 {
    0.5
}

fn default_medium_threshold() -> f64 {
    0.50
}

fn default_high_threshold() -> f64 {
    0.65
}

fn default_critical_threshold() -> f64 {
    0.85
}

fn default_recent_alerts_max() -> usize {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_pool_size() -> usize {
    10
}

fn default_group_id() -> String {
    "payment-risk-engine".to_string()
}

fn default_bootstrap_servers() -> String {
    "localhost:9092".to_string()
}

fn default_consumer_topic() -> String {
    "payment-events".to_string()
}

fn default_publisher_topic() -> String {
    "risk-alerts".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

// =============================================================================
// Window
// =============================================================================

/// Rolling-window aggregation parameters (§3, §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Total retention window for feature computation.
    pub duration_ms: u64,
    /// Sub-window used for the `countLast1Min` velocity feature.
    pub velocity_1m_ms: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_window_duration_ms(),
            velocity_1m_ms: default_velocity_1m_ms(),
        }
    }
}

// =============================================================================
// Risk
// =============================================================================

/// Score cutoffs mapping a `RiskEngine` score to a `RiskLevel` (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLevelThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            medium: default_medium_threshold(),
            high: default_high_threshold(),
            critical: default_critical_threshold(),
        }
    }
}

/// Risk engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Minimum score (absent an `alwaysAlert` signal) to emit an alert.
    pub threshold: f64,
    pub level_thresholds: RiskLevelThresholds,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            threshold: default_risk_threshold(),
            level_thresholds: RiskLevelThresholds::default(),
        }
    }
}

// =============================================================================
// Recent alerts
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentAlertsConfig {
    pub max: usize,
}

impl Default for RecentAlertsConfig {
    fn default() -> Self {
        Self {
            max: default_recent_alerts_max(),
        }
    }
}

// =============================================================================
// Webhook
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    #[serde(default = "default_false")]
    pub enabled: bool,
    pub max_retries: u32,
    /// Linear backoff multiplier: delay before attempt N is `retry_delay_ms * N`.
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
    pub pool_size: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
            pool_size: default_pool_size(),
        }
    }
}

// =============================================================================
// Consumer / Publisher / Engine / HTTP / Logging
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub group_id: String,
    pub bootstrap_servers: String,
    pub topic: String,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group_id: default_group_id(),
            bootstrap_servers: default_bootstrap_servers(),
            topic: default_consumer_topic(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub topic: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            topic: default_publisher_topic(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the payment risk engine.
///
/// Every field has a serde default so that older JSON files missing new
/// fields will still deserialise correctly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub window: WindowConfig,
    pub risk: RiskConfig,
    pub recent_alerts: RecentAlertsConfig,
    pub webhook: WebhookConfig,
    pub consumer: ConsumerConfig,
    pub publisher: PublisherConfig,
    pub engine: EngineConfig,
    pub http: HttpConfig,
    pub log: LogConfig,
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bootstrap_servers = %config.consumer.bootstrap_servers,
            topic = %config.consumer.topic,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Validate every field enumerated in the specification. Called once at
    /// startup; a returned `Err` is a fatal configuration error (§7 kind 6).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.risk.threshold) {
            return Err(ConfigError::RiskThresholdOutOfRange(self.risk.threshold));
        }

        let t = &self.risk.level_thresholds;
        if !(t.medium <= t.high && t.high <= t.critical) {
            return Err(ConfigError::RiskLevelThresholdsNotOrdered {
                medium: t.medium,
                high: t.high,
                critical: t.critical,
            });
        }

        if self.webhook.enabled && self.webhook.pool_size == 0 {
            return Err(ConfigError::WebhookPoolSizeZero);
        }

        if self.webhook.max_retries > 50 {
            return Err(ConfigError::WebhookMaxRetriesUnreasonable(
                self.webhook.max_retries,
            ));
        }

        if self.recent_alerts.max == 0 {
            return Err(ConfigError::RecentAlertsMaxZero(self.recent_alerts.max));
        }

        if self.window.duration_ms < self.window.velocity_1m_ms {
            return Err(ConfigError::WindowDurationTooShort {
                duration_ms: self.window.duration_ms,
                velocity1m_ms: self.window.velocity_1m_ms,
            });
        }

        if self.consumer.bootstrap_servers.trim().is_empty() {
            return Err(ConfigError::BlankBootstrapServers);
        }

        if self.http.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddr(self.http.bind_addr.clone()));
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.window.duration_ms, 300_000);
        assert_eq!(cfg.window.velocity_1m_ms, 60_000);
        assert!((cfg.risk.threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.recent_alerts.max, 100);
        assert!(!cfg.webhook.enabled);
        assert_eq!(cfg.webhook.max_retries, 3);
        assert_eq!(cfg.consumer.group_id, "payment-risk-engine");
        assert!(cfg.engine.enabled);
    }

    #[test]
    fn default_config_validates() {
        assert!(RuntimeConfig::default().validate().is_ok());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.consumer.topic, "payment-events");
        assert_eq!(cfg.publisher.topic, "risk-alerts");
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "risk": { "threshold": 0.7 } }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert!((cfg.risk.threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(cfg.window.duration_ms, 300_000);
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = RuntimeConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.consumer.group_id, cfg2.consumer.group_id);
        assert_eq!(cfg.webhook.pool_size, cfg2.webhook.pool_size);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut cfg = RuntimeConfig::default();
        cfg.risk.threshold = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RiskThresholdOutOfRange(_))
        ));
    }

    #[test]
    fn rejects_unordered_level_thresholds() {
        let mut cfg = RuntimeConfig::default();
        cfg.risk.level_thresholds.high = 0.1;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RiskLevelThresholdsNotOrdered { .. })
        ));
    }

    #[test]
    fn rejects_zero_pool_size_when_webhooks_enabled() {
        let mut cfg = RuntimeConfig::default();
        cfg.webhook.enabled = true;
        cfg.webhook.pool_size = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::WebhookPoolSizeZero)
        ));
    }

    #[test]
    fn allows_zero_pool_size_when_webhooks_disabled() {
        let mut cfg = RuntimeConfig::default();
        cfg.webhook.enabled = false;
        cfg.webhook.pool_size = 0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_invalid_bind_addr() {
        let mut cfg = RuntimeConfig::default();
        cfg.http.bind_addr = "not-an-address".to_string();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidBindAddr(_))
        ));
    }
}
