// =============================================================================
// Typed error taxonomy
// =============================================================================
//
// `ConfigError` is the only error kind that is ever fatal (§7 kind 6): a bad
// config fails the process at startup rather than letting the pipeline limp
// along with nonsensical thresholds. Everything else in the pipeline is
// caught, logged, and skipped — see `stream_consumer` and `webhook_dispatcher`
// for the at-least-once-and-never-crash handling those components own
// themselves instead of propagating a typed error up through here.
// =============================================================================

use thiserror::Error;

/// A configuration value failed validation at startup. The process must exit
/// non-zero when this is returned from `RuntimeConfig::validate`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("risk.threshold must be within [0, 1], got {0}")]
    RiskThresholdOutOfRange(f64),

    #[error("risk.level.thresholds must be non-decreasing (medium <= high <= critical), got medium={medium}, high={high}, critical={critical}")]
    RiskLevelThresholdsNotOrdered {
        medium: f64,
        high: f64,
        critical: f64,
    },

    #[error("webhook.poolSize must be > 0 when webhook.enabled is true")]
    WebhookPoolSizeZero,

    #[error("webhook.maxRetries too large ({0}); refusing to configure unbounded retry storms")]
    WebhookMaxRetriesUnreasonable(u32),

    #[error("recentAlerts.max must be > 0, got {0}")]
    RecentAlertsMaxZero(usize),

    #[error("window.durationMs must be >= window.velocity1mMs, got duration={duration_ms}, velocity1m={velocity1m_ms}")]
    WindowDurationTooShort { duration_ms: u64, velocity1m_ms: u64 },

    #[error("consumer.bootstrapServers must not be blank")]
    BlankBootstrapServers,

    #[error("http.bindAddr is not a valid socket address: {0}")]
    InvalidBindAddr(String),
}
