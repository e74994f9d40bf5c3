// =============================================================================
// Central Application State — payment risk engine
// =============================================================================
//
// The single source of truth tying the pipeline's components together. Each
// component owns its own interior mutability (`WindowAggregator`,
// `LinkStore`, `RecentAlertsStore` each guard their own state); `AppState`
// just holds the `Arc`s and the handful of process-level counters the HTTP
// API reports. No component here holds a reference back to `RiskEngine` or
// to `AppState` itself — dependency injection flows one way, from `main`
// down into `stream_consumer::Pipeline`.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::alert_publisher::AlertPublisher;
use crate::alert_summary::AlertSummaryService;
use crate::link_store::LinkStore;
use crate::recent_alerts::RecentAlertsStore;
use crate::risk_engine::RiskEngine;
use crate::runtime_config::RuntimeConfig;
use crate::webhook_dispatcher::WebhookDispatcher;
use crate::window_aggregator::WindowAggregator;

/// A recorded error event for the operator-facing health log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    pub at: String,
}

const MAX_RECENT_ERRORS: usize = 50;

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    /// Monotonically increasing version counter, bumped on every config
    /// reload or recorded error — lets a future push feed detect change
    /// without polling the whole state.
    pub state_version: AtomicU64,

    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    pub aggregator: Arc<WindowAggregator>,
    pub links: Arc<LinkStore>,
    pub risk_engine: Arc<RiskEngine>,
    pub recent_alerts: Arc<RecentAlertsStore>,
    pub publisher: Arc<AlertPublisher>,
    pub webhooks: Arc<WebhookDispatcher>,
    pub summary_service: Arc<dyn AlertSummaryService>,

    pub recent_errors: RwLock<Vec<ErrorRecord>>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        aggregator: Arc<WindowAggregator>,
        links: Arc<LinkStore>,
        risk_engine: Arc<RiskEngine>,
        recent_alerts: Arc<RecentAlertsStore>,
        publisher: Arc<AlertPublisher>,
        webhooks: Arc<WebhookDispatcher>,
        summary_service: Arc<dyn AlertSummaryService>,
    ) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),
            aggregator,
            links,
            risk_engine,
            recent_alerts,
            publisher,
            webhooks,
            summary_service,
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    /// Record an operator-visible error. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted when the limit is
    /// reached.
    pub fn push_error(&self, message: String) {
        let record = ErrorRecord {
            message,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }

        self.increment_version();
    }

    pub fn build_health(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "ok".to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            state_version: self.current_state_version(),
            recent_alert_count: self.recent_alerts.len(),
            recent_error_count: self.recent_errors.read().len(),
        }
    }
}

/// Payload for `GET /api/v1/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: String,
    pub uptime_seconds: u64,
    pub state_version: u64,
    pub recent_alert_count: usize,
    pub recent_error_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert_publisher::LoggingAlertSink;
    use crate::alert_summary::NoOpAlertSummaryService;
    use crate::risk_engine::LevelThresholds;
    use crate::webhook_dispatcher::WebhookConfig;

    fn test_state() -> AppState {
        AppState::new(
            RuntimeConfig::default(),
            Arc::new(WindowAggregator::new(300_000, 60_000)),
            Arc::new(LinkStore::new()),
            Arc::new(RiskEngine::new(
                0.5,
                LevelThresholds {
                    medium: 0.50,
                    high: 0.65,
                    critical: 0.85,
                },
            )),
            Arc::new(RecentAlertsStore::new(100)),
            Arc::new(AlertPublisher::new("risk-alerts", Arc::new(LoggingAlertSink))),
            Arc::new(WebhookDispatcher::new(WebhookConfig {
                enabled: false,
                max_retries: 3,
                retry_delay_ms: 1000,
                timeout_ms: 5000,
                pool_size: 10,
            })),
            Arc::new(NoOpAlertSummaryService),
        )
    }

    #[test]
    fn push_error_bumps_version_and_bounds_ring_buffer() {
        let state = test_state();
        let before = state.current_state_version();
        for i in 0..(MAX_RECENT_ERRORS + 10) {
            state.push_error(format!("error {i}"));
        }
        assert!(state.current_state_version() > before);
        assert_eq!(state.recent_errors.read().len(), MAX_RECENT_ERRORS);
    }

    #[test]
    fn health_snapshot_reflects_state() {
        let state = test_state();
        let health = state.build_health();
        assert_eq!(health.status, "ok");
        assert_eq!(health.recent_alert_count, 0);
    }
}
