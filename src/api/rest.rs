// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// The HTTP surface is a thin read-only adapter sitting outside the core
// pipeline: a health probe and a window onto the recent-alerts cache. Nothing
// here mutates pipeline state, so neither endpoint needs authentication.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::AppState;

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/risk/alerts", get(recent_alerts))
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_health())
}

#[derive(Debug, Deserialize)]
struct RecentAlertsQuery {
    limit: Option<usize>,
}

const DEFAULT_ALERTS_LIMIT: usize = 20;

async fn recent_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentAlertsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_ALERTS_LIMIT);
    Json(state.recent_alerts.get_recent(limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert_publisher::{AlertPublisher, LoggingAlertSink};
    use crate::alert_summary::NoOpAlertSummaryService;
    use crate::link_store::LinkStore;
    use crate::recent_alerts::RecentAlertsStore;
    use crate::risk_engine::{LevelThresholds, RiskEngine};
    use crate::runtime_config::RuntimeConfig;
    use crate::webhook_dispatcher::{WebhookConfig, WebhookDispatcher};
    use crate::window_aggregator::WindowAggregator;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(
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
        ))
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn recent_alerts_endpoint_returns_empty_array_when_no_alerts() {
        let app = router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/risk/alerts?limit=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let alerts: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert!(alerts.is_empty());
    }
}
