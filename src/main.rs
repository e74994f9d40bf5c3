// =============================================================================
// Payment Risk Engine — Main Entry Point
// =============================================================================

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use payment_risk_engine::alert_publisher::{AlertPublisher, LoggingAlertSink};
use payment_risk_engine::alert_summary::NoOpAlertSummaryService;
use payment_risk_engine::app_state::AppState;
use payment_risk_engine::link_store::LinkStore;
use payment_risk_engine::risk_engine::{LevelThresholds, RiskEngine};
use payment_risk_engine::runtime_config::RuntimeConfig;
use payment_risk_engine::stream_consumer::{Pipeline, StreamConsumer};
use payment_risk_engine::webhook_dispatcher::{WebhookConfig, WebhookDispatcher};
use payment_risk_engine::window_aggregator::WindowAggregator;
use payment_risk_engine::{api, recent_alerts};

const CONFIG_PATH: &str = "runtime_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    let config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        RuntimeConfig::default()
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("payment risk engine starting up");

    if let Err(e) = config.validate() {
        error!(error = %e, "invalid runtime configuration, refusing to start");
        anyhow::bail!(e);
    }

    let aggregator = Arc::new(WindowAggregator::new(
        config.window.duration_ms,
        config.window.velocity_1m_ms,
    ));
    let links = Arc::new(LinkStore::new());
    let risk_engine = Arc::new(RiskEngine::new(
        config.risk.threshold,
        LevelThresholds {
            medium: config.risk.level_thresholds.medium,
            high: config.risk.level_thresholds.high,
            critical: config.risk.level_thresholds.critical,
        },
    ));
    let recent_alerts = Arc::new(recent_alerts::RecentAlertsStore::new(
        config.recent_alerts.max,
    ));
    let publisher = Arc::new(AlertPublisher::new(
        config.publisher.topic.clone(),
        Arc::new(LoggingAlertSink),
    ));
    let webhooks = Arc::new(WebhookDispatcher::new(WebhookConfig {
        enabled: config.webhook.enabled,
        max_retries: config.webhook.max_retries,
        retry_delay_ms: config.webhook.retry_delay_ms,
        timeout_ms: config.webhook.timeout_ms,
        pool_size: config.webhook.pool_size,
    }));
    let summary_service = Arc::new(NoOpAlertSummaryService);

    let state = Arc::new(AppState::new(
        config.clone(),
        aggregator.clone(),
        links.clone(),
        risk_engine.clone(),
        recent_alerts.clone(),
        publisher.clone(),
        webhooks.clone(),
        summary_service.clone(),
    ));

    let pipeline = Arc::new(Pipeline {
        aggregator,
        links,
        risk_engine,
        recent_alerts,
        publisher,
        webhooks,
        summary_service,
    });

    if config.engine.enabled {
        let bootstrap_servers = config.consumer.bootstrap_servers.clone();
        let group_id = config.consumer.group_id.clone();
        let topic = config.consumer.topic.clone();
        let consumer_state = state.clone();
        let consumer_pipeline = pipeline.clone();

        tokio::spawn(async move {
            loop {
                match StreamConsumer::new(&bootstrap_servers, &group_id, &topic) {
                    Ok(consumer) => {
                        consumer.run(&consumer_pipeline).await;
                    }
                    Err(e) => {
                        consumer_state.push_error(format!("failed to start stream consumer: {e}"));
                        error!(error = %e, "failed to start stream consumer, retrying in 5s");
                    }
                }
                tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
            }
        });
    } else {
        info!("engine.enabled is false, stream consumer not started");
    }

    let bind_addr = config.http.bind_addr.clone();
    let http_state = state.clone();
    let http_handle = tokio::spawn(async move {
        let app = api::rest::router(http_state);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .expect("failed to bind HTTP listener");
        info!(addr = %bind_addr, "HTTP API listening");
        axum::serve(listener, app).await.expect("HTTP server failed");
    });

    info!("all subsystems running, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    warn!("shutdown signal received, draining in-flight work");

    tokio::time::sleep(tokio::time::Duration::from_secs(30)).await;
    http_handle.abort();

    if let Err(e) = state.runtime_config.read().save(CONFIG_PATH) {
        error!(error = %e, "failed to save runtime config on shutdown");
    }

    info!("payment risk engine shut down complete");
    Ok(())
}
