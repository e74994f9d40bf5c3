// =============================================================================
// StreamConsumer — payment-events ingestion
// =============================================================================
//
// Wraps an `rdkafka` `StreamConsumer` subscribed to the configured topic
// under group-id `payment-risk-engine`. Message handling itself lives in the
// free function `handle_message` so it can be driven either by a live broker
// poll loop or by the in-process harness used in tests — both paths go
// through the exact same per-message logic.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer as RdStreamConsumer};
use rdkafka::message::Message;
use tracing::{debug, error, info, warn};

use crate::alert_publisher::AlertPublisher;
use crate::alert_summary::AlertSummaryService;
use crate::link_store::LinkStore;
use crate::recent_alerts::RecentAlertsStore;
use crate::risk_engine::RiskEngine;
use crate::types::PaymentEvent;
use crate::webhook_dispatcher::WebhookDispatcher;
use crate::window_aggregator::WindowAggregator;

/// The collaborators a single message handling pass needs. Grouped so the
/// live poll loop and the test harness can share one call site.
pub struct Pipeline {
    pub aggregator: Arc<WindowAggregator>,
    pub links: Arc<LinkStore>,
    pub risk_engine: Arc<RiskEngine>,
    pub recent_alerts: Arc<RecentAlertsStore>,
    pub publisher: Arc<AlertPublisher>,
    pub webhooks: Arc<WebhookDispatcher>,
    pub summary_service: Arc<dyn AlertSummaryService>,
}

pub struct StreamConsumer {
    consumer: RdStreamConsumer,
    topic: String,
}

impl StreamConsumer {
    pub fn new(bootstrap_servers: &str, group_id: &str, topic: &str) -> anyhow::Result<Self> {
        let consumer: RdStreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .create()?;

        Ok(Self {
            consumer,
            topic: topic.to_string(),
        })
    }

    /// Subscribe and poll forever, handling each message through `pipeline`.
    /// Reconnects with a fixed backoff on subscribe failure rather than
    /// exiting the process — a transient broker outage should not take the
    /// whole service down.
    pub async fn run(&self, pipeline: &Pipeline) {
        loop {
            if let Err(e) = self.consumer.subscribe(&[self.topic.as_str()]) {
                error!(error = %e, topic = %self.topic, "failed to subscribe, retrying");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
            break;
        }

        loop {
            match self.consumer.recv().await {
                Ok(message) => {
                    let payload = message.payload();
                    handle_payload(payload, pipeline).await;
                }
                Err(e) => {
                    error!(error = %e, "kafka receive error, backing off");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
}

/// Deserialize and process one raw message payload. Never panics: a parse
/// failure is treated the same as a poison record.
pub async fn handle_payload(payload: Option<&[u8]>, pipeline: &Pipeline) {
    let event: PaymentEvent = match payload {
        None => {
            warn!("received message with empty payload, treating as poison");
            PaymentEvent::default()
        }
        Some(bytes) => match serde_json::from_slice(bytes) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "failed to deserialize payment event, treating as poison");
                PaymentEvent::default()
            }
        },
    };

    handle_message(&event, pipeline).await;
}

/// Steps 1-6 of per-message handling. Any panic-worthy condition is instead
/// logged and the function returns, never propagating an error up to the
/// poll loop.
pub async fn handle_message(event: &PaymentEvent, pipeline: &Pipeline) {
    if event.is_poison() {
        warn!("poison message received, skipping");
        return;
    }

    debug!(
        event_id = ?event.event_id,
        idempotency_key = ?event.idempotency_key,
        amount = ?event.amount,
        event_type = ?event.event_type,
        merchant_reference = ?event.merchant_reference,
        "received payment event"
    );

    let alert = pipeline
        .risk_engine
        .evaluate(event, &pipeline.aggregator, &pipeline.links);

    let Some(mut alert) = alert else {
        return;
    };

    if let Some(explanation) = pipeline.summary_service.generate_summary(&alert).await {
        alert.detailed_explanation = Some(explanation);
    }

    info!(
        alert_id = %alert.alert_id,
        level = %alert.level,
        signal_types = ?alert.signal_types,
        "risk alert produced"
    );

    pipeline.recent_alerts.add(alert.clone());
    pipeline.publisher.publish(alert.clone());
    pipeline.webhooks.send_alert(&alert);
}
