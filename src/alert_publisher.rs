// =============================================================================
// AlertPublisher — non-blocking fan-out to a named message topic
// =============================================================================
//
// The consumer hands an alert to `publish` and moves on immediately; a single
// background task drains a bounded channel and hands each alert to an
// `AlertSink`. A real deployment swaps in a Kafka-producer-backed sink; the
// default here logs structurally, which is enough to keep the pipeline fully
// exercised without a broker.
// =============================================================================

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::types::RiskAlert;

/// External collaborator that actually moves a published alert out of
/// process. Implementations must not block the caller for long — the
/// dispatch task awaits each `publish` call in turn.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, alert: &RiskAlert) -> anyhow::Result<()>;
}

/// Logs the alert at info level instead of handing it to a broker.
pub struct LoggingAlertSink;

#[async_trait::async_trait]
impl AlertSink for LoggingAlertSink {
    async fn publish(&self, topic: &str, key: &str, alert: &RiskAlert) -> anyhow::Result<()> {
        info!(
            topic,
            key,
            alert_id = %alert.alert_id,
            level = %alert.level,
            risk_score = alert.risk_score,
            "publishing risk alert"
        );
        Ok(())
    }
}

struct Envelope {
    key: String,
    alert: RiskAlert,
}

/// Depth of the internal channel decoupling callers from publish I/O. Large
/// enough to absorb a burst without the background task falling behind
/// during a transient sink slowdown.
const CHANNEL_CAPACITY: usize = 1024;

pub struct AlertPublisher {
    topic: String,
    tx: mpsc::Sender<Envelope>,
}

impl AlertPublisher {
    pub fn new(topic: impl Into<String>, sink: Arc<dyn AlertSink>) -> Self {
        let topic = topic.into();
        let (tx, mut rx) = mpsc::channel::<Envelope>(CHANNEL_CAPACITY);

        let task_topic = topic.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                if let Err(e) = sink.publish(&task_topic, &envelope.key, &envelope.alert).await {
                    error!(
                        alert_id = %envelope.alert.alert_id,
                        error = %e,
                        "alert publish failed"
                    );
                }
            }
            warn!("alert publisher channel closed, background task exiting");
        });

        Self { topic, tx }
    }

    /// Enqueue `alert` for publish. Never blocks; a send failure (the
    /// background task has exited) is logged and swallowed, matching the
    /// "failures never propagate to the consumer" contract.
    pub fn publish(&self, alert: RiskAlert) {
        let key = if !alert.entity_id.is_empty() {
            alert.entity_id.clone()
        } else {
            alert.alert_id.clone()
        };
        if let Err(e) = self.tx.try_send(Envelope { key, alert }) {
            error!(error = %e, "alert publisher channel unavailable, dropping alert");
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}
