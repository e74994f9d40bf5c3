// =============================================================================
// WebhookDispatcher — per-entity subscriber fan-out with retry/backoff
// =============================================================================
//
// Registry of `entityId -> Vec<url>` guarded by its own lock; `send_alert`
// enqueues one delivery task per subscriber onto a semaphore-bounded pool so
// a slow or dead endpoint for one subscriber can never starve delivery to
// another. Each delivery retries on any transport error or non-2xx response
// with linear backoff before giving up and logging.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{error, warn};

use crate::types::RiskAlert;

pub struct WebhookConfig {
    pub enabled: bool,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
    pub pool_size: usize,
}

pub struct WebhookDispatcher {
    registry: RwLock<HashMap<String, Vec<String>>>,
    client: Client,
    config: WebhookConfig,
    semaphore: Arc<Semaphore>,
}

impl WebhookDispatcher {
    pub fn new(config: WebhookConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.timeout_ms))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("reqwest client builds with valid timeout configuration");

        let semaphore = Arc::new(Semaphore::new(config.pool_size.max(1)));

        Self {
            registry: RwLock::new(HashMap::new()),
            client,
            config,
            semaphore,
        }
    }

    pub fn register_webhook(&self, entity_id: &str, url: &str) {
        let mut registry = self.registry.write();
        let urls = registry.entry(entity_id.to_string()).or_default();
        if !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }

    pub fn unregister_webhook(&self, entity_id: &str, url: &str) {
        let mut registry = self.registry.write();
        if let Some(urls) = registry.get_mut(entity_id) {
            urls.retain(|u| u != url);
            if urls.is_empty() {
                registry.remove(entity_id);
            }
        }
    }

    pub fn get_webhooks(&self, entity_id: &str) -> Vec<String> {
        self.registry
            .read()
            .get(entity_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Enqueue one delivery per subscriber registered for `alert.entity_id`.
    /// Returns immediately; the number returned is the count of deliveries
    /// enqueued (0 when disabled globally or no subscribers exist).
    pub fn send_alert(&self, alert: &RiskAlert) -> usize {
        if !self.config.enabled {
            return 0;
        }

        let urls = self.get_webhooks(&alert.entity_id);
        if urls.is_empty() {
            return 0;
        }

        for url in &urls {
            let client = self.client.clone();
            let semaphore = self.semaphore.clone();
            let alert = alert.clone();
            let url = url.clone();
            let max_retries = self.config.max_retries;
            let retry_delay_ms = self.config.retry_delay_ms;

            tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                deliver_with_retry(&client, &url, &alert, max_retries, retry_delay_ms).await;
            });
        }

        urls.len()
    }
}

async fn deliver_with_retry(
    client: &Client,
    url: &str,
    alert: &RiskAlert,
    max_retries: u32,
    retry_delay_ms: u64,
) {
    let mut attempt: u32 = 0;
    loop {
        let result = client.post(url).json(alert).send().await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                return;
            }
            Ok(resp) => {
                warn!(
                    url,
                    alert_id = %alert.alert_id,
                    status = resp.status().as_u16(),
                    attempt,
                    "webhook delivery returned non-2xx"
                );
            }
            Err(e) => {
                warn!(
                    url,
                    alert_id = %alert.alert_id,
                    error = %e,
                    attempt,
                    "webhook delivery failed"
                );
            }
        }

        if attempt >= max_retries {
            error!(
                url,
                alert_id = %alert.alert_id,
                attempt,
                "webhook delivery exhausted retries, dropping"
            );
            return;
        }

        attempt += 1;
        tokio::time::sleep(Duration::from_millis(retry_delay_ms * attempt as u64)).await;
    }
}
