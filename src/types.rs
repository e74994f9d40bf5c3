// =============================================================================
// Shared types used across the payment risk engine
// =============================================================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a payment as reported by the upstream gateway.
///
/// `Other` absorbs event types the risk engine does not special-case (e.g.
/// `CHARGEBACK`, `DISPUTED`) so that unknown-but-valid events still flow
/// through the pipeline instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Requested,
    Completed,
    Failed,
    Refunded,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested => write!(f, "REQUESTED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Refunded => write!(f, "REFUNDED"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// The grouping key type a `WindowFeatures` snapshot is computed for.
///
/// Only `Merchant` is produced today; the field exists so a future
/// customer- or card-level aggregation can share the same feature shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Merchant,
}

impl Default for EntityType {
    fn default() -> Self {
        Self::Merchant
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merchant => write!(f, "MERCHANT"),
        }
    }
}

/// Severity bucket a risk score maps to, per the published thresholds in
/// `RuntimeConfig::risk_level_thresholds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A single named risk condition. Order here is the fixed evaluation order
/// the risk engine iterates in — see `risk_engine::SIGNAL_WEIGHTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    HighFailureRate,
    VelocitySpike,
    LargeAmount,
    AmountEscalation,
    OffHours,
    EmailMultiplePar,
    ParMultipleEmail,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::HighFailureRate => "HIGH_FAILURE_RATE",
            Self::VelocitySpike => "VELOCITY_SPIKE",
            Self::LargeAmount => "LARGE_AMOUNT",
            Self::AmountEscalation => "AMOUNT_ESCALATION",
            Self::OffHours => "OFF_HOURS",
            Self::EmailMultiplePar => "EMAIL_MULTIPLE_PAR",
            Self::ParMultipleEmail => "PAR_MULTIPLE_EMAIL",
        };
        write!(f, "{s}")
    }
}

/// A payment lifecycle event as received from the `payment-events` topic.
///
/// Every field besides `eventType` is optional: the stream consumer must
/// tolerate partial and poison records (see `stream_consumer::handle_message`)
/// rather than rejecting the whole message on one missing field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentEvent {
    pub event_id: Option<String>,
    pub idempotency_key: Option<String>,
    pub event_type: Option<EventType>,
    pub amount: Option<Decimal>,
    pub currency_code: Option<String>,
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
    pub merchant_reference: Option<String>,
    pub correlation_id: Option<String>,
    pub customer_id: Option<String>,
    pub email: Option<String>,
    pub client_ip: Option<String>,
    pub payment_method_id: Option<String>,
    pub card_bin: Option<String>,
    pub card_last4: Option<String>,
    pub network_token: Option<String>,
    pub par: Option<String>,
    pub card_fingerprint: Option<String>,
}

impl PaymentEvent {
    /// A poison message: every identifying/value field is absent. Such a
    /// record carries no entity, no amount, nothing to aggregate or score —
    /// it is logged and skipped rather than processed.
    pub fn is_poison(&self) -> bool {
        self.event_id.is_none()
            && self.idempotency_key.is_none()
            && self.event_type.is_none()
            && self.amount.is_none()
            && self.merchant_reference.is_none()
            && self.correlation_id.is_none()
            && self.email.is_none()
            && self.par.is_none()
    }

    /// Deterministic entity id: `merchantReference` if non-blank, else
    /// `correlationId` if non-blank, else the literal `"default"`.
    pub fn entity_id(&self) -> String {
        if let Some(m) = self.merchant_reference.as_deref() {
            if !m.trim().is_empty() {
                return m.to_string();
            }
        }
        if let Some(c) = self.correlation_id.as_deref() {
            if !c.trim().is_empty() {
                return c.to_string();
            }
        }
        "default".to_string()
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.event_type, Some(EventType::Failed))
    }
}

/// A published risk alert. Serialized as the `risk-alerts` topic payload and
/// as the JSON body of `GET /api/v1/risk/alerts` and outbound webhook POSTs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAlert {
    pub alert_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: RiskLevel,
    pub signal_types: Vec<SignalType>,
    pub risk_score: f64,
    pub entity_id: String,
    pub entity_type: EntityType,
    pub related_event_ids: Vec<String>,
    pub amount: Decimal,
    pub currency_code: Option<String>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_explanation: Option<String>,
}
