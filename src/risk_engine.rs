// =============================================================================
// RiskEngine — pure scoring function over (event, window features, links)
// =============================================================================
//
// `evaluate` is the one place the whole signal battery lives. It is
// deliberately side-effect-free with respect to scoring: the only mutations
// it performs are the window record (step 1) and the link write (step 4),
// both mandated by the algorithm's ordering rules in the design notes. Given
// identical aggregator/link-store state, two calls with the same event
// produce byte-identical alerts.
// =============================================================================

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::link_store::LinkStore;
use crate::types::{PaymentEvent, RiskAlert, RiskLevel, SignalType};
use crate::window_aggregator::{WindowAggregator, WindowFeatures};

/// Published weight and summary template for one signal, in the fixed
/// evaluation order the design notes require.
struct SignalSpec {
    signal_type: SignalType,
    weight: f64,
    summary: &'static str,
}

const SIGNAL_TABLE: &[SignalSpec] = &[
    SignalSpec {
        signal_type: SignalType::HighFailureRate,
        weight: 0.35,
        summary: "elevated failure rate observed for this entity",
    },
    SignalSpec {
        signal_type: SignalType::VelocitySpike,
        weight: 0.30,
        summary: "transaction velocity spike detected",
    },
    SignalSpec {
        signal_type: SignalType::LargeAmount,
        weight: 0.20,
        summary: "transaction amount far exceeds this entity's recent average",
    },
    SignalSpec {
        signal_type: SignalType::AmountEscalation,
        weight: 0.25,
        summary: "rapid escalating-amount pattern consistent with card testing",
    },
    SignalSpec {
        signal_type: SignalType::OffHours,
        weight: 0.10,
        summary: "large transaction outside normal operating hours",
    },
    SignalSpec {
        signal_type: SignalType::EmailMultiplePar,
        weight: 0.30,
        summary: "email address linked to multiple payment account references",
    },
    SignalSpec {
        signal_type: SignalType::ParMultipleEmail,
        weight: 0.30,
        summary: "payment account reference linked to multiple email addresses",
    },
];

/// Level thresholds, configurable via `RuntimeConfig`.
#[derive(Debug, Clone, Copy)]
pub struct LevelThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

pub struct RiskEngine {
    threshold: f64,
    level_thresholds: LevelThresholds,
}

impl RiskEngine {
    pub fn new(threshold: f64, level_thresholds: LevelThresholds) -> Self {
        Self {
            threshold,
            level_thresholds,
        }
    }

    fn level_for(&self, score: f64) -> RiskLevel {
        if score >= self.level_thresholds.critical {
            RiskLevel::Critical
        } else if score >= self.level_thresholds.high {
            RiskLevel::High
        } else if score >= self.level_thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Evaluate one event, recording it into `aggregator` first and linking
    /// its email/par into `links` after scoring, per the algorithm's fixed
    /// ordering. Returns `None` when the score falls below the configured
    /// threshold (no published signal carries an `alwaysAlert` override).
    pub fn evaluate(
        &self,
        event: &PaymentEvent,
        aggregator: &Arc<WindowAggregator>,
        links: &Arc<LinkStore>,
    ) -> Option<RiskAlert> {
        let entity_id = event.entity_id();

        aggregator.record(event);
        let features = aggregator.get_features(&entity_id);

        let mut triggered: Vec<SignalType> = Vec::new();
        let mut score = 0.0f64;

        for spec in SIGNAL_TABLE {
            if self.signal_triggers(spec.signal_type, event, features.as_ref(), links) {
                triggered.push(spec.signal_type);
                score += spec.weight;
            }
        }
        score = score.clamp(0.0, 1.0);

        if let (Some(email), Some(par)) = (event.email.as_deref(), event.par.as_deref()) {
            if !email.trim().is_empty() && !par.trim().is_empty() {
                links.link(email, par);
            }
        }

        // No signal in `SIGNAL_TABLE` carries an `alwaysAlert` flag, so the
        // emission gate reduces to the plain score check.
        if score < self.threshold {
            return None;
        }

        let mut sorted_signals = triggered.clone();
        sorted_signals.sort();

        let alert_id = compute_alert_id(event.event_id.as_deref().unwrap_or(""), &sorted_signals);

        let highest_weight_signal = SIGNAL_TABLE
            .iter()
            .filter(|spec| triggered.contains(&spec.signal_type))
            .max_by(|a, b| a.weight.partial_cmp(&b.weight).unwrap());

        let summary = highest_weight_signal
            .map(|s| s.summary.to_string())
            .unwrap_or_else(|| "risk threshold exceeded".to_string());

        let related_event_ids = aggregator.recent_event_ids(&entity_id, 10);

        Some(RiskAlert {
            alert_id,
            timestamp: Utc::now(),
            level: self.level_for(score),
            signal_types: sorted_signals,
            risk_score: score,
            entity_id,
            entity_type: crate::types::EntityType::default(),
            related_event_ids,
            amount: event.amount.unwrap_or(Decimal::ZERO),
            currency_code: event.currency_code.clone(),
            summary,
            detailed_explanation: None,
        })
    }

    fn signal_triggers(
        &self,
        signal: SignalType,
        event: &PaymentEvent,
        features: Option<&WindowFeatures>,
        links: &Arc<LinkStore>,
    ) -> bool {
        match signal {
            SignalType::HighFailureRate => features.is_some_and(|f| {
                f.total_count >= 3 && f.failure_rate >= 0.5
            }),
            SignalType::VelocitySpike => {
                features.is_some_and(|f| f.count_last_1min >= 10)
            }
            SignalType::LargeAmount => {
                let Some(f) = features else { return false };
                let Some(amount) = event.amount else { return false };
                f.avg_amount > Decimal::ZERO && amount >= f.avg_amount * Decimal::from(3)
            }
            SignalType::AmountEscalation => features.is_some_and(|f| {
                f.increasing_amount_count >= 3 && f.avg_time_gap_seconds < 30.0
            }),
            SignalType::OffHours => {
                let Some(f) = features else { return false };
                let Some(amount) = event.amount else { return false };
                let threshold = f.avg_amount.max(Decimal::from(500));
                (0..=5).contains(&f.hour_of_day) && amount > threshold
            }
            SignalType::EmailMultiplePar => {
                let Some(email) = event.email.as_deref() else { return false };
                links.pars_for_email(email).len() >= 3
            }
            SignalType::ParMultipleEmail => {
                let Some(par) = event.par.as_deref() else { return false };
                links.emails_for_par(par).len() >= 3
            }
        }
    }
}

fn compute_alert_id(event_id: &str, sorted_signals: &[SignalType]) -> String {
    let signals_part = sorted_signals
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let mut hasher = Sha256::new();
    hasher.update(event_id.as_bytes());
    hasher.update(b"|");
    hasher.update(signals_part.as_bytes());
    hex::encode(hasher.finalize())
}
