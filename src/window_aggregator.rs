// =============================================================================
// WindowAggregator — per-entity rolling window of payment events
// =============================================================================
//
// Maintains, per entity id, an ordered sequence of `EventEntry`. Mutations to
// one entity's sequence are serialized behind that entity's own lock; two
// different entities may be recorded into concurrently without contending.
//
// This is the authoritative in-memory aggregate the rest of the pipeline
// reads from. The substitution point called out in the design notes — a
// durable KV-backed implementation with TTL instead of this in-memory map —
// would only need to preserve the two public operations below; `RiskEngine`
// never sees anything but a `WindowFeatures` snapshot.
// =============================================================================

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Timelike, Utc};
use parking_lot::RwLock;
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::warn;

use crate::types::{EntityType, PaymentEvent};

/// An immutable, append-only record of one event inside an entity's window.
#[derive(Debug, Clone)]
pub struct EventEntry {
    pub event_id: String,
    pub timestamp_ms: i64,
    pub amount: Decimal,
    pub is_failure: bool,
}

/// Derived features for one entity, computed over the trailing window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowFeatures {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub window_start_ms: i64,
    pub window_end_ms: i64,
    pub total_count: u64,
    pub failure_count: u64,
    pub failure_rate: f64,
    pub total_amount: Decimal,
    pub avg_amount: Decimal,
    pub max_amount: Decimal,
    pub min_amount: Decimal,
    pub count_last_1min: u64,
    /// Equal to `total_count` — the window itself is 5 minutes, so "last 5
    /// minutes" and "the whole window" are the same set. Preserved as
    /// observed rather than renamed; see SPEC_FULL.md open questions.
    pub count_last_5min: u64,
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub seconds_since_last_transaction: i64,
    pub amount_variance: f64,
    pub amount_trend: i32,
    pub increasing_amount_count: u64,
    pub decreasing_amount_count: u64,
    pub avg_time_gap_seconds: f64,
}

/// Per-entity rolling window store.
pub struct WindowAggregator {
    entities: RwLock<HashMap<String, Arc<RwLock<VecDeque<EventEntry>>>>>,
    window_ms: i64,
    velocity_1m_ms: i64,
}

impl WindowAggregator {
    pub fn new(window_ms: u64, velocity_1m_ms: u64) -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            window_ms: window_ms as i64,
            velocity_1m_ms: velocity_1m_ms as i64,
        }
    }

    fn entity_slot(&self, entity_id: &str) -> Arc<RwLock<VecDeque<EventEntry>>> {
        if let Some(slot) = self.entities.read().get(entity_id) {
            return slot.clone();
        }
        self.entities
            .write()
            .entry(entity_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(VecDeque::new())))
            .clone()
    }

    /// Record one event. Normalizes a missing timestamp to "now" and a
    /// missing amount to zero (both logged as warnings), appends an entry,
    /// then evicts anything older than `now - window_ms` from the *same*
    /// entity's sequence.
    pub fn record(&self, event: &PaymentEvent) {
        let entity_id = event.entity_id();
        let now = Utc::now();

        let timestamp_ms = match event.timestamp {
            Some(ts) => ts.timestamp_millis(),
            None => {
                warn!(entity_id = %entity_id, "event missing timestamp, substituting receive time");
                now.timestamp_millis()
            }
        };

        let amount = match event.amount {
            Some(a) => a,
            None => {
                warn!(entity_id = %entity_id, "event missing amount, substituting zero");
                Decimal::ZERO
            }
        };

        let entry = EventEntry {
            event_id: event.event_id.clone().unwrap_or_default(),
            timestamp_ms,
            amount,
            is_failure: event.is_failure(),
        };

        let slot = self.entity_slot(&entity_id);
        let mut seq = slot.write();
        seq.push_back(entry);
        evict_older_than(&mut seq, now.timestamp_millis() - self.window_ms);
    }

    /// Snapshot the window for `entity_id` and compute derived features.
    /// Returns `None` when no in-window entries exist.
    pub fn get_features(&self, entity_id: &str) -> Option<WindowFeatures> {
        let slot = self.entities.read().get(entity_id).cloned()?;
        let now_ms = Utc::now().timestamp_millis();

        let snapshot: Vec<EventEntry> = {
            let mut seq = slot.write();
            evict_older_than(&mut seq, now_ms - self.window_ms);
            seq.iter().cloned().collect()
        };

        if snapshot.is_empty() {
            return None;
        }

        let mut entries = snapshot;
        entries.sort_by_key(|e| e.timestamp_ms);

        Some(compute_features(
            entity_id,
            &entries,
            now_ms,
            self.window_ms,
            self.velocity_1m_ms,
        ))
    }

    /// Equivalent to `get_features(entity_id_from(event))`. Does not record
    /// the event — a pre-event view of the window for callers that want to
    /// inspect state without mutating it.
    pub fn get_features_from_event(&self, event: &PaymentEvent) -> Option<WindowFeatures> {
        self.get_features(&event.entity_id())
    }

    /// Up to the last `limit` event ids recorded for `entity_id`, oldest
    /// first truncated to the newest `limit` — used to populate
    /// `RiskAlert::related_event_ids`.
    pub fn recent_event_ids(&self, entity_id: &str, limit: usize) -> Vec<String> {
        let Some(slot) = self.entities.read().get(entity_id).cloned() else {
            return Vec::new();
        };
        let seq = slot.read();
        let skip = seq.len().saturating_sub(limit);
        seq.iter().skip(skip).map(|e| e.event_id.clone()).collect()
    }
}

fn evict_older_than(seq: &mut VecDeque<EventEntry>, cutoff_ms: i64) {
    while let Some(front) = seq.front() {
        if front.timestamp_ms < cutoff_ms {
            seq.pop_front();
        } else {
            break;
        }
    }
}

fn compute_features(
    entity_id: &str,
    entries: &[EventEntry],
    now_ms: i64,
    window_ms: i64,
    velocity_1m_ms: i64,
) -> WindowFeatures {
    let total_count = entries.len() as u64;
    let failure_count = entries.iter().filter(|e| e.is_failure).count() as u64;
    let failure_rate = if total_count > 0 {
        failure_count as f64 / total_count as f64
    } else {
        0.0
    };

    let total_amount: Decimal = entries.iter().map(|e| e.amount).sum();
    let avg_amount = if total_count > 0 {
        (total_amount / Decimal::from(total_count))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    } else {
        Decimal::ZERO
    };

    let max_amount = entries.iter().map(|e| e.amount).max().unwrap_or(Decimal::ZERO);
    let min_amount = entries.iter().map(|e| e.amount).min().unwrap_or(Decimal::ZERO);

    let count_last_1min = entries
        .iter()
        .filter(|e| e.timestamp_ms >= now_ms - velocity_1m_ms)
        .count() as u64;

    let last = entries.last().expect("entries is non-empty");
    let last_ts: DateTime<Utc> = DateTime::from_timestamp_millis(last.timestamp_ms)
        .unwrap_or_else(Utc::now);
    let hour_of_day = last_ts.hour();
    let day_of_week = last_ts.weekday().num_days_from_monday();

    let seconds_since_last_transaction = if entries.len() >= 2 {
        let prev_ts = entries[entries.len() - 2].timestamp_ms;
        (now_ms - prev_ts) / 1000
    } else {
        0
    };

    let amounts: Vec<f64> = entries.iter().map(|e| e.amount.to_f64().unwrap_or(0.0)).collect();
    let amount_variance = population_variance(&amounts);

    let amount_trend = if entries.len() >= 2 {
        let first = entries.first().unwrap().amount;
        let last_amount = last.amount;
        match last_amount.cmp(&first) {
            std::cmp::Ordering::Greater => 1,
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
        }
    } else {
        0
    };

    let mut increasing_amount_count = 0u64;
    let mut decreasing_amount_count = 0u64;
    for pair in entries.windows(2) {
        if pair[1].amount > pair[0].amount {
            increasing_amount_count += 1;
        } else if pair[1].amount < pair[0].amount {
            decreasing_amount_count += 1;
        }
    }

    let avg_time_gap_seconds = if entries.len() >= 2 {
        let gaps: Vec<f64> = entries
            .windows(2)
            .map(|pair| (pair[1].timestamp_ms - pair[0].timestamp_ms) as f64 / 1000.0)
            .collect();
        gaps.iter().sum::<f64>() / gaps.len() as f64
    } else {
        0.0
    };

    WindowFeatures {
        entity_id: entity_id.to_string(),
        entity_type: EntityType::default(),
        window_start_ms: now_ms - window_ms,
        window_end_ms: now_ms,
        total_count,
        failure_count,
        failure_rate,
        total_amount,
        avg_amount,
        max_amount,
        min_amount,
        count_last_1min,
        count_last_5min: total_count,
        hour_of_day,
        day_of_week,
        seconds_since_last_transaction,
        amount_variance,
        amount_trend,
        increasing_amount_count,
        decreasing_amount_count,
        avg_time_gap_seconds,
    }
}

fn population_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
