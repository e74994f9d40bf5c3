// =============================================================================
// RecentAlertsStore — bounded ring buffer of the most recent risk alerts
// =============================================================================
//
// Backs `GET /api/v1/risk/alerts`. Newest alert first; once the buffer hits
// its configured capacity the oldest entry is dropped. Same push-then-trim
// idiom as the rest of the pipeline's ring buffers, just newest-first instead
// of oldest-first since readers almost always want "what just happened".
// =============================================================================

use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::types::RiskAlert;

pub struct RecentAlertsStore {
    alerts: RwLock<VecDeque<RiskAlert>>,
    max: usize,
}

impl RecentAlertsStore {
    pub fn new(max: usize) -> Self {
        Self {
            alerts: RwLock::new(VecDeque::with_capacity(max)),
            max,
        }
    }

    pub fn add(&self, alert: RiskAlert) {
        let mut alerts = self.alerts.write();
        alerts.push_front(alert);
        while alerts.len() > self.max {
            alerts.pop_back();
        }
    }

    /// The `limit` most recent alerts, newest first. `limit` is clamped to
    /// the buffer's own capacity.
    pub fn get_recent(&self, limit: usize) -> Vec<RiskAlert> {
        let alerts = self.alerts.read();
        alerts.iter().take(limit.min(self.max)).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
