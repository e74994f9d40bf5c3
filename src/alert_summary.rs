// =============================================================================
// AlertSummaryService — optional external enrichment collaborator
// =============================================================================
//
// An LLM-backed (or otherwise) summarizer lives outside this crate. The
// contract is deliberately narrow: `Alert -> Option<String>`, and the
// implementation must be non-blocking or bounded so it can never stall the
// consumer. The default here is a no-op stand-in that always returns `None`.
// =============================================================================

use crate::types::RiskAlert;

#[async_trait::async_trait]
pub trait AlertSummaryService: Send + Sync {
    async fn generate_summary(&self, alert: &RiskAlert) -> Option<String>;
}

pub struct NoOpAlertSummaryService;

#[async_trait::async_trait]
impl AlertSummaryService for NoOpAlertSummaryService {
    async fn generate_summary(&self, _alert: &RiskAlert) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityType, RiskLevel};
    use chrono::Utc;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn no_op_service_always_returns_none() {
        let service = NoOpAlertSummaryService;
        let alert = RiskAlert {
            alert_id: "a1".into(),
            timestamp: Utc::now(),
            level: RiskLevel::Low,
            signal_types: vec![],
            risk_score: 0.1,
            entity_id: "m1".into(),
            entity_type: EntityType::Merchant,
            related_event_ids: vec![],
            amount: Decimal::ZERO,
            currency_code: None,
            summary: String::new(),
            detailed_explanation: None,
        };
        assert!(service.generate_summary(&alert).await.is_none());
    }
}
