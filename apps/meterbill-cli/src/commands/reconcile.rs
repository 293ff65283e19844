//! # Reconcile & Collections Commands
//!
//! `reconcile` compares expected totals with recorded payments for a day.
//! `collections` is the plain daily collection report with no expectations.

use chrono::NaiveDate;
use meterbill_core::reconciliation::{
    reconcile, summarize_collections, CategoryGrouping, CollectionTotal, ExpectedTotal,
    ReconciliationReport,
};
use meterbill_core::Payment;
use serde::Deserialize;
use tracing::info;

use crate::config::BillingConfig;
use crate::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileRequest {
    pub date: NaiveDate,
    pub expected: Vec<ExpectedTotal>,
    pub payments: Vec<Payment>,
    /// Overrides the configured threshold.
    #[serde(default)]
    pub threshold_bps: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionsRequest {
    pub date: NaiveDate,
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub grouping: CategoryGrouping,
}

pub fn run(input: &str, config: &BillingConfig) -> Result<ReconciliationReport, ApiError> {
    let request: ReconcileRequest = serde_json::from_str(input)?;

    let threshold_bps = request
        .threshold_bps
        .unwrap_or(config.reconciliation.threshold_bps);
    if threshold_bps > 10_000 {
        return Err(ApiError::validation(format!(
            "threshold_bps must be at most 10000, got {}",
            threshold_bps
        )));
    }

    let report = reconcile(&request.expected, &request.payments, request.date, threshold_bps);
    info!(
        date = %report.date,
        status = ?report.status,
        variance = %report.total_variance,
        "Reconciliation report built"
    );
    Ok(report)
}

pub fn run_collections(input: &str) -> Result<Vec<CollectionTotal>, ApiError> {
    let request: CollectionsRequest = serde_json::from_str(input)?;
    let totals = summarize_collections(&request.payments, request.date, request.grouping);
    info!(date = %request.date, categories = totals.len(), "Collection report built");
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use meterbill_core::reconciliation::ReconciliationStatus;

    const PAYMENTS: &str = r#"[
        { "payment_id": "P1", "bill_id": "B1", "customer_id": "C1", "amount": 990000,
          "method": "cash", "channel": "counter", "date": "2026-05-02" },
        { "payment_id": "P2", "bill_id": "B2", "customer_id": "C2", "amount": 500000,
          "method": "card", "channel": "portal", "date": "2026-05-02" }
    ]"#;

    fn request(expected: &str, threshold: &str) -> String {
        format!(
            r#"{{ "date": "2026-05-02", "expected": {}, "payments": {} {} }}"#,
            expected, PAYMENTS, threshold
        )
    }

    #[test]
    fn test_needs_review_with_default_threshold() {
        let input = request(
            r#"[ { "category": "cash", "expected_amount": 1000000 },
                 { "category": "card", "expected_amount": 500000 } ]"#,
            "",
        );
        let report = run(&input, &BillingConfig::default()).unwrap();
        assert_eq!(report.threshold_bps, 200);
        assert_eq!(report.status, ReconciliationStatus::NeedsReview);
    }

    #[test]
    fn test_threshold_override() {
        let input = request(
            r#"[ { "category": "cash", "expected_amount": 1000000 },
                 { "category": "card", "expected_amount": 500000 } ]"#,
            r#", "threshold_bps": 50"#,
        );
        let report = run(&input, &BillingConfig::default()).unwrap();
        assert_eq!(report.status, ReconciliationStatus::DiscrepancyFound);

        let bad = request("[]", r#", "threshold_bps": 20000"#);
        assert_eq!(
            run(&bad, &BillingConfig::default()).unwrap_err().code,
            ErrorCode::ValidationError
        );
    }

    #[test]
    fn test_channel_expectations() {
        let input = request(
            r#"[ { "category": "counter", "expected_amount": 990000 },
                 { "category": "portal", "expected_amount": 500000 } ]"#,
            "",
        );
        let report = run(&input, &BillingConfig::default()).unwrap();
        assert_eq!(report.status, ReconciliationStatus::Balanced);
        assert_eq!(report.lines.len(), 2);
    }

    #[test]
    fn test_collections_by_channel() {
        let input = format!(
            r#"{{ "date": "2026-05-02", "payments": {}, "grouping": "channel" }}"#,
            PAYMENTS
        );
        let totals = run_collections(&input).unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].amount.cents(), 990000);
        assert_eq!(totals[1].payment_count, 1);
    }
}
