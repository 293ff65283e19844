//! # Refund Command
//!
//! Validates a refund against the original payment and issues the record.
//! The refund id is generated here; the sequence number for the reference
//! comes from the caller, which owns the per-year counter.

use chrono::NaiveDate;
use meterbill_core::refund::{Refund, RefundContext, RefundOutcome, RefundProcessor, RefundRequest};
use meterbill_core::Payment;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::config::BillingConfig;
use crate::error::ApiError;

fn default_processed_by() -> String {
    "meterbill-cli".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundCommand {
    pub request: RefundRequest,
    pub payment: Payment,
    #[serde(default)]
    pub previous_refunds: Vec<Refund>,
    /// Running number for this year's references.
    pub sequence: u32,
    #[serde(default = "default_processed_by")]
    pub processed_by: String,
    /// Refund date; today when omitted.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

pub fn run(input: &str, config: &BillingConfig) -> Result<RefundOutcome, ApiError> {
    let command: RefundCommand = serde_json::from_str(input)?;

    let context = RefundContext {
        refund_id: Uuid::new_v4().to_string(),
        date: command
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive()),
        processed_by: command.processed_by,
        sequence: command.sequence,
    };

    let processor = RefundProcessor::new(config.reference_format());
    let outcome = processor.process(
        &command.request,
        &command.payment,
        &command.previous_refunds,
        &context,
    )?;

    info!(
        refund_id = %outcome.refund.refund_id,
        reference = %outcome.refund.reference,
        amount = %outcome.refund.refund_amount,
        status = ?outcome.payment_status,
        "Refund issued"
    );
    Ok(outcome)
}
