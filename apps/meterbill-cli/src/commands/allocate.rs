//! # Allocate Command
//!
//! Applies one customer payment to that customer's open bills.
//!
//! ## Flow
//! ```text
//! AllocateRequest
//!      │
//!      ▼
//! order_bills(request.order or config order)
//!      │
//!      ▼
//! allocate ──► NoOutstandingBills? ──► whole amount becomes credit
//!      │
//!      ▼
//! one Payment row per touched bill (new UUID each)
//!      │
//!      ▼
//! excess > 0 ──► Overpayment record
//! ```

use chrono::NaiveDate;
use meterbill_core::allocation::{allocate, order_bills, AllocationOrder, AllocationResult};
use meterbill_core::overpayment::{Overpayment, OverpaymentTracker};
use meterbill_core::validation::validate_payment_amount;
use meterbill_core::{CoreError, Money, OpenBill, Payment, PaymentChannel, PaymentMethod, PaymentStatus};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::BillingConfig;
use crate::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
pub struct AllocateRequest {
    pub payment_amount: Money,
    pub customer_id: String,
    pub method: PaymentMethod,
    pub channel: PaymentChannel,
    /// Settlement date; today when omitted.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub bills: Vec<OpenBill>,
    /// Overrides the configured allocation order.
    #[serde(default)]
    pub order: Option<AllocationOrder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocateResponse {
    pub order: AllocationOrder,
    pub allocation: AllocationResult,
    pub payments: Vec<Payment>,
    pub overpayment: Option<Overpayment>,
}

pub fn run(input: &str, config: &BillingConfig) -> Result<AllocateResponse, ApiError> {
    let request: AllocateRequest = serde_json::from_str(input)?;
    let date = request
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    allocate_payment(request, date, config, || Uuid::new_v4().to_string())
}

/// Runs the allocation with an explicit date and id source.
pub fn allocate_payment<F>(
    request: AllocateRequest,
    date: NaiveDate,
    config: &BillingConfig,
    mut next_id: F,
) -> Result<AllocateResponse, ApiError>
where
    F: FnMut() -> String,
{
    validate_payment_amount(request.payment_amount.cents())?;
    if request.customer_id.trim().is_empty() {
        return Err(ApiError::validation("customer_id is required"));
    }

    let order = request.order.unwrap_or(config.allocation.order);
    let bills = order_bills(&request.bills, order);

    let mut result = match allocate(request.payment_amount, &bills) {
        Ok(result) => result,
        Err(CoreError::NoOutstandingBills { excess }) => {
            info!(
                customer_id = %request.customer_id,
                %excess,
                "No open bills; keeping the payment as credit"
            );
            AllocationResult::unallocated(excess)
        }
        Err(e) => return Err(e.into()),
    };

    let drafts = result.payment_drafts(request.method, request.channel, date);
    let ids: Vec<String> = drafts.iter().map(|_| next_id()).collect();
    result.attach_payment_ids(ids)?;

    let payments: Vec<Payment> = drafts
        .into_iter()
        .zip(result.payment_ids.iter())
        .map(|(draft, payment_id)| Payment {
            payment_id: payment_id.clone(),
            bill_id: draft.bill_id,
            customer_id: request.customer_id.clone(),
            amount: draft.amount,
            method: draft.method,
            channel: draft.channel,
            date: draft.date,
            status: PaymentStatus::Completed,
        })
        .collect();

    // The credit is keyed to the last payment row, or to a fresh id when
    // nothing was placed on a bill.
    let overpayment_payment_id = result
        .payment_ids
        .last()
        .cloned()
        .unwrap_or_else(&mut next_id);
    let mut tracker = OverpaymentTracker::new();
    let overpayment = tracker
        .record_allocation_excess(&result, &overpayment_payment_id, &request.customer_id, date)
        .cloned();

    info!(
        customer_id = %request.customer_id,
        amount = %result.total_payment_amount,
        allocated = %result.total_allocated,
        excess = %result.excess_amount,
        payments = payments.len(),
        %order,
        "Payment allocated"
    );

    Ok(AllocateResponse {
        order,
        allocation: result,
        payments,
        overpayment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 2).unwrap()
    }

    fn counter_ids() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("PAY-{}", n)
        }
    }

    fn request(json: &str) -> AllocateRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_oldest_due_first_by_default() {
        let req = request(
            r#"{
                "payment_amount": 300000,
                "customer_id": "CUST-1",
                "method": "cash",
                "channel": "counter",
                "bills": [
                    { "bill_id": "B-MAY", "outstanding": 100000, "due_date": "2026-05-31" },
                    { "bill_id": "B-MAR", "outstanding": 250000, "due_date": "2026-03-31" }
                ]
            }"#,
        );

        let response = allocate_payment(req, date(), &BillingConfig::default(), counter_ids()).unwrap();
        assert_eq!(response.order, AllocationOrder::OldestDueFirst);
        assert_eq!(response.allocation.allocations[0].bill_id, "B-MAR");
        assert_eq!(response.allocation.allocations[1].allocated_amount.cents(), 50000);
        assert_eq!(response.payments.len(), 2);
        assert_eq!(response.payments[0].payment_id, "PAY-1");
        assert_eq!(response.payments[1].amount.cents(), 50000);
        assert!(response.overpayment.is_none());
    }

    #[test]
    fn test_request_order_overrides_config() {
        let req = request(
            r#"{
                "payment_amount": 1000,
                "customer_id": "CUST-1",
                "method": "card",
                "channel": "portal",
                "order": "as_given",
                "bills": [
                    { "bill_id": "B-MAY", "outstanding": 1000, "due_date": "2026-05-31" },
                    { "bill_id": "B-MAR", "outstanding": 1000, "due_date": "2026-03-31" }
                ]
            }"#,
        );
        let response = allocate_payment(req, date(), &BillingConfig::default(), counter_ids()).unwrap();
        assert_eq!(response.allocation.allocations.len(), 1);
        assert_eq!(response.allocation.allocations[0].bill_id, "B-MAY");
    }

    #[test]
    fn test_excess_becomes_overpayment() {
        let req = request(
            r#"{
                "payment_amount": 500000,
                "customer_id": "CUST-1",
                "method": "online",
                "channel": "portal",
                "bills": [
                    { "bill_id": "1", "outstanding": 250000 },
                    { "bill_id": "2", "outstanding": 100000 }
                ]
            }"#,
        );
        let response = allocate_payment(req, date(), &BillingConfig::default(), counter_ids()).unwrap();
        let credit = response.overpayment.unwrap();
        assert_eq!(credit.overpayment_amount.cents(), 150000);
        assert_eq!(credit.payment_id, "PAY-2");
        assert_eq!(credit.customer_id, "CUST-1");
    }

    #[test]
    fn test_no_open_bills_is_full_credit() {
        let req = request(
            r#"{
                "payment_amount": 20000,
                "customer_id": "CUST-2",
                "method": "cash",
                "channel": "counter",
                "bills": []
            }"#,
        );
        let response = allocate_payment(req, date(), &BillingConfig::default(), counter_ids()).unwrap();
        assert!(response.payments.is_empty());
        let credit = response.overpayment.unwrap();
        assert_eq!(credit.overpayment_amount.cents(), 20000);
        assert_eq!(credit.bill_id, None);
        assert_eq!(credit.payment_id, "PAY-1");
    }

    #[test]
    fn test_invalid_amount_and_customer() {
        let zero = request(
            r#"{ "payment_amount": 0, "customer_id": "C", "method": "cash",
                 "channel": "counter", "bills": [] }"#,
        );
        let err = allocate_payment(zero, date(), &BillingConfig::default(), counter_ids()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let anonymous = request(
            r#"{ "payment_amount": 10, "customer_id": " ", "method": "cash",
                 "channel": "counter", "bills": [] }"#,
        );
        assert!(allocate_payment(anonymous, date(), &BillingConfig::default(), counter_ids()).is_err());
    }

    #[test]
    fn test_run_generates_uuid_payment_ids() {
        let input = r#"{
            "payment_amount": 1000,
            "customer_id": "CUST-1",
            "method": "cash",
            "channel": "counter",
            "date": "2026-05-02",
            "bills": [ { "bill_id": "1", "outstanding": 1000 } ]
        }"#;
        let response = run(input, &BillingConfig::default()).unwrap();
        assert!(Uuid::parse_str(&response.payments[0].payment_id).is_ok());
        assert_eq!(response.payments[0].date, date());
    }
}
