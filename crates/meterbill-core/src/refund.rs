//! # Refund Module
//!
//! Validates a refund against a prior payment and produces the refund record.
//!
//! ## Refund Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RefundRequest + Payment + earlier refunds on that payment             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  refund_id is a UUID ?                ── no ──► Validation(Format)     │
//! │  amount > 0 ?                         ── no ──► InvalidAmount          │
//! │  request.payment_id == payment ?      ── no ──► Validation(Mismatch)   │
//! │  reason given ?                       ── no ──► Validation(Required)   │
//! │  amount ≤ paid − already refunded ?   ── no ──► RefundExceedsPayment   │
//! │  bank transfer ⇒ bank details ?       ── no ──► MissingBankDetails     │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  Refund { reference: REF-2026-0001, ... }                               │
//! │  net_received = paid − all refunds                                      │
//! │  payment status = Refunded | PartiallyRefunded                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The payment's own `amount` is never touched. Refunds are deductions kept
//! alongside it.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Payment, PaymentStatus};
use crate::validation::{validate_bank_details, validate_reason, validate_uuid};

// =============================================================================
// Refund Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RefundMethod {
    Cash,
    BankTransfer,
    Card,
    Cheque,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_number: String,
    #[serde(default)]
    pub account_holder: Option<String>,
}

/// What the customer (or an operator) asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundRequest {
    pub payment_id: String,
    pub refund_amount: Money,
    pub reason: String,
    pub method: RefundMethod,
    #[serde(default)]
    pub bank_details: Option<BankDetails>,
}

/// A processed refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Refund {
    pub refund_id: String,
    pub payment_id: String,
    pub refund_amount: Money,
    pub reason: String,
    pub method: RefundMethod,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub processed_by: String,
    pub reference: String,
    #[serde(default)]
    pub bank_details: Option<BankDetails>,
}

/// Identity and clock for one refund, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundContext {
    /// Must be a UUID.
    pub refund_id: String,
    pub date: NaiveDate,
    pub processed_by: String,
    /// Per-year running number used in the reference.
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundOutcome {
    pub refund: Refund,
    /// Payment amount minus every refund on it, this one included.
    pub net_received: Money,
    pub payment_status: PaymentStatus,
}

// =============================================================================
// Reference Format
// =============================================================================

/// Renders refund references as `{prefix}-{year}-{sequence}`.
///
/// ```rust
/// use chrono::NaiveDate;
/// use meterbill_core::refund::RefundReferenceFormat;
///
/// let format = RefundReferenceFormat::default();
/// let date = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
/// assert_eq!(format.render(date, 1), "REF-2026-0001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReferenceFormat {
    pub prefix: String,
    /// Zero-padded width of the sequence number.
    pub width: usize,
}

impl Default for RefundReferenceFormat {
    fn default() -> Self {
        RefundReferenceFormat {
            prefix: "REF".to_string(),
            width: 4,
        }
    }
}

impl RefundReferenceFormat {
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        RefundReferenceFormat {
            prefix: prefix.into(),
            width,
        }
    }

    pub fn render(&self, date: NaiveDate, sequence: u32) -> String {
        format!(
            "{}-{}-{:0width$}",
            self.prefix,
            date.year(),
            sequence,
            width = self.width
        )
    }
}

// =============================================================================
// Processor
// =============================================================================

/// Validates refund requests and produces refund records.
#[derive(Debug, Clone, Default)]
pub struct RefundProcessor {
    reference_format: RefundReferenceFormat,
}

impl RefundProcessor {
    pub fn new(reference_format: RefundReferenceFormat) -> Self {
        RefundProcessor { reference_format }
    }

    /// What can still be refunded on `payment` given `previous_refunds`.
    ///
    /// Refunds recorded against other payments are ignored. The result never
    /// exceeds `payment.amount`.
    ///
    /// ## Errors
    /// `InvalidAmount` when an earlier refund on this payment is zero or
    /// negative, or when their sum overflows.
    pub fn refundable(payment: &Payment, previous_refunds: &[Refund]) -> CoreResult<Money> {
        let on_payment: Vec<&Refund> = previous_refunds
            .iter()
            .filter(|r| r.payment_id == payment.payment_id)
            .collect();

        if let Some(bad) = on_payment.iter().find(|r| !r.refund_amount.is_positive()) {
            return Err(CoreError::invalid_amount(
                "previous refund amount",
                format!(
                    "refund {} must be greater than zero, got {}",
                    bad.refund_id, bad.refund_amount
                ),
            ));
        }

        let already = Money::try_sum(on_payment.iter().map(|r| r.refund_amount), "previous refunds")?;
        let remaining = payment
            .amount
            .checked_sub(already)
            .ok_or_else(|| CoreError::amount_overflow("refundable balance"))?;
        Ok(remaining.clamp_non_negative().min(payment.amount))
    }

    /// Validates `request` against `payment` and builds the refund.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use meterbill_core::money::Money;
    /// use meterbill_core::refund::{RefundContext, RefundMethod, RefundProcessor, RefundRequest};
    /// use meterbill_core::types::{Payment, PaymentChannel, PaymentMethod, PaymentStatus};
    ///
    /// let date = NaiveDate::from_ymd_opt(2026, 5, 2).unwrap();
    /// let payment = Payment {
    ///     payment_id: "P1".into(),
    ///     bill_id: "B1".into(),
    ///     customer_id: "C1".into(),
    ///     amount: Money::from_cents(50000),
    ///     method: PaymentMethod::Cash,
    ///     channel: PaymentChannel::Counter,
    ///     date,
    ///     status: PaymentStatus::Completed,
    /// };
    /// let request = RefundRequest {
    ///     payment_id: "P1".into(),
    ///     refund_amount: Money::from_cents(60000),
    ///     reason: "Duplicate payment".into(),
    ///     method: RefundMethod::Cash,
    ///     bank_details: None,
    /// };
    /// let context = RefundContext {
    ///     refund_id: "7d9f3c2e-1b4a-4c8e-9f60-2a5b8c1d3e47".into(),
    ///     date,
    ///     processed_by: "cashier-7".into(),
    ///     sequence: 1,
    /// };
    ///
    /// let result = RefundProcessor::default().process(&request, &payment, &[], &context);
    /// assert!(result.is_err());
    /// ```
    ///
    /// ## Errors
    /// Checked in this order:
    /// - `Validation` when `context.refund_id` is not a UUID
    /// - `InvalidAmount` for a zero or negative refund
    /// - `Validation` when the request names another payment or has no reason
    /// - `RefundExceedsPayment` when the amount is above what is refundable
    ///   (`InvalidAmount` if an earlier refund is itself malformed)
    /// - `MissingBankDetails` for a bank transfer without usable details
    pub fn process(
        &self,
        request: &RefundRequest,
        payment: &Payment,
        previous_refunds: &[Refund],
        context: &RefundContext,
    ) -> CoreResult<RefundOutcome> {
        validate_uuid(&context.refund_id)?;

        if !request.refund_amount.is_positive() {
            return Err(CoreError::invalid_amount(
                "refund amount",
                format!("must be greater than zero, got {}", request.refund_amount),
            ));
        }

        if request.payment_id != payment.payment_id {
            return Err(ValidationError::Mismatch {
                field: "payment_id".to_string(),
                expected: payment.payment_id.clone(),
                actual: request.payment_id.clone(),
            }
            .into());
        }

        validate_reason(&request.reason)?;

        let refundable = Self::refundable(payment, previous_refunds)?;
        if request.refund_amount > refundable {
            warn!(
                payment_id = %payment.payment_id,
                requested = %request.refund_amount,
                %refundable,
                "Refund rejected: exceeds refundable balance"
            );
            return Err(CoreError::RefundExceedsPayment {
                payment_id: payment.payment_id.clone(),
                requested: request.refund_amount,
                refundable,
            });
        }

        if request.method == RefundMethod::BankTransfer {
            let details = request
                .bank_details
                .as_ref()
                .ok_or_else(|| CoreError::MissingBankDetails {
                    reason: "no bank details supplied".to_string(),
                })?;
            validate_bank_details(&details.bank_name, &details.account_number).map_err(|e| {
                warn!(payment_id = %payment.payment_id, error = %e, "Refund rejected: bad bank details");
                CoreError::MissingBankDetails {
                    reason: e.to_string(),
                }
            })?;
        }

        let net_received = refundable - request.refund_amount;
        let payment_status = if net_received.is_zero() {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };

        let refund = Refund {
            refund_id: context.refund_id.clone(),
            payment_id: payment.payment_id.clone(),
            refund_amount: request.refund_amount,
            reason: request.reason.trim().to_string(),
            method: request.method,
            date: context.date,
            processed_by: context.processed_by.clone(),
            reference: self.reference_format.render(context.date, context.sequence),
            bank_details: request.bank_details.clone(),
        };

        debug!(
            payment_id = %refund.payment_id,
            reference = %refund.reference,
            amount = %refund.refund_amount,
            %net_received,
            "Refund processed"
        );

        Ok(RefundOutcome {
            refund,
            net_received,
            payment_status,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
