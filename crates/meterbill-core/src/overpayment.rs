//! # Overpayment Module
//!
//! Standing credit created when a payment is larger than what was owed.
//!
//! ## Credit Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  allocate() ── excess > 0 ──► record_allocation_excess ──┐              │
//! │                                                          │              │
//! │  single-bill payment > outstanding ──► record_single_bill┤              │
//! │                                                          ▼              │
//! │                                              ┌──────────────────────┐   │
//! │                                              │  OverpaymentTracker  │   │
//! │                                              │  key: (payment,      │   │
//! │                                              │        bill,         │   │
//! │                                              │        customer)     │   │
//! │                                              └──────────┬───────────┘   │
//! │                         ┌───────────────────────────────┤               │
//! │                         ▼                               ▼               │
//! │              apply_credit(customer, bills)   consume_for_refund(...)    │
//! │              (same allocator, oldest credit   (credit paid back out)    │
//! │               consumed first)                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here applies credit on its own. Both ways of using credit are
//! explicit calls made by the caller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::allocation::{allocate, AllocationResult};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::OpenBill;

// =============================================================================
// Overpayment Record
// =============================================================================

/// Excess money held as credit for a customer.
///
/// `bill_id` is the last bill the payment touched, or `None` when the payment
/// found nothing to pay at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Overpayment {
    pub payment_id: String,
    #[ts(as = "Option<String>")]
    pub bill_id: Option<String>,
    pub customer_id: String,
    pub bill_amount: Money,
    pub total_paid: Money,
    pub overpayment_amount: Money,
    /// Part of the credit already applied to bills or paid out.
    #[serde(default)]
    pub consumed_amount: Money,
    #[ts(as = "String")]
    pub recorded_on: NaiveDate,
}

impl Overpayment {
    /// Credit still available on this record.
    pub fn remaining_credit(&self) -> Money {
        (self.overpayment_amount - self.consumed_amount).clamp_non_negative()
    }

    fn matches_key(&self, payment_id: &str, bill_id: Option<&str>, customer_id: &str) -> bool {
        self.payment_id == payment_id
            && self.bill_id.as_deref() == bill_id
            && self.customer_id == customer_id
    }

    /// Takes up to `amount` from this record, returning what was taken.
    fn consume(&mut self, amount: Money) -> Money {
        let taken = amount.min(self.remaining_credit());
        self.consumed_amount += taken;
        taken
    }
}

// =============================================================================
// Tracker
// =============================================================================

/// Caller-owned ledger of overpayments.
///
/// The tracker holds plain data. Callers that share it across threads wrap it
/// in their own lock; persistence is also theirs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverpaymentTracker {
    entries: Vec<Overpayment>,
}

impl OverpaymentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a tracker from previously persisted records.
    pub fn from_entries(entries: Vec<Overpayment>) -> Self {
        OverpaymentTracker { entries }
    }

    pub fn entries(&self) -> &[Overpayment] {
        &self.entries
    }

    /// Records the excess of a multi-bill allocation.
    ///
    /// Returns `None` when the allocation had no excess.
    pub fn record_allocation_excess(
        &mut self,
        result: &AllocationResult,
        payment_id: &str,
        customer_id: &str,
        date: NaiveDate,
    ) -> Option<&Overpayment> {
        if !result.excess_amount.is_positive() {
            return None;
        }

        let record = Overpayment {
            payment_id: payment_id.to_string(),
            bill_id: result.last_touched_bill().map(str::to_string),
            customer_id: customer_id.to_string(),
            bill_amount: result.total_allocated,
            total_paid: result.total_payment_amount,
            overpayment_amount: result.excess_amount,
            consumed_amount: Money::zero(),
            recorded_on: date,
        };
        Some(self.upsert(record))
    }

    /// Records a single-bill payment that exceeded the bill's outstanding.
    ///
    /// Returns `Ok(None)` when `paid` does not exceed `bill_outstanding`.
    ///
    /// ## Errors
    /// - `InvalidAmount` for a non-positive payment or negative outstanding
    pub fn record_single_bill(
        &mut self,
        payment_id: &str,
        bill_id: &str,
        customer_id: &str,
        bill_outstanding: Money,
        paid: Money,
        date: NaiveDate,
    ) -> CoreResult<Option<&Overpayment>> {
        if !paid.is_positive() {
            return Err(CoreError::invalid_amount(
                "payment amount",
                format!("must be greater than zero, got {}", paid),
            ));
        }
        if bill_outstanding.is_negative() {
            return Err(CoreError::invalid_amount(
                "outstanding",
                format!("bill {} has negative outstanding {}", bill_id, bill_outstanding),
            ));
        }
        if paid <= bill_outstanding {
            return Ok(None);
        }

        let record = Overpayment {
            payment_id: payment_id.to_string(),
            bill_id: Some(bill_id.to_string()),
            customer_id: customer_id.to_string(),
            bill_amount: bill_outstanding,
            total_paid: paid,
            overpayment_amount: paid - bill_outstanding,
            consumed_amount: Money::zero(),
            recorded_on: date,
        };
        Ok(Some(self.upsert(record)))
    }

    /// Inserts or replaces the record with the same key.
    ///
    /// A replaced record keeps what was already consumed, capped at the new
    /// amount.
    fn upsert(&mut self, mut record: Overpayment) -> &Overpayment {
        let position = self.entries.iter().position(|e| {
            e.matches_key(&record.payment_id, record.bill_id.as_deref(), &record.customer_id)
        });

        let index = match position {
            Some(index) => {
                let consumed = self.entries[index].consumed_amount;
                record.consumed_amount = consumed.min(record.overpayment_amount);
                debug!(
                    payment_id = %record.payment_id,
                    amount = %record.overpayment_amount,
                    "Overpayment re-recorded"
                );
                self.entries[index] = record;
                index
            }
            None => {
                debug!(
                    payment_id = %record.payment_id,
                    customer_id = %record.customer_id,
                    amount = %record.overpayment_amount,
                    "Overpayment recorded"
                );
                self.entries.push(record);
                self.entries.len() - 1
            }
        };
        &self.entries[index]
    }

    /// Credits with something left for `customer_id`, oldest first.
    pub fn list_outstanding_credits(&self, customer_id: &str) -> Vec<&Overpayment> {
        let mut credits: Vec<&Overpayment> = self
            .entries
            .iter()
            .filter(|e| e.customer_id == customer_id && e.remaining_credit().is_positive())
            .collect();
        credits.sort_by_key(|e| e.recorded_on);
        credits
    }

    /// Total standing credit for `customer_id`.
    pub fn available_credit(&self, customer_id: &str) -> Money {
        self.list_outstanding_credits(customer_id)
            .iter()
            .map(|e| e.remaining_credit())
            .sum()
    }

    /// Applies the customer's standing credit to `bills` in the order given.
    ///
    /// Runs the same allocator used for cash payments. Credits are consumed
    /// oldest first by the amount actually placed on bills; anything the bills
    /// could not absorb stays as credit.
    ///
    /// ## Errors
    /// - `InsufficientCredit` when the customer has no credit at all
    /// - Any allocator error (`NoOutstandingBills`, `InvalidAmount`)
    pub fn apply_credit(&mut self, customer_id: &str, bills: &[OpenBill]) -> CoreResult<AllocationResult> {
        let available = self.available_credit(customer_id);
        if !available.is_positive() {
            let requested: Money = bills.iter().map(|b| b.outstanding.clamp_non_negative()).sum();
            return Err(CoreError::InsufficientCredit {
                available,
                requested,
            });
        }

        let result = allocate(available, bills)?;
        self.consume_oldest_first(|e| e.customer_id == customer_id, result.total_allocated);

        debug!(
            customer_id,
            applied = %result.total_allocated,
            left = %result.excess_amount,
            "Credit applied to bills"
        );
        Ok(result)
    }

    /// Pays `amount` of the credit created by `payment_id` back out.
    ///
    /// Returns the credit left on that payment afterwards.
    ///
    /// ## Errors
    /// - `InvalidAmount` for a non-positive amount
    /// - `InsufficientCredit` when the payment's remaining credit is smaller
    pub fn consume_for_refund(&mut self, payment_id: &str, amount: Money) -> CoreResult<Money> {
        if !amount.is_positive() {
            return Err(CoreError::invalid_amount(
                "credit payout",
                format!("must be greater than zero, got {}", amount),
            ));
        }

        let available: Money = self
            .entries
            .iter()
            .filter(|e| e.payment_id == payment_id)
            .map(|e| e.remaining_credit())
            .sum();

        if amount > available {
            warn!(payment_id, %amount, %available, "Credit payout rejected");
            return Err(CoreError::InsufficientCredit {
                available,
                requested: amount,
            });
        }

        self.consume_oldest_first(|e| e.payment_id == payment_id, amount);
        Ok(available - amount)
    }

    fn consume_oldest_first<F>(&mut self, select: F, amount: Money)
    where
        F: Fn(&Overpayment) -> bool,
    {
        let mut order: Vec<usize> = (0..self.entries.len())
            .filter(|&i| select(&self.entries[i]))
            .collect();
        order.sort_by_key(|&i| self.entries[i].recorded_on);

        let mut left = amount;
        for index in order {
            if left.is_zero() {
                break;
            }
            left -= self.entries[index].consume(left);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
