//! # Allocation Module
//!
//! Spreads one payment amount over a list of open bills.
//!
//! ## Allocation Walk
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Payment: 3000.00     Bills (in the order given):                       │
//! │                                                                         │
//! │    B1 outstanding 2500.00 ──► allocate 2500.00 ──► after 0.00  (paid)   │
//! │    remaining 500.00                                                     │
//! │    B2 outstanding 1000.00 ──► allocate  500.00 ──► after 500.00         │
//! │    remaining 0.00 ──► STOP (later bills are not touched at all)         │
//! │                                                                         │
//! │  excess = remaining after the last bill (0.00 here)                     │
//! │                                                                         │
//! │  Invariants:                                                            │
//! │    total_payment_amount == total_allocated + excess_amount             │
//! │    allocated_i <= outstanding_before_i                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering Policy
//! The allocator never reorders. Which bill is paid first is a caller
//! decision, made explicit with [`order_bills`] and [`AllocationOrder`]
//! (usually [`AllocationOrder::OldestDueFirst`] so overdue debt is cleared
//! before newer bills).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{OpenBill, PaymentChannel, PaymentMethod};

// =============================================================================
// Ordering
// =============================================================================

/// Order in which open bills receive money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AllocationOrder {
    /// Keep the caller's order.
    AsGiven,
    /// Earliest due date first; bills without a due date go last.
    #[default]
    OldestDueFirst,
    /// Largest outstanding balance first.
    LargestOutstandingFirst,
}

impl std::str::FromStr for AllocationOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "as_given" | "given" => Ok(AllocationOrder::AsGiven),
            "oldest_due_first" | "oldest" => Ok(AllocationOrder::OldestDueFirst),
            "largest_outstanding_first" | "largest" => Ok(AllocationOrder::LargestOutstandingFirst),
            other => Err(ValidationError::InvalidFormat {
                field: "allocation order".to_string(),
                reason: format!(
                    "unknown order '{}'; expected as_given, oldest_due_first or largest_outstanding_first",
                    other
                ),
            }),
        }
    }
}

impl std::fmt::Display for AllocationOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationOrder::AsGiven => write!(f, "as_given"),
            AllocationOrder::OldestDueFirst => write!(f, "oldest_due_first"),
            AllocationOrder::LargestOutstandingFirst => write!(f, "largest_outstanding_first"),
        }
    }
}

/// Returns the bills sorted by `order`.
///
/// The sort is stable and ties are broken by `bill_id`, so the result is the
/// same for the same input whatever order it arrived in.
pub fn order_bills(bills: &[OpenBill], order: AllocationOrder) -> Vec<OpenBill> {
    let mut ordered = bills.to_vec();
    match order {
        AllocationOrder::AsGiven => {}
        AllocationOrder::OldestDueFirst => ordered.sort_by(|a, b| {
            compare_due(a.due_date, b.due_date).then_with(|| a.bill_id.cmp(&b.bill_id))
        }),
        AllocationOrder::LargestOutstandingFirst => ordered.sort_by(|a, b| {
            b.outstanding
                .cmp(&a.outstanding)
                .then_with(|| a.bill_id.cmp(&b.bill_id))
        }),
    }
    ordered
}

fn compare_due(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// =============================================================================
// Allocation Result
// =============================================================================

/// What one bill received from a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Allocation {
    pub bill_id: String,
    pub outstanding_before: Money,
    pub allocated_amount: Money,
    pub outstanding_after: Money,
    pub is_fully_paid: bool,
}

/// Outcome of spreading one payment over a list of bills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AllocationResult {
    pub total_payment_amount: Money,
    pub total_allocated: Money,
    pub excess_amount: Money,
    pub allocations: Vec<Allocation>,
    /// Filled in by the caller once the per-bill payments are persisted.
    pub payment_ids: Vec<String>,
}

/// A payment row to persist for one touched bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentDraft {
    pub bill_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub channel: PaymentChannel,
    #[ts(as = "String")]
    pub date: NaiveDate,
}

impl AllocationResult {
    /// A result where nothing was placed and the whole amount is excess.
    ///
    /// This is what a [`CoreError::NoOutstandingBills`] turns into when the
    /// caller chooses to keep the money as credit.
    pub fn unallocated(payment_amount: Money) -> Self {
        AllocationResult {
            total_payment_amount: payment_amount,
            total_allocated: Money::zero(),
            excess_amount: payment_amount,
            allocations: Vec::new(),
            payment_ids: Vec::new(),
        }
    }

    /// True when part of the payment could not be placed on any bill.
    pub fn has_excess(&self) -> bool {
        self.excess_amount.is_positive()
    }

    /// One payment row per touched bill, in allocation order.
    pub fn payment_drafts(
        &self,
        method: PaymentMethod,
        channel: PaymentChannel,
        date: NaiveDate,
    ) -> Vec<PaymentDraft> {
        self.allocations
            .iter()
            .map(|a| PaymentDraft {
                bill_id: a.bill_id.clone(),
                amount: a.allocated_amount,
                method,
                channel,
                date,
            })
            .collect()
    }

    /// Records the identifiers the caller assigned to the persisted drafts.
    ///
    /// `ids` must line up one-to-one with [`Self::allocations`].
    pub fn attach_payment_ids(&mut self, ids: Vec<String>) -> CoreResult<()> {
        if ids.len() != self.allocations.len() {
            return Err(ValidationError::Mismatch {
                field: "payment id count".to_string(),
                expected: self.allocations.len().to_string(),
                actual: ids.len().to_string(),
            }
            .into());
        }
        self.payment_ids = ids;
        Ok(())
    }

    /// The last bill that received money, if any.
    pub fn last_touched_bill(&self) -> Option<&str> {
        self.allocations.last().map(|a| a.bill_id.as_str())
    }
}

// =============================================================================
// Allocator
// =============================================================================

/// Applies `payment_amount` to `bills` in the order given.
///
/// Bills with nothing outstanding are skipped: they never get an allocation
/// and never produce a payment row. Once the money runs out the walk stops,
/// so bills after that point are absent from the result.
///
/// ## Example
/// ```rust
/// use meterbill_core::allocation::allocate;
/// use meterbill_core::money::Money;
/// use meterbill_core::types::OpenBill;
///
/// let bills = vec![
///     OpenBill::new("B1", Money::from_cents(250000)),
///     OpenBill::new("B2", Money::from_cents(100000)),
/// ];
/// let result = allocate(Money::from_cents(500000), &bills).unwrap();
/// assert_eq!(result.total_allocated.cents(), 350000);
/// assert_eq!(result.excess_amount.cents(), 150000);
/// ```
///
/// ## Errors
/// - `InvalidAmount` when the payment is zero/negative or a bill has a
///   negative outstanding balance
/// - `NoOutstandingBills` when nothing is owed on any supplied bill
pub fn allocate(payment_amount: Money, bills: &[OpenBill]) -> CoreResult<AllocationResult> {
    if !payment_amount.is_positive() {
        return Err(CoreError::invalid_amount(
            "payment amount",
            format!("must be greater than zero, got {}", payment_amount),
        ));
    }

    if let Some(bad) = bills.iter().find(|b| b.outstanding.is_negative()) {
        return Err(CoreError::invalid_amount(
            "outstanding",
            format!("bill {} has negative outstanding {}", bad.bill_id, bad.outstanding),
        ));
    }

    if bills.iter().all(|b| b.outstanding.is_zero()) {
        return Err(CoreError::NoOutstandingBills {
            excess: payment_amount,
        });
    }

    let mut remaining = payment_amount;
    let mut allocations = Vec::new();

    for bill in bills.iter().filter(|b| b.outstanding.is_positive()) {
        if remaining.is_zero() {
            break;
        }

        let allocated = remaining.min(bill.outstanding);
        remaining -= allocated;
        let outstanding_after = bill.outstanding - allocated;

        allocations.push(Allocation {
            bill_id: bill.bill_id.clone(),
            outstanding_before: bill.outstanding,
            allocated_amount: allocated,
            outstanding_after,
            is_fully_paid: outstanding_after.is_zero(),
        });
    }

    let excess_amount = remaining;
    let total_allocated = payment_amount - excess_amount;

    debug!(
        %payment_amount,
        %total_allocated,
        %excess_amount,
        bills_touched = allocations.len(),
        "Payment allocated"
    );

    Ok(AllocationResult {
        total_payment_amount: payment_amount,
        total_allocated,
        excess_amount,
        allocations,
        payment_ids: Vec::new(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn two_bills() -> Vec<OpenBill> {
        vec![
            OpenBill::new("1", Money::from_cents(250000)),
            OpenBill::new("2", Money::from_cents(100000)),
        ]
    }

    #[test]
    fn test_partial_second_bill() {
        let result = allocate(Money::from_cents(300000), &two_bills()).unwrap();

        assert_eq!(result.allocations.len(), 2);
        let first = &result.allocations[0];
        assert_eq!(first.allocated_amount.cents(), 250000);
        assert!(first.outstanding_after.is_zero());
        assert!(first.is_fully_paid);

        let second = &result.allocations[1];
        assert_eq!(second.allocated_amount.cents(), 50000);
        assert_eq!(second.outstanding_after.cents(), 50000);
        assert!(!second.is_fully_paid);

        assert!(result.excess_amount.is_zero());
        assert!(!result.has_excess());
    }

    #[test]
    fn test_overpayment_leaves_excess() {
        let result = allocate(Money::from_cents(500000), &two_bills()).unwrap();
        assert!(result.allocations.iter().all(|a| a.is_fully_paid));
        assert_eq!(result.excess_amount.cents(), 150000);
        assert_eq!(
            result.total_payment_amount,
            result.total_allocated + result.excess_amount
        );
    }

    #[test]
    fn test_stops_once_payment_is_used_up() {
        let bills = vec![
            OpenBill::new("1", Money::from_cents(1000)),
            OpenBill::new("2", Money::from_cents(1000)),
            OpenBill::new("3", Money::from_cents(1000)),
        ];
        let result = allocate(Money::from_cents(1000), &bills).unwrap();
        assert_eq!(result.allocations.len(), 1);
        assert_eq!(result.last_touched_bill(), Some("1"));
    }

    #[test]
    fn test_zero_outstanding_bills_are_skipped() {
        let bills = vec![
            OpenBill::new("settled", Money::zero()),
            OpenBill::new("open", Money::from_cents(700)),
        ];
        let result = allocate(Money::from_cents(500), &bills).unwrap();
        assert_eq!(result.allocations.len(), 1);
        assert_eq!(result.allocations[0].bill_id, "open");
    }

    #[test]
    fn test_invalid_amounts() {
        assert!(matches!(
            allocate(Money::zero(), &two_bills()).unwrap_err(),
            CoreError::InvalidAmount { .. }
        ));
        assert!(matches!(
            allocate(Money::from_cents(-5), &two_bills()).unwrap_err(),
            CoreError::InvalidAmount { .. }
        ));

        let negative = vec![OpenBill::new("x", Money::from_cents(-1))];
        assert!(matches!(
            allocate(Money::from_cents(5), &negative).unwrap_err(),
            CoreError::InvalidAmount { .. }
        ));
    }

    #[test]
    fn test_no_outstanding_bills() {
        match allocate(Money::from_cents(900), &[]).unwrap_err() {
            CoreError::NoOutstandingBills { excess } => assert_eq!(excess.cents(), 900),
            other => panic!("unexpected error: {other}"),
        }

        let settled = vec![OpenBill::new("a", Money::zero()), OpenBill::new("b", Money::zero())];
        assert!(matches!(
            allocate(Money::from_cents(900), &settled).unwrap_err(),
            CoreError::NoOutstandingBills { .. }
        ));
    }

    #[test]
    fn test_order_oldest_due_first() {
        let bills = vec![
            OpenBill::new("no-date", Money::from_cents(100)),
            OpenBill::new("march", Money::from_cents(100)).with_due_date(date(2026, 3, 31)),
            OpenBill::new("jan", Money::from_cents(100)).with_due_date(date(2026, 1, 31)),
        ];
        let ordered = order_bills(&bills, AllocationOrder::OldestDueFirst);
        let ids: Vec<&str> = ordered.iter().map(|b| b.bill_id.as_str()).collect();
        assert_eq!(ids, vec!["jan", "march", "no-date"]);

        let as_given = order_bills(&bills, AllocationOrder::AsGiven);
        assert_eq!(as_given, bills);
    }

    #[test]
    fn test_order_largest_first_breaks_ties_by_id() {
        let bills = vec![
            OpenBill::new("b", Money::from_cents(100)),
            OpenBill::new("a", Money::from_cents(100)),
            OpenBill::new("c", Money::from_cents(900)),
        ];
        let ordered = order_bills(&bills, AllocationOrder::LargestOutstandingFirst);
        let ids: Vec<&str> = ordered.iter().map(|b| b.bill_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_order_parsing() {
        assert_eq!("oldest".parse::<AllocationOrder>().unwrap(), AllocationOrder::OldestDueFirst);
        assert_eq!(
            "largest_outstanding_first".parse::<AllocationOrder>().unwrap(),
            AllocationOrder::LargestOutstandingFirst
        );
        assert!("random".parse::<AllocationOrder>().is_err());
        assert_eq!(AllocationOrder::AsGiven.to_string(), "as_given");
    }

    #[test]
    fn test_payment_drafts_and_ids() {
        let mut result = allocate(Money::from_cents(300000), &two_bills()).unwrap();
        let drafts = result.payment_drafts(PaymentMethod::Cash, PaymentChannel::Counter, date(2026, 5, 2));
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[1].amount.cents(), 50000);

        assert!(result.attach_payment_ids(vec!["p1".into()]).is_err());
        result
            .attach_payment_ids(vec!["p1".into(), "p2".into()])
            .unwrap();
        assert_eq!(result.payment_ids, vec!["p1", "p2"]);
    }
}
