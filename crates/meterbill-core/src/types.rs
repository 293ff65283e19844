//! # Domain Types
//!
//! Shared domain types used across the billing and payment components.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    OpenBill     │   │    Payment      │   │   BillStatus    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bill_id        │   │  payment_id     │   │  Unpaid         │       │
//! │  │  outstanding    │   │  bill_id        │   │  PartiallyPaid  │       │
//! │  │  due_date       │   │  amount         │   │  Paid           │       │
//! │  └─────────────────┘   │  method/channel │   │  Overdue        │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │ PaymentMethod   │   │ PaymentStatus   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Cash, Card     │   │  Completed      │       │
//! │  │  1500 = 15%     │   │  Online, ...    │   │  (Partially)    │       │
//! │  └─────────────────┘   └─────────────────┘   │  Refunded       │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1500 bps = 15% VAT, 250 bps = 2.5% levy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a whole percentage (15 → 15%).
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        TaxRate(percent * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Tariff Category
// =============================================================================

/// Customer class a tariff schedule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TariffCategory {
    Domestic,
    Religious,
    GeneralPurpose,
    Industrial,
    Hotel,
    Government,
}

// =============================================================================
// Payment Method / Channel / Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash at a collection counter.
    Cash,
    /// Card on a counter terminal.
    Card,
    /// Confirmed payment from the external gateway.
    Online,
    /// Direct bank transfer or deposit.
    BankTransfer,
    Cheque,
}

/// Where the payment was collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentChannel {
    Counter,
    Portal,
    MobileApp,
    Bank,
}

/// Payment lifecycle. Only refunds move a payment out of `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Completed,
    PartiallyRefunded,
    Refunded,
}

// =============================================================================
// Payment
// =============================================================================

/// A settled payment against one bill.
///
/// A single customer payment spread over several bills produces one
/// `Payment` per bill touched. `amount` never changes after creation; refunds
/// are recorded separately and only move `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub payment_id: String,
    pub bill_id: String,
    pub customer_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub channel: PaymentChannel,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub status: PaymentStatus,
}

// =============================================================================
// Open Bill
// =============================================================================

/// A bill as seen by the allocator: its id and what is still owed.
///
/// `outstanding` is already net of earlier payments. `due_date` only feeds
/// [`crate::allocation::order_bills`]; the allocator itself ignores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OpenBill {
    pub bill_id: String,
    pub outstanding: Money,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
}

impl OpenBill {
    pub fn new(bill_id: impl Into<String>, outstanding: Money) -> Self {
        OpenBill {
            bill_id: bill_id.into(),
            outstanding,
            due_date: None,
        }
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

// =============================================================================
// Bill Status
// =============================================================================

/// Settlement state of an issued bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    #[default]
    Unpaid,
    PartiallyPaid,
    Paid,
    Overdue,
}

impl BillStatus {
    /// Derives the status of a bill from what was billed and what was paid.
    ///
    /// ```text
    /// outstanding == 0                 → Paid
    /// outstanding > 0, as_of > due     → Overdue
    /// paid > 0                         → PartiallyPaid
    /// otherwise                        → Unpaid
    /// ```
    pub fn derive(total: Money, paid: Money, due_date: NaiveDate, as_of: NaiveDate) -> Self {
        let outstanding = outstanding(total, paid);
        if outstanding.is_zero() {
            BillStatus::Paid
        } else if as_of > due_date {
            BillStatus::Overdue
        } else if paid.is_positive() {
            BillStatus::PartiallyPaid
        } else {
            BillStatus::Unpaid
        }
    }
}

/// What is still owed on a bill: `max(0, total − paid)`.
#[inline]
pub fn outstanding(total: Money, paid: Money) -> Money {
    (total - paid).clamp_non_negative()
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

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(1500);
        assert_eq!(rate.bps(), 1500);
        assert_eq!(TaxRate::from_percent(15), rate);
    }

    #[test]
    fn test_tax_rate_display() {
        assert_eq!(TaxRate::from_bps(1500).to_string(), "15.00%");
        assert_eq!(TaxRate::from_bps(250).to_string(), "2.50%");
    }

    #[test]
    fn test_bill_status_derive() {
        let total = Money::from_cents(250000);
        let due = date(2026, 3, 31);

        assert_eq!(
            BillStatus::derive(total, total, due, date(2026, 4, 5)),
            BillStatus::Paid
        );
        assert_eq!(
            BillStatus::derive(total, Money::from_cents(300000), due, date(2026, 3, 1)),
            BillStatus::Paid
        );
        assert_eq!(
            BillStatus::derive(total, Money::from_cents(1000), due, date(2026, 4, 1)),
            BillStatus::Overdue
        );
        assert_eq!(
            BillStatus::derive(total, Money::from_cents(1000), due, due),
            BillStatus::PartiallyPaid
        );
        assert_eq!(
            BillStatus::derive(total, Money::zero(), due, date(2026, 3, 2)),
            BillStatus::Unpaid
        );
    }

    #[test]
    fn test_outstanding_never_negative() {
        assert_eq!(
            outstanding(Money::from_cents(100), Money::from_cents(150)),
            Money::zero()
        );
        assert_eq!(
            outstanding(Money::from_cents(100), Money::from_cents(40)).cents(),
            60
        );
    }

    #[test]
    fn test_payment_status_default_and_serde() {
        assert_eq!(PaymentStatus::default(), PaymentStatus::Completed);
        let json = serde_json::to_string(&PaymentStatus::PartiallyRefunded).unwrap();
        assert_eq!(json, "\"partially_refunded\"");
        let method: PaymentMethod = serde_json::from_str("\"bank_transfer\"").unwrap();
        assert_eq!(method, PaymentMethod::BankTransfer);
    }
}
