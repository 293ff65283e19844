//! # Money Module
//!
//! Provides the `Money` type and the one rounding routine every monetary
//! computation in the engine goes through.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    60 × 7.85 = 470.99999999999994  ❌ WRONG!                            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    60 units × 785 cents = 47100 cents = 471.00                         │
//! │    Division happens in ONE place: round_half_up_div                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Boundaries
//! ```text
//! Slab amount   = units_milli × rate_cents / 1000      ─┐
//! Tax amount    = base_cents  × rate_bps   / 10000     ─┼─► round_half_up_div
//! Variance %    = variance    × 10000      / expected  ─┘
//! ```
//! Each component is rounded where it is computed, never at the end of a
//! chain, so two implementations fed the same inputs agree to the cent.
//!
//! ## Usage
//! ```rust
//! use meterbill_core::money::Money;
//!
//! let fixed = Money::from_cents(10000);          // 100.00
//! let energy = Money::from_major_minor(2436, 0); // 2436.00
//! assert_eq!((fixed + energy).to_string(), "2536.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::TaxRate;

// =============================================================================
// Shared Rounding
// =============================================================================

/// Divides `numerator` by `denominator`, rounding half-up.
///
/// Ties round away from zero, so `-2.5 → -3` mirrors `2.5 → 3`. This is the
/// single rounding routine of the crate; slab charges, taxes and variance
/// percentages all call it.
///
/// ## Example
/// ```rust
/// use meterbill_core::money::round_half_up_div;
///
/// assert_eq!(round_half_up_div(38040, 100), 380);  // 380.40 → 380
/// assert_eq!(round_half_up_div(825, 100), 8);      // 8.25 → 8
/// assert_eq!(round_half_up_div(850, 100), 9);      // 8.50 → 9
/// assert_eq!(round_half_up_div(-850, 100), -9);
/// ```
///
/// ## Panics
/// Panics if `denominator` is zero. Every call site in this crate divides by a
/// constant scale or by a value already checked to be non-zero.
pub fn round_half_up_div(numerator: i128, denominator: i128) -> i128 {
    let (numerator, denominator) = if denominator < 0 {
        (-numerator, -denominator)
    } else {
        (numerator, denominator)
    };
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator {
        quotient + numerator.signum()
    } else {
        quotient
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: variances and credit adjustments may be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **No float constructor**: money never passes through `f64`
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  TariffSlab.rate_per_unit ──► SlabCharge.amount ──► BillLine.energy     │
/// │                                                                         │
/// │  BillLine.before_tax ──► TaxLine.amount ──► BillLine.total_amount       │
/// │                                                                         │
/// │  OpenBill.outstanding ──► Allocation.allocated ──► Overpayment.amount  │
/// │                                                                         │
/// │  Payment.amount ──► Refund.refund_amount ──► Reconciliation.actual     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use meterbill_core::money::Money;
    ///
    /// let fixed_charge = Money::from_cents(10000); // 100.00
    /// assert_eq!(fixed_charge.cents(), 10000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use meterbill_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(7, 85).cents(), 785);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50, not -4.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// ```rust
    /// use meterbill_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-150).clamp_non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(150).clamp_non_negative().cents(), 150);
    /// ```
    #[inline]
    pub const fn clamp_non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Calculates a percentage of this amount, rounded half-up.
    ///
    /// ## Implementation
    /// `round_half_up_div(amount_cents × bps, 10000)` on i128. A result that
    /// does not fit back into i64 cents is an error, never a wrapped value.
    ///
    /// ## Example
    /// ```rust
    /// use meterbill_core::money::Money;
    /// use meterbill_core::types::TaxRate;
    ///
    /// let before_tax = Money::from_cents(253600); // 2536.00
    /// let vat = TaxRate::from_bps(1500);          // 15%
    /// assert_eq!(before_tax.percent(vat).unwrap().cents(), 38040); // 380.40
    /// ```
    ///
    /// ## Bill Workflow
    /// ```text
    /// beforeTax: 2536.00
    ///      │
    ///      ▼
    /// percent(VAT 15%) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// taxAmount: 380.40 ──► totalAmount: 2916.40
    /// ```
    ///
    /// ## Errors
    /// `InvalidAmount` when the result overflows (only possible above 100%).
    pub fn percent(&self, rate: TaxRate) -> CoreResult<Money> {
        let cents = round_half_up_div(self.0 as i128 * rate.bps() as i128, 10_000);
        Money::try_from_i128(cents, "tax amount")
    }

    /// Narrows an i128 intermediate back to cents.
    pub(crate) fn try_from_i128(cents: i128, field: &str) -> CoreResult<Money> {
        i64::try_from(cents)
            .map(Money)
            .map_err(|_| CoreError::amount_overflow(field))
    }

    /// `self + other`, or `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// `self - other`, or `None` on overflow.
    #[inline]
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Sums `amounts`, failing with `InvalidAmount` for `field` on overflow.
    pub fn try_sum<I>(amounts: I, field: &str) -> CoreResult<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), Money::checked_add)
            .ok_or_else(|| CoreError::amount_overflow(field))
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        std::cmp::min(self, other)
    }

    /// Returns the larger of two amounts.
    #[inline]
    pub fn max(self, other: Money) -> Money {
        std::cmp::max(self, other)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders as a plain two-decimal amount (`1371.00`, `-5.50`).
///
/// ## Note
/// Currency symbols and grouping are a presentation concern of the UI layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, factor: i64) -> Self {
        Money(self.0 * factor)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(137100);
        assert_eq!(money.cents(), 137100);
        assert_eq!(money.major(), 1371);
        assert_eq!(money.minor(), 0);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(7, 85).cents(), 785);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(291640).to_string(), "2916.40");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(0).to_string(), "0.00");
        assert_eq!(Money::from_cents(7).to_string(), "0.07");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_round_half_up_div_ties() {
        assert_eq!(round_half_up_div(5, 10), 1);
        assert_eq!(round_half_up_div(4, 10), 0);
        assert_eq!(round_half_up_div(15, 10), 2);
        assert_eq!(round_half_up_div(25, 10), 3); // not bankers: 2.5 → 3
        assert_eq!(round_half_up_div(-25, 10), -3);
        assert_eq!(round_half_up_div(-24, 10), -2);
        assert_eq!(round_half_up_div(25, -10), -3);
        assert_eq!(round_half_up_div(0, 7), 0);
    }

    #[test]
    fn test_percent_basic() {
        let amount = Money::from_cents(1000);
        assert_eq!(amount.percent(TaxRate::from_bps(1000)).unwrap().cents(), 100);
    }

    #[test]
    fn test_percent_rounds_half_up() {
        // 10.00 at 8.25% = 0.825 → 0.83
        let amount = Money::from_cents(1000);
        assert_eq!(amount.percent(TaxRate::from_bps(825)).unwrap().cents(), 83);

        // 2536.00 at 15% = 380.40 exactly
        let base = Money::from_cents(253600);
        assert_eq!(base.percent(TaxRate::from_bps(1500)).unwrap().cents(), 38040);
    }

    #[test]
    fn test_clamp_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-100).clamp_non_negative(), Money::zero());
        assert_eq!(Money::from_cents(-100).abs().cents(), 100);
        assert_eq!(Money::from_cents(3).min(Money::from_cents(5)).cents(), 3);
        assert_eq!(Money::from_cents(3).max(Money::from_cents(5)).cents(), 5);
    }

    #[test]
    fn test_large_amount_does_not_overflow() {
        let huge = Money::from_cents(i64::MAX / 2);
        let tax = huge.percent(TaxRate::from_bps(10_000)).unwrap();
        assert_eq!(tax, huge);
    }

    #[test]
    fn test_percent_overflow_is_an_error() {
        let huge = Money::from_cents(i64::MAX / 2);
        let err = huge.percent(TaxRate::from_bps(30_000)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));
    }

    #[test]
    fn test_checked_arithmetic() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max.checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(5).checked_add(Money::from_cents(7)),
            Some(Money::from_cents(12))
        );

        assert_eq!(
            Money::try_sum([Money::from_cents(1), Money::from_cents(2)], "total").unwrap(),
            Money::from_cents(3)
        );
        assert!(Money::try_sum([max, max], "total").is_err());
    }
}
