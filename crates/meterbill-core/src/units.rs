//! # Units Module
//!
//! Metered quantities (kWh, m³, …) as integer thousandths.
//!
//! Meter registers often show fractional values (`1234.567`). Storing them as
//! `i64` thousandths keeps readings, consumption and slab bounds exact, the
//! same way [`Money`] keeps amounts exact in cents.
//!
//! ```rust
//! use meterbill_core::money::Money;
//! use meterbill_core::units::Units;
//!
//! let used = Units::from_whole(60);
//! assert_eq!(used.charge_at(Money::from_cents(785)).unwrap().cents(), 47100); // 471.00
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::{round_half_up_div, Money};

/// Thousandths per whole unit.
pub const MILLI_PER_UNIT: i64 = 1000;

/// Largest whole-unit count that [`Units::from_whole`] can represent.
pub const MAX_WHOLE_UNITS: i64 = i64::MAX / MILLI_PER_UNIT;

/// A metered quantity in thousandths of a unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Units(i64);

impl Units {
    /// Creates a quantity from thousandths of a unit.
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Units(milli)
    }

    /// Creates a quantity from whole units.
    ///
    /// `whole` must be within `±MAX_WHOLE_UNITS`; see [`Units::checked_from_whole`].
    #[inline]
    pub const fn from_whole(whole: i64) -> Self {
        Units(whole * MILLI_PER_UNIT)
    }

    /// Creates a quantity from whole units, or `None` if it does not fit.
    #[inline]
    pub const fn checked_from_whole(whole: i64) -> Option<Self> {
        match whole.checked_mul(MILLI_PER_UNIT) {
            Some(milli) => Some(Units(milli)),
            None => None,
        }
    }

    /// Returns the quantity in thousandths.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Units(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub fn min(self, other: Units) -> Units {
        std::cmp::min(self, other)
    }

    /// Prices this quantity at `rate` per whole unit, rounded half-up to the cent.
    ///
    /// ```rust
    /// use meterbill_core::money::Money;
    /// use meterbill_core::units::Units;
    ///
    /// // 0.5 kWh at 7.85 = 3.925 → 3.93
    /// let half = Units::from_milli(500);
    /// assert_eq!(half.charge_at(Money::from_cents(785)).unwrap().cents(), 393);
    /// ```
    ///
    /// ## Errors
    /// `InvalidAmount` when the charge does not fit in i64 cents.
    pub fn charge_at(&self, rate: Money) -> CoreResult<Money> {
        let cents = round_half_up_div(
            self.0 as i128 * rate.cents() as i128,
            MILLI_PER_UNIT as i128,
        );
        Money::try_from_i128(cents, "slab charge")
    }

    /// `self - other`, or `None` on overflow.
    #[inline]
    pub fn checked_sub(self, other: Units) -> Option<Units> {
        self.0.checked_sub(other.0).map(Units)
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / MILLI_PER_UNIT;
        let frac = abs % MILLI_PER_UNIT;
        if frac == 0 {
            write!(f, "{}{}", sign, whole)
        } else {
            let digits = format!("{:03}", frac);
            write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
        }
    }
}

impl Add for Units {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Units(self.0 + other.0)
    }
}

impl AddAssign for Units {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Units {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Units(self.0 - other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_and_milli() {
        assert_eq!(Units::from_whole(150).milli(), 150_000);
        assert_eq!(Units::from_milli(1_500), Units::from_whole(1) + Units::from_milli(500));
    }

    #[test]
    fn test_display_trims_fraction() {
        assert_eq!(Units::from_whole(150).to_string(), "150");
        assert_eq!(Units::from_milli(1_500).to_string(), "1.5");
        assert_eq!(Units::from_milli(1_234_567).to_string(), "1234.567");
        assert_eq!(Units::from_milli(-20).to_string(), "-0.02");
    }

    #[test]
    fn test_charge_at_whole_units() {
        // 90 units at 10.00
        assert_eq!(
            Units::from_whole(90).charge_at(Money::from_cents(1000)).unwrap().cents(),
            90_000
        );
    }

    #[test]
    fn test_charge_at_rounds_half_up() {
        // 0.001 unit at 5.00 = 0.005 → 0.01
        assert_eq!(Units::from_milli(1).charge_at(Money::from_cents(500)).unwrap().cents(), 1);
        // 0.001 unit at 4.00 = 0.004 → 0.00
        assert_eq!(Units::from_milli(1).charge_at(Money::from_cents(400)).unwrap().cents(), 0);
    }

    #[test]
    fn test_charge_at_overflow_is_an_error() {
        // 10^13 units at 10000.00 per unit
        let huge = Units::from_whole(10_000_000_000_000);
        let err = huge.charge_at(Money::from_cents(1_000_000)).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::InvalidAmount { .. }));
    }

    #[test]
    fn test_checked_constructors() {
        assert_eq!(
            Units::checked_from_whole(MAX_WHOLE_UNITS),
            Some(Units::from_milli(MAX_WHOLE_UNITS * MILLI_PER_UNIT))
        );
        assert_eq!(Units::checked_from_whole(MAX_WHOLE_UNITS + 1), None);
        assert_eq!(Units::from_milli(i64::MIN).checked_sub(Units::from_milli(1)), None);
        assert_eq!(
            Units::from_whole(5).checked_sub(Units::from_whole(2)),
            Some(Units::from_whole(3))
        );
    }
}
