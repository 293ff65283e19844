//! # Tariff Module
//!
//! Turns a consumption figure and a slab table into an energy charge.
//!
//! ## Slab Walk
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Slabs: [0-60 @ 7.85] [60-∞ @ 10.00]      Consumption: 150             │
//! │                                                                         │
//! │  remaining = 150                                                        │
//! │    slab 0-60  : take min(150, 60) = 60  → 60 × 7.85  = 471.00          │
//! │  remaining = 90                                                         │
//! │    slab 60-∞  : take 90                 → 90 × 10.00 = 900.00          │
//! │  remaining = 0  → stop                                                  │
//! │                                                                         │
//! │  energy_charge = 471.00 + 900.00 = 1371.00                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Slabs that receive no units are left out of the breakdown, so a
//! breakdown only ever lists slabs that contributed to the charge.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::TariffCategory;
use crate::units::Units;

// =============================================================================
// Slab Types
// =============================================================================

/// One consumption band of a tariff.
///
/// `to == None` marks the unbounded top band; only the last slab may be
/// unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TariffSlab {
    pub from: Units,
    pub to: Option<Units>,
    pub rate_per_unit: Money,
}

impl TariffSlab {
    pub fn bounded(from: Units, to: Units, rate_per_unit: Money) -> Self {
        TariffSlab {
            from,
            to: Some(to),
            rate_per_unit,
        }
    }

    pub fn unbounded(from: Units, rate_per_unit: Money) -> Self {
        TariffSlab {
            from,
            to: None,
            rate_per_unit,
        }
    }

    /// Width of the band, `None` when unbounded.
    pub fn width(&self) -> Option<Units> {
        self.to.map(|to| to - self.from)
    }
}

/// Units consumed inside one slab and what they cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SlabCharge {
    pub from: Units,
    pub to: Option<Units>,
    pub units: Units,
    pub rate: Money,
    pub amount: Money,
}

/// Result of pricing consumption against a slab table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EnergyCharge {
    pub slab_breakdown: Vec<SlabCharge>,
    pub energy_charge: Money,
}

// =============================================================================
// Slab Validation
// =============================================================================

/// Checks that a slab table is ordered, contiguous and starts at zero.
///
/// ## Rules
/// - At least one slab
/// - First slab starts at 0
/// - Each slab starts where the previous one ended
/// - Bounded slabs have `to > from`
/// - Only the last slab may be unbounded
/// - Rates are not negative
pub fn validate_slabs(slabs: &[TariffSlab]) -> CoreResult<()> {
    let first = slabs
        .first()
        .ok_or_else(|| CoreError::invalid_tariff("slab table is empty"))?;

    if !first.from.is_zero() {
        return Err(CoreError::invalid_tariff(format!(
            "first slab must start at 0, starts at {}",
            first.from
        )));
    }

    let last_index = slabs.len() - 1;
    let mut expected_from = Units::zero();

    for (index, slab) in slabs.iter().enumerate() {
        if slab.from != expected_from {
            return Err(CoreError::invalid_tariff(format!(
                "slab {} starts at {} but previous slab ends at {}",
                index, slab.from, expected_from
            )));
        }

        if slab.rate_per_unit.is_negative() {
            return Err(CoreError::invalid_tariff(format!(
                "slab {} has negative rate {}",
                index, slab.rate_per_unit
            )));
        }

        match slab.to {
            Some(to) if to <= slab.from => {
                return Err(CoreError::invalid_tariff(format!(
                    "slab {} ends at {} which is not after its start {}",
                    index, to, slab.from
                )));
            }
            Some(to) => expected_from = to,
            None if index != last_index => {
                return Err(CoreError::invalid_tariff(format!(
                    "slab {} is unbounded but is not the last slab",
                    index
                )));
            }
            None => {}
        }
    }

    Ok(())
}

// =============================================================================
// Energy Charge
// =============================================================================

/// Prices `consumption` against `slabs`.
///
/// ## Example
/// ```rust
/// use meterbill_core::money::Money;
/// use meterbill_core::tariff::{calculate_energy_charge, TariffSlab};
/// use meterbill_core::units::Units;
///
/// let slabs = vec![
///     TariffSlab::bounded(Units::zero(), Units::from_whole(60), Money::from_cents(785)),
///     TariffSlab::unbounded(Units::from_whole(60), Money::from_cents(1000)),
/// ];
/// let charge = calculate_energy_charge(Units::from_whole(150), &slabs).unwrap();
/// assert_eq!(charge.energy_charge.cents(), 137100);
/// assert_eq!(charge.slab_breakdown.len(), 2);
/// ```
///
/// ## Errors
/// - `InvalidReading` when consumption is negative
/// - `InvalidTariff` when the table is malformed or ends before the
///   consumption is fully priced
/// - `InvalidAmount` when the charge overflows i64 cents
pub fn calculate_energy_charge(consumption: Units, slabs: &[TariffSlab]) -> CoreResult<EnergyCharge> {
    if consumption.is_negative() {
        return Err(CoreError::invalid_reading(format!(
            "consumption cannot be negative, got {}",
            consumption
        )));
    }

    validate_slabs(slabs)?;

    let mut remaining = consumption;
    let mut slab_breakdown = Vec::new();

    for slab in slabs {
        if remaining.is_zero() {
            break;
        }

        let units = match slab.width() {
            Some(width) => remaining.min(width),
            None => remaining,
        };
        remaining = remaining - units;

        slab_breakdown.push(SlabCharge {
            from: slab.from,
            to: slab.to,
            units,
            rate: slab.rate_per_unit,
            amount: units.charge_at(slab.rate_per_unit)?,
        });
    }

    if !remaining.is_zero() {
        return Err(CoreError::invalid_tariff(format!(
            "slab table ends before consumption {} is covered; {} units unpriced",
            consumption, remaining
        )));
    }

    let energy_charge = Money::try_sum(slab_breakdown.iter().map(|s| s.amount), "energy charge")?;
    debug!(%consumption, %energy_charge, slabs = slab_breakdown.len(), "Energy charge computed");

    Ok(EnergyCharge {
        slab_breakdown,
        energy_charge,
    })
}

// =============================================================================
// Tariff Schedules
// =============================================================================

/// A dated slab table for one customer category.
///
/// Schedules are reference data. A bill copies what it needs from the
/// schedule at composition time, so later schedule changes never reach an
/// issued bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TariffSchedule {
    pub category: TariffCategory,
    #[ts(as = "String")]
    pub effective_from: NaiveDate,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub effective_to: Option<NaiveDate>,
    #[serde(default)]
    pub fixed_charge: Money,
    pub slabs: Vec<TariffSlab>,
}

impl TariffSchedule {
    /// True when `date` falls inside the schedule's inclusive date range.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.effective_from <= date && self.effective_to.map_or(true, |to| date <= to)
    }
}

/// Caller-supplied set of schedules to resolve against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TariffCatalog {
    pub schedules: Vec<TariffSchedule>,
}

impl TariffCatalog {
    pub fn new(schedules: Vec<TariffSchedule>) -> Self {
        TariffCatalog { schedules }
    }

    /// Finds the schedule for `category` in force on `date`.
    ///
    /// When ranges overlap the schedule with the latest `effective_from`
    /// wins. The chosen schedule's slab table is validated before returning.
    pub fn resolve(&self, category: TariffCategory, date: NaiveDate) -> CoreResult<&TariffSchedule> {
        let schedule = self
            .schedules
            .iter()
            .filter(|s| s.category == category && s.covers(date))
            .max_by_key(|s| s.effective_from)
            .ok_or_else(|| {
                CoreError::invalid_tariff(format!(
                    "no {:?} tariff effective on {}",
                    category, date
                ))
            })?;

        validate_slabs(&schedule.slabs)?;
        Ok(schedule)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
