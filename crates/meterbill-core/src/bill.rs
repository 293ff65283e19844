//! # Bill Module
//!
//! Composes a priced bill line from a reading pair, a slab table, fixed
//! charge, subsidy, solar credit and taxes.
//!
//! ## Composition Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ReadingPair ──► consumption = end − start   (negative → InvalidReading)│
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  calculate_energy_charge(consumption, slabs) ──► energy_charge          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  before_tax = max(0, energy + fixed − subsidy? − solar_credit?)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  apply_taxes(before_tax, rules, as_of) ──► tax_breakdown, total_tax     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  total_amount = before_tax + total_tax                                  │
//! │                                                                         │
//! │  Any failing step fails the whole bill. No partial bills.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The resulting [`BillLine`] owns copies of its breakdowns; it is a frozen
//! snapshot of the tariff and tax data it was priced with.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tariff::{calculate_energy_charge, SlabCharge, TariffSlab};
use crate::tax::{apply_taxes, TaxLine, TaxRule};
use crate::units::Units;

// =============================================================================
// Inputs
// =============================================================================

/// Start and end register values for one billing period.
///
/// Export registers are only present on net-metered (solar) connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReadingPair {
    pub start_import: Units,
    pub end_import: Units,
    #[serde(default)]
    pub start_export: Option<Units>,
    #[serde(default)]
    pub end_export: Option<Units>,
}

impl ReadingPair {
    pub fn import_only(start: Units, end: Units) -> Self {
        ReadingPair {
            start_import: start,
            end_import: end,
            start_export: None,
            end_export: None,
        }
    }

    pub fn with_export(mut self, start: Units, end: Units) -> Self {
        self.start_export = Some(start);
        self.end_export = Some(end);
        self
    }

    /// Imported units for the period.
    pub fn import_consumption(&self) -> CoreResult<Units> {
        let consumption = self
            .end_import
            .checked_sub(self.start_import)
            .ok_or_else(|| CoreError::invalid_reading("import readings are out of range"))?;
        if consumption.is_negative() {
            return Err(CoreError::invalid_reading(format!(
                "import reading went backwards from {} to {}",
                self.start_import, self.end_import
            )));
        }
        Ok(consumption)
    }

    /// Exported units for the period; zero when the connection has no
    /// export register.
    pub fn export_units(&self) -> CoreResult<Units> {
        match (self.start_export, self.end_export) {
            (None, None) => Ok(Units::zero()),
            (Some(start), Some(end)) => {
                let exported = end
                    .checked_sub(start)
                    .ok_or_else(|| CoreError::invalid_reading("export readings are out of range"))?;
                if exported.is_negative() {
                    return Err(CoreError::invalid_reading(format!(
                        "export reading went backwards from {} to {}",
                        start, end
                    )));
                }
                Ok(exported)
            }
            _ => Err(CoreError::invalid_reading(
                "export readings need both a start and an end value",
            )),
        }
    }
}

/// Everything needed to price one bill.
///
/// Reference data (slabs, charges, rules) arrives already resolved for the
/// customer and date; see [`crate::tariff::TariffCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillInput {
    pub readings: ReadingPair,
    pub slabs: Vec<TariffSlab>,
    #[serde(default)]
    pub fixed_charge: Money,
    #[serde(default)]
    pub subsidy: Money,
    #[serde(default)]
    pub apply_subsidy: bool,
    #[serde(default)]
    pub solar_credit: Money,
    #[serde(default)]
    pub apply_solar_credit: bool,
    #[serde(default)]
    pub tax_rules: Vec<TaxRule>,
    pub as_of: NaiveDate,
}

// =============================================================================
// Output
// =============================================================================

/// A fully priced bill.
///
/// `total_amount == before_tax + Σ tax_breakdown.amount` and
/// `energy_charge == Σ slab_breakdown.amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillLine {
    pub start_reading: Units,
    pub end_reading: Units,
    pub consumption: Units,
    pub export_units: Units,
    pub slab_breakdown: Vec<SlabCharge>,
    pub energy_charge: Money,
    pub fixed_charge: Money,
    /// Subsidy actually deducted (zero when not applied).
    pub subsidy: Money,
    /// Solar credit actually deducted (zero when not applied).
    pub solar_credit: Money,
    pub before_tax: Money,
    pub tax_breakdown: Vec<TaxLine>,
    pub total_tax: Money,
    pub total_amount: Money,
    #[ts(as = "String")]
    pub as_of: NaiveDate,
}

// =============================================================================
// Composer
// =============================================================================

/// Prices one bill.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use meterbill_core::bill::{compose_bill, BillInput, ReadingPair};
/// use meterbill_core::money::Money;
/// use meterbill_core::tariff::TariffSlab;
/// use meterbill_core::tax::TaxRule;
/// use meterbill_core::types::TaxRate;
/// use meterbill_core::units::Units;
///
/// let as_of = NaiveDate::from_ymd_opt(2026, 5, 31).unwrap();
/// let input = BillInput {
///     readings: ReadingPair::import_only(Units::from_whole(1000), Units::from_whole(1150)),
///     slabs: vec![
///         TariffSlab::bounded(Units::zero(), Units::from_whole(60), Money::from_cents(785)),
///         TariffSlab::unbounded(Units::from_whole(60), Money::from_cents(1000)),
///     ],
///     fixed_charge: Money::from_cents(10000),
///     subsidy: Money::zero(),
///     apply_subsidy: false,
///     solar_credit: Money::zero(),
///     apply_solar_credit: false,
///     tax_rules: vec![TaxRule::new("VAT", TaxRate::from_percent(15), as_of)],
///     as_of,
/// };
///
/// let bill = compose_bill(&input).unwrap();
/// assert_eq!(bill.energy_charge.cents(), 137100); // 1371.00
/// assert_eq!(bill.before_tax.cents(), 147100);    // + 100.00 fixed
/// assert_eq!(bill.total_amount.cents(), 169165);  // + 15% VAT (220.65)
/// ```
pub fn compose_bill(input: &BillInput) -> CoreResult<BillLine> {
    let consumption = input.readings.import_consumption()?;
    let export_units = input.readings.export_units()?;

    require_non_negative("fixed charge", input.fixed_charge)?;
    require_non_negative("subsidy", input.subsidy)?;
    require_non_negative("solar credit", input.solar_credit)?;

    let energy = calculate_energy_charge(consumption, &input.slabs)?;

    let subsidy = if input.apply_subsidy {
        input.subsidy
    } else {
        Money::zero()
    };
    let solar_credit = if input.apply_solar_credit {
        input.solar_credit
    } else {
        Money::zero()
    };

    let before_tax = energy
        .energy_charge
        .checked_add(input.fixed_charge)
        .and_then(|gross| gross.checked_sub(subsidy))
        .and_then(|net| net.checked_sub(solar_credit))
        .ok_or_else(|| CoreError::amount_overflow("before-tax amount"))?
        .clamp_non_negative();

    let taxes = apply_taxes(before_tax, &input.tax_rules, input.as_of)?;
    let total_amount = before_tax
        .checked_add(taxes.total_tax)
        .ok_or_else(|| CoreError::amount_overflow("total amount"))?;

    debug!(
        %consumption,
        energy_charge = %energy.energy_charge,
        %before_tax,
        total_tax = %taxes.total_tax,
        %total_amount,
        "Bill composed"
    );

    Ok(BillLine {
        start_reading: input.readings.start_import,
        end_reading: input.readings.end_import,
        consumption,
        export_units,
        slab_breakdown: energy.slab_breakdown,
        energy_charge: energy.energy_charge,
        fixed_charge: input.fixed_charge,
        subsidy,
        solar_credit,
        before_tax,
        tax_breakdown: taxes.tax_breakdown,
        total_tax: taxes.total_tax,
        total_amount,
        as_of: input.as_of,
    })
}

/// Credit for exported units at a flat export rate.
///
/// Feed the result into [`BillInput::solar_credit`] for net-metered
/// connections.
pub fn solar_export_credit(readings: &ReadingPair, export_rate: Money) -> CoreResult<Money> {
    require_non_negative("export rate", export_rate)?;
    readings.export_units()?.charge_at(export_rate)
}

fn require_non_negative(field: &str, amount: Money) -> CoreResult<()> {
    if amount.is_negative() {
        return Err(CoreError::invalid_amount(
            field,
            format!("cannot be negative, got {}", amount),
        ));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
