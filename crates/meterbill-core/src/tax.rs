//! # Tax Module
//!
//! Applies the tax rules effective on a date to a taxable base.
//!
//! ## Additive vs Cumulative
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  base = 1000.00   rules: [VAT 15%, Levy 2% (cumulative)]                │
//! │                                                                         │
//! │  VAT  (additive)   : 1000.00            × 15% = 150.00                  │
//! │  Levy (cumulative) : (1000.00 + 150.00) × 2%  =  23.00                  │
//! │                                                                         │
//! │  Without the cumulative flag the levy would be 1000.00 × 2% = 20.00     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rules are applied in the order given. The only date the engine looks at is
//! the `as_of` argument, so the same inputs always give the same breakdown.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::TaxRate;
use crate::validation::validate_tax_rate_bps;

// =============================================================================
// Tax Rule
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    #[default]
    Active,
    Inactive,
}

/// A named percentage tax with a validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRule {
    pub name: String,
    pub rate: TaxRate,
    #[ts(as = "String")]
    pub effective_from: NaiveDate,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub effective_to: Option<NaiveDate>,
    #[serde(default)]
    pub status: RuleStatus,
    /// Apply on top of the taxes computed before this one.
    #[serde(default)]
    pub cumulative: bool,
}

impl TaxRule {
    /// An active, open-ended, additive rule.
    pub fn new(name: impl Into<String>, rate: TaxRate, effective_from: NaiveDate) -> Self {
        TaxRule {
            name: name.into(),
            rate,
            effective_from,
            effective_to: None,
            status: RuleStatus::Active,
            cumulative: false,
        }
    }

    /// True iff the rule is active and `date` is inside its window (inclusive).
    pub fn is_effective(&self, date: NaiveDate) -> bool {
        self.status == RuleStatus::Active
            && self.effective_from <= date
            && self.effective_to.map_or(true, |to| date <= to)
    }
}

// =============================================================================
// Tax Computation
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxLine {
    pub name: String,
    pub rate: TaxRate,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxComputation {
    pub tax_breakdown: Vec<TaxLine>,
    pub total_tax: Money,
}

/// Computes every tax effective on `as_of` against `base`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use meterbill_core::money::Money;
/// use meterbill_core::tax::{apply_taxes, TaxRule};
/// use meterbill_core::types::TaxRate;
///
/// let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let as_of = NaiveDate::from_ymd_opt(2026, 5, 31).unwrap();
/// let vat = TaxRule::new("VAT", TaxRate::from_percent(15), from);
///
/// let taxes = apply_taxes(Money::from_cents(253600), &[vat], as_of).unwrap();
/// assert_eq!(taxes.total_tax.cents(), 38040);
/// ```
///
/// ## Errors
/// - `InvalidAmount` for a negative base
/// - `Validation` for an effective rule above 100%
/// - `InvalidAmount` when the total tax overflows i64 cents
pub fn apply_taxes(base: Money, rules: &[TaxRule], as_of: NaiveDate) -> CoreResult<TaxComputation> {
    if base.is_negative() {
        return Err(CoreError::invalid_amount(
            "taxable base",
            format!("cannot be negative, got {}", base),
        ));
    }

    let mut tax_breakdown = Vec::new();
    let mut total_tax = Money::zero();

    for rule in rules.iter().filter(|r| r.is_effective(as_of)) {
        validate_tax_rate_bps(rule.rate.bps())?;

        let rule_base = if rule.cumulative {
            base.checked_add(total_tax)
                .ok_or_else(|| CoreError::amount_overflow("cumulative tax base"))?
        } else {
            base
        };
        let amount = rule_base.percent(rule.rate)?;
        total_tax = total_tax
            .checked_add(amount)
            .ok_or_else(|| CoreError::amount_overflow("total tax"))?;

        tax_breakdown.push(TaxLine {
            name: rule.name.clone(),
            rate: rule.rate,
            amount,
        });
    }

    debug!(%base, %total_tax, applied = tax_breakdown.len(), %as_of, "Taxes applied");

    Ok(TaxComputation {
        tax_breakdown,
        total_tax,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
