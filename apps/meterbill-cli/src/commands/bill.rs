//! # Bill Command
//!
//! Prices one bill from a reading pair.
//!
//! The tariff comes either as literal slabs or as a catalog plus a customer
//! category, resolved against the bill's `as_of` date. Subsidy and solar flags
//! the request leaves out take the configured defaults.

use chrono::NaiveDate;
use meterbill_core::bill::{compose_bill, solar_export_credit, BillInput, BillLine, ReadingPair};
use meterbill_core::tariff::{TariffCatalog, TariffSlab};
use meterbill_core::tax::TaxRule;
use meterbill_core::{Money, TariffCategory};
use serde::Deserialize;
use tracing::info;

use crate::config::BillingConfig;
use crate::error::ApiError;

/// A tariff catalog and the category to look up in it.
#[derive(Debug, Clone, Deserialize)]
pub struct TariffSelection {
    pub catalog: TariffCatalog,
    pub category: TariffCategory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillRequest {
    pub readings: ReadingPair,

    /// Literal slab table. Takes precedence over `tariff`.
    #[serde(default)]
    pub slabs: Option<Vec<TariffSlab>>,

    #[serde(default)]
    pub tariff: Option<TariffSelection>,

    /// Overrides the schedule's fixed charge when given.
    #[serde(default)]
    pub fixed_charge: Option<Money>,

    #[serde(default)]
    pub subsidy: Money,
    #[serde(default)]
    pub apply_subsidy: Option<bool>,

    #[serde(default)]
    pub solar_credit: Money,
    /// Prices exported units at this rate instead of using `solar_credit`.
    #[serde(default)]
    pub solar_export_rate: Option<Money>,
    #[serde(default)]
    pub apply_solar_credit: Option<bool>,

    #[serde(default)]
    pub tax_rules: Vec<TaxRule>,

    pub as_of: NaiveDate,
}

pub fn run(input: &str, config: &BillingConfig) -> Result<BillLine, ApiError> {
    let request: BillRequest = serde_json::from_str(input)?;
    let bill_input = build_input(request, config)?;
    let bill = compose_bill(&bill_input)?;

    info!(
        consumption = %bill.consumption,
        total = %bill.total_amount,
        as_of = %bill.as_of,
        "Bill computed"
    );
    Ok(bill)
}

fn build_input(request: BillRequest, config: &BillingConfig) -> Result<BillInput, ApiError> {
    let (slabs, schedule_fixed_charge) = match (request.slabs, &request.tariff) {
        (Some(slabs), _) => (slabs, Money::zero()),
        (None, Some(selection)) => {
            let schedule = selection
                .catalog
                .resolve(selection.category, request.as_of)?;
            (schedule.slabs.clone(), schedule.fixed_charge)
        }
        (None, None) => {
            return Err(ApiError::validation(
                "either slabs or tariff (catalog + category) is required",
            ))
        }
    };

    let solar_credit = match request.solar_export_rate {
        Some(rate) => solar_export_credit(&request.readings, rate)?,
        None => request.solar_credit,
    };

    Ok(BillInput {
        readings: request.readings,
        slabs,
        fixed_charge: request.fixed_charge.unwrap_or(schedule_fixed_charge),
        subsidy: request.subsidy,
        apply_subsidy: request.apply_subsidy.unwrap_or(config.billing.apply_subsidy),
        solar_credit,
        apply_solar_credit: request
            .apply_solar_credit
            .unwrap_or(config.billing.apply_solar_credit),
        tax_rules: request.tax_rules,
        as_of: request.as_of,
    })
}
