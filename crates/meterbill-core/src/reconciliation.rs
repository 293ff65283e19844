//! # Reconciliation Module
//!
//! Daily collection totals and expected-vs-actual reconciliation.
//!
//! ## Report Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Category       Expected     Actual    Variance    Variance%   Flag     │
//! │  ────────────   ────────   ────────   ─────────   ─────────   ─────    │
//! │  cash           10000.00    9900.00     -100.00     -1.00%             │
//! │  card            5000.00    5000.00        0.00      0.00%             │
//! │  online          2000.00    2500.00      500.00     25.00%     ⚠        │
//! │                                                                         │
//! │  threshold = 2.00%                                                      │
//! │                                                                         │
//! │  all variances zero             → BALANCED                              │
//! │  all within threshold, some ≠ 0 → NEEDS_REVIEW                          │
//! │  any beyond threshold           → DISCREPANCY_FOUND   (this example)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Percentages are kept in basis points (100 bps = 1%). The threshold is an
//! input; the core holds no default.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use ts_rs::TS;

use crate::money::{round_half_up_div, Money};
use crate::types::{Payment, PaymentChannel, PaymentMethod};

// =============================================================================
// Categories
// =============================================================================

/// How payments are bucketed for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CategoryGrouping {
    #[default]
    Method,
    Channel,
}

/// A reporting bucket: a payment method or a collection channel.
///
/// Serialized as the bare method or channel name (`"cash"`, `"portal"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(untagged)]
pub enum CollectionCategory {
    Method(PaymentMethod),
    Channel(PaymentChannel),
}

impl CollectionCategory {
    pub fn of(payment: &Payment, grouping: CategoryGrouping) -> Self {
        match grouping {
            CategoryGrouping::Method => CollectionCategory::Method(payment.method),
            CategoryGrouping::Channel => CollectionCategory::Channel(payment.channel),
        }
    }

    pub fn grouping(&self) -> CategoryGrouping {
        match self {
            CollectionCategory::Method(_) => CategoryGrouping::Method,
            CollectionCategory::Channel(_) => CategoryGrouping::Channel,
        }
    }
}

// =============================================================================
// Collection Summary
// =============================================================================

/// Actual collections in one category for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CollectionTotal {
    pub category: CollectionCategory,
    pub amount: Money,
    pub payment_count: usize,
}

/// Totals the payments dated `date`, one entry per category, sorted by category.
pub fn summarize_collections(
    payments: &[Payment],
    date: NaiveDate,
    grouping: CategoryGrouping,
) -> Vec<CollectionTotal> {
    let mut totals: BTreeMap<CollectionCategory, (Money, usize)> = BTreeMap::new();

    for payment in payments.iter().filter(|p| p.date == date) {
        let entry = totals
            .entry(CollectionCategory::of(payment, grouping))
            .or_insert((Money::zero(), 0));
        entry.0 += payment.amount;
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(category, (amount, payment_count))| CollectionTotal {
            category,
            amount,
            payment_count,
        })
        .collect()
}

// =============================================================================
// Reconciliation
// =============================================================================

/// What the day's collections in a category should add up to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpectedTotal {
    pub category: CollectionCategory,
    pub expected_amount: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    Balanced,
    NeedsReview,
    DiscrepancyFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconciliationLine {
    pub category: CollectionCategory,
    pub expected_amount: Money,
    pub actual_amount: Money,
    /// `actual − expected`.
    pub variance: Money,
    /// `None` when nothing was expected but something was collected.
    pub variance_bps: Option<i64>,
    pub exceeds_threshold: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconciliationReport {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub threshold_bps: u32,
    pub lines: Vec<ReconciliationLine>,
    pub total_expected: Money,
    pub total_actual: Money,
    pub total_variance: Money,
    pub status: ReconciliationStatus,
}

/// Variance as basis points of `expected`, using the shared rounding.
///
/// ```text
/// expected ≠ 0           → round(variance × 10000 / expected)
/// expected = 0, actual 0 → Some(0)
/// expected = 0, actual ≠ 0 → None (unbounded)
/// ```
pub fn variance_bps(expected: Money, actual: Money) -> Option<i64> {
    let variance = actual - expected;
    if expected.is_zero() {
        return if variance.is_zero() { Some(0) } else { None };
    }
    let bps = round_half_up_div(variance.cents() as i128 * 10_000, expected.cents() as i128);
    i64::try_from(bps).ok()
}

/// Compares expected totals with the payments actually recorded on `date`.
///
/// Actual payments are bucketed the same way as the expected categories
/// (method, channel or both). A category that only shows up in the actual
/// payments is reported with an expected amount of zero. If `expected` is
/// empty, payments are bucketed by method.
///
/// With both groupings present every payment appears in two lines, so the
/// overall totals are not summed from the lines. `total_actual` counts each
/// payment dated `date` once and `total_expected` comes from the first
/// grouping named in `expected`.
pub fn reconcile(
    expected: &[ExpectedTotal],
    payments: &[Payment],
    date: NaiveDate,
    threshold_bps: u32,
) -> ReconciliationReport {
    let mut groupings: Vec<CategoryGrouping> = Vec::new();
    for grouping in expected.iter().map(|e| e.category.grouping()) {
        if !groupings.contains(&grouping) {
            groupings.push(grouping);
        }
    }
    if groupings.is_empty() {
        groupings.push(CategoryGrouping::Method);
    }

    // category → (expected, actual)
    let mut buckets: BTreeMap<CollectionCategory, (Money, Money)> = BTreeMap::new();
    for e in expected {
        buckets.entry(e.category).or_insert((Money::zero(), Money::zero())).0 += e.expected_amount;
    }
    for &grouping in &groupings {
        for total in summarize_collections(payments, date, grouping) {
            buckets.entry(total.category).or_insert((Money::zero(), Money::zero())).1 += total.amount;
        }
    }

    let threshold = i64::from(threshold_bps);
    let lines: Vec<ReconciliationLine> = buckets
        .into_iter()
        .map(|(category, (expected_amount, actual_amount))| {
            let variance_bps = variance_bps(expected_amount, actual_amount);
            ReconciliationLine {
                category,
                expected_amount,
                actual_amount,
                variance: actual_amount - expected_amount,
                variance_bps,
                exceeds_threshold: variance_bps.map_or(true, |bps| bps.abs() > threshold),
            }
        })
        .collect();

    let status = if lines.iter().all(|l| l.variance.is_zero()) {
        ReconciliationStatus::Balanced
    } else if lines.iter().any(|l| l.exceeds_threshold) {
        ReconciliationStatus::DiscrepancyFound
    } else {
        ReconciliationStatus::NeedsReview
    };

    let primary = groupings[0];
    let total_expected: Money = expected
        .iter()
        .filter(|e| e.category.grouping() == primary)
        .map(|e| e.expected_amount)
        .sum();
    let total_actual: Money = payments
        .iter()
        .filter(|p| p.date == date)
        .map(|p| p.amount)
        .sum();

    if status == ReconciliationStatus::DiscrepancyFound {
        warn!(%date, %total_expected, %total_actual, threshold_bps, "Reconciliation discrepancy");
    } else {
        debug!(%date, ?status, %total_expected, %total_actual, "Reconciliation complete");
    }

    ReconciliationReport {
        date,
        threshold_bps,
        lines,
        total_expected,
        total_actual,
        total_variance: total_actual - total_expected,
        status,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
