//! Property-based tests for billing and payment invariants
//!
//! These tests use proptest to verify:
//! - Slab exhaustiveness: Σ breakdown.units == consumption
//! - Bill non-negativity: total_amount ≥ 0 whatever the deductions
//! - Allocation conservation: paid == allocated + excess
//! - No over-allocation: allocated_i ≤ outstanding_before_i
//! - Refund cap: Σ accepted refunds ≤ payment amount
//! - Deterministic tax filtering: same inputs, same breakdown
//! - Extreme inputs: a bill is exact or an error, never a wrapped amount
//! - Refundable balance: never above the payment, whatever came before

use chrono::NaiveDate;
use meterbill_core::{
    allocation::{allocate, order_bills, AllocationOrder},
    bill::{compose_bill, BillInput, ReadingPair},
    money::Money,
    error::CoreError,
    refund::{Refund, RefundContext, RefundMethod, RefundProcessor, RefundRequest},
    tariff::{calculate_energy_charge, TariffSlab},
    tax::{apply_taxes, RuleStatus, TaxRule},
    types::{OpenBill, Payment, PaymentChannel, PaymentMethod, PaymentStatus, TaxRate},
    units::Units,
};
use proptest::prelude::*;

fn day(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Days::new(u64::from(offset))
}

/// Strategy for contiguous slab tables: bounded widths plus an unbounded tail
fn slab_table_strategy() -> impl Strategy<Value = Vec<TariffSlab>> {
    (
        prop::collection::vec((1i64..200_000i64, 0i64..5_000i64), 0..5),
        0i64..5_000i64,
    )
        .prop_map(|(bounded, tail_rate)| {
            let mut slabs = Vec::new();
            let mut from = Units::zero();
            for (width, rate) in bounded {
                let to = from + Units::from_milli(width);
                slabs.push(TariffSlab::bounded(from, to, Money::from_cents(rate)));
                from = to;
            }
            slabs.push(TariffSlab::unbounded(from, Money::from_cents(tail_rate)));
            slabs
        })
}

/// Strategy for tax rules, some effective and some not
fn tax_rules_strategy() -> impl Strategy<Value = Vec<TaxRule>> {
    prop::collection::vec(
        (0u32..2_500u32, 0u32..200u32, any::<bool>(), any::<bool>()),
        0..4,
    )
    .prop_map(|rules| {
        rules
            .into_iter()
            .enumerate()
            .map(|(i, (bps, starts, active, cumulative))| {
                let mut rule = TaxRule::new(format!("T{}", i), TaxRate::from_bps(bps), day(starts));
                rule.status = if active {
                    RuleStatus::Active
                } else {
                    RuleStatus::Inactive
                };
                rule.cumulative = cumulative;
                rule
            })
            .collect()
    })
}

/// Strategy for open bills (zero outstanding allowed)
fn bills_strategy() -> impl Strategy<Value = Vec<OpenBill>> {
    prop::collection::vec((0i64..1_000_000i64, prop::option::of(0u32..365u32)), 0..8).prop_map(
        |bills| {
            bills
                .into_iter()
                .enumerate()
                .map(|(i, (cents, due))| {
                    let bill = OpenBill::new(format!("B{:02}", i), Money::from_cents(cents));
                    match due {
                        Some(offset) => bill.with_due_date(day(offset)),
                        None => bill,
                    }
                })
                .collect()
        },
    )
}

fn order_strategy() -> impl Strategy<Value = AllocationOrder> {
    prop_oneof![
        Just(AllocationOrder::AsGiven),
        Just(AllocationOrder::OldestDueFirst),
        Just(AllocationOrder::LargestOutstandingFirst),
    ]
}

proptest! {
    /// Property: every unit of consumption lands in exactly one slab
    #[test]
    fn prop_slab_exhaustiveness(
        slabs in slab_table_strategy(),
        consumption in 0i64..2_000_000i64,
    ) {
        let consumption = Units::from_milli(consumption);
        let charge = calculate_energy_charge(consumption, &slabs).unwrap();

        let priced = charge
            .slab_breakdown
            .iter()
            .fold(Units::zero(), |acc, s| acc + s.units);
        prop_assert_eq!(priced, consumption);

        let summed: Money = charge.slab_breakdown.iter().map(|s| s.amount).sum();
        prop_assert_eq!(summed, charge.energy_charge);
        prop_assert!(charge.slab_breakdown.iter().all(|s| !s.units.is_zero()));
    }

    /// Property: deductions never drive a bill below zero
    #[test]
    fn prop_bill_non_negative(
        slabs in slab_table_strategy(),
        start in 0i64..1_000_000i64,
        delta in 0i64..1_000_000i64,
        fixed in 0i64..50_000i64,
        subsidy in 0i64..5_000_000i64,
        solar in 0i64..5_000_000i64,
        apply_subsidy in any::<bool>(),
        apply_solar_credit in any::<bool>(),
        tax_rules in tax_rules_strategy(),
        as_of in 0u32..365u32,
    ) {
        let input = BillInput {
            readings: ReadingPair::import_only(
                Units::from_milli(start),
                Units::from_milli(start + delta),
            ),
            slabs,
            fixed_charge: Money::from_cents(fixed),
            subsidy: Money::from_cents(subsidy),
            apply_subsidy,
            solar_credit: Money::from_cents(solar),
            apply_solar_credit,
            tax_rules,
            as_of: day(as_of),
        };
        let bill = compose_bill(&input).unwrap();

        prop_assert!(!bill.total_amount.is_negative());
        prop_assert!(!bill.before_tax.is_negative());
        let taxes: Money = bill.tax_breakdown.iter().map(|t| t.amount).sum();
        prop_assert_eq!(bill.total_amount, bill.before_tax + taxes);
    }

    /// Property: total_payment_amount == total_allocated + excess_amount
    #[test]
    fn prop_allocation_conservation(
        payment in 1i64..5_000_000i64,
        bills in bills_strategy(),
        order in order_strategy(),
    ) {
        let bills = order_bills(&bills, order);
        let total_outstanding: Money = bills.iter().map(|b| b.outstanding).sum();

        match allocate(Money::from_cents(payment), &bills) {
            Ok(result) => {
                prop_assert_eq!(
                    result.total_payment_amount,
                    result.total_allocated + result.excess_amount
                );
                let allocated: Money = result.allocations.iter().map(|a| a.allocated_amount).sum();
                prop_assert_eq!(allocated, result.total_allocated);
                prop_assert_eq!(
                    result.excess_amount,
                    (Money::from_cents(payment) - total_outstanding).clamp_non_negative()
                );
            }
            Err(_) => prop_assert!(total_outstanding.is_zero()),
        }
    }

    /// Property: no bill receives more than it owed
    #[test]
    fn prop_no_over_allocation(
        payment in 1i64..5_000_000i64,
        bills in bills_strategy(),
    ) {
        if let Ok(result) = allocate(Money::from_cents(payment), &bills) {
            for a in &result.allocations {
                prop_assert!(a.allocated_amount <= a.outstanding_before);
                prop_assert!(a.allocated_amount.is_positive());
                prop_assert_eq!(a.outstanding_after, a.outstanding_before - a.allocated_amount);
                prop_assert_eq!(a.is_fully_paid, a.outstanding_after.is_zero());
            }
            // only the last touched bill may be left partly paid
            let partial = result.allocations.iter().filter(|a| !a.is_fully_paid).count();
            prop_assert!(partial <= 1);
        }
    }

    /// Property: accepted refunds never add up to more than the payment
    #[test]
    fn prop_refund_cap(
        paid in 1i64..1_000_000i64,
        requests in prop::collection::vec(-1_000i64..600_000i64, 1..10),
    ) {
        let date = day(10);
        let payment = Payment {
            payment_id: "P1".to_string(),
            bill_id: "B1".to_string(),
            customer_id: "C1".to_string(),
            amount: Money::from_cents(paid),
            method: PaymentMethod::Card,
            channel: PaymentChannel::Portal,
            date,
            status: PaymentStatus::Completed,
        };
        let processor = RefundProcessor::default();
        let mut accepted: Vec<Refund> = Vec::new();

        for (i, cents) in requests.into_iter().enumerate() {
            let request = RefundRequest {
                payment_id: "P1".to_string(),
                refund_amount: Money::from_cents(cents),
                reason: "customer request".to_string(),
                method: RefundMethod::Card,
                bank_details: None,
            };
            let context = RefundContext {
                refund_id: format!("00000000-0000-4000-8000-{:012}", i),
                date,
                processed_by: "ops".to_string(),
                sequence: i as u32 + 1,
            };
            if let Ok(outcome) = processor.process(&request, &payment, &accepted, &context) {
                accepted.push(outcome.refund);
            }
        }

        let refunded: Money = accepted.iter().map(|r| r.refund_amount).sum();
        prop_assert!(refunded <= payment.amount);
    }

    /// Property: tax filtering depends only on its inputs
    #[test]
    fn prop_tax_deterministic(
        base in 0i64..10_000_000i64,
        rules in tax_rules_strategy(),
        as_of in 0u32..365u32,
    ) {
        let first = apply_taxes(Money::from_cents(base), &rules, day(as_of)).unwrap();
        let second = apply_taxes(Money::from_cents(base), &rules, day(as_of)).unwrap();
        prop_assert_eq!(&first, &second);

        let effective = rules.iter().filter(|r| r.is_effective(day(as_of))).count();
        prop_assert_eq!(first.tax_breakdown.len(), effective);
    }
}

proptest! {
    /// Property: huge consumptions and rates price exactly or fail with InvalidAmount
    #[test]
    fn prop_extreme_bill_exact_or_error(
        milli in 0i64..i64::MAX,
        rate in 0i64..100_000_000i64,
    ) {
        let as_of = day(0);
        let input = BillInput {
            readings: ReadingPair::import_only(Units::zero(), Units::from_milli(milli)),
            slabs: vec![TariffSlab::unbounded(Units::zero(), Money::from_cents(rate))],
            fixed_charge: Money::zero(),
            subsidy: Money::zero(),
            apply_subsidy: false,
            solar_credit: Money::zero(),
            apply_solar_credit: false,
            tax_rules: vec![],
            as_of,
        };

        let exact = (i128::from(milli) * i128::from(rate) + 500) / 1000;
        match compose_bill(&input) {
            Ok(bill) => {
                prop_assert_eq!(i128::from(bill.energy_charge.cents()), exact);
                prop_assert_eq!(bill.total_amount, bill.energy_charge);
            }
            Err(err) => {
                let is_invalid_amount = matches!(err, CoreError::InvalidAmount { .. });
                prop_assert!(is_invalid_amount);
                prop_assert!(exact > i128::from(i64::MAX));
            }
        }
    }

    /// Property: refundable never exceeds the payment, even with malformed history
    #[test]
    fn prop_refundable_bounded(
        paid in 1i64..1_000_000i64,
        previous in prop::collection::vec(-1_000_000i64..1_000_000i64, 0..6),
    ) {
        let date = day(3);
        let payment = Payment {
            payment_id: "P1".to_string(),
            bill_id: "B1".to_string(),
            customer_id: "C1".to_string(),
            amount: Money::from_cents(paid),
            method: PaymentMethod::Cash,
            channel: PaymentChannel::Counter,
            date,
            status: PaymentStatus::Completed,
        };
        let refunds: Vec<Refund> = previous
            .iter()
            .enumerate()
            .map(|(i, cents)| Refund {
                refund_id: format!("00000000-0000-4000-8000-{:012}", i),
                payment_id: "P1".to_string(),
                refund_amount: Money::from_cents(*cents),
                reason: "earlier".to_string(),
                method: RefundMethod::Cash,
                date,
                processed_by: "ops".to_string(),
                reference: format!("REF-2026-{:04}", i),
                bank_details: None,
            })
            .collect();

        match RefundProcessor::refundable(&payment, &refunds) {
            Ok(refundable) => {
                prop_assert!(previous.iter().all(|c| *c > 0));
                prop_assert!(refundable <= payment.amount);
                prop_assert!(!refundable.is_negative());
            }
            Err(err) => {
                let is_invalid_amount = matches!(err, CoreError::InvalidAmount { .. });
                prop_assert!(is_invalid_amount);
                prop_assert!(previous.iter().any(|c| *c <= 0));
            }
        }
    }
}
