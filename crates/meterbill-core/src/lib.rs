//! # meterbill-core: Billing Calculation & Payment Allocation
//!
//! This crate prices utility bills from meter readings and applies payments,
//! refunds and credits against them. Everything here is a pure function of its
//! inputs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MeterBill Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               meterbill-cli (JSON in / JSON out)                │   │
//! │  │   config (TOML + env) ──► commands ──► ids, dates, logging      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ meterbill-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   reading delta ──► tariff ──► bill ◄── tax                     │   │
//! │  │                                                                 │   │
//! │  │   payment + open bills ──► allocation ──► overpayment           │   │
//! │  │                                                                 │   │
//! │  │   refund request + payment ──► refund                           │   │
//! │  │                                                                 │   │
//! │  │   payments + expected totals ──► reconciliation                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Persistence, ids and "today" are supplied by the caller.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money in cents and the shared half-up rounding
//! - [`units`] - Metered quantities in thousandths of a unit
//! - [`types`] - Shared domain types (Payment, OpenBill, TaxRate, ...)
//! - [`tariff`] - Slab tables and energy charges
//! - [`tax`] - Effective-dated percentage taxes
//! - [`bill`] - Bill composition from a reading pair
//! - [`allocation`] - Spreading a payment over open bills
//! - [`overpayment`] - Standing credit from excess payments
//! - [`refund`] - Refund validation and records
//! - [`reconciliation`] - Collection totals and variance reports
//! - [`validation`] - Field validators and bulk reading checks
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output; no hidden clock reads
//! 2. **Integer Money**: cents in `i64`, rounded half-up at each component
//! 3. **Explicit Errors**: every failure is a typed [`CoreError`]; bill amounts
//!    that overflow `i64` cents fail with `InvalidAmount` instead of wrapping
//! 4. **Explicit Policy**: bill ordering and thresholds are caller inputs
//!
//! ## Example Usage
//!
//! ```rust
//! use meterbill_core::money::Money;
//! use meterbill_core::tariff::{calculate_energy_charge, TariffSlab};
//! use meterbill_core::units::Units;
//!
//! let slabs = vec![
//!     TariffSlab::bounded(Units::zero(), Units::from_whole(60), Money::from_cents(785)),
//!     TariffSlab::unbounded(Units::from_whole(60), Money::from_cents(1000)),
//! ];
//!
//! let charge = calculate_energy_charge(Units::from_whole(150), &slabs).unwrap();
//! assert_eq!(charge.energy_charge, Money::from_cents(137100)); // 1371.00
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod bill;
pub mod error;
pub mod money;
pub mod overpayment;
pub mod reconciliation;
pub mod refund;
pub mod tariff;
pub mod tax;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use meterbill_core::Money` instead of
// `use meterbill_core::money::Money`

pub use allocation::{allocate, order_bills, AllocationOrder, AllocationResult};
pub use bill::{compose_bill, BillInput, BillLine};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use overpayment::{Overpayment, OverpaymentTracker};
pub use reconciliation::{reconcile, ReconciliationReport, ReconciliationStatus};
pub use refund::{Refund, RefundProcessor, RefundRequest};
pub use types::*;
pub use units::Units;
