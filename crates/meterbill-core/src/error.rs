//! # Error Types
//!
//! Domain-specific error types for meterbill-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  meterbill-core errors (this file)                                     │
//! │  ├── CoreError        - Billing/payment rule violations                │
//! │  │   └── kind()       - Machine-readable ErrorKind                     │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  meterbill-cli errors (app)                                            │
//! │  ├── ConfigError      - Configuration load/validation                  │
//! │  └── ApiError         - What callers see (code + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → JSON on stdout         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (amounts, ids, dates)
//! 3. Errors are enum variants, never String
//! 4. Nothing is retried here; every failure is a deterministic input problem

use serde::Serialize;
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Billing and payment errors.
///
/// Every computation in the core either returns a fully-populated result or
/// one of these. There is no partial result mode.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The slab table is malformed or does not cover the consumption.
    ///
    /// ## When This Occurs
    /// - Slabs out of order, overlapping or with a gap
    /// - An unbounded slab that is not the last one
    /// - Consumption beyond the end of a bounded last slab
    /// - No tariff schedule effective for the requested date
    #[error("Invalid tariff: {reason}")]
    InvalidTariff { reason: String },

    /// A reading pair produced negative consumption or is otherwise unusable.
    ///
    /// ## User Workflow
    /// ```text
    /// Start reading: 1500   End reading: 1200   (meter replaced?)
    ///      │
    ///      ▼
    /// compose_bill
    ///      │
    ///      ▼
    /// InvalidReading { reason: "import reading went backwards ..." }
    ///      │
    ///      ▼
    /// Caller fixes the reading upstream; nothing is clamped silently
    /// ```
    #[error("Invalid reading: {reason}")]
    InvalidReading { reason: String },

    /// An amount is zero/negative where a positive one is required.
    #[error("Invalid amount for {field}: {reason}")]
    InvalidAmount { field: String, reason: String },

    /// No bill in the supplied list has anything outstanding.
    ///
    /// `excess` is the whole payment amount; the caller decides whether to
    /// reject it or record it as an overpayment.
    #[error("No outstanding bills to allocate against; {excess} would be excess")]
    NoOutstandingBills { excess: Money },

    /// Refund request is larger than what remains refundable on the payment.
    #[error("Refund of {requested} exceeds refundable balance {refundable} on payment {payment_id}")]
    RefundExceedsPayment {
        payment_id: String,
        requested: Money,
        refundable: Money,
    },

    /// Bank transfer refund without usable bank details.
    #[error("Bank transfer refund requires bank details: {reason}")]
    MissingBankDetails { reason: String },

    /// Not enough standing credit to cover a credit payout.
    #[error("Insufficient credit: available {available}, requested {requested}")]
    InsufficientCredit { available: Money, requested: Money },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidTariff { .. } => ErrorKind::InvalidTariff,
            CoreError::InvalidReading { .. } => ErrorKind::InvalidReading,
            CoreError::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            CoreError::NoOutstandingBills { .. } => ErrorKind::NoOutstandingBills,
            CoreError::RefundExceedsPayment { .. } => ErrorKind::RefundExceedsPayment,
            CoreError::MissingBankDetails { .. } => ErrorKind::MissingBankDetails,
            CoreError::InsufficientCredit { .. } => ErrorKind::InsufficientCredit,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }

    pub(crate) fn invalid_tariff(reason: impl Into<String>) -> Self {
        CoreError::InvalidTariff {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_reading(reason: impl Into<String>) -> Self {
        CoreError::InvalidReading {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_amount(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn amount_overflow(field: impl Into<String>) -> Self {
        CoreError::invalid_amount(field, "exceeds the representable range")
    }
}

/// Error kinds surfaced to callers alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidTariff,
    InvalidReading,
    InvalidAmount,
    NoOutstandingBills,
    RefundExceedsPayment,
    MissingBankDetails,
    InsufficientCredit,
    Validation,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Field-level failures caught before any billing logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid reference).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two values that must agree do not.
    #[error("{field} mismatch: expected '{expected}', got '{actual}'")]
    Mismatch {
        field: String,
        expected: String,
        actual: String,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
