//! # Validation Module
//!
//! Field validators and bulk meter-reading validation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (CLI / API)                                           │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── THIS MODULE: field rules before any billing logic runs            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Billing components                                           │
//! │  ├── Slab coverage, reading direction, refund caps                     │
//! │  └── Reported as CoreError kinds                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Storage (outside this crate)                                 │
//! │  └── Optimistic concurrency on outstanding balances                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Bulk Readings
//! A batch of readings is checked one by one with [`validate_reading`] and the
//! results are reduced with [`BulkValidationSummary::fold`]. The summary is a
//! value built from the checks; there is no accumulator object to mutate.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use meterbill_core::units::Units;
//! use meterbill_core::validation::{validate_reading, BulkValidationSummary, ReadingSubmission};
//!
//! let date = NaiveDate::from_ymd_opt(2026, 5, 31).unwrap();
//! let readings = vec![
//!     ReadingSubmission::new("M-1", Units::from_whole(100), Units::from_whole(250), date),
//!     ReadingSubmission::new("M-2", Units::from_whole(900), Units::from_whole(800), date),
//! ];
//! let limit = Units::from_whole(5000);
//! let summary = BulkValidationSummary::fold(readings.iter().map(|r| validate_reading(r, limit)));
//! assert_eq!(summary.accepted, 1);
//! assert_eq!(summary.rejected, 1);
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::units::Units;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest free-text reason accepted on a refund.
pub const MAX_REASON_LEN: usize = 500;

/// Longest meter identifier accepted on a reading.
pub const MAX_METER_ID_LEN: usize = 50;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a payment amount in cents.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Cannot pay zero or negative amounts
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use meterbill_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates the bank details a transfer refund is paid to.
///
/// ## Rules
/// - Bank name must not be blank
/// - Account number must not be blank, 6 to 34 characters
/// - Account number may contain letters and digits (IBAN style), plus spaces
///   and hyphens as separators
pub fn validate_bank_details(bank_name: &str, account_number: &str) -> ValidationResult<()> {
    if bank_name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "bank_name".to_string(),
        });
    }

    let account: String = account_number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if account.is_empty() {
        return Err(ValidationError::Required {
            field: "account_number".to_string(),
        });
    }

    if !account.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "account_number".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    if account.len() < 6 || account.len() > 34 {
        return Err(ValidationError::OutOfRange {
            field: "account_number length".to_string(),
            min: 6,
            max: 34,
        });
    }

    Ok(())
}

/// Validates a refund reason.
///
/// ## Rules
/// - Must not be blank
/// - At most [`MAX_REASON_LEN`] characters
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    if reason.chars().count() > MAX_REASON_LEN {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LEN,
        });
    }

    Ok(())
}

/// Validates a meter identifier.
pub fn validate_meter_id(meter_id: &str) -> ValidationResult<()> {
    let meter_id = meter_id.trim();

    if meter_id.is_empty() {
        return Err(ValidationError::Required {
            field: "meter_id".to_string(),
        });
    }

    if meter_id.len() > MAX_METER_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "meter_id".to_string(),
            max: MAX_METER_ID_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Reading Validation
// =============================================================================

/// A meter reading as captured in the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReadingSubmission {
    pub meter_id: String,
    pub previous_reading: Units,
    pub current_reading: Units,
    #[ts(as = "String")]
    pub reading_date: NaiveDate,
}

impl ReadingSubmission {
    pub fn new(
        meter_id: impl Into<String>,
        previous_reading: Units,
        current_reading: Units,
        reading_date: NaiveDate,
    ) -> Self {
        ReadingSubmission {
            meter_id: meter_id.into(),
            previous_reading,
            current_reading,
            reading_date,
        }
    }
}

/// Verdict on a single reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReadingCheck {
    Accepted { consumption: Units },
    /// Usable, but above the high-consumption limit; worth a second look.
    Flagged { consumption: Units, reason: String },
    Rejected { reason: String },
}

impl ReadingCheck {
    pub fn is_rejected(&self) -> bool {
        matches!(self, ReadingCheck::Rejected { .. })
    }
}

/// Checks one reading.
///
/// ## Rules
/// ```text
/// meter id blank / too long         → Rejected
/// current < previous                → Rejected (rollover or replacement)
/// consumption > high limit          → Flagged
/// otherwise                         → Accepted
/// ```
pub fn validate_reading(reading: &ReadingSubmission, high_consumption_limit: Units) -> ReadingCheck {
    if let Err(e) = validate_meter_id(&reading.meter_id) {
        return ReadingCheck::Rejected {
            reason: e.to_string(),
        };
    }

    if reading.current_reading < reading.previous_reading {
        return ReadingCheck::Rejected {
            reason: format!(
                "current reading {} is below previous reading {} on meter {}",
                reading.current_reading, reading.previous_reading, reading.meter_id
            ),
        };
    }

    let Some(consumption) = reading.current_reading.checked_sub(reading.previous_reading) else {
        return ReadingCheck::Rejected {
            reason: format!("readings on meter {} are out of range", reading.meter_id),
        };
    };
    if consumption > high_consumption_limit {
        return ReadingCheck::Flagged {
            consumption,
            reason: format!(
                "consumption {} exceeds high-consumption limit {}",
                consumption, high_consumption_limit
            ),
        };
    }

    ReadingCheck::Accepted { consumption }
}

/// A rejected reading and its position in the submitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RejectedReading {
    pub index: usize,
    pub reason: String,
}

/// Counts for a batch of reading checks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BulkValidationSummary {
    pub total: usize,
    pub accepted: usize,
    pub flagged: usize,
    pub rejected: usize,
    pub rejections: Vec<RejectedReading>,
}

impl BulkValidationSummary {
    /// Reduces a batch of checks into a summary. Indexes follow iteration order.
    pub fn fold<I, C>(checks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Borrow<ReadingCheck>,
    {
        checks
            .into_iter()
            .enumerate()
            .fold(BulkValidationSummary::default(), |summary, (index, check)| {
                summary.with_check(index, check.borrow())
            })
    }

    fn with_check(mut self, index: usize, check: &ReadingCheck) -> Self {
        self.total += 1;
        match check {
            ReadingCheck::Accepted { .. } => self.accepted += 1,
            ReadingCheck::Flagged { .. } => self.flagged += 1,
            ReadingCheck::Rejected { reason } => {
                self.rejected += 1;
                self.rejections.push(RejectedReading {
                    index,
                    reason: reason.clone(),
                });
            }
        }
        self
    }

    pub fn all_accepted(&self) -> bool {
        self.accepted == self.total
    }
}

/// Validates a whole batch in one call.
pub fn validate_readings(
    readings: &[ReadingSubmission],
    high_consumption_limit: Units,
) -> BulkValidationSummary {
    BulkValidationSummary::fold(
        readings
            .iter()
            .map(|reading| validate_reading(reading, high_consumption_limit)),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
