//! # API Error Type
//!
//! Unified error type for CLI commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in meterbill                              │
//! │                                                                         │
//! │  meterbill allocate --input payment.json                               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Bad JSON? ───────── serde_json::Error ──────────┐              │  │
//! │  │         │                                         │              │  │
//! │  │         ▼                                         ▼              │  │
//! │  │  Billing rule? ───── CoreError::RefundExceeds.. ── ApiError ───►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  stdout: { "code": "REFUND_EXCEEDS_PAYMENT", "message": "..." }        │
//! │  exit status: non-zero                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use meterbill_core::{CoreError, ErrorKind};
use serde::Serialize;
use std::path::PathBuf;

/// Error returned from CLI commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NO_OUTSTANDING_BILLS",
///   "message": "No outstanding bills to allocate against; 1500.00 would be excess"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidTariff,
    InvalidReading,
    InvalidAmount,
    NoOutstandingBills,
    RefundExceedsPayment,
    MissingBankDetails,
    InsufficientCredit,

    /// Field-level validation failed
    ValidationError,

    /// Input could not be read or parsed
    InvalidInput,

    /// Configuration could not be loaded
    ConfigError,

    /// Output could not be produced
    Internal,
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidTariff => ErrorCode::InvalidTariff,
            ErrorKind::InvalidReading => ErrorCode::InvalidReading,
            ErrorKind::InvalidAmount => ErrorCode::InvalidAmount,
            ErrorKind::NoOutstandingBills => ErrorCode::NoOutstandingBills,
            ErrorKind::RefundExceedsPayment => ErrorCode::RefundExceedsPayment,
            ErrorKind::MissingBankDetails => ErrorCode::MissingBankDetails,
            ErrorKind::InsufficientCredit => ErrorCode::InsufficientCredit,
            ErrorKind::Validation => ErrorCode::ValidationError,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidInput, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts core errors to API errors. The core already carries the message.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::new(err.kind().into(), err.to_string())
    }
}

impl From<meterbill_core::ValidationError> for ApiError {
    fn from(err: meterbill_core::ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Malformed JSON input: {}", err))
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use meterbill_core::Money;

    #[test]
    fn test_core_error_keeps_kind_and_message() {
        let api: ApiError = CoreError::NoOutstandingBills {
            excess: Money::from_cents(150000),
        }
        .into();
        assert_eq!(api.code, ErrorCode::NoOutstandingBills);
        assert!(api.message.contains("1500.00"));

        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["code"], "NO_OUTSTANDING_BILLS");
    }

    #[test]
    fn test_validation_maps_to_validation_code() {
        let api: ApiError = CoreError::from(meterbill_core::ValidationError::Required {
            field: "reason".to_string(),
        })
        .into();
        assert_eq!(api.code, ErrorCode::ValidationError);
        assert_eq!(api.to_string(), "[ValidationError] Validation error: reason is required");
    }

    #[test]
    fn test_bad_json_is_invalid_input() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let api: ApiError = err.into();
        assert_eq!(api.code, ErrorCode::InvalidInput);
    }
}
