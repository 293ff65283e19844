//! # MeterBill CLI Library
//!
//! Everything the `meterbill` binary does except argument parsing and
//! process exit: configuration, request decoding, id and date generation,
//! and mapping billing errors to a stable JSON shape.
//!
//! ## Layout
//! ```text
//! main.rs ─────► clap parsing, tracing setup, stdout/exit status
//!
//! config.rs ───► BillingConfig (defaults → billing.toml → METERBILL_* env)
//!
//! error.rs ────► ApiError { code, message }, ConfigError
//!
//! commands/ ───► bill, allocate, refund, reconcile, collections,
//!                validate-readings
//! ```

pub mod commands;
pub mod config;
pub mod error;

pub use commands::{execute, load_config, read_input, CommandKind};
pub use config::BillingConfig;
pub use error::{ApiError, ConfigError, ErrorCode};
