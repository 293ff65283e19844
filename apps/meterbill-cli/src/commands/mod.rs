//! # CLI Commands Module
//!
//! Every subcommand reads one JSON document and writes one JSON document.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (dispatch, input reading)
//! ├── bill.rs       ◄─── bill: reading pair → priced bill
//! ├── allocate.rs   ◄─── allocate: payment → bills, payment rows, credit
//! ├── refund.rs     ◄─── refund: validate + issue a refund
//! ├── reconcile.rs  ◄─── reconcile, collections: daily totals
//! └── readings.rs   ◄─── validate-readings: batch reading checks
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  meterbill allocate --input payment.json                                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  read_input("payment.json")       ("-" reads stdin)                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  execute(CommandKind::Allocate, &input, &config)                        │
//! │         │                                                               │
//! │         ├── Ok  ──► pretty JSON on stdout, exit 0                       │
//! │         └── Err ──► ApiError JSON on stdout, exit 1                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod allocate;
pub mod bill;
pub mod readings;
pub mod reconcile;
pub mod refund;

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::config::BillingConfig;
use crate::error::ApiError;

/// The JSON-in / JSON-out subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Bill,
    Allocate,
    Refund,
    Reconcile,
    Collections,
    ValidateReadings,
}

/// Loads the configuration for a run.
///
/// Failures become `CONFIG_ERROR` so they reach stdout like any other
/// command failure.
pub fn load_config(path: Option<PathBuf>) -> Result<BillingConfig, ApiError> {
    BillingConfig::load(path).map_err(|e| {
        warn!(error = %e, "Configuration rejected");
        ApiError::from(e)
    })
}

/// Reads the request document from a file, or from stdin when `path` is `-`.
pub fn read_input(path: &Path) -> Result<String, ApiError> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| ApiError::invalid_input(format!("failed to read stdin: {}", e)))?;
        return Ok(buffer);
    }

    std::fs::read_to_string(path).map_err(|e| {
        ApiError::invalid_input(format!("failed to read {}: {}", path.display(), e))
    })
}

/// Runs one command and renders its response as pretty JSON.
pub fn execute(kind: CommandKind, input: &str, config: &BillingConfig) -> Result<String, ApiError> {
    match kind {
        CommandKind::Bill => render(&bill::run(input, config)?),
        CommandKind::Allocate => render(&allocate::run(input, config)?),
        CommandKind::Refund => render(&refund::run(input, config)?),
        CommandKind::Reconcile => render(&reconcile::run(input, config)?),
        CommandKind::Collections => render(&reconcile::run_collections(input)?),
        CommandKind::ValidateReadings => render(&readings::run(input, config)?),
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::internal(format!("failed to render response: {}", e)))
}
