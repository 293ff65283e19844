//! # Billing Configuration
//!
//! Policy knobs the billing engine takes as inputs.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     METERBILL_ALLOCATION_ORDER=largest_outstanding_first               │
//! │     METERBILL_RECON_THRESHOLD_BPS=150                                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, else METERBILL_CONFIG, else                       │
//! │     ~/.config/meterbill/billing.toml (Linux)                           │
//! │     ~/Library/Application Support/com.meterbill.meterbill/... (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # billing.toml
//! [billing]
//! apply_subsidy = true
//! apply_solar_credit = true
//!
//! [allocation]
//! order = "oldest_due_first"  # as_given | oldest_due_first | largest_outstanding_first
//!
//! [refund]
//! reference_prefix = "REF"
//! sequence_width = 4
//!
//! [reconciliation]
//! threshold_bps = 200  # 2.00 %
//!
//! [readings]
//! high_consumption_units = 5000
//! ```

use meterbill_core::allocation::AllocationOrder;
use meterbill_core::refund::RefundReferenceFormat;
use meterbill_core::units::{Units, MAX_WHOLE_UNITS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "METERBILL_CONFIG";

// =============================================================================
// Sections
// =============================================================================

/// Defaults for flags a bill request may leave out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingSettings {
    #[serde(default = "default_true")]
    pub apply_subsidy: bool,

    #[serde(default = "default_true")]
    pub apply_solar_credit: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BillingSettings {
    fn default() -> Self {
        BillingSettings {
            apply_subsidy: true,
            apply_solar_credit: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSettings {
    /// Order bills receive money when the request does not say.
    #[serde(default)]
    pub order: AllocationOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundSettings {
    #[serde(default = "default_reference_prefix")]
    pub reference_prefix: String,

    #[serde(default = "default_sequence_width")]
    pub sequence_width: usize,
}

fn default_reference_prefix() -> String {
    "REF".to_string()
}
fn default_sequence_width() -> usize {
    4
}

impl Default for RefundSettings {
    fn default() -> Self {
        RefundSettings {
            reference_prefix: default_reference_prefix(),
            sequence_width: default_sequence_width(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSettings {
    /// Largest variance, in basis points, that is still only "needs review".
    #[serde(default = "default_threshold_bps")]
    pub threshold_bps: u32,
}

fn default_threshold_bps() -> u32 {
    200
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        ReconciliationSettings {
            threshold_bps: default_threshold_bps(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingSettings {
    /// Consumption above this many whole units is flagged.
    #[serde(default = "default_high_consumption")]
    pub high_consumption_units: i64,
}

fn default_high_consumption() -> i64 {
    5000
}

impl Default for ReadingSettings {
    fn default() -> Self {
        ReadingSettings {
            high_consumption_units: default_high_consumption(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete billing configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    #[serde(default)]
    pub billing: BillingSettings,

    #[serde(default)]
    pub allocation: AllocationSettings,

    #[serde(default)]
    pub refund: RefundSettings,

    #[serde(default)]
    pub reconciliation: ReconciliationSettings,

    #[serde(default)]
    pub readings: ReadingSettings,
}

impl BillingConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (billing.toml)
    /// 3. Environment variables
    ///
    /// A file named with `--config` or `METERBILL_CONFIG` must exist. The
    /// platform default path is optional.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let explicit = config_path.or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path));
                }
                Self::from_file(&path)?
            }
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Reads and parses one TOML file. Missing sections take their defaults.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading billing config from file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.refund.reference_prefix;
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::InvalidValue {
                field: "refund.reference_prefix".into(),
                reason: format!("must be non-empty and alphanumeric, got '{}'", prefix),
            });
        }

        if !(1..=10).contains(&self.refund.sequence_width) {
            return Err(ConfigError::InvalidValue {
                field: "refund.sequence_width".into(),
                reason: format!("must be between 1 and 10, got {}", self.refund.sequence_width),
            });
        }

        if self.reconciliation.threshold_bps > 10_000 {
            return Err(ConfigError::InvalidValue {
                field: "reconciliation.threshold_bps".into(),
                reason: format!(
                    "must be at most 10000 (100%), got {}",
                    self.reconciliation.threshold_bps
                ),
            });
        }

        if !(1..=MAX_WHOLE_UNITS).contains(&self.readings.high_consumption_units) {
            return Err(ConfigError::InvalidValue {
                field: "readings.high_consumption_units".into(),
                reason: format!(
                    "must be between 1 and {}, got {}",
                    MAX_WHOLE_UNITS, self.readings.high_consumption_units
                ),
            });
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(order) = lookup("METERBILL_ALLOCATION_ORDER") {
            match order.parse::<AllocationOrder>() {
                Ok(parsed) => {
                    debug!(order = %parsed, "Overriding allocation order from environment");
                    self.allocation.order = parsed;
                }
                Err(e) => warn!(value = %order, error = %e, "Ignoring METERBILL_ALLOCATION_ORDER"),
            }
        }

        if let Some(prefix) = lookup("METERBILL_REFUND_PREFIX") {
            debug!(prefix = %prefix, "Overriding refund prefix from environment");
            self.refund.reference_prefix = prefix;
        }

        if let Some(threshold) = lookup("METERBILL_RECON_THRESHOLD_BPS") {
            match threshold.trim().parse::<u32>() {
                Ok(bps) => {
                    debug!(threshold_bps = bps, "Overriding reconciliation threshold from environment");
                    self.reconciliation.threshold_bps = bps;
                }
                Err(_) => warn!(value = %threshold, "Ignoring METERBILL_RECON_THRESHOLD_BPS"),
            }
        }

        if let Some(limit) = lookup("METERBILL_HIGH_CONSUMPTION_UNITS") {
            match limit.trim().parse::<i64>() {
                Ok(units) => {
                    debug!(units, "Overriding high-consumption limit from environment");
                    self.readings.high_consumption_units = units;
                }
                Err(_) => warn!(value = %limit, "Ignoring METERBILL_HIGH_CONSUMPTION_UNITS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "meterbill", "meterbill")
            .map(|dirs| dirs.config_dir().join("billing.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn reference_format(&self) -> RefundReferenceFormat {
        RefundReferenceFormat::new(
            self.refund.reference_prefix.clone(),
            self.refund.sequence_width,
        )
    }

    /// Saturates for a limit that [`validate`](Self::validate) would reject.
    pub fn high_consumption_limit(&self) -> Units {
        Units::checked_from_whole(self.readings.high_consumption_units)
            .unwrap_or(Units::from_milli(i64::MAX))
    }
}
