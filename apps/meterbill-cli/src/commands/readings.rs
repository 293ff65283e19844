//! # Validate-Readings Command
//!
//! Checks a batch of field readings and reports counts plus the rejected rows.

use meterbill_core::validation::{validate_readings, BulkValidationSummary, ReadingSubmission};
use tracing::{info, warn};

use crate::config::BillingConfig;
use crate::error::ApiError;

pub fn run(input: &str, config: &BillingConfig) -> Result<BulkValidationSummary, ApiError> {
    let readings: Vec<ReadingSubmission> = serde_json::from_str(input)?;
    let summary = validate_readings(&readings, config.high_consumption_limit());

    if summary.rejected > 0 {
        warn!(
            rejected = summary.rejected,
            total = summary.total,
            "Some readings were rejected"
        );
    }
    info!(
        total = summary.total,
        accepted = summary.accepted,
        flagged = summary.flagged,
        "Readings validated"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const READINGS: &str = r#"[
        { "meter_id": "M-1", "previous_reading": 100000, "current_reading": 250000,
          "reading_date": "2026-05-31" },
        { "meter_id": "M-2", "previous_reading": 900000, "current_reading": 800000,
          "reading_date": "2026-05-31" },
        { "meter_id": "M-3", "previous_reading": 0, "current_reading": 1000000,
          "reading_date": "2026-05-31" }
    ]"#;

    #[test]
    fn test_batch_summary_with_default_limit() {
        let summary = run(READINGS, &BillingConfig::default()).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.rejections[0].index, 1);
    }

    #[test]
    fn test_lower_limit_flags_more() {
        let mut config = BillingConfig::default();
        config.readings.high_consumption_units = 500;
        let summary = run(READINGS, &config).unwrap();
        assert_eq!(summary.flagged, 1);
        assert_eq!(summary.accepted, 1);
    }

    #[test]
    fn test_not_a_list() {
        assert!(run("{}", &BillingConfig::default()).is_err());
    }
}
