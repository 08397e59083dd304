use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CoachError;
use crate::types::{Percent, Rate, Strategy};
use crate::CoachResult;

/// Months reported for a debt whose payment never clears its balance.
pub const UNPAYABLE_MONTHS: u32 = 999;

/// Upper bound for the months-to-target search (100 years).
pub const MAX_PROJECTION_MONTHS: u32 = 1200;

/// Upper bound for month-by-month amortization and payoff loops (30 years).
pub const MAX_SCHEDULE_MONTHS: u32 = 360;

/// Modelling assumptions shared by the planners and the scenario engine.
///
/// Every field has a default so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    /// Expected nominal annual return on invested savings (0.07 = 7%)
    pub expected_annual_return: Rate,
    /// Safe withdrawal rate used for the FIRE number (0.04 = 4%)
    pub withdrawal_rate: Rate,
    /// Payoff ordering used when a caller does not pick one
    pub strategy: Strategy,
    /// Savings swing (percent of baseline savings) that flips better/worse
    pub baseline_threshold_percent: Percent,
    /// Category overspend (percent above its own baseline) that is flagged
    pub category_anomaly_threshold_percent: Percent,
    /// Average APR assumed when estimating interest saved by a lump sum
    pub lump_sum_assumed_apr: Rate,
}

impl Default for CoachConfig {
    fn default() -> Self {
        CoachConfig {
            expected_annual_return: dec!(0.07),
            withdrawal_rate: dec!(0.04),
            strategy: Strategy::Avalanche,
            baseline_threshold_percent: dec!(10),
            category_anomaly_threshold_percent: dec!(50),
            lump_sum_assumed_apr: dec!(0.10),
        }
    }
}

impl CoachConfig {
    /// Parse a (possibly partial) JSON config document.
    pub fn from_json(raw: &str) -> CoachResult<Self> {
        let config: CoachConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoachResult<()> {
        if self.expected_annual_return <= dec!(-1) {
            return Err(CoachError::InvalidInput {
                field: "expected_annual_return".into(),
                reason: "must be greater than -100%".into(),
            });
        }
        if self.baseline_threshold_percent < Decimal::ZERO
            || self.category_anomaly_threshold_percent < Decimal::ZERO
        {
            return Err(CoachError::InvalidInput {
                field: "threshold".into(),
                reason: "thresholds must be >= 0".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = CoachConfig::from_json(r#"{"withdrawal_rate": "0.035"}"#).unwrap();
        assert_eq!(config.withdrawal_rate, dec!(0.035));
        assert_eq!(config.expected_annual_return, dec!(0.07));
        assert_eq!(config.strategy, Strategy::Avalanche);
    }

    #[test]
    fn test_strategy_parses_lowercase() {
        let config = CoachConfig::from_json(r#"{"strategy": "snowball"}"#).unwrap();
        assert_eq!(config.strategy, Strategy::Snowball);
    }

    #[test]
    fn test_rejects_return_below_minus_100() {
        assert!(CoachConfig::from_json(r#"{"expected_annual_return": "-1.5"}"#).is_err());
    }
}
