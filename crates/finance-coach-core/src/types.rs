use chrono::{Local, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoachError;
use crate::CoachResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Percent-valued fields say so in
/// their name.
pub type Rate = Decimal;

/// Percentages (12.5 = 12.5%)
pub type Percent = Decimal;

/// Debt payoff ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Highest APR first (minimises total interest)
    #[default]
    Avalanche,
    /// Smallest balance first (fastest first payoff)
    Snowball,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Avalanche => "avalanche",
            Strategy::Snowball => "snowball",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Strategy {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avalanche" => Ok(Strategy::Avalanche),
            "snowball" => Ok(Strategy::Snowball),
            other => Err(CoachError::InvalidInput {
                field: "strategy".into(),
                reason: format!("unknown strategy '{other}', expected avalanche or snowball"),
            }),
        }
    }
}

/// A debt as held by the debt store. `monthly_payment` is the minimum
/// payment the user is committed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub id: String,
    pub name: String,
    pub current_balance: Money,
    pub annual_interest_rate_percent: Percent,
    pub monthly_payment: Money,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Debt {
    /// Active debts with something left to pay.
    pub fn is_open(&self) -> bool {
        self.is_active && self.current_balance > Decimal::ZERO
    }
}

/// Reject negative balances, rates and payments. Everything downstream
/// assumes non-negative quantities.
pub fn validate_debts(debts: &[Debt]) -> CoachResult<()> {
    for debt in debts {
        let checks = [
            ("current_balance", debt.current_balance),
            ("annual_interest_rate_percent", debt.annual_interest_rate_percent),
            ("monthly_payment", debt.monthly_payment),
        ];
        for (field, value) in checks {
            if value < Decimal::ZERO {
                return Err(CoachError::InvalidInput {
                    field: format!("debts[{}].{field}", debt.id),
                    reason: "must be >= 0".into(),
                });
            }
        }
    }
    Ok(())
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Default "as of" date for serde inputs that omit one.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `date + months`, or `None` if the result leaves chrono's range.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// `part / whole * 100`, zero when `whole` is zero.
pub fn percent_of(part: Decimal, whole: Decimal) -> Percent {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part / whole * Decimal::ONE_HUNDRED
}
