use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use finance_coach_core::baseline::calculator::{self, BaselineComparisonInput, BaselineInput};
use finance_coach_core::baseline::categories::{self, CategoryAnomalyInput, CategoryBaselineInput};
use finance_coach_core::CoachConfig;

use crate::input;

/// Arguments for the trailing three-month baseline
#[derive(Args)]
pub struct BaselineArgs {
    /// Path to JSON input file (reference_month, history, debts)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_baseline(args: BaselineArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let baseline_input: BaselineInput = input::load(args.input.as_deref(), "baseline")?;
    let result = calculator::calculate_baseline(&baseline_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for comparing a month against its baseline
#[derive(Args)]
pub struct BaselineCompareArgs {
    /// Path to JSON input file (current, baseline)
    #[arg(long)]
    pub input: Option<String>,

    /// Savings swing in percent that flips the status (default from config)
    #[arg(long)]
    pub threshold: Option<Decimal>,
}

pub fn run_baseline_compare(
    args: BaselineCompareArgs,
    config: &CoachConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut compare_input: BaselineComparisonInput =
        input::load(args.input.as_deref(), "baseline-compare")?;
    compare_input.threshold_percent = args
        .threshold
        .or(compare_input.threshold_percent)
        .or(Some(config.baseline_threshold_percent));
    let result = calculator::compare_to_baseline(&compare_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for per-category baselines
#[derive(Args)]
pub struct CategoryBaselinesArgs {
    /// Path to JSON input file (reference_month, history)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_category_baselines(args: CategoryBaselinesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let baseline_input: CategoryBaselineInput =
        input::load(args.input.as_deref(), "category-baselines")?;
    let result = categories::category_baselines(&baseline_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for category anomaly detection
#[derive(Args)]
pub struct CategoryAnomaliesArgs {
    /// Path to JSON input file (reference_month, history, current)
    #[arg(long)]
    pub input: Option<String>,

    /// Percent above baseline that flags a category (default from config)
    #[arg(long)]
    pub threshold: Option<Decimal>,
}

pub fn run_category_anomalies(
    args: CategoryAnomaliesArgs,
    config: &CoachConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut anomaly_input: CategoryAnomalyInput =
        input::load(args.input.as_deref(), "category-anomalies")?;
    anomaly_input.threshold_percent = args
        .threshold
        .or(anomaly_input.threshold_percent)
        .or(Some(config.category_anomaly_threshold_percent));
    let result = categories::detect_category_anomalies(&anomaly_input)?;
    Ok(serde_json::to_value(result)?)
}
