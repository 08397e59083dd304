use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use finance_coach_core::fire::projection::{self, FireInput, FireSeriesInput};
use finance_coach_core::{today, CoachConfig};

use crate::input;

/// Arguments for a FIRE analysis
#[derive(Args)]
pub struct FireArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Current net worth
    #[arg(long, allow_hyphen_values = true)]
    pub net_worth: Option<Decimal>,

    /// Amount invested each month
    #[arg(long)]
    pub contribution: Option<Decimal>,

    /// Annual spending in retirement
    #[arg(long)]
    pub annual_expenses: Option<Decimal>,

    /// Expected annual return as a decimal (default from config)
    #[arg(long, allow_hyphen_values = true)]
    pub annual_return: Option<Decimal>,

    /// Safe withdrawal rate as a decimal (default from config)
    #[arg(long)]
    pub withdrawal_rate: Option<Decimal>,

    /// Net monthly income, for the savings rate
    #[arg(long)]
    pub income: Option<Decimal>,
}

pub fn run_fire(args: FireArgs, config: &CoachConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let fire_input: FireInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let annual_expenses = args
            .annual_expenses
            .ok_or("--annual-expenses is required (or provide --input)")?;

        FireInput {
            current_net_worth: args.net_worth.unwrap_or(Decimal::ZERO),
            monthly_contribution: args.contribution.unwrap_or(Decimal::ZERO),
            annual_expenses,
            annual_return: args.annual_return.unwrap_or(config.expected_annual_return),
            withdrawal_rate: args.withdrawal_rate.unwrap_or(config.withdrawal_rate),
            monthly_income: args.income,
            as_of: today(),
        }
    };

    let result = projection::analyze_fire(&fire_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the month-by-month FIRE chart series
#[derive(Args)]
pub struct FireSeriesArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the horizon in years
    #[arg(long)]
    pub years: Option<u32>,
}

pub fn run_fire_series(args: FireSeriesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut series_input: FireSeriesInput = input::load(args.input.as_deref(), "fire-series")?;
    if let Some(years) = args.years {
        series_input.horizon_years = years;
    }
    let result = projection::projection_series(&series_input)?;
    Ok(serde_json::to_value(result)?)
}
