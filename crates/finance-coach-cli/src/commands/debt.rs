use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use finance_coach_core::amortization::{
    amortization_schedule, is_payable, monthly_interest, months_to_payoff, total_interest,
};
use finance_coach_core::debt::payoff::{self, StrategyComparisonInput};
use finance_coach_core::debt::planner::{self, DebtPlanInput, ExtraPaymentInput};
use finance_coach_core::Strategy;

use crate::input;

/// Arguments for a one-month debt plan
#[derive(Args)]
pub struct DebtPlanArgs {
    /// Path to JSON input file (debts, strategy, extra_payment | total_budget)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the strategy in the input: avalanche or snowball
    #[arg(long)]
    pub strategy: Option<Strategy>,

    /// Override the extra payment on top of minimums
    #[arg(long)]
    pub extra: Option<Decimal>,

    /// Override the total monthly debt budget
    #[arg(long)]
    pub budget: Option<Decimal>,
}

pub fn run_debt_plan(args: DebtPlanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut plan_input: DebtPlanInput = input::load(args.input.as_deref(), "debt-plan")?;
    if let Some(strategy) = args.strategy {
        plan_input.strategy = strategy;
    }
    if args.extra.is_some() {
        plan_input.extra_payment = args.extra;
    }
    if args.budget.is_some() {
        plan_input.total_budget = args.budget;
    }

    let result = planner::plan_month(&plan_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the avalanche vs snowball comparison
#[derive(Args)]
pub struct StrategyCompareArgs {
    /// Path to JSON input file (debts, monthly_budget | extra_payment)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_strategy_compare(args: StrategyCompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let compare_input: StrategyComparisonInput =
        input::load(args.input.as_deref(), "strategy-compare")?;
    let result = payoff::compare_strategies(&compare_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the minimums-only vs extra payment comparison
#[derive(Args)]
pub struct ExtraPaymentArgs {
    /// Path to JSON input file (debts, extra_monthly)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the extra monthly amount
    #[arg(long)]
    pub extra: Option<Decimal>,
}

pub fn run_extra_payment(args: ExtraPaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut extra_input: ExtraPaymentInput = input::load(args.input.as_deref(), "extra-payment")?;
    if let Some(extra) = args.extra {
        extra_input.extra_monthly = extra;
    }
    let result = planner::calculate_scenario_comparison(&extra_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for a single-loan payoff calculation
#[derive(Args)]
pub struct PayoffArgs {
    /// Outstanding balance
    #[arg(long)]
    pub balance: Decimal,

    /// Monthly payment
    #[arg(long)]
    pub payment: Decimal,

    /// Annual interest rate in percent (e.g. 12 for 12%)
    #[arg(long)]
    pub apr: Decimal,

    /// Include the month-by-month amortization table
    #[arg(long)]
    pub schedule: bool,
}

pub fn run_payoff(args: PayoffArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.balance < Decimal::ZERO || args.payment < Decimal::ZERO || args.apr < Decimal::ZERO {
        return Err("--balance, --payment and --apr must be >= 0".into());
    }

    let months = months_to_payoff(args.balance, args.payment, args.apr);
    let payable = is_payable(args.balance, args.payment, args.apr);
    let mut result = serde_json::json!({
        "months_to_payoff": months,
        "is_payable": payable,
        "monthly_interest": monthly_interest(args.balance, args.apr).round_dp(2),
        "total_interest": if payable {
            total_interest(args.balance, args.payment, months)
        } else {
            Decimal::ZERO
        },
    });
    if args.schedule {
        result["schedule"] =
            serde_json::to_value(amortization_schedule(args.balance, args.payment, args.apr))?;
    }

    let mut warnings = Vec::new();
    if !payable {
        warnings.push("Payment does not cover monthly interest; the balance never clears");
    }

    Ok(serde_json::json!({
        "result": result,
        "methodology": "Closed-form amortization, n = ln(P / (P - B*r)) / ln(1 + r)",
        "warnings": warnings,
    }))
}
