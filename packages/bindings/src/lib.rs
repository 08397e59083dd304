use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use finance_coach_core::scenarios::{FinancialSnapshot, ScenarioChange, ScenarioEngine, ScenarioResult};
use finance_coach_core::CoachConfig;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse<T: DeserializeOwned>(input_json: &str) -> NapiResult<T> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

fn render<T: Serialize>(output: &T) -> NapiResult<String> {
    serde_json::to_string(output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Amortization
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct LoanInput {
    balance: rust_decimal::Decimal,
    payment: rust_decimal::Decimal,
    annual_interest_rate_percent: rust_decimal::Decimal,
}

#[napi]
pub fn months_to_payoff(input_json: String) -> NapiResult<u32> {
    let loan: LoanInput = parse(&input_json)?;
    Ok(finance_coach_core::amortization::months_to_payoff(
        loan.balance,
        loan.payment,
        loan.annual_interest_rate_percent,
    ))
}

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    let loan: LoanInput = parse(&input_json)?;
    render(&finance_coach_core::amortization::amortization_schedule(
        loan.balance,
        loan.payment,
        loan.annual_interest_rate_percent,
    ))
}

// ---------------------------------------------------------------------------
// Debt
// ---------------------------------------------------------------------------

#[napi]
pub fn plan_debt_month(input_json: String) -> NapiResult<String> {
    let input: finance_coach_core::debt::planner::DebtPlanInput = parse(&input_json)?;
    let output = finance_coach_core::debt::planner::plan_month(&input).map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn compare_extra_payment(input_json: String) -> NapiResult<String> {
    let input: finance_coach_core::debt::planner::ExtraPaymentInput = parse(&input_json)?;
    let output = finance_coach_core::debt::planner::calculate_scenario_comparison(&input)
        .map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn compare_payoff_strategies(input_json: String) -> NapiResult<String> {
    let input: finance_coach_core::debt::payoff::StrategyComparisonInput = parse(&input_json)?;
    let output =
        finance_coach_core::debt::payoff::compare_strategies(&input).map_err(to_napi_error)?;
    render(&output)
}

// ---------------------------------------------------------------------------
// FIRE
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_fire(input_json: String) -> NapiResult<String> {
    let input: finance_coach_core::fire::projection::FireInput = parse(&input_json)?;
    let output = finance_coach_core::fire::projection::analyze_fire(&input).map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn fire_projection_series(input_json: String) -> NapiResult<String> {
    let input: finance_coach_core::fire::projection::FireSeriesInput = parse(&input_json)?;
    let output =
        finance_coach_core::fire::projection::projection_series(&input).map_err(to_napi_error)?;
    render(&output)
}

// ---------------------------------------------------------------------------
// Baseline
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_baseline(input_json: String) -> NapiResult<String> {
    let input: finance_coach_core::baseline::calculator::BaselineInput = parse(&input_json)?;
    let output =
        finance_coach_core::baseline::calculator::calculate_baseline(&input).map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn compare_to_baseline(input_json: String) -> NapiResult<String> {
    let input: finance_coach_core::baseline::calculator::BaselineComparisonInput =
        parse(&input_json)?;
    let output = finance_coach_core::baseline::calculator::compare_to_baseline(&input)
        .map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn category_baselines(input_json: String) -> NapiResult<String> {
    let input: finance_coach_core::baseline::categories::CategoryBaselineInput =
        parse(&input_json)?;
    let output = finance_coach_core::baseline::categories::category_baselines(&input)
        .map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn detect_category_anomalies(input_json: String) -> NapiResult<String> {
    let input: finance_coach_core::baseline::categories::CategoryAnomalyInput =
        parse(&input_json)?;
    let output = finance_coach_core::baseline::categories::detect_category_anomalies(&input)
        .map_err(to_napi_error)?;
    render(&output)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ScenarioRequest {
    snapshot: FinancialSnapshot,
    #[serde(default)]
    config: CoachConfig,
    change: ScenarioChange,
}

#[napi]
pub fn current_financial_state(input_json: String) -> NapiResult<String> {
    #[derive(Deserialize)]
    struct StateRequest {
        snapshot: FinancialSnapshot,
        #[serde(default)]
        config: CoachConfig,
    }
    let request: StateRequest = parse(&input_json)?;
    let engine = ScenarioEngine::new(request.snapshot, request.config).map_err(to_napi_error)?;
    render(engine.current_state())
}

#[napi]
pub fn simulate_scenario(input_json: String) -> NapiResult<String> {
    let request: ScenarioRequest = parse(&input_json)?;
    let engine = ScenarioEngine::new(request.snapshot, request.config).map_err(to_napi_error)?;
    let result = engine.simulate(&request.change).map_err(to_napi_error)?;
    render(&result)
}

#[napi]
pub fn compare_scenarios(input_json: String) -> NapiResult<String> {
    let results: Vec<ScenarioResult> = parse(&input_json)?;
    let output =
        finance_coach_core::scenarios::compare_scenarios(&results).map_err(to_napi_error)?;
    render(&output)
}
