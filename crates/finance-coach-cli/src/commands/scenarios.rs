use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use finance_coach_core::scenarios::{
    compare_scenarios, FinancialSnapshot, ScenarioChange, ScenarioEngine, ScenarioResult,
};
use finance_coach_core::CoachConfig;

use crate::input;

/// One what-if against a snapshot.
#[derive(Debug, Deserialize)]
struct ScenarioRequest {
    snapshot: FinancialSnapshot,
    /// Overrides `--config` for this request
    #[serde(default)]
    config: Option<CoachConfig>,
    change: ScenarioChange,
}

/// Several what-ifs against the same snapshot.
#[derive(Debug, Deserialize)]
struct ScenarioBatch {
    snapshot: FinancialSnapshot,
    #[serde(default)]
    config: Option<CoachConfig>,
    changes: Vec<ScenarioChange>,
}

/// Arguments for a single scenario simulation
#[derive(Args)]
pub struct ScenarioArgs {
    /// Path to JSON input file ({ snapshot, change, config? })
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_scenario(args: ScenarioArgs, config: &CoachConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ScenarioRequest = input::load(args.input.as_deref(), "scenario")?;
    let engine = ScenarioEngine::new(request.snapshot, request.config.unwrap_or_else(|| config.clone()))?;
    let result = engine.simulate(&request.change)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for simulating and ranking several scenarios
#[derive(Args)]
pub struct CompareScenariosArgs {
    /// Path to JSON input file ({ snapshot, changes: [...], config? })
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_compare_scenarios(
    args: CompareScenariosArgs,
    config: &CoachConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let batch: ScenarioBatch = input::load(args.input.as_deref(), "compare-scenarios")?;
    let engine = ScenarioEngine::new(batch.snapshot, batch.config.unwrap_or_else(|| config.clone()))?;

    let results: Vec<ScenarioResult> = batch
        .changes
        .iter()
        .map(|change| engine.simulate(change))
        .collect::<Result<_, _>>()?;
    let comparison = compare_scenarios(&results)?;

    let mut value = serde_json::to_value(comparison)?;
    let simulated: Vec<Value> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "name": r.name,
                "scenario_type": r.scenario_type,
                "summary": r.summary,
                "impact": r.impact,
            })
        })
        .collect();
    value["scenarios"] = Value::Array(simulated);
    Ok(value)
}
