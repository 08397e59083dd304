pub mod payoff;
pub mod planner;

pub use payoff::{compare_strategies, simulate_payoff};
pub use planner::{calculate_scenario_comparison, plan_month, project_aggregate_payoff};
