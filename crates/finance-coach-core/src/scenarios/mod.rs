pub mod compare;
pub mod engine;
pub mod state;

pub use compare::{compare_scenarios, ScenarioComparison, ScenarioPick};
pub use engine::{
    ChangeAmount, ExpenseChange, ExtraDebtPayment, Impact, IncomeChange, LumpSum,
    LumpSumAllocation, ScenarioChange, ScenarioEngine, ScenarioResult, ScenarioType,
};
pub use state::{compute_state, CategoryAmount, FinancialSnapshot, FinancialState, UserProfile};
