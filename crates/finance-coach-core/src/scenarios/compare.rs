use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CoachError;
use crate::scenarios::engine::ScenarioResult;
use crate::types::{with_metadata, ComputationOutput};
use crate::CoachResult;

/// One scenario singled out by [`compare_scenarios`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPick {
    /// Position in the input list
    pub index: usize,
    pub name: String,
    /// Savings gained per month, months saved, or years saved
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub best_for_savings: Option<ScenarioPick>,
    pub best_for_debt: Option<ScenarioPick>,
    pub best_for_fire: Option<ScenarioPick>,
    pub recommended: Option<ScenarioPick>,
    pub reason: String,
}

/// First scenario with the largest strictly positive score.
fn best_by<F>(results: &[ScenarioResult], score: F) -> Option<ScenarioPick>
where
    F: Fn(&ScenarioResult) -> Option<Decimal>,
{
    let mut best: Option<ScenarioPick> = None;
    for (index, r) in results.iter().enumerate() {
        let Some(value) = score(r) else { continue };
        if value <= Decimal::ZERO {
            continue;
        }
        if best.as_ref().map_or(true, |b| value > b.value) {
            best = Some(ScenarioPick {
                index,
                name: r.name.clone(),
                value,
            });
        }
    }
    best
}

/// Reduce several scenario results to the best for savings, debt payoff and
/// FIRE. Faster debt payoff is the overall recommendation whenever any
/// scenario achieves it; savings comes next, then FIRE.
pub fn compare_scenarios(
    results: &[ScenarioResult],
) -> CoachResult<ComputationOutput<ScenarioComparison>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if results.is_empty() {
        return Err(CoachError::InsufficientData(
            "At least one scenario result required".into(),
        ));
    }

    let baseline = &results[0].current_state;
    if results.iter().any(|r| &r.current_state != baseline) {
        warnings.push("Scenarios were simulated against different current states".into());
    }

    let best_for_savings = best_by(results, |r| Some(r.impact.monthly_savings_delta));
    let best_for_debt = best_by(results, |r| {
        Some(Decimal::from(-r.impact.debt_payoff_months_delta))
    });
    let best_for_fire = best_by(results, |r| r.impact.fire_years_delta.map(|d| -d));

    let (recommended, reason) = if let Some(pick) = &best_for_debt {
        let reason = match &best_for_savings {
            Some(s) if s.index != pick.index => format!(
                "'{}' clears debt {} months sooner; debt payoff takes priority over the higher savings of '{}'",
                pick.name, pick.value, s.name
            ),
            _ => format!("'{}' clears debt {} months sooner", pick.name, pick.value),
        };
        (Some(pick.clone()), reason)
    } else if let Some(pick) = &best_for_savings {
        (
            Some(pick.clone()),
            format!("'{}' adds {}/month to savings", pick.name, pick.value.round_dp(2)),
        )
    } else if let Some(pick) = &best_for_fire {
        (
            Some(pick.clone()),
            format!("'{}' reaches FIRE {} years sooner", pick.name, pick.value.round_dp(1)),
        )
    } else {
        warnings.push("No scenario improves savings, debt payoff or FIRE timing".into());
        (None, "No scenario improves on the current plan".to_string())
    };

    tracing::debug!(count = results.len(), ?recommended, "compared scenarios");

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Max-delta selection per goal, debt payoff prioritised",
        &serde_json::json!({
            "scenarios": results.len(),
            "priority": ["debt", "savings", "fire"],
        }),
        warnings,
        elapsed,
        ScenarioComparison {
            best_for_savings,
            best_for_debt,
            best_for_fire,
            recommended,
            reason,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoachConfig;
    use crate::scenarios::engine::ScenarioEngine;
    use crate::scenarios::state::FinancialSnapshot;
    use crate::types::Debt;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn engine(with_debt: bool) -> ScenarioEngine {
        let debts = if with_debt {
            vec![Debt {
                id: "card".into(),
                name: "Credit card".into(),
                current_balance: dec!(5000),
                annual_interest_rate_percent: dec!(12),
                monthly_payment: dec!(200),
                is_active: true,
            }]
        } else {
            vec![]
        };
        let snapshot = FinancialSnapshot {
            monthly_income: dec!(3200),
            monthly_expenses: dec!(2600),
            extra_debt_payment: Decimal::ZERO,
            current_net_worth: dec!(10_000),
            debts,
            category_spending: vec![],
            emergency_fund_target_months: None,
            as_of: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        };
        ScenarioEngine::new(snapshot, CoachConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(matches!(
            compare_scenarios(&[]),
            Err(CoachError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_debt_payoff_preferred() {
        let e = engine(true);
        let extra = e.simulate_extra_payment("card", dec!(50)).unwrap();
        let out = compare_scenarios(&[extra]).unwrap().result;
        assert_eq!(out.best_for_debt.as_ref().map(|p| p.index), Some(0));
        assert_eq!(out.recommended.map(|p| p.index), Some(0));
    }

    #[test]
    fn test_savings_wins_without_debt() {
        use crate::scenarios::engine::{ChangeAmount, IncomeChange};
        let e = engine(false);
        let small = e
            .simulate_income_change(&IncomeChange { change: ChangeAmount::Absolute(dec!(100)) })
            .unwrap();
        let large = e
            .simulate_income_change(&IncomeChange { change: ChangeAmount::Absolute(dec!(300)) })
            .unwrap();
        let out = compare_scenarios(&[small, large]).unwrap().result;
        assert!(out.best_for_debt.is_none());
        assert_eq!(out.best_for_savings.as_ref().map(|p| p.value), Some(dec!(300)));
        assert_eq!(out.recommended.map(|p| p.index), Some(1));
    }
}
