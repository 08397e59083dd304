use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::fire::projection::{fire_number, project_to_fire, FireInput};
use crate::types::{Money, Percent, Rate};

/// Return-rate shifts applied to the base assumption.
pub const RETURN_DELTAS: [Decimal; 5] = [dec!(-0.02), dec!(-0.01), dec!(0), dec!(0.01), dec!(0.02)];

/// Expense shifts in percent of the base annual expenses.
pub const EXPENSE_DELTAS_PERCENT: [Decimal; 5] = [dec!(-20), dec!(-10), dec!(0), dec!(10), dec!(20)];

/// Fixed assumption bundles: (name, annual return, withdrawal rate).
pub const NAMED_SCENARIOS: [(&str, Decimal, Decimal); 3] = [
    ("conservative", dec!(0.05), dec!(0.035)),
    ("expected", dec!(0.07), dec!(0.04)),
    ("optimistic", dec!(0.09), dec!(0.045)),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub label: String,
    pub annual_return: Rate,
    pub annual_expenses: Money,
    pub withdrawal_rate: Rate,
    pub fire_number: Money,
    pub months_to_fire: u32,
    /// `None` when the target is not reachable within the horizon
    pub years_to_fire: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireSensitivity {
    pub return_sensitivity: Vec<SensitivityPoint>,
    pub expense_sensitivity: Vec<SensitivityPoint>,
    pub scenarios: Vec<SensitivityPoint>,
    pub return_values: Vec<Rate>,
    pub expense_delta_percents: Vec<Percent>,
    /// matrix[i][j] = years to FIRE at return_values[i], expense_delta_percents[j]
    pub matrix: Vec<Vec<Option<Decimal>>>,
}

fn evaluate(
    base: &FireInput,
    label: String,
    annual_return: Rate,
    annual_expenses: Money,
    withdrawal_rate: Rate,
) -> SensitivityPoint {
    let target = fire_number(annual_expenses, withdrawal_rate);
    let p = project_to_fire(
        base.current_net_worth,
        base.monthly_contribution,
        annual_return,
        target,
        base.as_of,
    );
    SensitivityPoint {
        label,
        annual_return,
        annual_expenses,
        withdrawal_rate,
        fire_number: target,
        months_to_fire: p.months_to_fire,
        years_to_fire: p.is_reachable.then_some(p.years_to_fire),
    }
}

fn signed(value: Decimal) -> String {
    let value = value.normalize();
    if value.is_sign_negative() {
        value.to_string()
    } else {
        format!("+{value}")
    }
}

fn shifted_return(base: Rate, delta: Rate) -> Rate {
    // Keep the monthly growth factor positive
    (base + delta).max(dec!(-0.99))
}

fn shifted_expenses(base: Money, delta_percent: Percent) -> Money {
    (base * (Decimal::ONE + delta_percent / Decimal::ONE_HUNDRED)).max(Decimal::ZERO)
}

/// Recompute the projection over the return/expense grid and the named
/// scenarios. Only `fire_number` and `project_to_fire` are used.
pub fn fire_sensitivity(base: &FireInput) -> FireSensitivity {
    let return_values: Vec<Rate> = RETURN_DELTAS
        .iter()
        .map(|d| shifted_return(base.annual_return, *d))
        .collect();

    let return_sensitivity = RETURN_DELTAS
        .iter()
        .zip(return_values.iter())
        .map(|(delta, r)| {
            evaluate(
                base,
                format!("return {}%", signed(delta * Decimal::ONE_HUNDRED)),
                *r,
                base.annual_expenses,
                base.withdrawal_rate,
            )
        })
        .collect();

    let expense_sensitivity = EXPENSE_DELTAS_PERCENT
        .iter()
        .map(|delta| {
            evaluate(
                base,
                format!("expenses {}%", signed(*delta)),
                base.annual_return,
                shifted_expenses(base.annual_expenses, *delta),
                base.withdrawal_rate,
            )
        })
        .collect();

    let scenarios = NAMED_SCENARIOS
        .iter()
        .map(|(name, annual_return, swr)| {
            evaluate(base, (*name).to_string(), *annual_return, base.annual_expenses, *swr)
        })
        .collect();

    let matrix = return_values
        .iter()
        .map(|r| {
            EXPENSE_DELTAS_PERCENT
                .iter()
                .map(|delta| {
                    evaluate(
                        base,
                        String::new(),
                        *r,
                        shifted_expenses(base.annual_expenses, *delta),
                        base.withdrawal_rate,
                    )
                    .years_to_fire
                })
                .collect()
        })
        .collect();

    FireSensitivity {
        return_sensitivity,
        expense_sensitivity,
        scenarios,
        return_values,
        expense_delta_percents: EXPENSE_DELTAS_PERCENT.to_vec(),
        matrix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn base() -> FireInput {
        FireInput {
            current_net_worth: dec!(50_000),
            monthly_contribution: dec!(1500),
            annual_expenses: dec!(30_000),
            annual_return: dec!(0.07),
            withdrawal_rate: dec!(0.04),
            monthly_income: None,
            as_of: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_grid_shape() {
        let s = fire_sensitivity(&base());
        assert_eq!(s.return_sensitivity.len(), 5);
        assert_eq!(s.expense_sensitivity.len(), 5);
        assert_eq!(s.scenarios.len(), 3);
        assert_eq!(s.matrix.len(), 5);
        assert!(s.matrix.iter().all(|row| row.len() == 5));
    }

    #[test]
    fn test_higher_return_is_never_slower() {
        let s = fire_sensitivity(&base());
        let months: Vec<u32> = s.return_sensitivity.iter().map(|p| p.months_to_fire).collect();
        assert!(months.windows(2).all(|w| w[0] >= w[1]), "{months:?}");
    }

    #[test]
    fn test_higher_expenses_are_never_faster() {
        let s = fire_sensitivity(&base());
        let months: Vec<u32> = s.expense_sensitivity.iter().map(|p| p.months_to_fire).collect();
        assert!(months.windows(2).all(|w| w[0] <= w[1]), "{months:?}");
    }

    #[test]
    fn test_center_matches_base_projection() {
        let b = base();
        let s = fire_sensitivity(&b);
        let p = project_to_fire(
            b.current_net_worth,
            b.monthly_contribution,
            b.annual_return,
            fire_number(b.annual_expenses, b.withdrawal_rate),
            b.as_of,
        );
        assert_eq!(s.matrix[2][2], Some(p.years_to_fire));
        assert_eq!(s.return_sensitivity[2].months_to_fire, p.months_to_fire);
    }

    #[test]
    fn test_conservative_slower_than_optimistic() {
        let s = fire_sensitivity(&base());
        assert_eq!(s.scenarios[0].label, "conservative");
        assert!(s.scenarios[0].months_to_fire > s.scenarios[2].months_to_fire);
    }
}
