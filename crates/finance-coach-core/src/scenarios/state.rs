use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::CoachConfig;
use crate::debt::planner::project_aggregate_payoff;
use crate::error::CoachError;
use crate::fire::projection::{fire_number, project_to_fire};
use crate::types::{percent_of, today, validate_debts, Debt, Money, Percent};
use crate::CoachResult;

/// Monthly spending attributed to one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAmount {
    pub category_name: String,
    pub monthly_amount: Money,
}

/// User profile fields the engine reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub monthly_net_income: Money,
    #[serde(default)]
    pub emergency_fund_target_months: Option<u32>,
}

/// Raw inputs for a [`FinancialState`].
///
/// `monthly_expenses` includes minimum debt payments. `extra_debt_payment`
/// is surplus committed to debt on top of the minimums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub monthly_income: Money,
    pub monthly_expenses: Money,
    #[serde(default)]
    pub extra_debt_payment: Money,
    #[serde(default)]
    pub current_net_worth: Money,
    #[serde(default)]
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub category_spending: Vec<CategoryAmount>,
    #[serde(default)]
    pub emergency_fund_target_months: Option<u32>,
    #[serde(default = "today")]
    pub as_of: NaiveDate,
}

impl FinancialSnapshot {
    /// Build a snapshot from a profile and a computed baseline. Baseline
    /// income wins when there is data; otherwise the profile income is used.
    #[cfg(feature = "baseline")]
    pub fn from_profile_and_baseline(
        profile: &UserProfile,
        baseline: &crate::baseline::BaselineMetrics,
        debts: Vec<Debt>,
        current_net_worth: Money,
        as_of: NaiveDate,
    ) -> Self {
        let monthly_income = if baseline.has_data && baseline.avg_monthly_income > Decimal::ZERO {
            baseline.avg_monthly_income
        } else {
            profile.monthly_net_income
        };
        FinancialSnapshot {
            monthly_income,
            monthly_expenses: baseline.avg_monthly_spending,
            extra_debt_payment: Decimal::ZERO,
            current_net_worth,
            debts,
            category_spending: Vec::new(),
            emergency_fund_target_months: profile.emergency_fund_target_months,
            as_of,
        }
    }

    pub fn has_open_debts(&self) -> bool {
        self.debts.iter().any(Debt::is_open)
    }

    pub fn minimum_payments(&self) -> Money {
        self.debts
            .iter()
            .filter(|d| d.is_open())
            .map(|d| d.monthly_payment)
            .sum()
    }

    pub fn validate(&self) -> CoachResult<()> {
        let checks = [
            ("monthly_income", self.monthly_income),
            ("monthly_expenses", self.monthly_expenses),
            ("extra_debt_payment", self.extra_debt_payment),
        ];
        for (field, value) in checks {
            if value < Decimal::ZERO {
                return Err(CoachError::InvalidInput {
                    field: field.into(),
                    reason: "must be >= 0".into(),
                });
            }
        }
        validate_debts(&self.debts)
    }
}

/// The canonical "current state" a scenario diffs against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialState {
    pub monthly_income: Money,
    pub monthly_expenses: Money,
    /// Income minus expenses; includes surplus sent to extra debt payments
    pub monthly_savings: Money,
    pub savings_rate: Percent,
    pub extra_debt_payment: Money,
    /// Savings left to invest after extra debt payments
    pub monthly_investment: Money,
    pub total_debt: Money,
    pub monthly_debt_payment: Money,
    pub debt_to_income_percent: Percent,
    pub debt_payoff_months: u32,
    pub debt_payoff_date: Option<NaiveDate>,
    pub total_debt_interest: Money,
    pub debt_payable: bool,
    pub net_worth: Money,
    pub fire_number: Money,
    pub fire_years: Option<Decimal>,
    pub fire_date: Option<NaiveDate>,
    pub emergency_fund_target: Option<Money>,
}

/// Derive the full state from a snapshot.
///
/// Debt payoff uses the weighted-average-rate projection on minimums plus
/// extra. FIRE uses twelve months of expenses over the withdrawal rate and
/// grows net worth with `monthly_investment`.
pub fn compute_state(snapshot: &FinancialSnapshot, config: &CoachConfig) -> FinancialState {
    let monthly_savings = snapshot.monthly_income - snapshot.monthly_expenses;
    let has_debts = snapshot.has_open_debts();
    let extra = if has_debts {
        snapshot.extra_debt_payment
    } else {
        Decimal::ZERO
    };
    let monthly_investment = (monthly_savings - extra).max(Decimal::ZERO);
    let monthly_debt_payment = if has_debts {
        snapshot.minimum_payments() + extra
    } else {
        Decimal::ZERO
    };

    let payoff = project_aggregate_payoff(&snapshot.debts, monthly_debt_payment, snapshot.as_of);

    let target = fire_number(
        snapshot.monthly_expenses * Decimal::from(12),
        config.withdrawal_rate,
    );
    let fire = project_to_fire(
        snapshot.current_net_worth,
        monthly_investment,
        config.expected_annual_return,
        target,
        snapshot.as_of,
    );

    FinancialState {
        monthly_income: snapshot.monthly_income,
        monthly_expenses: snapshot.monthly_expenses,
        monthly_savings,
        savings_rate: percent_of(monthly_savings, snapshot.monthly_income).round_dp(2),
        extra_debt_payment: extra,
        monthly_investment,
        total_debt: payoff.total_debt,
        monthly_debt_payment,
        debt_to_income_percent: percent_of(monthly_debt_payment, snapshot.monthly_income).round_dp(2),
        debt_payoff_months: payoff.months_to_payoff,
        debt_payoff_date: payoff.payoff_date,
        total_debt_interest: payoff.total_interest,
        debt_payable: payoff.is_payable,
        net_worth: snapshot.current_net_worth,
        fire_number: target,
        fire_years: fire.is_reachable.then_some(fire.years_to_fire),
        fire_date: fire.fire_date,
        emergency_fund_target: snapshot
            .emergency_fund_target_months
            .map(|m| snapshot.monthly_expenses * Decimal::from(m)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> FinancialSnapshot {
        FinancialSnapshot {
            monthly_income: dec!(3200),
            monthly_expenses: dec!(2600),
            extra_debt_payment: Decimal::ZERO,
            current_net_worth: dec!(10_000),
            debts: vec![Debt {
                id: "card".into(),
                name: "Credit card".into(),
                current_balance: dec!(5000),
                annual_interest_rate_percent: dec!(12),
                monthly_payment: dec!(200),
                is_active: true,
            }],
            category_spending: vec![],
            emergency_fund_target_months: Some(6),
            as_of: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_state_from_reference_example() {
        let state = compute_state(&snapshot(), &CoachConfig::default());
        assert_eq!(state.monthly_savings, dec!(600));
        assert_eq!(state.savings_rate, dec!(18.75));
        assert_eq!(state.total_debt, dec!(5000));
        assert_eq!(state.monthly_debt_payment, dec!(200));
        assert_eq!(state.debt_payoff_months, 29);
        assert_eq!(state.debt_to_income_percent, dec!(6.25));
        assert_eq!(state.fire_number, dec!(780_000));
        assert!(state.fire_years.is_some());
        assert_eq!(state.emergency_fund_target, Some(dec!(15_600)));
    }

    #[test]
    fn test_extra_ignored_without_debts() {
        let mut snap = snapshot();
        snap.debts.clear();
        snap.extra_debt_payment = dec!(100);
        let state = compute_state(&snap, &CoachConfig::default());
        assert_eq!(state.extra_debt_payment, Decimal::ZERO);
        assert_eq!(state.monthly_investment, dec!(600));
        assert_eq!(state.debt_payoff_months, 0);
        assert_eq!(state.debt_payoff_date, None);
    }

    #[test]
    fn test_negative_income_rejected() {
        let mut snap = snapshot();
        snap.monthly_income = dec!(-1);
        assert!(snap.validate().is_err());
    }
}
