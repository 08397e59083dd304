use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::monthly_rate;
use crate::config::MAX_SCHEDULE_MONTHS;
use crate::debt::planner::order_debts;
use crate::types::{add_months, today, validate_debts, with_metadata, ComputationOutput};
use crate::types::{Debt, Money, Strategy};
use crate::CoachResult;

/// Input for the avalanche vs snowball comparison.
///
/// `monthly_budget` defaults to the sum of minimum payments plus
/// `extra_payment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyComparisonInput {
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub monthly_budget: Option<Money>,
    #[serde(default)]
    pub extra_payment: Option<Money>,
    #[serde(default = "today")]
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtPayoffSummary {
    pub debt_id: String,
    pub debt_name: String,
    pub order_in_strategy: u32,
    pub payoff_month: Option<u32>,
    pub payoff_date: Option<NaiveDate>,
    /// Interest charged to this debt, including any left unpaid
    pub interest_accrued: Money,
}

/// Month-by-month rolling payoff under one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffSimulation {
    pub strategy: Strategy,
    pub monthly_budget: Money,
    pub months_simulated: u32,
    pub cleared_all: bool,
    pub debt_free_date: Option<NaiveDate>,
    pub total_interest: Money,
    pub total_paid: Money,
    pub first_payoff_month: Option<u32>,
    pub remaining_balance: Money,
    pub debts: Vec<DebtPayoffSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub avalanche: PayoffSimulation,
    pub snowball: PayoffSimulation,
    /// Snowball interest minus avalanche interest
    pub interest_saved_by_avalanche: Money,
    /// Snowball months minus avalanche months
    pub months_difference: i64,
    pub recommended: Strategy,
    pub reason: String,
}

struct Slot {
    balance: Money,
    rate: Decimal,
    minimum: Money,
    interest_accrued: Money,
    payoff_month: Option<u32>,
}

/// Simulate paying `monthly_budget` every month until all debts clear or
/// `MAX_SCHEDULE_MONTHS` elapse.
///
/// Each month interest accrues, minimums are paid in strategy order, then the
/// rest of the budget goes to the first unpaid debt and cascades to the next
/// once it clears. Order is fixed from the starting balances. Balances that
/// outgrow the `Decimal` range saturate at `Decimal::MAX`.
pub fn simulate_payoff(
    debts: &[Debt],
    strategy: Strategy,
    monthly_budget: Money,
    as_of: NaiveDate,
) -> PayoffSimulation {
    let ordered = order_debts(debts, strategy);
    let budget = monthly_budget.max(Decimal::ZERO);

    let mut slots: Vec<Slot> = ordered
        .iter()
        .map(|d| Slot {
            balance: d.current_balance,
            rate: monthly_rate(d.annual_interest_rate_percent),
            minimum: d.monthly_payment,
            interest_accrued: Decimal::ZERO,
            payoff_month: None,
        })
        .collect();

    let mut month = 0;
    let mut total_paid = Decimal::ZERO;

    while month < MAX_SCHEDULE_MONTHS && slots.iter().any(|s| s.balance > Decimal::ZERO) {
        month += 1;
        let mut available = budget;

        for slot in slots.iter_mut().filter(|s| s.balance > Decimal::ZERO) {
            let interest = slot.balance.saturating_mul(slot.rate);
            slot.balance = slot.balance.saturating_add(interest);
            slot.interest_accrued = slot.interest_accrued.saturating_add(interest);
        }

        for slot in slots.iter_mut().filter(|s| s.balance > Decimal::ZERO) {
            let pay = slot.minimum.min(slot.balance).min(available);
            slot.balance -= pay;
            available -= pay;
            total_paid += pay;
        }

        for slot in slots.iter_mut().filter(|s| s.balance > Decimal::ZERO) {
            if available <= Decimal::ZERO {
                break;
            }
            let pay = slot.balance.min(available);
            slot.balance -= pay;
            available -= pay;
            total_paid += pay;
        }

        for slot in slots.iter_mut() {
            if slot.payoff_month.is_none() && slot.balance <= Decimal::ZERO {
                slot.payoff_month = Some(month);
            }
        }
    }

    let cleared_all = slots.iter().all(|s| s.payoff_month.is_some());
    let remaining_balance: Money = slots
        .iter()
        .fold(Decimal::ZERO, |acc, s| acc.saturating_add(s.balance.max(Decimal::ZERO)));
    if !cleared_all {
        tracing::warn!(%strategy, %remaining_balance, "debts not cleared within schedule cap");
    }

    let summaries: Vec<DebtPayoffSummary> = ordered
        .iter()
        .zip(slots.iter())
        .enumerate()
        .map(|(idx, (debt, slot))| DebtPayoffSummary {
            debt_id: debt.id.clone(),
            debt_name: debt.name.clone(),
            order_in_strategy: idx as u32 + 1,
            payoff_month: slot.payoff_month,
            payoff_date: slot.payoff_month.and_then(|m| add_months(as_of, m)),
            interest_accrued: slot.interest_accrued,
        })
        .collect();

    PayoffSimulation {
        strategy,
        monthly_budget: budget,
        months_simulated: month,
        cleared_all,
        debt_free_date: if cleared_all && month > 0 {
            add_months(as_of, month)
        } else {
            None
        },
        total_interest: slots
            .iter()
            .fold(Decimal::ZERO, |acc, s| acc.saturating_add(s.interest_accrued)),
        total_paid,
        first_payoff_month: slots.iter().filter_map(|s| s.payoff_month).min(),
        remaining_balance,
        debts: summaries,
    }
}

/// Run the rolling simulation under both strategies and recommend one.
pub fn compare_strategies(
    input: &StrategyComparisonInput,
) -> CoachResult<ComputationOutput<StrategyComparison>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_debts(&input.debts)?;

    let minimums: Money = input
        .debts
        .iter()
        .filter(|d| d.is_open())
        .map(|d| d.monthly_payment)
        .sum();
    let budget = input
        .monthly_budget
        .unwrap_or(minimums + input.extra_payment.unwrap_or(Decimal::ZERO).max(Decimal::ZERO));

    if budget < minimums {
        warnings.push(format!(
            "Monthly budget {budget} is below total minimum payments {minimums}"
        ));
    }

    let avalanche = simulate_payoff(&input.debts, Strategy::Avalanche, budget, input.as_of);
    let snowball = simulate_payoff(&input.debts, Strategy::Snowball, budget, input.as_of);

    if !avalanche.cleared_all || !snowball.cleared_all {
        warnings.push(format!(
            "Budget does not clear all debts within {MAX_SCHEDULE_MONTHS} months"
        ));
    }

    let interest_saved_by_avalanche = snowball.total_interest - avalanche.total_interest;
    let months_difference =
        i64::from(snowball.months_simulated) - i64::from(avalanche.months_simulated);

    let (recommended, reason) = if interest_saved_by_avalanche > Decimal::ZERO {
        (
            Strategy::Avalanche,
            format!(
                "Avalanche saves {} in interest",
                interest_saved_by_avalanche.round_dp(2)
            ),
        )
    } else if interest_saved_by_avalanche < Decimal::ZERO {
        (
            Strategy::Snowball,
            format!(
                "Snowball saves {} in interest",
                (-interest_saved_by_avalanche).round_dp(2)
            ),
        )
    } else {
        match (snowball.first_payoff_month, avalanche.first_payoff_month) {
            (Some(s), Some(a)) if s < a => (
                Strategy::Snowball,
                format!("Same interest; snowball clears its first debt {} months sooner", a - s),
            ),
            _ => (
                Strategy::Avalanche,
                "Same interest either way; avalanche kept as default".to_string(),
            ),
        }
    };

    tracing::debug!(%recommended, %interest_saved_by_avalanche, "compared payoff strategies");

    let comparison = StrategyComparison {
        avalanche,
        snowball,
        interest_saved_by_avalanche,
        months_difference,
        recommended,
        reason,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Rolling month-by-month payoff simulation (avalanche vs snowball)",
        &serde_json::json!({
            "monthly_budget": budget.to_string(),
            "max_months": MAX_SCHEDULE_MONTHS,
            "as_of": input.as_of.to_string(),
        }),
        warnings,
        elapsed,
        comparison,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn debt(id: &str, balance: Decimal, apr: Decimal, payment: Decimal) -> Debt {
        Debt {
            id: id.into(),
            name: id.into(),
            current_balance: balance,
            annual_interest_rate_percent: apr,
            monthly_payment: payment,
            is_active: true,
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_single_debt_matches_closed_form() {
        let debts = vec![debt("card", dec!(5000), dec!(12), dec!(200))];
        let sim = simulate_payoff(&debts, Strategy::Avalanche, dec!(200), as_of());
        assert!(sim.cleared_all);
        assert_eq!(sim.months_simulated, 29);
        assert_eq!(sim.debts[0].payoff_month, Some(29));
        assert!((sim.total_paid - dec!(5000) - sim.total_interest).abs() < dec!(0.000001));
    }

    #[test]
    fn test_freed_minimum_rolls_over() {
        let debts = vec![
            debt("small", dec!(300), dec!(0), dec!(100)),
            debt("large", dec!(1200), dec!(0), dec!(100)),
        ];
        let sim = simulate_payoff(&debts, Strategy::Snowball, dec!(200), as_of());
        // small clears in month 3, then large gets 200/month
        assert_eq!(sim.debts[0].payoff_month, Some(3));
        // large: 900 left after month 3, then 200/month clears it in month 8
        assert_eq!(sim.debts[1].payoff_month, Some(8));
        assert_eq!(sim.total_interest, Decimal::ZERO);
    }

    #[test]
    fn test_avalanche_saves_interest() {
        let input = StrategyComparisonInput {
            debts: vec![
                debt("cheap-small", dec!(1000), dec!(5), dec!(50)),
                debt("pricey-big", dec!(6000), dec!(24), dec!(150)),
            ],
            monthly_budget: Some(dec!(500)),
            extra_payment: None,
            as_of: as_of(),
        };
        let out = compare_strategies(&input).unwrap().result;
        assert!(out.interest_saved_by_avalanche > Decimal::ZERO);
        assert_eq!(out.recommended, Strategy::Avalanche);
        assert_eq!(out.snowball.debts[0].debt_id, "cheap-small");
        assert_eq!(out.avalanche.debts[0].debt_id, "pricey-big");
    }

    #[test]
    fn test_uncleared_budget_flags_warning() {
        let input = StrategyComparisonInput {
            debts: vec![debt("loan", dec!(10000), dec!(24), dec!(150))],
            monthly_budget: None,
            extra_payment: None,
            as_of: as_of(),
        };
        let out = compare_strategies(&input).unwrap();
        assert!(!out.result.avalanche.cleared_all);
        assert_eq!(out.result.avalanche.debt_free_date, None);
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_payday_loan_saturates_without_clearing() {
        let debts = vec![debt("payday", dec!(500), dec!(400), dec!(10))];
        let sim = simulate_payoff(&debts, Strategy::Avalanche, dec!(10), as_of());
        assert!(!sim.cleared_all);
        assert_eq!(sim.months_simulated, MAX_SCHEDULE_MONTHS);
        assert_eq!(sim.debts[0].payoff_month, None);
        assert!(sim.remaining_balance > dec!(1_000_000_000_000));
        assert!(sim.debts[0].interest_accrued > dec!(1_000_000_000_000));
    }
}
