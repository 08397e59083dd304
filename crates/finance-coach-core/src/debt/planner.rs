use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::{is_payable, months_to_payoff, total_interest};
use crate::types::{add_months, today, validate_debts, with_metadata, ComputationOutput};
use crate::types::{Debt, Money, Percent, Strategy};
use crate::CoachResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for a single month's debt plan.
///
/// Supply either `extra_payment` (on top of all minimums) or
/// `total_budget` (everything available for debt this month). When both
/// are present the budget wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtPlanInput {
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub extra_payment: Option<Money>,
    #[serde(default)]
    pub total_budget: Option<Money>,
    #[serde(default = "today")]
    pub as_of: NaiveDate,
}

/// Allocation for one debt in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtPayment {
    pub debt_id: String,
    pub debt_name: String,
    pub current_balance: Money,
    pub annual_interest_rate_percent: Percent,
    pub minimum_payment: Money,
    pub extra_payment: Money,
    pub planned_payment: Money,
    /// 1 = focus debt receiving the extra
    pub order_in_strategy: u32,
    pub is_focus: bool,
    pub projected_balance_after: Money,
    /// Months to clear this debt at `planned_payment`
    pub months_to_payoff: u32,
    pub is_payable: bool,
}

/// All allocations for one month under one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyDebtPlan {
    pub strategy: Strategy,
    pub as_of: NaiveDate,
    pub payments: Vec<DebtPayment>,
    pub total_debt: Money,
    pub total_minimum_payments: Money,
    pub total_available: Money,
    pub extra_available: Money,
    pub weighted_average_rate_percent: Percent,
    /// Weighted-average-rate approximation, see `project_aggregate_payoff`
    pub months_remaining: u32,
    pub total_interest: Money,
    pub projected_payoff_date: Option<NaiveDate>,
    pub unpayable_debts: Vec<String>,
}

/// Aggregate payoff projection for a pool of debts at one monthly payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffProjection {
    pub total_debt: Money,
    pub monthly_payment: Money,
    pub weighted_average_rate_percent: Percent,
    pub months_to_payoff: u32,
    pub total_interest: Money,
    pub payoff_date: Option<NaiveDate>,
    pub is_payable: bool,
}

/// Input for the minimums-only vs minimums-plus-extra comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraPaymentInput {
    pub debts: Vec<Debt>,
    pub extra_monthly: Money,
    #[serde(default = "today")]
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraPaymentComparison {
    pub extra_monthly: Money,
    pub minimums_only: PayoffProjection,
    pub with_extra: PayoffProjection,
    pub months_saved: i64,
    pub interest_saved: Money,
    /// `None` when either side never pays off
    pub payoff_date_improvement_days: Option<i64>,
}

// ---------------------------------------------------------------------------
// Ordering and aggregates
// ---------------------------------------------------------------------------

/// Active, non-zero debts in strategy order. The sort is stable so ties keep
/// input order.
pub fn order_debts(debts: &[Debt], strategy: Strategy) -> Vec<&Debt> {
    let mut open: Vec<&Debt> = debts.iter().filter(|d| d.is_open()).collect();
    match strategy {
        Strategy::Avalanche => open.sort_by(|a, b| {
            b.annual_interest_rate_percent
                .cmp(&a.annual_interest_rate_percent)
        }),
        Strategy::Snowball => open.sort_by(|a, b| a.current_balance.cmp(&b.current_balance)),
    }
    open
}

/// Balance-weighted APR across debts; zero for an empty pool.
pub fn weighted_average_rate<'a>(debts: impl IntoIterator<Item = &'a Debt>) -> Percent {
    let (weighted, total) = debts
        .into_iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(w, t), d| {
            (
                w + d.current_balance * d.annual_interest_rate_percent,
                t + d.current_balance,
            )
        });
    if total.is_zero() {
        Decimal::ZERO
    } else {
        weighted / total
    }
}

/// Project the whole pool as one loan at the weighted-average rate paid with
/// `monthly_payment`.
///
/// This does not roll freed minimums into other debts, so the month count
/// is conservative and can differ from the sum of the per-debt payoffs.
pub fn project_aggregate_payoff(
    debts: &[Debt],
    monthly_payment: Money,
    as_of: NaiveDate,
) -> PayoffProjection {
    let open: Vec<&Debt> = debts.iter().filter(|d| d.is_open()).collect();
    let total_debt: Money = open.iter().map(|d| d.current_balance).sum();
    let rate = weighted_average_rate(open.iter().copied());
    let payment = monthly_payment.max(Decimal::ZERO);

    let months = months_to_payoff(total_debt, payment, rate);
    let payable = is_payable(total_debt, payment, rate);
    let interest = if payable {
        total_interest(total_debt, payment, months)
    } else {
        Decimal::ZERO
    };
    let payoff_date = if payable && !total_debt.is_zero() {
        add_months(as_of, months)
    } else {
        None
    };

    PayoffProjection {
        total_debt,
        monthly_payment: payment,
        weighted_average_rate_percent: rate,
        months_to_payoff: months,
        total_interest: interest,
        payoff_date,
        is_payable: payable,
    }
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Build this month's payment plan.
///
/// Every debt receives its minimum; all extra goes to the first debt in
/// strategy order, capped at `balance - minimum`. Extra left over after the
/// focus debt is capped is not passed on to the next debt this month.
pub fn plan_month(input: &DebtPlanInput) -> CoachResult<ComputationOutput<MonthlyDebtPlan>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_debts(&input.debts)?;

    let ordered = order_debts(&input.debts, input.strategy);
    let total_debt: Money = ordered.iter().map(|d| d.current_balance).sum();
    let total_minimums: Money = ordered.iter().map(|d| d.monthly_payment).sum();

    if input.total_budget.is_some() && input.extra_payment.is_some() {
        warnings.push("Both total_budget and extra_payment given; using total_budget".into());
    }

    let (total_available, extra_available) = match (input.total_budget, input.extra_payment) {
        (Some(budget), _) => {
            let budget = budget.max(Decimal::ZERO);
            (budget, (budget - total_minimums).max(Decimal::ZERO))
        }
        (None, Some(extra)) => {
            let extra = extra.max(Decimal::ZERO);
            (total_minimums + extra, extra)
        }
        (None, None) => (total_minimums, Decimal::ZERO),
    };

    if total_available < total_minimums {
        warnings.push(format!(
            "Available {total_available} does not cover minimum payments of {total_minimums}; \
             minimums are funded in strategy order"
        ));
    }

    let mut remaining = total_available;
    let mut payments = Vec::with_capacity(ordered.len());
    let mut unpayable_debts = Vec::new();

    for (idx, debt) in ordered.iter().enumerate() {
        let minimum = debt.monthly_payment.min(remaining).max(Decimal::ZERO);
        remaining -= minimum;

        let is_focus = idx == 0;
        let extra = if is_focus {
            let room = (debt.current_balance - minimum).max(Decimal::ZERO);
            extra_available.min(room).min(remaining)
        } else {
            Decimal::ZERO
        };
        remaining -= extra;

        let planned = minimum + extra;
        let rate = debt.annual_interest_rate_percent;
        let accrued = debt.current_balance * rate / Decimal::ONE_HUNDRED / Decimal::from(12);
        let after = (debt.current_balance + accrued - planned).max(Decimal::ZERO);
        let months = months_to_payoff(debt.current_balance, planned, rate);
        let payable = is_payable(debt.current_balance, planned, rate);

        if !payable {
            tracing::warn!(debt_id = %debt.id, payment = %planned, "payment does not cover interest");
            warnings.push(format!(
                "{}: payment of {planned} does not cover monthly interest of {}; balance will never clear",
                debt.name,
                accrued.round_dp(2)
            ));
            unpayable_debts.push(debt.id.clone());
        }

        payments.push(DebtPayment {
            debt_id: debt.id.clone(),
            debt_name: debt.name.clone(),
            current_balance: debt.current_balance,
            annual_interest_rate_percent: rate,
            minimum_payment: minimum,
            extra_payment: extra,
            planned_payment: planned,
            order_in_strategy: idx as u32 + 1,
            is_focus,
            projected_balance_after: after,
            months_to_payoff: months,
            is_payable: payable,
        });
    }

    let projection = project_aggregate_payoff(&input.debts, total_available, input.as_of);
    if !ordered.is_empty() {
        warnings.push(
            "Months remaining uses the weighted-average rate on the full budget; \
             it is an approximation and may differ from per-debt payoff times"
                .into(),
        );
        if !projection.is_payable {
            warnings.push("Total budget does not cover aggregate interest; debt-free date unknown".into());
        }
    }

    tracing::debug!(
        strategy = %input.strategy,
        debts = ordered.len(),
        total_debt = %total_debt,
        months = projection.months_to_payoff,
        "built monthly debt plan"
    );

    let plan = MonthlyDebtPlan {
        strategy: input.strategy,
        as_of: input.as_of,
        payments,
        total_debt,
        total_minimum_payments: total_minimums,
        total_available,
        extra_available,
        weighted_average_rate_percent: projection.weighted_average_rate_percent,
        months_remaining: projection.months_to_payoff,
        total_interest: projection.total_interest,
        projected_payoff_date: projection.payoff_date,
        unpayable_debts,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Single-focus monthly allocation with weighted-average-rate payoff projection",
        &serde_json::json!({
            "strategy": input.strategy,
            "extra_payment": input.extra_payment.map(|d| d.to_string()),
            "total_budget": input.total_budget.map(|d| d.to_string()),
            "as_of": input.as_of.to_string(),
        }),
        warnings,
        elapsed,
        plan,
    ))
}

/// Compare paying minimums only against minimums plus `extra_monthly`.
pub fn calculate_scenario_comparison(
    input: &ExtraPaymentInput,
) -> CoachResult<ComputationOutput<ExtraPaymentComparison>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_debts(&input.debts)?;

    let extra = input.extra_monthly.max(Decimal::ZERO);
    if extra.is_zero() {
        warnings.push("No positive extra payment supplied; both projections are identical".into());
    }

    let minimums: Money = input
        .debts
        .iter()
        .filter(|d| d.is_open())
        .map(|d| d.monthly_payment)
        .sum();

    let base = project_aggregate_payoff(&input.debts, minimums, input.as_of);
    let boosted = project_aggregate_payoff(&input.debts, minimums + extra, input.as_of);

    if !base.is_payable {
        warnings.push("Minimum payments alone never clear the debt".into());
    }
    if !boosted.is_payable {
        warnings.push("Minimums plus extra still do not cover interest".into());
    }

    let months_saved = i64::from(base.months_to_payoff) - i64::from(boosted.months_to_payoff);
    let interest_saved = if base.is_payable && boosted.is_payable {
        base.total_interest - boosted.total_interest
    } else {
        Decimal::ZERO
    };
    let payoff_date_improvement_days = match (base.payoff_date, boosted.payoff_date) {
        (Some(before), Some(after)) => Some((before - after).num_days()),
        _ => None,
    };

    let comparison = ExtraPaymentComparison {
        extra_monthly: extra,
        minimums_only: base,
        with_extra: boosted,
        months_saved,
        interest_saved,
        payoff_date_improvement_days,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Minimums-only vs minimums-plus-extra aggregate payoff",
        &serde_json::json!({
            "extra_monthly": extra.to_string(),
            "as_of": input.as_of.to_string(),
        }),
        warnings,
        elapsed,
        comparison,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UNPAYABLE_MONTHS;
    use rust_decimal_macros::dec;

    fn debt(id: &str, balance: Decimal, apr: Decimal, payment: Decimal) -> Debt {
        Debt {
            id: id.into(),
            name: id.to_uppercase(),
            current_balance: balance,
            annual_interest_rate_percent: apr,
            monthly_payment: payment,
            is_active: true,
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn test_order_debts_stable_on_ties() {
        let debts = vec![
            debt("a", dec!(100), dec!(10), dec!(10)),
            debt("b", dec!(200), dec!(10), dec!(10)),
            debt("c", dec!(50), dec!(20), dec!(10)),
        ];
        let ids: Vec<&str> = order_debts(&debts, Strategy::Avalanche)
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_order_debts_skips_inactive_and_cleared() {
        let mut closed = debt("closed", dec!(100), dec!(30), dec!(10));
        closed.is_active = false;
        let debts = vec![closed, debt("zero", Decimal::ZERO, dec!(25), dec!(10))];
        assert!(order_debts(&debts, Strategy::Avalanche).is_empty());
    }

    #[test]
    fn test_weighted_average_rate() {
        let debts = vec![
            debt("a", dec!(1000), dec!(5), dec!(50)),
            debt("b", dec!(1000), dec!(15), dec!(50)),
        ];
        assert_eq!(weighted_average_rate(&debts), dec!(10));
        assert_eq!(weighted_average_rate(Vec::<Debt>::new().iter()), Decimal::ZERO);
    }

    #[test]
    fn test_extra_capped_at_balance_minus_minimum() {
        let input = DebtPlanInput {
            debts: vec![
                debt("small", dec!(150), dec!(20), dec!(50)),
                debt("big", dec!(4000), dec!(10), dec!(100)),
            ],
            strategy: Strategy::Avalanche,
            extra_payment: Some(dec!(500)),
            total_budget: None,
            as_of: as_of(),
        };
        let plan = plan_month(&input).unwrap().result;
        let focus = &plan.payments[0];
        assert_eq!(focus.debt_id, "small");
        assert_eq!(focus.extra_payment, dec!(100));
        assert_eq!(focus.planned_payment, dec!(150));
        // Leftover extra is not rolled into the next debt
        assert_eq!(plan.payments[1].planned_payment, dec!(100));
        assert_eq!(plan.payments[1].extra_payment, Decimal::ZERO);
    }

    #[test]
    fn test_budget_below_minimums_never_negative() {
        let input = DebtPlanInput {
            debts: vec![
                debt("a", dec!(1000), dec!(20), dec!(80)),
                debt("b", dec!(1000), dec!(10), dec!(80)),
            ],
            strategy: Strategy::Avalanche,
            extra_payment: None,
            total_budget: Some(dec!(100)),
            as_of: as_of(),
        };
        let out = plan_month(&input).unwrap();
        let plan = out.result;
        assert_eq!(plan.payments[0].planned_payment, dec!(80));
        assert_eq!(plan.payments[1].planned_payment, dec!(20));
        assert_eq!(plan.extra_available, Decimal::ZERO);
        assert!(out.warnings.iter().any(|w| w.contains("does not cover minimum")));

        let zero = DebtPlanInput {
            total_budget: Some(dec!(-50)),
            ..input
        };
        let plan = plan_month(&zero).unwrap().result;
        assert!(plan.payments.iter().all(|p| p.planned_payment == Decimal::ZERO));
        assert_eq!(plan.months_remaining, UNPAYABLE_MONTHS);
        assert_eq!(plan.projected_payoff_date, None);
    }

    #[test]
    fn test_projected_balance_after_month() {
        let input = DebtPlanInput {
            debts: vec![debt("card", dec!(5000), dec!(12), dec!(200))],
            strategy: Strategy::Avalanche,
            extra_payment: None,
            total_budget: None,
            as_of: as_of(),
        };
        let plan = plan_month(&input).unwrap().result;
        // 5000 + 50 interest - 200
        assert_eq!(plan.payments[0].projected_balance_after, dec!(4850));
        assert_eq!(plan.months_remaining, 29);
        assert_eq!(plan.projected_payoff_date, NaiveDate::from_ymd_opt(2027, 6, 15));
    }

    #[test]
    fn test_unpayable_debt_reported() {
        let input = DebtPlanInput {
            debts: vec![debt("loan", dec!(10000), dec!(24), dec!(150))],
            strategy: Strategy::Snowball,
            extra_payment: None,
            total_budget: None,
            as_of: as_of(),
        };
        let out = plan_month(&input).unwrap();
        assert_eq!(out.result.unpayable_debts, vec!["loan".to_string()]);
        assert_eq!(out.result.payments[0].months_to_payoff, UNPAYABLE_MONTHS);
        assert!(!out.result.payments[0].is_payable);
    }

    #[test]
    fn test_negative_balance_rejected() {
        let input = DebtPlanInput {
            debts: vec![debt("bad", dec!(-1), dec!(5), dec!(10))],
            strategy: Strategy::Avalanche,
            extra_payment: None,
            total_budget: None,
            as_of: as_of(),
        };
        assert!(plan_month(&input).is_err());
    }

    #[test]
    fn test_scenario_comparison_saves_months_and_interest() {
        let input = ExtraPaymentInput {
            debts: vec![debt("card", dec!(5000), dec!(12), dec!(200))],
            extra_monthly: dec!(50),
            as_of: as_of(),
        };
        let cmp = calculate_scenario_comparison(&input).unwrap().result;
        assert_eq!(cmp.minimums_only.months_to_payoff, 29);
        assert_eq!(cmp.with_extra.months_to_payoff, 23);
        assert_eq!(cmp.months_saved, 6);
        // 200*29 - 5000 = 800 vs 250*23 - 5000 = 750
        assert_eq!(cmp.interest_saved, dec!(50));
        assert!(cmp.payoff_date_improvement_days.unwrap() > 150);
    }

    #[test]
    fn test_aggregate_long_but_payable() {
        let debts = vec![debt("family", dec!(10000), Decimal::ZERO, dec!(5))];
        let p = project_aggregate_payoff(&debts, dec!(5), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(p.is_payable);
        assert_eq!(p.months_to_payoff, 2000);
        assert!(p.months_to_payoff > UNPAYABLE_MONTHS);
    }
}
