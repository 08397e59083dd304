use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::amortization::{is_payable, months_to_payoff, total_interest};
use crate::config::CoachConfig;
use crate::debt::planner::order_debts;
use crate::error::CoachError;
use crate::scenarios::state::{compute_state, FinancialSnapshot, FinancialState};
use crate::types::{Money, Percent};
use crate::CoachResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A change expressed either as a percentage of the affected amount or as
/// an absolute monthly amount. Negative values are decreases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChangeAmount {
    Percent(Percent),
    Absolute(Money),
}

impl ChangeAmount {
    fn resolve(&self, base: Money) -> Money {
        match self {
            ChangeAmount::Percent(p) => base * p / Decimal::ONE_HUNDRED,
            ChangeAmount::Absolute(a) => *a,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseChange {
    /// Category to adjust; the percentage applies to total expenses if absent
    #[serde(default)]
    pub category: Option<String>,
    pub change: ChangeAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeChange {
    pub change: ChangeAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraDebtPayment {
    pub debt_id: String,
    pub extra_monthly: Money,
}

/// Percent split of a lump sum; expected to add up to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LumpSumAllocation {
    #[serde(default)]
    pub debt_percent: Percent,
    #[serde(default)]
    pub savings_percent: Percent,
    #[serde(default)]
    pub invest_percent: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LumpSum {
    pub amount: Money,
    pub allocation: LumpSumAllocation,
}

/// Any scenario, tagged by `type` for JSON callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioChange {
    ExpenseChange(ExpenseChange),
    IncomeChange(IncomeChange),
    ExtraDebtPayment(ExtraDebtPayment),
    LumpSum(LumpSum),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    ExpenseChange,
    IncomeChange,
    ExtraDebtPayment,
    LumpSum,
}

/// Deltas are simulated minus current, so a faster payoff is a negative
/// `debt_payoff_months_delta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub monthly_savings_delta: Money,
    pub debt_payoff_months_delta: i64,
    /// `None` when either side never reaches FIRE
    pub fire_years_delta: Option<Decimal>,
    pub total_interest_saved: Money,
    pub savings_rate_delta: Percent,
}

/// Isolated before/after for the debt targeted by an extra payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtPayoffChange {
    pub debt_id: String,
    pub debt_name: String,
    pub payment_before: Money,
    pub payment_after: Money,
    pub months_before: u32,
    pub months_after: u32,
    pub interest_before: Money,
    pub interest_after: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_type: ScenarioType,
    pub name: String,
    pub current_state: FinancialState,
    pub simulated_state: FinancialState,
    pub impact: Impact,
    pub summary: String,
    pub assumptions: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_detail: Option<DebtPayoffChange>,
    /// Inputs behind `simulated_state`; seed a new engine with it to chain
    pub simulated_snapshot: FinancialSnapshot,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// What-if simulator over one snapshot. The current state is computed once
/// at construction and shared by every simulation.
#[derive(Debug, Clone)]
pub struct ScenarioEngine {
    snapshot: FinancialSnapshot,
    config: CoachConfig,
    current: FinancialState,
}

impl ScenarioEngine {
    pub fn new(snapshot: FinancialSnapshot, config: CoachConfig) -> CoachResult<Self> {
        snapshot.validate()?;
        config.validate()?;
        let current = compute_state(&snapshot, &config);
        tracing::debug!(
            income = %current.monthly_income,
            expenses = %current.monthly_expenses,
            total_debt = %current.total_debt,
            "scenario engine baseline computed"
        );
        Ok(ScenarioEngine {
            snapshot,
            config,
            current,
        })
    }

    pub fn current_state(&self) -> &FinancialState {
        &self.current
    }

    pub fn snapshot(&self) -> &FinancialSnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    /// Dispatch any [`ScenarioChange`].
    pub fn simulate(&self, change: &ScenarioChange) -> CoachResult<ScenarioResult> {
        match change {
            ScenarioChange::ExpenseChange(c) => self.simulate_expense_change(c),
            ScenarioChange::IncomeChange(c) => self.simulate_income_change(c),
            ScenarioChange::ExtraDebtPayment(c) => {
                self.simulate_extra_payment(&c.debt_id, c.extra_monthly)
            }
            ScenarioChange::LumpSum(c) => self.simulate_lump_sum(c.amount, &c.allocation),
        }
    }

    /// Adjust expenses overall or in one category. A decrease is routed in
    /// full to extra debt payment while debts remain; an increase first
    /// claws back previously routed extra payment.
    pub fn simulate_expense_change(&self, change: &ExpenseChange) -> CoachResult<ScenarioResult> {
        let mut assumptions: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut snap = self.snapshot.clone();

        let category_idx = match &change.category {
            Some(name) => {
                let idx = snap
                    .category_spending
                    .iter()
                    .position(|c| c.category_name.eq_ignore_ascii_case(name));
                if idx.is_none() {
                    if let ChangeAmount::Percent(_) = change.change {
                        return Err(CoachError::InvalidInput {
                            field: "category".into(),
                            reason: format!("no spending recorded for category '{name}'"),
                        });
                    }
                    warnings.push(format!(
                        "Category '{name}' not in current spending; change applied to total expenses"
                    ));
                }
                idx
            }
            None => None,
        };

        let base = match category_idx {
            Some(i) => snap.category_spending[i].monthly_amount,
            None => snap.monthly_expenses,
        };
        let requested = change.change.resolve(base);
        // Expenses (and the category) cannot go below zero
        let delta = requested.max(-base).max(-snap.monthly_expenses);
        if delta != requested {
            warnings.push(format!(
                "Requested change of {} capped at {} to keep spending non-negative",
                requested.round_dp(2),
                delta.round_dp(2)
            ));
        }

        snap.monthly_expenses += delta;
        if let Some(i) = category_idx {
            snap.category_spending[i].monthly_amount += delta;
        }

        route_delta(&mut snap, -delta, &mut assumptions, "expense reduction");

        let label = change
            .category
            .as_deref()
            .map(|c| format!(" on {c}"))
            .unwrap_or_default();
        let name = if delta <= Decimal::ZERO {
            format!("Cut spending{label} by {}/month", (-delta).round_dp(2))
        } else {
            format!("Increase spending{label} by {}/month", delta.round_dp(2))
        };

        let simulated = compute_state(&snap, &self.config);
        if simulated.monthly_savings < Decimal::ZERO {
            warnings.push("Simulated monthly savings are negative".into());
        }
        let impact = diff_states(&self.current, &simulated);

        Ok(self.finish(ScenarioType::ExpenseChange, name, simulated, impact, assumptions, warnings, None, snap))
    }

    /// Adjust monthly income. Increases are routed to extra debt payment
    /// while debts remain; decreases first claw back routed extra payment.
    pub fn simulate_income_change(&self, change: &IncomeChange) -> CoachResult<ScenarioResult> {
        let mut assumptions: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut snap = self.snapshot.clone();

        let requested = change.change.resolve(snap.monthly_income);
        let delta = requested.max(-snap.monthly_income);
        if delta != requested {
            warnings.push("Income cannot fall below zero; change capped".into());
        }
        snap.monthly_income += delta;

        route_delta(&mut snap, delta, &mut assumptions, "income increase");

        let name = if delta >= Decimal::ZERO {
            format!("Raise income by {}/month", delta.round_dp(2))
        } else {
            format!("Lose {}/month of income", (-delta).round_dp(2))
        };

        let simulated = compute_state(&snap, &self.config);
        if simulated.monthly_savings < Decimal::ZERO {
            tracing::warn!(savings = %simulated.monthly_savings, "income scenario leaves negative savings");
            warnings.push(format!(
                "Monthly savings would be negative ({}); expenses exceed income",
                simulated.monthly_savings.round_dp(2)
            ));
        }
        let impact = diff_states(&self.current, &simulated);

        Ok(self.finish(ScenarioType::IncomeChange, name, simulated, impact, assumptions, warnings, None, snap))
    }

    /// Pay `extra_monthly` more on one debt. Payoff time and interest saved
    /// come from that debt alone, not the multi-debt projection.
    pub fn simulate_extra_payment(&self, debt_id: &str, extra_monthly: Money) -> CoachResult<ScenarioResult> {
        let mut assumptions: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        if extra_monthly < Decimal::ZERO {
            return Err(CoachError::InvalidInput {
                field: "extra_monthly".into(),
                reason: "must be >= 0".into(),
            });
        }

        let debt = self
            .snapshot
            .debts
            .iter()
            .find(|d| d.id == debt_id && d.is_open())
            .ok_or_else(|| CoachError::UnknownDebt(debt_id.to_string()))?;

        let rate = debt.annual_interest_rate_percent;
        let payment_before = debt.monthly_payment;
        let payment_after = payment_before + extra_monthly;
        let months_before = months_to_payoff(debt.current_balance, payment_before, rate);
        let months_after = months_to_payoff(debt.current_balance, payment_after, rate);
        let payable_before = is_payable(debt.current_balance, payment_before, rate);
        let payable_after = is_payable(debt.current_balance, payment_after, rate);
        let interest_before =
            interest_or_zero(debt.current_balance, payment_before, months_before, payable_before);
        let interest_after =
            interest_or_zero(debt.current_balance, payment_after, months_after, payable_after);

        let interest_saved = if !payable_before {
            warnings.push(format!(
                "{} is not payable at the current payment; interest saved cannot be measured",
                debt.name
            ));
            Decimal::ZERO
        } else {
            interest_before - interest_after
        };
        if !payable_after {
            warnings.push(format!(
                "{} still does not clear with the extra payment",
                debt.name
            ));
        }

        let mut snap = self.snapshot.clone();
        snap.extra_debt_payment += extra_monthly;
        assumptions.push(format!(
            "Extra {}/month is funded from monthly savings",
            extra_monthly.round_dp(2)
        ));
        assumptions.push(format!(
            "Payoff time and interest are for {} alone using simple amortization",
            debt.name
        ));

        let simulated = compute_state(&snap, &self.config);
        if extra_monthly > self.current.monthly_investment {
            warnings.push("Extra payment exceeds what is currently left to invest each month".into());
        }

        let mut impact = diff_states(&self.current, &simulated);
        impact.debt_payoff_months_delta = i64::from(months_after) - i64::from(months_before);
        impact.total_interest_saved = interest_saved;

        let detail = DebtPayoffChange {
            debt_id: debt.id.clone(),
            debt_name: debt.name.clone(),
            payment_before,
            payment_after,
            months_before,
            months_after,
            interest_before,
            interest_after,
        };
        let name = format!("Pay {} extra/month on {}", extra_monthly.round_dp(2), debt.name);

        Ok(self.finish(
            ScenarioType::ExtraDebtPayment,
            name,
            simulated,
            impact,
            assumptions,
            warnings,
            Some(detail),
            snap,
        ))
    }

    /// Split a one-off amount across debt, savings and investments.
    ///
    /// The debt share pays balances down in strategy order. Interest saved
    /// is a flat estimate at the configured average APR over the current
    /// payoff horizon, not per-debt math.
    pub fn simulate_lump_sum(&self, amount: Money, allocation: &LumpSumAllocation) -> CoachResult<ScenarioResult> {
        let mut assumptions: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        if amount < Decimal::ZERO {
            return Err(CoachError::InvalidInput {
                field: "amount".into(),
                reason: "must be >= 0".into(),
            });
        }
        let parts = [
            allocation.debt_percent,
            allocation.savings_percent,
            allocation.invest_percent,
        ];
        if parts.iter().any(|p| *p < Decimal::ZERO) {
            return Err(CoachError::InvalidInput {
                field: "allocation".into(),
                reason: "percentages must be >= 0".into(),
            });
        }

        let total_pct: Percent = parts.iter().sum();
        let (debt_share, savings_share, invest_share) = if total_pct.is_zero() {
            warnings.push("Allocation is empty; whole amount treated as savings".into());
            (Decimal::ZERO, amount, Decimal::ZERO)
        } else {
            if (total_pct - Decimal::ONE_HUNDRED).abs() > dec!(0.01) {
                warnings.push(format!(
                    "Allocation adds up to {total_pct}%; shares scaled to 100%"
                ));
            }
            (
                amount * allocation.debt_percent / total_pct,
                amount * allocation.savings_percent / total_pct,
                amount * allocation.invest_percent / total_pct,
            )
        };

        let mut snap = self.snapshot.clone();
        let minimums_before = snap.minimum_payments();

        // Pay down balances in strategy order
        let order: Vec<String> = order_debts(&snap.debts, self.config.strategy)
            .iter()
            .map(|d| d.id.clone())
            .collect();
        let mut to_debt = debt_share;
        for id in &order {
            if to_debt <= Decimal::ZERO {
                break;
            }
            if let Some(d) = snap.debts.iter_mut().find(|d| &d.id == id) {
                let pay = d.current_balance.min(to_debt);
                d.current_balance -= pay;
                to_debt -= pay;
            }
        }
        let applied_to_debt = debt_share - to_debt;
        if to_debt > Decimal::ZERO {
            warnings.push(format!(
                "Debt share exceeds total debt; {} moved to savings",
                to_debt.round_dp(2)
            ));
        }

        let released = minimums_before - snap.minimum_payments();
        if released > Decimal::ZERO {
            if snap.has_open_debts() {
                snap.extra_debt_payment += released;
                assumptions.push(format!(
                    "Minimum payments of cleared debts ({}/month) roll into remaining debts",
                    released.round_dp(2)
                ));
            } else {
                snap.monthly_expenses = (snap.monthly_expenses - released).max(Decimal::ZERO);
                snap.extra_debt_payment = Decimal::ZERO;
                assumptions.push(format!(
                    "All debts cleared; {}/month of minimum payments leaves expenses",
                    released.round_dp(2)
                ));
            }
        }

        snap.current_net_worth += savings_share + invest_share + to_debt;

        let simulated = compute_state(&snap, &self.config);
        let mut impact = diff_states(&self.current, &simulated);

        let horizon = if self.current.debt_payable {
            Decimal::from(self.current.debt_payoff_months)
        } else {
            Decimal::ZERO
        };
        impact.total_interest_saved =
            (applied_to_debt * self.config.lump_sum_assumed_apr / Decimal::from(12) * horizon).round_dp(2);
        assumptions.push(format!(
            "Interest saved estimated at a flat {}% average APR",
            (self.config.lump_sum_assumed_apr * Decimal::ONE_HUNDRED).normalize()
        ));
        assumptions.push("Savings and investment shares are added to net worth".into());

        let name = format!("Allocate lump sum of {}", amount.round_dp(2));

        Ok(self.finish(ScenarioType::LumpSum, name, simulated, impact, assumptions, warnings, None, snap))
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        scenario_type: ScenarioType,
        name: String,
        simulated_state: FinancialState,
        impact: Impact,
        assumptions: Vec<String>,
        warnings: Vec<String>,
        debt_detail: Option<DebtPayoffChange>,
        simulated_snapshot: FinancialSnapshot,
    ) -> ScenarioResult {
        let summary = summarize(&name, &impact);
        tracing::debug!(?scenario_type, %summary, "scenario simulated");
        ScenarioResult {
            scenario_type,
            name,
            current_state: self.current.clone(),
            simulated_state,
            impact,
            summary,
            assumptions,
            warnings,
            debt_detail,
            simulated_snapshot,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Move a cash-flow improvement into extra debt payment, or claw a
/// deterioration back out of it. `improvement` is positive when more money
/// is free each month.
fn route_delta(
    snap: &mut FinancialSnapshot,
    improvement: Money,
    assumptions: &mut Vec<String>,
    what: &str,
) {
    if improvement > Decimal::ZERO {
        if snap.has_open_debts() {
            snap.extra_debt_payment += improvement;
            assumptions.push(format!(
                "The {what} of {}/month goes 100% to extra debt payment",
                improvement.round_dp(2)
            ));
        } else {
            assumptions.push(format!(
                "No open debts; the {what} of {}/month is invested",
                improvement.round_dp(2)
            ));
        }
    } else if improvement < Decimal::ZERO {
        let clawback = snap.extra_debt_payment.min(-improvement);
        if clawback > Decimal::ZERO {
            snap.extra_debt_payment -= clawback;
            assumptions.push(format!(
                "{}/month is taken back from extra debt payment first",
                clawback.round_dp(2)
            ));
        }
    }
}

fn interest_or_zero(balance: Money, payment: Money, months: u32, payable: bool) -> Money {
    if payable {
        total_interest(balance, payment, months)
    } else {
        Decimal::ZERO
    }
}

pub(crate) fn diff_states(current: &FinancialState, simulated: &FinancialState) -> Impact {
    let total_interest_saved = if current.debt_payable && simulated.debt_payable {
        current.total_debt_interest - simulated.total_debt_interest
    } else {
        Decimal::ZERO
    };
    Impact {
        monthly_savings_delta: simulated.monthly_savings - current.monthly_savings,
        debt_payoff_months_delta: i64::from(simulated.debt_payoff_months)
            - i64::from(current.debt_payoff_months),
        fire_years_delta: match (simulated.fire_years, current.fire_years) {
            (Some(after), Some(before)) => Some(after - before),
            _ => None,
        },
        total_interest_saved,
        savings_rate_delta: simulated.savings_rate - current.savings_rate,
    }
}

fn summarize(name: &str, impact: &Impact) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !impact.monthly_savings_delta.is_zero() {
        parts.push(format!(
            "savings {}{}/month",
            if impact.monthly_savings_delta > Decimal::ZERO { "+" } else { "" },
            impact.monthly_savings_delta.round_dp(2)
        ));
    }
    match impact.debt_payoff_months_delta {
        0 => {}
        d if d < 0 => parts.push(format!("debt-free {} months sooner", -d)),
        d => parts.push(format!("debt-free {d} months later")),
    }
    if let Some(years) = impact.fire_years_delta {
        if years < Decimal::ZERO {
            parts.push(format!("FIRE {} years sooner", (-years).round_dp(1)));
        } else if years > Decimal::ZERO {
            parts.push(format!("FIRE {} years later", years.round_dp(1)));
        }
    }
    if impact.total_interest_saved > Decimal::ZERO {
        parts.push(format!("{} interest saved", impact.total_interest_saved.round_dp(2)));
    }

    if parts.is_empty() {
        format!("{name}: no measurable change")
    } else {
        format!("{name}: {}", parts.join(", "))
    }
}
