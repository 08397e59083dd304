use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::CoachConfig;
use crate::debt::planner::{project_aggregate_payoff, PayoffProjection};
use crate::error::CoachError;
use crate::types::{percent_of, today, validate_debts, with_metadata, ComputationOutput};
use crate::types::{Debt, Money, Percent};
use crate::CoachResult;

/// Trailing window length in months.
pub const BASELINE_WINDOW: u32 = 3;

// ---------------------------------------------------------------------------
// Month keys
// ---------------------------------------------------------------------------

/// Parse a `YYYY-MM` key into the first day of that month.
pub fn parse_month(key: &str) -> CoachResult<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", key.trim()), "%Y-%m-%d")
        .map_err(|e| CoachError::DateError(format!("invalid month key '{key}': {e}")))
}

pub fn format_month(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// The `BASELINE_WINDOW` month keys before `reference`, newest first.
pub fn window_months(reference: &str) -> CoachResult<Vec<String>> {
    let start = parse_month(reference)?;
    (1..=BASELINE_WINDOW)
        .map(|back| {
            start
                .checked_sub_months(Months::new(back))
                .map(format_month)
                .ok_or_else(|| CoachError::DateError(format!("month before {reference} out of range")))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Income and expense totals for one `YYYY-MM` month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: String,
    pub total_income: Money,
    pub total_expenses: Money,
}

impl MonthlySummary {
    pub fn savings(&self) -> Money {
        self.total_income - self.total_expenses
    }

    fn is_empty(&self) -> bool {
        self.total_income.is_zero() && self.total_expenses.is_zero()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineInput {
    /// Month being evaluated; the baseline uses the three months before it
    pub reference_month: String,
    pub history: Vec<MonthlySummary>,
    /// Debts for the "continue as-is" payoff projection
    #[serde(default)]
    pub debts: Vec<Debt>,
    #[serde(default = "today")]
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineMetrics {
    pub reference_month: String,
    pub window_months: Vec<String>,
    /// Window months that had any income or expense
    pub months_used: u32,
    pub has_data: bool,
    pub avg_monthly_income: Money,
    pub avg_monthly_spending: Money,
    pub avg_monthly_savings: Money,
    pub savings_rate_percent: Percent,
    /// Paying minimums only from today; `None` without baseline data or debts
    pub continue_as_is: Option<PayoffProjection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineStatus {
    Better,
    Same,
    Worse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineComparisonInput {
    pub current: MonthlySummary,
    pub baseline: BaselineMetrics,
    #[serde(default)]
    pub threshold_percent: Option<Percent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub month: String,
    pub has_baseline: bool,
    pub current_spending: Money,
    pub current_income: Money,
    pub current_savings: Money,
    pub spending_change: Money,
    pub spending_percent_change: Percent,
    pub income_change: Money,
    pub income_percent_change: Percent,
    pub savings_change: Money,
    pub savings_percent_change: Percent,
    /// Savings swing beyond the threshold, for alerting
    pub status: BaselineStatus,
    /// Spending down or savings up, for narrative
    pub is_improving: bool,
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Collapse duplicate month entries by summing them.
pub(crate) fn totals_by_month(history: &[MonthlySummary]) -> CoachResult<BTreeMap<String, MonthlySummary>> {
    let mut by_month: BTreeMap<String, MonthlySummary> = BTreeMap::new();
    for entry in history {
        let key = format_month(parse_month(&entry.month)?);
        by_month
            .entry(key.clone())
            .and_modify(|m| {
                m.total_income += entry.total_income;
                m.total_expenses += entry.total_expenses;
            })
            .or_insert(MonthlySummary {
                month: key,
                total_income: entry.total_income,
                total_expenses: entry.total_expenses,
            });
    }
    Ok(by_month)
}

/// Trailing three-month averages before `reference_month`.
///
/// Months with neither income nor expenses are skipped. With no usable
/// month the baseline is all zero and carries no payoff projection.
pub fn calculate_baseline(input: &BaselineInput) -> CoachResult<ComputationOutput<BaselineMetrics>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_debts(&input.debts)?;

    let window = window_months(&input.reference_month)?;
    let by_month = totals_by_month(&input.history)?;

    let used: Vec<&MonthlySummary> = window
        .iter()
        .filter_map(|key| by_month.get(key))
        .filter(|m| !m.is_empty())
        .collect();

    let months_used = used.len() as u32;
    let has_data = months_used > 0;

    let (avg_income, avg_spending) = if has_data {
        let n = Decimal::from(months_used);
        let income: Money = used.iter().map(|m| m.total_income).sum();
        let spending: Money = used.iter().map(|m| m.total_expenses).sum();
        ((income / n).round_dp(2), (spending / n).round_dp(2))
    } else {
        tracing::warn!(reference = %input.reference_month, "no history in baseline window");
        warnings.push(format!(
            "No income or expense data in the {BASELINE_WINDOW} months before {}",
            input.reference_month
        ));
        (Decimal::ZERO, Decimal::ZERO)
    };

    if has_data && months_used < BASELINE_WINDOW {
        warnings.push(format!(
            "Baseline uses {months_used} of {BASELINE_WINDOW} months; missing months are excluded"
        ));
    }

    let avg_savings = avg_income - avg_spending;
    let continue_as_is = if has_data && input.debts.iter().any(Debt::is_open) {
        let minimums: Money = input
            .debts
            .iter()
            .filter(|d| d.is_open())
            .map(|d| d.monthly_payment)
            .sum();
        Some(project_aggregate_payoff(&input.debts, minimums, input.as_of))
    } else {
        None
    };

    let metrics = BaselineMetrics {
        reference_month: format_month(parse_month(&input.reference_month)?),
        window_months: window,
        months_used,
        has_data,
        avg_monthly_income: avg_income,
        avg_monthly_spending: avg_spending,
        avg_monthly_savings: avg_savings,
        savings_rate_percent: percent_of(avg_savings, avg_income).round_dp(2),
        continue_as_is,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Trailing 3-month average excluding empty months",
        &serde_json::json!({
            "reference_month": input.reference_month,
            "window": BASELINE_WINDOW,
        }),
        warnings,
        elapsed,
        metrics,
    ))
}

/// Compare one month's actuals to its baseline.
///
/// `status` is "better"/"worse" when the savings change exceeds the
/// threshold share of baseline savings; `is_improving` only asks whether
/// spending fell or savings rose.
pub fn compare_to_baseline(
    input: &BaselineComparisonInput,
) -> CoachResult<ComputationOutput<BaselineComparison>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let threshold = input
        .threshold_percent
        .unwrap_or(CoachConfig::default().baseline_threshold_percent);
    if threshold < Decimal::ZERO {
        return Err(CoachError::InvalidInput {
            field: "threshold_percent".into(),
            reason: "must be >= 0".into(),
        });
    }

    let month = format_month(parse_month(&input.current.month)?);
    let base = &input.baseline;
    let current_savings = input.current.savings();

    let spending_change = input.current.total_expenses - base.avg_monthly_spending;
    let income_change = input.current.total_income - base.avg_monthly_income;
    let savings_change = current_savings - base.avg_monthly_savings;

    let (status, is_improving) = if base.has_data {
        let band = base.avg_monthly_savings.abs() * threshold / Decimal::ONE_HUNDRED;
        let status = if savings_change > band {
            BaselineStatus::Better
        } else if savings_change < -band {
            BaselineStatus::Worse
        } else {
            BaselineStatus::Same
        };
        (
            status,
            spending_change < Decimal::ZERO || savings_change > Decimal::ZERO,
        )
    } else {
        warnings.push("No baseline data; status defaults to 'same'".into());
        (BaselineStatus::Same, false)
    };

    let comparison = BaselineComparison {
        month,
        has_baseline: base.has_data,
        current_spending: input.current.total_expenses,
        current_income: input.current.total_income,
        current_savings,
        spending_change,
        spending_percent_change: percent_of(spending_change, base.avg_monthly_spending).round_dp(2),
        income_change,
        income_percent_change: percent_of(income_change, base.avg_monthly_income).round_dp(2),
        savings_change,
        savings_percent_change: percent_of(savings_change, base.avg_monthly_savings.abs()).round_dp(2),
        status,
        is_improving,
    };

    tracing::debug!(month = %comparison.month, status = ?comparison.status, "compared month to baseline");

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Current month vs trailing 3-month baseline",
        &serde_json::json!({
            "threshold_percent": threshold.to_string(),
            "baseline_month": base.reference_month,
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
    use rust_decimal_macros::dec;

    fn summary(month: &str, income: Decimal, expenses: Decimal) -> MonthlySummary {
        MonthlySummary {
            month: month.into(),
            total_income: income,
            total_expenses: expenses,
        }
    }

    #[test]
    fn test_window_months_crosses_year() {
        assert_eq!(
            window_months("2025-02").unwrap(),
            vec!["2025-01", "2024-12", "2024-11"]
        );
    }

    #[test]
    fn test_bad_month_key() {
        assert!(matches!(parse_month("2025-13"), Err(CoachError::DateError(_))));
        assert!(parse_month("March").is_err());
    }

    #[test]
    fn test_empty_months_are_excluded() {
        let input = BaselineInput {
            reference_month: "2025-04".into(),
            history: vec![
                summary("2025-03", dec!(3000), dec!(2000)),
                summary("2025-02", Decimal::ZERO, Decimal::ZERO),
                summary("2025-01", dec!(3000), dec!(2400)),
                // Outside the window
                summary("2024-12", dec!(9000), dec!(100)),
            ],
            debts: vec![],
            as_of: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
        };
        let out = calculate_baseline(&input).unwrap();
        let b = out.result;
        assert_eq!(b.months_used, 2);
        assert_eq!(b.avg_monthly_spending, dec!(2200));
        assert_eq!(b.avg_monthly_income, dec!(3000));
        assert!(b.continue_as_is.is_none());
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_duplicate_months_are_summed() {
        let totals = totals_by_month(&[
            summary("2025-03", dec!(1000), dec!(200)),
            summary("2025-03", dec!(500), dec!(300)),
        ])
        .unwrap();
        assert_eq!(totals["2025-03"].total_income, dec!(1500));
        assert_eq!(totals["2025-03"].total_expenses, dec!(500));
    }

    #[test]
    fn test_no_history_gives_zero_baseline() {
        let input = BaselineInput {
            reference_month: "2025-04".into(),
            history: vec![],
            debts: vec![Debt {
                id: "d".into(),
                name: "Card".into(),
                current_balance: dec!(1000),
                annual_interest_rate_percent: dec!(20),
                monthly_payment: dec!(50),
                is_active: true,
            }],
            as_of: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
        };
        let b = calculate_baseline(&input).unwrap().result;
        assert!(!b.has_data);
        assert_eq!(b.avg_monthly_spending, Decimal::ZERO);
        assert_eq!(b.continue_as_is, None);
    }

    #[test]
    fn test_status_same_within_band() {
        let baseline = BaselineMetrics {
            reference_month: "2025-04".into(),
            window_months: vec![],
            months_used: 3,
            has_data: true,
            avg_monthly_income: dec!(3000),
            avg_monthly_spending: dec!(2000),
            avg_monthly_savings: dec!(1000),
            savings_rate_percent: dec!(33.33),
            continue_as_is: None,
        };
        let input = BaselineComparisonInput {
            current: summary("2025-04", dec!(3000), dec!(2050)),
            baseline,
            threshold_percent: None,
        };
        let cmp = compare_to_baseline(&input).unwrap().result;
        assert_eq!(cmp.status, BaselineStatus::Same);
        assert!(!cmp.is_improving);
    }

    #[test]
    fn test_is_improving_looser_than_status() {
        let baseline = BaselineMetrics {
            reference_month: "2025-04".into(),
            window_months: vec![],
            months_used: 3,
            has_data: true,
            avg_monthly_income: dec!(3000),
            avg_monthly_spending: dec!(2000),
            avg_monthly_savings: dec!(1000),
            savings_rate_percent: dec!(33.33),
            continue_as_is: None,
        };
        let input = BaselineComparisonInput {
            current: summary("2025-04", dec!(3000), dec!(1950)),
            baseline,
            threshold_percent: None,
        };
        let cmp = compare_to_baseline(&input).unwrap().result;
        assert_eq!(cmp.status, BaselineStatus::Same);
        assert!(cmp.is_improving);
        assert_eq!(cmp.spending_percent_change, dec!(-2.5));
    }
}
