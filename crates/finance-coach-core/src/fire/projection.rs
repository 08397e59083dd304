use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::{future_value, months_to_reach_target};
use crate::config::{CoachConfig, MAX_PROJECTION_MONTHS};
use crate::error::CoachError;
use crate::fire::sensitivity::{fire_sensitivity, FireSensitivity};
use crate::types::{add_months, percent_of, today, with_metadata, ComputationOutput};
use crate::types::{Money, Percent, Rate};
use crate::CoachResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Fixed checkpoints: (fraction of the FIRE number, label).
pub const MILESTONES: [(Decimal, &str); 4] = [
    (dec!(0.25), "Coast FI"),
    (dec!(0.50), "Barista FI"),
    (dec!(0.75), "Lean FI"),
    (dec!(1.00), "Full FI"),
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

fn default_return() -> Rate {
    CoachConfig::default().expected_annual_return
}

fn default_withdrawal_rate() -> Rate {
    CoachConfig::default().withdrawal_rate
}

/// Input for a full FIRE analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireInput {
    pub current_net_worth: Money,
    pub monthly_contribution: Money,
    pub annual_expenses: Money,
    #[serde(default = "default_return")]
    pub annual_return: Rate,
    #[serde(default = "default_withdrawal_rate")]
    pub withdrawal_rate: Rate,
    /// Net monthly income, used only for the savings rate
    #[serde(default)]
    pub monthly_income: Option<Money>,
    #[serde(default = "today")]
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireProjection {
    pub fire_number: Money,
    pub current_net_worth: Money,
    pub monthly_contribution: Money,
    pub annual_return: Rate,
    pub months_to_fire: u32,
    pub years_to_fire: Decimal,
    pub fire_date: Option<NaiveDate>,
    pub is_achieved: bool,
    /// False when the target is not reached inside the 100-year horizon
    pub is_reachable: bool,
    pub progress_percent: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireMilestone {
    pub label: String,
    pub fraction_percent: Percent,
    pub target: Money,
    pub is_achieved: bool,
    pub is_reachable: bool,
    pub months_to_reach: u32,
    pub years_to_reach: Decimal,
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireAnalysis {
    pub fire_number: Money,
    pub projection: FireProjection,
    pub milestones: Vec<FireMilestone>,
    pub sensitivity: FireSensitivity,
    pub savings_rate_percent: Option<Percent>,
}

/// Input for the month-by-month chart series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireSeriesInput {
    pub current_net_worth: Money,
    pub monthly_contribution: Money,
    pub annual_expenses: Money,
    #[serde(default = "default_return")]
    pub annual_return: Rate,
    #[serde(default = "default_withdrawal_rate")]
    pub withdrawal_rate: Rate,
    pub horizon_years: u32,
    #[serde(default = "today")]
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub month: u32,
    pub date: Option<NaiveDate>,
    pub net_worth: Money,
    pub total_contributions: Money,
    pub total_growth: Money,
    pub progress_percent: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireSeries {
    pub fire_number: Money,
    pub reached_fire_month: Option<u32>,
    pub points: Vec<ProjectionPoint>,
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Target net worth: `annual_expenses / withdrawal_rate`, zero for a
/// non-positive withdrawal rate.
pub fn fire_number(annual_expenses: Money, withdrawal_rate: Rate) -> Money {
    if withdrawal_rate <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    annual_expenses / withdrawal_rate
}

/// Months to grow `current_net_worth` into `fire_number` with a monthly
/// contribution and `annual_return / 12` monthly growth. Negative
/// contributions are treated as zero.
pub fn project_to_fire(
    current_net_worth: Money,
    monthly_contribution: Money,
    annual_return: Rate,
    fire_number: Money,
    as_of: NaiveDate,
) -> FireProjection {
    let contribution = monthly_contribution.max(Decimal::ZERO);
    let rate = annual_return / MONTHS_PER_YEAR;
    let is_achieved = current_net_worth >= fire_number;

    let (months, is_reachable) = if is_achieved {
        (0, true)
    } else {
        let months = months_to_reach_target(current_net_worth, contribution, rate, fire_number);
        let reachable = months < MAX_PROJECTION_MONTHS
            || future_value(current_net_worth, contribution, rate, MAX_PROJECTION_MONTHS)
                >= fire_number;
        (months, reachable)
    };

    FireProjection {
        fire_number,
        current_net_worth,
        monthly_contribution: contribution,
        annual_return,
        months_to_fire: months,
        years_to_fire: years(months),
        fire_date: if is_reachable {
            add_months(as_of, months)
        } else {
            None
        },
        is_achieved,
        is_reachable,
        progress_percent: percent_of(current_net_worth, fire_number),
    }
}

pub(crate) fn years(months: u32) -> Decimal {
    (Decimal::from(months) / MONTHS_PER_YEAR).round_dp(2)
}

/// Project each of the fixed milestones independently.
pub fn fire_milestones(
    current_net_worth: Money,
    monthly_contribution: Money,
    annual_return: Rate,
    fire_number: Money,
    as_of: NaiveDate,
) -> Vec<FireMilestone> {
    MILESTONES
        .iter()
        .map(|(fraction, label)| {
            let target = fire_number * fraction;
            let p = project_to_fire(
                current_net_worth,
                monthly_contribution,
                annual_return,
                target,
                as_of,
            );
            FireMilestone {
                label: (*label).to_string(),
                fraction_percent: fraction * Decimal::ONE_HUNDRED,
                target,
                is_achieved: current_net_worth >= target,
                is_reachable: p.is_reachable,
                months_to_reach: p.months_to_fire,
                years_to_reach: p.years_to_fire,
                target_date: p.fire_date,
            }
        })
        .collect()
}

/// FIRE number, projection, milestones and sensitivity in one call.
pub fn analyze_fire(input: &FireInput) -> CoachResult<ComputationOutput<FireAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_fire_amounts(input.current_net_worth, input.annual_expenses, input.annual_return)?;

    if input.withdrawal_rate <= Decimal::ZERO {
        warnings.push("Withdrawal rate must be positive; FIRE number reported as 0".into());
    }
    if input.monthly_contribution < Decimal::ZERO {
        warnings.push("Negative monthly contribution treated as 0".into());
    }

    let target = fire_number(input.annual_expenses, input.withdrawal_rate);
    let projection = project_to_fire(
        input.current_net_worth,
        input.monthly_contribution,
        input.annual_return,
        target,
        input.as_of,
    );
    if !projection.is_reachable {
        tracing::warn!(fire_number = %target, "FIRE target not reachable within horizon");
        warnings.push(format!(
            "FIRE number not reached within {} years at current contribution",
            MAX_PROJECTION_MONTHS / 12
        ));
    }

    let milestones = fire_milestones(
        input.current_net_worth,
        input.monthly_contribution,
        input.annual_return,
        target,
        input.as_of,
    );
    let sensitivity = fire_sensitivity(input);

    let savings_rate_percent = input
        .monthly_income
        .filter(|income| *income > Decimal::ZERO)
        .map(|income| percent_of(input.monthly_contribution.max(Decimal::ZERO), income));

    tracing::debug!(
        fire_number = %target,
        months = projection.months_to_fire,
        "projected FIRE timeline"
    );

    let analysis = FireAnalysis {
        fire_number: target,
        projection,
        milestones,
        sensitivity,
        savings_rate_percent,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "FIRE number (expenses / SWR) with monthly compound-growth projection",
        &serde_json::json!({
            "annual_return": input.annual_return.to_string(),
            "withdrawal_rate": input.withdrawal_rate.to_string(),
            "compounding": "monthly, annual_return / 12",
            "as_of": input.as_of.to_string(),
        }),
        warnings,
        elapsed,
        analysis,
    ))
}

/// Month-by-month net worth until the FIRE number or the horizon, whichever
/// comes first. Month 0 is the starting point.
pub fn projection_series(input: &FireSeriesInput) -> CoachResult<ComputationOutput<FireSeries>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_fire_amounts(input.current_net_worth, input.annual_expenses, input.annual_return)?;

    let target = fire_number(input.annual_expenses, input.withdrawal_rate);
    let contribution = input.monthly_contribution.max(Decimal::ZERO);
    let rate = input.annual_return / MONTHS_PER_YEAR;
    let requested = input.horizon_years.saturating_mul(12);
    let horizon = requested.min(MAX_PROJECTION_MONTHS);
    if requested > MAX_PROJECTION_MONTHS {
        warnings.push(format!("Horizon capped at {} years", MAX_PROJECTION_MONTHS / 12));
    }

    let mut net_worth = input.current_net_worth;
    let mut contributions = Decimal::ZERO;
    let mut reached = (net_worth >= target).then_some(0);
    let mut points = vec![ProjectionPoint {
        month: 0,
        date: Some(input.as_of),
        net_worth,
        total_contributions: Decimal::ZERO,
        total_growth: Decimal::ZERO,
        progress_percent: percent_of(net_worth, target),
    }];

    let mut month = 0;
    while reached.is_none() && month < horizon {
        month += 1;
        net_worth = future_value(net_worth, contribution, rate, 1);
        contributions = contributions.saturating_add(contribution);
        points.push(ProjectionPoint {
            month,
            date: add_months(input.as_of, month),
            net_worth,
            total_contributions: contributions,
            total_growth: net_worth
                .saturating_sub(input.current_net_worth)
                .saturating_sub(contributions),
            progress_percent: percent_of(net_worth, target),
        });
        if net_worth >= target {
            reached = Some(month);
        }
    }

    let series = FireSeries {
        fire_number: target,
        reached_fire_month: reached,
        points,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly net worth projection toward the FIRE number",
        &serde_json::json!({
            "annual_return": input.annual_return.to_string(),
            "withdrawal_rate": input.withdrawal_rate.to_string(),
            "horizon_years": input.horizon_years,
        }),
        warnings,
        elapsed,
        series,
    ))
}

fn validate_fire_amounts(net_worth: Money, annual_expenses: Money, annual_return: Rate) -> CoachResult<()> {
    if annual_expenses < Decimal::ZERO {
        return Err(CoachError::InvalidInput {
            field: "annual_expenses".into(),
            reason: "must be >= 0".into(),
        });
    }
    if annual_return <= dec!(-1) {
        return Err(CoachError::InvalidInput {
            field: "annual_return".into(),
            reason: "must be greater than -100%".into(),
        });
    }
    if net_worth < Decimal::ZERO {
        tracing::debug!(%net_worth, "projecting from negative net worth");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_fire_number_basic_and_invalid_rate() {
        assert_eq!(fire_number(dec!(40000), dec!(0.04)), dec!(1000000));
        assert_eq!(fire_number(dec!(40000), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(fire_number(dec!(40000), dec!(-0.04)), Decimal::ZERO);
    }

    #[test]
    fn test_already_at_fire_is_immediate() {
        let p = project_to_fire(dec!(1_200_000), dec!(1000), dec!(0.07), dec!(1_000_000), as_of());
        assert!(p.is_achieved);
        assert_eq!(p.months_to_fire, 0);
        assert_eq!(p.fire_date, Some(as_of()));
    }

    #[test]
    fn test_zero_return_linear() {
        let p = project_to_fire(dec!(0), dec!(1000), Decimal::ZERO, dec!(120_000), as_of());
        assert_eq!(p.months_to_fire, 120);
        assert_eq!(p.years_to_fire, dec!(10));
        assert_eq!(p.fire_date, NaiveDate::from_ymd_opt(2035, 6, 1));
    }

    #[test]
    fn test_unreachable_has_no_date() {
        let p = project_to_fire(dec!(0), dec!(0), Decimal::ZERO, dec!(100), as_of());
        assert!(!p.is_reachable);
        assert_eq!(p.fire_date, None);
    }

    #[test]
    fn test_milestone_labels_and_achievement() {
        let ms = fire_milestones(dec!(300_000), dec!(2000), dec!(0.07), dec!(1_000_000), as_of());
        let labels: Vec<&str> = ms.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["Coast FI", "Barista FI", "Lean FI", "Full FI"]);
        assert!(ms[0].is_achieved);
        assert!(!ms[1].is_achieved);
        assert_eq!(ms[0].months_to_reach, 0);
        assert_eq!(ms[3].target, dec!(1_000_000));
    }

    #[test]
    fn test_series_stops_at_fire() {
        let input = FireSeriesInput {
            current_net_worth: dec!(0),
            monthly_contribution: dec!(1000),
            annual_expenses: dec!(400),
            annual_return: Decimal::ZERO,
            withdrawal_rate: dec!(0.04),
            horizon_years: 30,
            as_of: as_of(),
        };
        let series = projection_series(&input).unwrap().result;
        // FIRE number 10_000 reached after 10 months
        assert_eq!(series.reached_fire_month, Some(10));
        assert_eq!(series.points.len(), 11);
        assert_eq!(series.points.last().unwrap().net_worth, dec!(10000));
    }

    #[test]
    fn test_series_stops_at_horizon() {
        let input = FireSeriesInput {
            current_net_worth: dec!(0),
            monthly_contribution: dec!(100),
            annual_expenses: dec!(40000),
            annual_return: dec!(0.05),
            withdrawal_rate: dec!(0.04),
            horizon_years: 2,
            as_of: as_of(),
        };
        let series = projection_series(&input).unwrap().result;
        assert_eq!(series.reached_fire_month, None);
        assert_eq!(series.points.len(), 25);
        assert!(series.points[24].total_growth > Decimal::ZERO);
    }

    #[test]
    fn test_series_huge_horizon_is_capped() {
        let input = FireSeriesInput {
            current_net_worth: dec!(0),
            monthly_contribution: dec!(10),
            annual_expenses: dec!(40000),
            annual_return: Decimal::ZERO,
            withdrawal_rate: dec!(0.04),
            horizon_years: 400_000_000,
            as_of: as_of(),
        };
        let out = projection_series(&input).unwrap();
        assert_eq!(out.result.points.len() as u32, MAX_PROJECTION_MONTHS + 1);
        assert!(out.warnings.iter().any(|w| w.contains("Horizon capped")));
    }

    #[test]
    fn test_high_return_projection_does_not_overflow() {
        let p = project_to_fire(dec!(100000), dec!(1000), dec!(0.8), dec!(2_000_000), as_of());
        assert!(p.is_reachable);
        assert!(p.months_to_fire > 0 && p.months_to_fire < MAX_PROJECTION_MONTHS);
    }
}
