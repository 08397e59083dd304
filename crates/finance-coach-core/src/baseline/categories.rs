use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use crate::baseline::calculator::{format_month, parse_month, window_months, BASELINE_WINDOW};
use crate::config::CoachConfig;
use crate::error::CoachError;
use crate::types::{percent_of, with_metadata, ComputationOutput, Money, Percent};
use crate::CoachResult;

/// Spending in one category for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category_id: String,
    pub category_name: String,
    pub total_spent: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMonth {
    pub month: String,
    pub categories: Vec<CategorySpending>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBaselineInput {
    pub reference_month: String,
    pub history: Vec<CategoryMonth>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBaseline {
    pub category_id: String,
    pub category_name: String,
    /// Sum over the window divided by the window months that had any spending
    pub average_spent: Money,
    pub months_with_spending: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAnomalyInput {
    /// Month whose spending is checked; its history window is the three
    /// months before it
    pub reference_month: String,
    pub history: Vec<CategoryMonth>,
    pub current: Vec<CategorySpending>,
    #[serde(default)]
    pub threshold_percent: Option<Percent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAnomaly {
    pub category_id: String,
    pub category_name: String,
    pub current_spent: Money,
    pub baseline_average: Money,
    pub change: Money,
    /// `None` for categories with no baseline
    pub percent_above_baseline: Option<Percent>,
    pub is_new: bool,
}

fn compute_baselines(input: &CategoryBaselineInput) -> CoachResult<(Vec<CategoryBaseline>, u32)> {
    let window = window_months(&input.reference_month)?;

    let mut active_months: HashSet<String> = HashSet::new();
    // category_id -> (name, total, months seen); BTreeMap keeps output stable
    let mut totals: BTreeMap<String, (String, Money, HashSet<String>)> = BTreeMap::new();

    for month in &input.history {
        let key = format_month(parse_month(&month.month)?);
        if !window.contains(&key) {
            continue;
        }
        let spent: Money = month.categories.iter().map(|c| c.total_spent).sum();
        if spent.is_zero() {
            continue;
        }
        for cat in month.categories.iter().filter(|c| !c.total_spent.is_zero()) {
            let entry = totals
                .entry(cat.category_id.clone())
                .or_insert_with(|| (cat.category_name.clone(), Decimal::ZERO, HashSet::new()));
            entry.1 += cat.total_spent;
            entry.2.insert(key.clone());
        }
        active_months.insert(key);
    }

    let months_used = active_months.len() as u32;
    let baselines = totals
        .into_iter()
        .map(|(id, (name, total, seen))| CategoryBaseline {
            category_id: id,
            category_name: name,
            average_spent: (total / Decimal::from(months_used.max(1))).round_dp(2),
            months_with_spending: seen.len() as u32,
        })
        .collect();

    Ok((baselines, months_used))
}

/// Per-category trailing three-month averages.
pub fn category_baselines(
    input: &CategoryBaselineInput,
) -> CoachResult<ComputationOutput<Vec<CategoryBaseline>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let (baselines, months_used) = compute_baselines(input)?;
    if months_used == 0 {
        warnings.push(format!(
            "No category spending in the {BASELINE_WINDOW} months before {}",
            input.reference_month
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Per-category trailing 3-month average",
        &serde_json::json!({
            "reference_month": input.reference_month,
            "months_used": months_used,
        }),
        warnings,
        elapsed,
        baselines,
    ))
}

/// Flag categories whose current spending is at least `threshold_percent`
/// above their own baseline, plus categories with no baseline at all.
/// Sorted by absolute overspend, largest first.
pub fn detect_category_anomalies(
    input: &CategoryAnomalyInput,
) -> CoachResult<ComputationOutput<Vec<CategoryAnomaly>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let threshold = input
        .threshold_percent
        .unwrap_or(CoachConfig::default().category_anomaly_threshold_percent);
    if threshold < Decimal::ZERO {
        return Err(CoachError::InvalidInput {
            field: "threshold_percent".into(),
            reason: "must be >= 0".into(),
        });
    }

    let (baselines, months_used) = compute_baselines(&CategoryBaselineInput {
        reference_month: input.reference_month.clone(),
        history: input.history.clone(),
    })?;
    if months_used == 0 {
        warnings.push("No category history; every category is reported as new".into());
    }

    let by_id: BTreeMap<&str, &CategoryBaseline> = baselines
        .iter()
        .map(|b| (b.category_id.as_str(), b))
        .collect();

    let mut anomalies: Vec<CategoryAnomaly> = input
        .current
        .iter()
        .filter(|c| c.total_spent > Decimal::ZERO)
        .filter_map(|c| match by_id.get(c.category_id.as_str()) {
            Some(base) => {
                let change = c.total_spent - base.average_spent;
                let pct = percent_of(change, base.average_spent).round_dp(2);
                (pct >= threshold).then(|| CategoryAnomaly {
                    category_id: c.category_id.clone(),
                    category_name: c.category_name.clone(),
                    current_spent: c.total_spent,
                    baseline_average: base.average_spent,
                    change,
                    percent_above_baseline: Some(pct),
                    is_new: false,
                })
            }
            None => Some(CategoryAnomaly {
                category_id: c.category_id.clone(),
                category_name: c.category_name.clone(),
                current_spent: c.total_spent,
                baseline_average: Decimal::ZERO,
                change: c.total_spent,
                percent_above_baseline: None,
                is_new: true,
            }),
        })
        .collect();

    anomalies.sort_by(|a, b| b.change.cmp(&a.change));

    tracing::debug!(flagged = anomalies.len(), %threshold, "checked category spending");

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Category spending vs its own trailing 3-month baseline",
        &serde_json::json!({
            "reference_month": input.reference_month,
            "threshold_percent": threshold.to_string(),
        }),
        warnings,
        elapsed,
        anomalies,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cat(id: &str, spent: Decimal) -> CategorySpending {
        CategorySpending {
            category_id: id.into(),
            category_name: id.to_uppercase(),
            total_spent: spent,
        }
    }

    fn history() -> Vec<CategoryMonth> {
        vec![
            CategoryMonth {
                month: "2025-05".into(),
                categories: vec![cat("food", dec!(400)), cat("fun", dec!(100))],
            },
            CategoryMonth {
                month: "2025-04".into(),
                categories: vec![cat("food", dec!(500))],
            },
            CategoryMonth {
                month: "2025-03".into(),
                categories: vec![cat("food", dec!(300)), cat("fun", dec!(200))],
            },
        ]
    }

    #[test]
    fn test_category_baseline_averages_over_active_months() {
        let input = CategoryBaselineInput {
            reference_month: "2025-06".into(),
            history: history(),
        };
        let out = category_baselines(&input).unwrap().result;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].category_id, "food");
        assert_eq!(out[0].average_spent, dec!(400));
        // fun: 300 over 3 active months
        assert_eq!(out[1].average_spent, dec!(100));
        assert_eq!(out[1].months_with_spending, 2);
    }

    #[test]
    fn test_anomalies_flag_overspend_and_new() {
        let input = CategoryAnomalyInput {
            reference_month: "2025-06".into(),
            history: history(),
            current: vec![cat("food", dec!(450)), cat("fun", dec!(160)), cat("travel", dec!(900))],
            threshold_percent: None,
        };
        let out = detect_category_anomalies(&input).unwrap().result;
        let ids: Vec<&str> = out.iter().map(|a| a.category_id.as_str()).collect();
        assert_eq!(ids, vec!["travel", "fun"]);
        assert!(out[0].is_new);
        assert_eq!(out[1].percent_above_baseline, Some(dec!(60)));
    }

    #[test]
    fn test_repeated_month_counted_once() {
        let mut history = history();
        history.push(CategoryMonth {
            month: "2025-04".into(),
            categories: vec![cat("food", dec!(100))],
        });
        let input = CategoryBaselineInput {
            reference_month: "2025-06".into(),
            history,
        };
        let out = category_baselines(&input).unwrap().result;
        assert_eq!(out[0].category_id, "food");
        assert_eq!(out[0].months_with_spending, 3);
        assert_eq!(out[0].average_spent, dec!(433.33));
    }
}
