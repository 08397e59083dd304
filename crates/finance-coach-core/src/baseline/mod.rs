pub mod calculator;
pub mod categories;

pub use calculator::{calculate_baseline, compare_to_baseline, BaselineMetrics, BaselineStatus, MonthlySummary};
pub use categories::{category_baselines, detect_category_anomalies, CategorySpending};
