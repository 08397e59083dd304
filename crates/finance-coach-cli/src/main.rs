mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{fmt, EnvFilter};

use commands::baseline::{BaselineArgs, BaselineCompareArgs, CategoryAnomaliesArgs, CategoryBaselinesArgs};
use commands::debt::{DebtPlanArgs, ExtraPaymentArgs, PayoffArgs, StrategyCompareArgs};
use commands::fire::{FireArgs, FireSeriesArgs};
use commands::scenarios::{CompareScenariosArgs, ScenarioArgs};
use finance_coach_core::CoachConfig;

/// Debt payoff, FIRE and what-if projections for personal finances
#[derive(Parser)]
#[command(
    name = "coach",
    version,
    about = "Debt payoff, FIRE and what-if projections for personal finances",
    long_about = "A CLI over the finance-coach engine with decimal precision. Plans \
                  avalanche/snowball debt payoff, projects time to financial independence, \
                  builds 3-month spending baselines and simulates what-if scenarios. \
                  Requests are JSON, read from --input or stdin."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// JSON file overriding default assumptions (returns, withdrawal rate, thresholds)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log computation details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Months and interest to clear one balance at a fixed payment
    Payoff(PayoffArgs),
    /// This month's allocation across debts (avalanche or snowball)
    DebtPlan(DebtPlanArgs),
    /// Simulate avalanche and snowball to debt-free and compare
    StrategyCompare(StrategyCompareArgs),
    /// Minimums only vs minimums plus an extra monthly payment
    ExtraPayment(ExtraPaymentArgs),
    /// FIRE number, time to FIRE, milestones and sensitivity
    Fire(FireArgs),
    /// Month-by-month net worth toward the FIRE number
    FireSeries(FireSeriesArgs),
    /// Trailing 3-month income/spending baseline
    Baseline(BaselineArgs),
    /// Compare a month against its baseline
    BaselineCompare(BaselineCompareArgs),
    /// Trailing 3-month baseline per spending category
    CategoryBaselines(CategoryBaselinesArgs),
    /// Flag categories well above their own baseline
    CategoryAnomalies(CategoryAnomaliesArgs),
    /// Simulate one what-if scenario against a financial snapshot
    Scenario(ScenarioArgs),
    /// Simulate several scenarios and pick the best
    CompareScenarios(CompareScenariosArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default = if verbose { "finance_coach_core=debug,coach=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&str>) -> Result<CoachConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read config '{path}': {e}"))?;
            Ok(CoachConfig::from_json(&raw)?)
        }
        None => Ok(CoachConfig::default()),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Payoff(args) => commands::debt::run_payoff(args),
        Commands::DebtPlan(args) => commands::debt::run_debt_plan(args),
        Commands::StrategyCompare(args) => commands::debt::run_strategy_compare(args),
        Commands::ExtraPayment(args) => commands::debt::run_extra_payment(args),
        Commands::Fire(args) => commands::fire::run_fire(args, &config),
        Commands::FireSeries(args) => commands::fire::run_fire_series(args),
        Commands::Baseline(args) => commands::baseline::run_baseline(args),
        Commands::BaselineCompare(args) => commands::baseline::run_baseline_compare(args, &config),
        Commands::CategoryBaselines(args) => commands::baseline::run_category_baselines(args),
        Commands::CategoryAnomalies(args) => commands::baseline::run_category_anomalies(args, &config),
        Commands::Scenario(args) => commands::scenarios::run_scenario(args, &config),
        Commands::CompareScenarios(args) => commands::scenarios::run_compare_scenarios(args, &config),
        Commands::Version => {
            println!("coach {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
