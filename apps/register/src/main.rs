//! # Duka Register Entry Point
//!
//! Headless register: opens the configured shop and seller session and
//! prints a report as JSON. The library holds all the logic; a UI shell
//! drives the same commands.
//!
//! ## Usage
//! ```bash
//! duka-register                          # today's summary
//! duka-register --config ./register.toml cart
//! duka-register summary 2024-03-15
//! duka-register overview | top | dead | low
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load config: defaults → register.toml → DUKA_* environment
//! 3. Open database & run migrations
//! 4. Restore the seller's cart, load the catalog
//! 5. Run the report, print JSON, shut down

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::error;

use duka_core::aggregation::local_date;
use duka_register::commands::{cart, report};
use duka_register::error::ApiError;
use duka_register::state::ConfigState;
use duka_register::{init_tracing, Register};

enum Report {
    Summary(Option<NaiveDate>),
    Cart,
    Overview,
    Top,
    Dead,
    Low,
}

fn usage() -> &'static str {
    "Usage: duka-register [--config PATH] [summary [YYYY-MM-DD] | cart | overview | top | dead | low]"
}

fn parse_args() -> Result<(Option<PathBuf>, Report), String> {
    let mut args = std::env::args().skip(1);
    let mut config_path = None;
    let mut report = Report::Summary(None);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().ok_or("--config needs a path")?;
                config_path = Some(PathBuf::from(path));
            }
            "summary" => {
                let date = match args.next() {
                    Some(raw) => Some(
                        raw.parse::<NaiveDate>()
                            .map_err(|e| format!("bad date '{}': {}", raw, e))?,
                    ),
                    None => None,
                };
                report = Report::Summary(date);
            }
            "cart" => report = Report::Cart,
            "overview" => report = Report::Overview,
            "top" => report = Report::Top,
            "dead" => report = Report::Dead,
            "low" => report = Report::Low,
            "--help" | "-h" => return Err(usage().to_string()),
            other => return Err(format!("unknown argument '{}'\n{}", other, usage())),
        }
    }

    Ok((config_path, report))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ApiError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ApiError::internal(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

async fn run_report(register: &Register, which: Report) -> Result<(), ApiError> {
    let (db, config) = (&register.db, &register.config);
    match which {
        Report::Summary(date) => {
            let date = date.unwrap_or_else(|| local_date(Utc::now(), config.offset()));
            print_json(&report::daily_summary(db, config, date).await?)
        }
        Report::Cart => print_json(&cart::get_cart(&register.cart)),
        Report::Overview => print_json(&report::financial_overview(db, config).await?),
        Report::Top => print_json(&report::product_profitability(db, config, Some(10)).await?),
        Report::Dead => print_json(&report::dead_stock(db, config).await?),
        Report::Low => print_json(&report::low_stock(db, config).await?),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let (config_path, which) = match parse_args() {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    let config = match ConfigState::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let register = match Register::bootstrap(config).await {
        Ok(register) => register,
        Err(e) => {
            error!(error = %e, "Failed to start register");
            return ExitCode::FAILURE;
        }
    };

    let result = run_report(&register, which).await;
    register.shutdown().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Report failed");
            ExitCode::FAILURE
        }
    }
}
