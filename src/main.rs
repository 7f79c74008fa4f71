//! Monthly new/repeat shop report for one employee
//!
//! Run: ./target/release/shop_activity --employee "Priya Nair"
//!      ./target/release/shop_activity --list-employees

use anyhow::Result;
use clap::{Parser, ValueEnum};
use shop_activity::{format::render_text, ledger::TransactionLog, report::build_report};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Sales activity report: new vs repeat shops per month
#[derive(Parser, Debug)]
#[command(name = "shop_activity")]
#[command(about = "Monthly new/repeat shop report for an employee")]
struct Args {
    /// Transaction log CSV
    #[arg(long, env = "SHOP_ACTIVITY_LOG", default_value = "data/transactions.csv")]
    input: PathBuf,

    /// Employee to report on
    #[arg(long, required_unless_present = "list_employees")]
    employee: Option<String>,

    /// List the employees present in the log and exit
    #[arg(long)]
    list_employees: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let log = TransactionLog::from_csv_path(&args.input)?;

    if args.list_employees {
        for name in log.employees() {
            println!("{}", name);
        }
        return Ok(());
    }

    let Some(employee) = args.employee else {
        anyhow::bail!("--employee is required");
    };

    info!("Generating report for {}", employee);
    let outcome = build_report(&log, &employee);

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&outcome)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }

    Ok(())
}
