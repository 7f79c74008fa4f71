//! Synthetic transaction log generator
//!
//! Produces a sales log in the same layout as the distribution export, with
//! shops that place a first order and then come back (or not) in later
//! months. A share of rows can be given broken dates or blank values so the
//! exclusion paths of the report show up in demos.
//!
//! Usage:
//!   cargo run --release --bin generate_synthetic -- [OPTIONS]
//!
//! Options:
//!   --employees <N>        Number of sales employees (default: 4)
//!   --shops <N>            Shops per employee (default: 25)
//!   --months <N>           Months of history (default: 12)
//!   --start <YYYY-MM>      First month (default: 2024-01)
//!   --return-rate <F>      Chance a shop orders again in a later month (default: 0.45)
//!   --invalid-date-rate <F> Share of rows with an unparsable date (default: 0.01)
//!   --missing-value-rate <F> Share of rows with a blank value (default: 0.01)
//!   --seed <N>             Random seed for reproducibility (optional)
//!   --output <PATH>        Output CSV path (default: data/transactions.csv)

use anyhow::{ensure, Context, Result};
use chrono::{Datelike, Months, NaiveDate};
use clap::Parser;
use csv::WriterBuilder;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use shop_activity::models::MonthKey;
use std::collections::HashSet;
use std::path::PathBuf;

const FIRST_NAMES: [&str; 8] = [
    "Priya", "Arjun", "Meena", "Ravi", "Kavya", "Sanjay", "Divya", "Rahul",
];
const LAST_NAMES: [&str; 6] = ["Nair", "Sharma", "Iyer", "Patel", "Reddy", "Das"];
const SHOP_KINDS: [&str; 8] = [
    "Medicals", "Stores", "Mart", "Pharmacy", "Traders", "Super Market", "Agencies", "Kirana",
];
const SHOP_PREFIXES: [&str; 10] = [
    "Sri Lakshmi", "New", "Royal", "City", "Balaji", "Green", "Star", "Sai", "Ganesh", "Anand",
];

/// Synthetic sales log generator
#[derive(Parser, Debug)]
#[command(name = "generate_synthetic")]
#[command(about = "Generate a synthetic shop transaction log")]
struct Args {
    /// Number of sales employees
    #[arg(long, default_value = "4")]
    employees: usize,

    /// Shops per employee
    #[arg(long, default_value = "25")]
    shops: usize,

    /// Months of history to generate
    #[arg(long, default_value = "12")]
    months: u32,

    /// First month, as YYYY-MM
    #[arg(long, default_value = "2024-01")]
    start: MonthKey,

    /// Probability a shop orders again in any later month
    #[arg(long, default_value = "0.45")]
    return_rate: f64,

    /// Share of rows written with an unparsable date
    #[arg(long, default_value = "0.01")]
    invalid_date_rate: f64,

    /// Share of rows written with a blank order value
    #[arg(long, default_value = "0.01")]
    missing_value_rate: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output CSV path
    #[arg(long, default_value = "data/transactions.csv")]
    output: PathBuf,
}

#[derive(Debug, Serialize)]
struct OutputRecord {
    #[serde(rename = "Employee Name")]
    employee_name: String,
    #[serde(rename = "Shop Name")]
    shop_name: String,
    #[serde(rename = "Order Date")]
    order_date: String,
    #[serde(rename = "Order Value")]
    order_value: String,
}

fn employee_name(i: usize) -> String {
    format!(
        "{} {}",
        FIRST_NAMES[i % FIRST_NAMES.len()],
        LAST_NAMES[(i / FIRST_NAMES.len() + i) % LAST_NAMES.len()]
    )
}

/// Pick a shop name not used so far. Once a base name is taken the running
/// count is appended, so any number of shops gets a distinct name.
fn shop_name(rng: &mut impl Rng, used: &mut HashSet<String>) -> String {
    let base = format!(
        "{} {}",
        SHOP_PREFIXES.choose(rng).copied().unwrap_or("New"),
        SHOP_KINDS.choose(rng).copied().unwrap_or("Stores")
    );
    let name = if used.contains(&base) {
        format!("{} {}", base, used.len() + 1)
    } else {
        base
    };
    used.insert(name.clone());
    name
}

fn month_start(start: MonthKey, offset: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(start.year, start.month, 1)?.checked_add_months(Months::new(offset))
}

fn random_day_in(month: NaiveDate, rng: &mut impl Rng) -> NaiveDate {
    let next = month.checked_add_months(Months::new(1)).unwrap_or(month);
    let days = (next - month).num_days().max(1);
    month + chrono::Duration::days(rng.gen_range(0..days))
}

fn order_value(rng: &mut impl Rng, repeat: bool) -> f64 {
    let base: f64 = if repeat {
        rng.gen_range(400.0..4000.0)
    } else {
        rng.gen_range(800.0..9000.0)
    };
    (base * 100.0).round() / 100.0
}

fn record(
    employee: &str,
    shop: &str,
    date: NaiveDate,
    value: f64,
    args: &Args,
    rng: &mut impl Rng,
) -> OutputRecord {
    let order_date = if rng.gen::<f64>() < args.invalid_date_rate {
        format!("31-02-{}", date.year())
    } else {
        date.format("%d-%m-%Y").to_string()
    };
    let order_value = if rng.gen::<f64>() < args.missing_value_rate {
        String::new()
    } else {
        format!("{:.2}", value)
    };
    OutputRecord {
        employee_name: employee.to_string(),
        shop_name: shop.to_string(),
        order_date,
        order_value,
    }
}

fn validate(args: &Args) -> Result<()> {
    ensure!(args.months > 0, "--months must be at least 1");
    for (flag, rate) in [
        ("--return-rate", args.return_rate),
        ("--invalid-date-rate", args.invalid_date_rate),
        ("--missing-value-rate", args.missing_value_rate),
    ] {
        ensure!((0.0..=1.0).contains(&rate), "{} must be between 0 and 1", flag);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    validate(&args)?;

    println!("Synthetic Transaction Log Generator");
    println!("{}", "━".repeat(60));
    println!("Output:             {}", args.output.display());
    println!("Employees:          {}", args.employees);
    println!("Shops per employee: {}", args.shops);
    println!("Months:             {} from {}", args.months, args.start);
    println!("Return rate:        {:.1}%", args.return_rate * 100.0);
    println!("Invalid date rate:  {:.1}%", args.invalid_date_rate * 100.0);
    println!("Missing value rate: {:.1}%", args.missing_value_rate * 100.0);
    if let Some(seed) = args.seed {
        println!("Random seed:        {}", seed);
    }
    println!();

    let mut rng: StdRng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let mut used_names = HashSet::new();
    let mut total_written = 0;

    for e in 0..args.employees {
        let employee = employee_name(e);
        for _ in 0..args.shops {
            let shop = shop_name(&mut rng, &mut used_names);
            let first_month = rng.gen_range(0..args.months);

            let Some(first) = month_start(args.start, first_month) else {
                continue;
            };
            let first_day = random_day_in(first, &mut rng);
            let first_orders = if rng.gen_bool(0.1) { 2 } else { 1 };
            for _ in 0..first_orders {
                let value = order_value(&mut rng, false);
                writer.serialize(record(&employee, &shop, first_day, value, &args, &mut rng))?;
                total_written += 1;
            }

            for later in (first_month + 1)..args.months {
                if rng.gen::<f64>() >= args.return_rate {
                    continue;
                }
                let Some(month) = month_start(args.start, later) else {
                    continue;
                };
                let orders = rng.gen_range(1..=3);
                for _ in 0..orders {
                    let day = random_day_in(month, &mut rng);
                    let value = order_value(&mut rng, true);
                    writer.serialize(record(&employee, &shop, day, value, &args, &mut rng))?;
                    total_written += 1;
                }
            }
        }
    }

    writer.flush()?;

    println!("Generation complete");
    println!("{}", "━".repeat(60));
    println!("Rows written:  {:>8}", total_written);
    println!("Output file:   {}", args.output.display());

    Ok(())
}
