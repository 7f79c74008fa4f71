//! Text rendering of report outcomes for terminal output

use std::fmt::{self, Write};

use crate::report::{Category, MonthlyReport, ReportOutcome};

/// Terminal rendering of a [`ReportOutcome`]
pub struct TextReport<'a>(pub &'a ReportOutcome);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ReportOutcome::NoData { employee } => {
                writeln!(f, "No data found for employee: {}", employee)
            }
            ReportOutcome::Report(report) => write_report(f, report),
        }
    }
}

pub fn render_text(outcome: &ReportOutcome) -> String {
    TextReport(outcome).to_string()
}

fn section_header(out: &mut impl Write, title: &str) -> fmt::Result {
    writeln!(out, "\n{}", "═".repeat(80))?;
    writeln!(out, "  {}", title)?;
    writeln!(out, "{}\n", "═".repeat(80))
}

fn subsection(out: &mut impl Write, title: &str) -> fmt::Result {
    writeln!(out, "\n{}", title)?;
    writeln!(out, "{}", "─".repeat(70))
}

fn write_report(out: &mut impl Write, report: &MonthlyReport) -> fmt::Result {
    section_header(out, &format!("SALES REPORT FOR EMPLOYEE: {}", report.employee))?;

    subsection(out, "Monthly Shop Activity")?;
    writeln!(
        out,
        "  {:8} {:>6} {:>6} {:>8} {:>12} {:>12} {:>12}",
        "Month", "Shops", "New", "Repeat", "Sales", "New Value", "Repeat Value"
    )?;
    writeln!(out, "  {}", "─".repeat(70))?;
    for row in &report.rows {
        writeln!(
            out,
            "  {:8} {:>6} {:>6} {:>8} {:>12.2} {:>12.2} {:>12.2}",
            row.month.to_string(),
            row.total_shops,
            row.new_shops,
            row.repeated_shops,
            row.total_sales,
            row.new_order_value,
            row.repeated_order_value
        )?;
    }
    if report.rows.is_empty() {
        writeln!(out, "  (no dated orders)")?;
    }

    let s = &report.summary;
    subsection(out, "Summary")?;
    writeln!(out, "  Average Monthly Sales:        {:>12.2}", s.average_monthly_sales)?;
    writeln!(out, "  Total Sales:                  {:>12.2}", s.total_sales)?;
    writeln!(out, "  Average Transaction Value:    {:>12.2}", s.average_transaction_value)?;
    writeln!(out, "  Total Repeated Order Value:   {:>12.2}", s.total_repeated_order_value)?;
    writeln!(out, "  Average Repeated Order Value: {:>12.2}", s.average_repeat_order_sales)?;
    writeln!(out, "  Total New Order Value:        {:>12.2}", s.total_new_order_value)?;
    writeln!(out, "  Average New Order Value:      {:>12.2}", s.average_new_order_sales)?;

    for (category, title) in [
        (Category::New, "New Shops and Their Total Order Values"),
        (Category::Repeat, "Repeated Shops and Their Total Order Values"),
    ] {
        subsection(out, title)?;
        writeln!(out, "  {:8} {:32} {:>8} {:>14}", "Month", "Shop", "Orders", "Order Value")?;
        for shop in report.shop_breakdown.iter().filter(|s| s.category == category) {
            writeln!(
                out,
                "  {:8} {:32} {:>8} {:>14.2}",
                shop.month.to_string(),
                shop.shop_name,
                shop.orders,
                shop.total_order_value
            )?;
        }
    }

    let ex = &report.exclusions;
    if ex.invalid_date > 0 || ex.missing_value > 0 {
        writeln!(out)?;
    }
    if ex.invalid_date > 0 {
        writeln!(out, "  Note: {} rows with an invalid order date were excluded", ex.invalid_date)?;
    }
    if ex.missing_value > 0 {
        writeln!(
            out,
            "  Note: {} rows without an order value were left out of sales figures",
            ex.missing_value
        )?;
    }
    Ok(())
}
