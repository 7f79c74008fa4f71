//! Monthly new/repeat shop report
//!
//! A report is built in four stages over one employee's transactions:
//!
//! 1. [`filter_employee`] selects the employee's rows and splits off those
//!    whose date could not be parsed.
//! 2. [`first_order_dates`] finds each shop's earliest order date.
//! 3. [`classify`] labels every dated order `New` (same month as the shop's
//!    first order) or `Repeat` (a strictly later month).
//! 4. [`aggregate_months`] groups by month, counting distinct shops per
//!    category and summing order values.
//!
//! Counting is by distinct shop name per month, so several orders from one
//! shop on the same day, or on different days of the same month, count once.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, warn};

use crate::ledger::TransactionLog;
use crate::models::{MonthKey, Transaction};

// ============================================================================
// Report types
// ============================================================================

/// Result of a report request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    /// The employee has no rows in the log
    NoData { employee: String },
    Report(MonthlyReport),
}

impl ReportOutcome {
    pub fn employee(&self) -> &str {
        match self {
            ReportOutcome::NoData { employee } => employee,
            ReportOutcome::Report(report) => &report.employee,
        }
    }

    pub fn report(&self) -> Option<&MonthlyReport> {
        match self {
            ReportOutcome::NoData { .. } => None,
            ReportOutcome::Report(report) => Some(report),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub employee: String,
    /// Ascending by month, one row per month with activity
    pub rows: Vec<MonthRow>,
    pub summary: ReportSummary,
    pub shop_breakdown: Vec<ShopMonthValue>,
    pub exclusions: Exclusions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthRow {
    pub month: MonthKey,
    pub total_shops: usize,
    pub new_shops: usize,
    pub repeated_shops: usize,
    pub orders: usize,
    pub total_sales: f64,
    pub average_sales: f64,
    pub new_order_value: f64,
    pub average_new_order_value: f64,
    pub repeated_order_value: f64,
    pub average_repeated_order_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub months: usize,
    pub distinct_shops: usize,
    pub total_sales: f64,
    /// Mean over individual valued transactions
    pub average_transaction_value: f64,
    /// Mean of the per-month `total_sales` column
    pub average_monthly_sales: f64,
    pub total_repeated_order_value: f64,
    pub average_repeat_order_sales: f64,
    pub total_new_order_value: f64,
    pub average_new_order_sales: f64,
}

/// One shop's activity in one month, for the name-level breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopMonthValue {
    pub month: MonthKey,
    pub shop_name: String,
    pub category: Category,
    pub orders: usize,
    pub total_order_value: f64,
}

/// Rows left out of parts of the report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusions {
    /// Excluded from every month-based figure
    pub invalid_date: usize,
    /// Counted as shop activity but left out of sums and means
    pub missing_value: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    New,
    Repeat,
}

// ============================================================================
// Pipeline stages
// ============================================================================

/// A transaction with a usable date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatedOrder<'a> {
    pub shop: &'a str,
    pub date: NaiveDate,
    pub month: MonthKey,
    pub value: Option<f64>,
}

/// The employee's rows, split by date validity
#[derive(Debug, Default)]
pub struct FilteredSet<'a> {
    pub orders: Vec<DatedOrder<'a>>,
    pub invalid_dates: usize,
}

impl FilteredSet<'_> {
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty() && self.invalid_dates == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifiedOrder<'a> {
    pub order: DatedOrder<'a>,
    pub category: Category,
}

/// Names are compared trimmed, matching how the log normalizes them on load.
pub fn filter_employee<'a>(transactions: &'a [Transaction], employee: &str) -> FilteredSet<'a> {
    let employee = employee.trim();
    let mut set = FilteredSet::default();
    for tx in transactions.iter().filter(|t| t.employee_name == employee) {
        match tx.order_date {
            Some(date) => set.orders.push(DatedOrder {
                shop: &tx.shop_name,
                date,
                month: MonthKey::from_date(date),
                value: tx.order_value,
            }),
            None => set.invalid_dates += 1,
        }
    }
    set
}

/// Earliest order date per shop
pub fn first_order_dates<'a>(orders: &[DatedOrder<'a>]) -> BTreeMap<&'a str, NaiveDate> {
    let mut first: BTreeMap<&'a str, NaiveDate> = BTreeMap::new();
    for order in orders {
        first
            .entry(order.shop)
            .and_modify(|d| {
                if order.date < *d {
                    *d = order.date;
                }
            })
            .or_insert(order.date);
    }
    first
}

pub fn classify<'a>(
    orders: &[DatedOrder<'a>],
    first_dates: &BTreeMap<&'a str, NaiveDate>,
) -> Vec<ClassifiedOrder<'a>> {
    let mut classified = Vec::with_capacity(orders.len());
    for order in orders {
        let Some(first) = first_dates.get(order.shop) else {
            error!("Shop {:?} has no first order date", order.shop);
            continue;
        };
        let category = match order.month.cmp(&MonthKey::from_date(*first)) {
            Ordering::Equal => Category::New,
            Ordering::Greater => Category::Repeat,
            Ordering::Less => {
                error!(
                    "Order for {:?} on {} precedes its first order {}",
                    order.shop, order.date, first
                );
                continue;
            }
        };
        classified.push(ClassifiedOrder {
            order: *order,
            category,
        });
    }
    classified
}

#[derive(Debug, Clone, Copy, Default)]
struct ValueTally {
    sum: f64,
    count: usize,
}

impl ValueTally {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug, Default)]
struct ShopTally {
    orders: usize,
    value: f64,
}

#[derive(Debug, Default)]
struct MonthAccumulator<'a> {
    shops: BTreeSet<&'a str>,
    orders: usize,
    total: ValueTally,
    new: ValueTally,
    repeat: ValueTally,
    by_shop: BTreeMap<(Category, &'a str), ShopTally>,
}

/// Per-month rows plus the shop-level breakdown, both ordered by month
pub fn aggregate_months(classified: &[ClassifiedOrder<'_>]) -> (Vec<MonthRow>, Vec<ShopMonthValue>) {
    let mut months: BTreeMap<MonthKey, MonthAccumulator<'_>> = BTreeMap::new();

    for c in classified {
        let acc = months.entry(c.order.month).or_default();
        acc.shops.insert(c.order.shop);
        acc.orders += 1;
        acc.total.add(c.order.value);
        match c.category {
            Category::New => acc.new.add(c.order.value),
            Category::Repeat => acc.repeat.add(c.order.value),
        }
        let shop = acc.by_shop.entry((c.category, c.order.shop)).or_default();
        shop.orders += 1;
        shop.value += c.order.value.unwrap_or(0.0);
    }

    let mut rows = Vec::with_capacity(months.len());
    let mut breakdown = Vec::new();
    for (month, acc) in months {
        let count_of = |category: Category| {
            acc.by_shop
                .keys()
                .filter(|(c, _)| *c == category)
                .count()
        };
        rows.push(MonthRow {
            month,
            total_shops: acc.shops.len(),
            new_shops: count_of(Category::New),
            repeated_shops: count_of(Category::Repeat),
            orders: acc.orders,
            total_sales: acc.total.sum,
            average_sales: acc.total.mean(),
            new_order_value: acc.new.sum,
            average_new_order_value: acc.new.mean(),
            repeated_order_value: acc.repeat.sum,
            average_repeated_order_value: acc.repeat.mean(),
        });
        breakdown.extend(acc.by_shop.into_iter().map(|((category, shop), tally)| {
            ShopMonthValue {
                month,
                shop_name: shop.to_string(),
                category,
                orders: tally.orders,
                total_order_value: tally.value,
            }
        }));
    }
    (rows, breakdown)
}

fn summarize(classified: &[ClassifiedOrder<'_>], rows: &[MonthRow], distinct_shops: usize) -> ReportSummary {
    let mut total = ValueTally::default();
    let mut new = ValueTally::default();
    let mut repeat = ValueTally::default();
    for c in classified {
        total.add(c.order.value);
        match c.category {
            Category::New => new.add(c.order.value),
            Category::Repeat => repeat.add(c.order.value),
        }
    }

    let average_monthly_sales = if rows.is_empty() {
        0.0
    } else {
        rows.iter().map(|r| r.total_sales).sum::<f64>() / rows.len() as f64
    };

    ReportSummary {
        months: rows.len(),
        distinct_shops,
        total_sales: total.sum,
        average_transaction_value: total.mean(),
        average_monthly_sales,
        total_repeated_order_value: repeat.sum,
        average_repeat_order_sales: repeat.mean(),
        total_new_order_value: new.sum,
        average_new_order_sales: new.mean(),
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Build the monthly report for one employee.
///
/// Returns [`ReportOutcome::NoData`] when the employee has no rows at all.
/// An employee whose rows all have invalid dates gets an empty report with
/// the exclusion count filled in.
pub fn build_report(log: &TransactionLog, employee: &str) -> ReportOutcome {
    let employee = employee.trim();
    let filtered = filter_employee(log.transactions(), employee);
    if filtered.is_empty() {
        debug!("No transactions for employee {:?}", employee);
        return ReportOutcome::NoData {
            employee: employee.to_string(),
        };
    }

    let first_dates = first_order_dates(&filtered.orders);
    let classified = classify(&filtered.orders, &first_dates);
    let (rows, shop_breakdown) = aggregate_months(&classified);
    let summary = summarize(&classified, &rows, first_dates.len());

    let exclusions = Exclusions {
        invalid_date: filtered.invalid_dates,
        missing_value: filtered.orders.iter().filter(|o| o.value.is_none()).count(),
    };
    if exclusions.invalid_date > 0 {
        warn!(
            "{} rows for {:?} have an invalid order date and were excluded",
            exclusions.invalid_date, employee
        );
    }
    if exclusions.missing_value > 0 {
        warn!(
            "{} rows for {:?} have no order value and were left out of sales figures",
            exclusions.missing_value, employee
        );
    }
    debug!(
        "Report for {:?}: {} orders, {} shops, {} months",
        employee,
        classified.len(),
        first_dates.len(),
        rows.len()
    );

    ReportOutcome::Report(MonthlyReport {
        employee: employee.to_string(),
        rows,
        summary,
        shop_breakdown,
        exclusions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(employee: &str, shop: &str, date: &str, value: Option<f64>) -> Transaction {
        Transaction::new(employee, shop, crate::models::parse_order_date(date), value)
    }

    fn report_for(transactions: Vec<Transaction>, employee: &str) -> MonthlyReport {
        let log = TransactionLog::from_transactions(transactions);
        match build_report(&log, employee) {
            ReportOutcome::Report(report) => report,
            ReportOutcome::NoData { .. } => panic!("expected a report for {}", employee),
        }
    }

    fn row(report: &MonthlyReport, year: i32, month: u32) -> &MonthRow {
        report
            .rows
            .iter()
            .find(|r| r.month == MonthKey::new(year, month))
            .expect("month row present")
    }

    #[test]
    fn test_new_then_repeat_across_months() {
        let report = report_for(
            vec![
                tx("E", "A", "10-01-2024", Some(10.0)),
                tx("E", "B", "15-02-2024", Some(20.0)),
                tx("E", "A", "20-03-2024", Some(30.0)),
            ],
            "E",
        );

        let counts: Vec<(usize, usize, usize)> = report
            .rows
            .iter()
            .map(|r| (r.total_shops, r.new_shops, r.repeated_shops))
            .collect();
        assert_eq!(counts, vec![(1, 1, 0), (1, 1, 0), (1, 0, 1)]);
        assert_eq!(report.rows[0].month, MonthKey::new(2024, 1));
        assert_eq!(report.rows[2].month, MonthKey::new(2024, 3));
    }

    #[test]
    fn test_no_data_for_unknown_employee() {
        let log = TransactionLog::from_transactions(vec![tx("E", "A", "10-01-2024", None)]);
        let outcome = build_report(&log, "Z");
        assert_eq!(
            outcome,
            ReportOutcome::NoData {
                employee: "Z".to_string()
            }
        );
        assert!(outcome.report().is_none());
        assert_eq!(outcome.employee(), "Z");
    }

    #[test]
    fn test_same_day_first_orders_count_once() {
        let report = report_for(
            vec![
                tx("E", "C", "03-05-2024", Some(5.0)),
                tx("E", "C", "03-05-2024", Some(7.0)),
            ],
            "E",
        );
        let may = row(&report, 2024, 5);
        assert_eq!(may.new_shops, 1);
        assert_eq!(may.total_shops, 1);
        assert_eq!(may.repeated_shops, 0);
        assert_eq!(may.new_order_value, 12.0);
    }

    #[test]
    fn test_later_orders_in_first_month_are_not_repeats() {
        let report = report_for(
            vec![
                tx("E", "A", "01-01-2024", Some(1.0)),
                tx("E", "A", "20-01-2024", Some(2.0)),
            ],
            "E",
        );
        let jan = row(&report, 2024, 1);
        assert_eq!((jan.total_shops, jan.new_shops, jan.repeated_shops), (1, 1, 0));
    }

    #[test]
    fn test_repeat_counted_once_per_month() {
        let report = report_for(
            vec![
                tx("E", "A", "01-01-2024", Some(1.0)),
                tx("E", "A", "02-02-2024", Some(2.0)),
                tx("E", "A", "02-02-2024", Some(3.0)),
                tx("E", "A", "25-02-2024", Some(4.0)),
            ],
            "E",
        );
        let feb = row(&report, 2024, 2);
        assert_eq!(feb.repeated_shops, 1);
        assert_eq!(feb.orders, 3);
        assert_eq!(feb.repeated_order_value, 9.0);
        assert_eq!(feb.average_repeated_order_value, 3.0);
    }

    #[test]
    fn test_single_order_shop_never_repeats() {
        let report = report_for(
            vec![
                tx("E", "Solo", "09-06-2024", Some(8.0)),
                tx("E", "A", "01-05-2024", Some(1.0)),
                tx("E", "A", "01-07-2024", Some(1.0)),
            ],
            "E",
        );
        assert!(report
            .shop_breakdown
            .iter()
            .filter(|s| s.shop_name == "Solo")
            .all(|s| s.category == Category::New));
        assert_eq!(row(&report, 2024, 6).new_shops, 1);
        assert_eq!(row(&report, 2024, 6).repeated_shops, 0);
    }

    #[test]
    fn test_zero_filled_months() {
        let report = report_for(
            vec![
                tx("E", "A", "01-01-2024", None),
                tx("E", "A", "01-02-2024", None),
            ],
            "E",
        );
        let feb = row(&report, 2024, 2);
        assert_eq!(feb.new_shops, 0);
        assert_eq!(feb.new_order_value, 0.0);
        let jan = row(&report, 2024, 1);
        assert_eq!(jan.repeated_shops, 0);
        assert_eq!(jan.average_repeated_order_value, 0.0);
    }

    #[test]
    fn test_value_split_and_summary() {
        let report = report_for(
            vec![
                tx("E", "D", "10-01-2024", Some(100.0)),
                tx("E", "D", "10-02-2024", Some(50.0)),
            ],
            "E",
        );
        assert_eq!(row(&report, 2024, 1).new_order_value, 100.0);
        assert_eq!(row(&report, 2024, 2).repeated_order_value, 50.0);
        assert_eq!(report.summary.average_repeat_order_sales, 50.0);
        assert_eq!(report.summary.average_new_order_sales, 100.0);
        assert_eq!(report.summary.total_sales, 150.0);
        assert_eq!(report.summary.months, 2);
        assert_eq!(report.summary.distinct_shops, 1);
    }

    #[test]
    fn test_monthly_average_differs_from_transaction_average() {
        let report = report_for(
            vec![
                tx("E", "A", "01-01-2024", Some(10.0)),
                tx("E", "B", "02-01-2024", Some(20.0)),
                tx("E", "C", "03-01-2024", Some(30.0)),
                tx("E", "A", "01-02-2024", Some(60.0)),
            ],
            "E",
        );
        // 120 over 4 orders vs 120 over 2 months
        assert_eq!(report.summary.average_transaction_value, 30.0);
        assert_eq!(report.summary.average_monthly_sales, 60.0);
        assert_eq!(row(&report, 2024, 1).average_sales, 20.0);
    }

    #[test]
    fn test_invalid_dates_excluded_and_counted() {
        let report = report_for(
            vec![
                tx("E", "A", "01-01-2024", Some(10.0)),
                tx("E", "A", "garbage", Some(999.0)),
                tx("E", "B", "", Some(1.0)),
            ],
            "E",
        );
        assert_eq!(report.exclusions.invalid_date, 2);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.summary.total_sales, 10.0);
        assert_eq!(report.summary.distinct_shops, 1);
    }

    #[test]
    fn test_all_invalid_dates_gives_empty_report() {
        let report = report_for(vec![tx("E", "A", "??", Some(1.0))], "E");
        assert!(report.rows.is_empty());
        assert_eq!(report.exclusions.invalid_date, 1);
        assert_eq!(report.summary.average_monthly_sales, 0.0);
    }

    #[test]
    fn test_missing_values_do_not_skew_averages() {
        let report = report_for(
            vec![
                tx("E", "A", "01-01-2024", Some(40.0)),
                tx("E", "B", "02-01-2024", None),
            ],
            "E",
        );
        let jan = row(&report, 2024, 1);
        assert_eq!(jan.total_shops, 2);
        assert_eq!(jan.new_shops, 2);
        assert_eq!(jan.average_sales, 40.0);
        assert_eq!(report.exclusions.missing_value, 1);
    }

    #[test]
    fn test_other_employees_ignored() {
        let report = report_for(
            vec![
                tx("E", "A", "01-01-2024", Some(1.0)),
                tx("F", "A", "01-12-2023", Some(1.0)),
            ],
            "E",
        );
        // F's earlier order must not make A a repeat for E
        assert_eq!(row(&report, 2024, 1).new_shops, 1);
        assert_eq!(report.rows.len(), 1);
    }

    #[test]
    fn test_year_boundary_ordering() {
        let report = report_for(
            vec![
                tx("E", "A", "05-01-2024", Some(1.0)),
                tx("E", "A", "20-12-2023", Some(1.0)),
            ],
            "E",
        );
        let months: Vec<MonthKey> = report.rows.iter().map(|r| r.month).collect();
        assert_eq!(months, vec![MonthKey::new(2023, 12), MonthKey::new(2024, 1)]);
        assert_eq!(row(&report, 2024, 1).repeated_shops, 1);
    }

    #[test]
    fn test_counts_invariant_and_strict_ordering() {
        let shops = ["A", "B", "C", "D", "E"];
        let mut transactions = Vec::new();
        for (i, shop) in shops.iter().enumerate() {
            for m in (i as u32 + 1)..=12 {
                if (m + i as u32) % 3 != 0 {
                    let date = format!("{:02}-{:02}-2024", (m % 27) + 1, m);
                    transactions.push(tx("E", shop, &date, Some(m as f64)));
                }
            }
        }
        let report = report_for(transactions, "E");
        for r in &report.rows {
            assert!(r.new_shops + r.repeated_shops <= r.total_shops);
        }
        assert!(report.rows.windows(2).all(|w| w[0].month < w[1].month));
    }

    #[test]
    fn test_requested_name_is_trimmed() {
        let csv = "Employee Name,Shop Name,Order Date,Order Value\n\
                   Ravi ,Shop A,05-01-2024,10\n";
        let log = TransactionLog::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(log.employees(), vec!["Ravi".to_string()]);

        let outcome = build_report(&log, "Ravi ");
        assert_eq!(outcome.employee(), "Ravi");
        assert_eq!(outcome.report().map(|r| r.rows.len()), Some(1));
    }

    #[test]
    fn test_two_digit_year_counts_as_invalid() {
        let csv = "Employee Name,Shop Name,Order Date,Order Value\n\
                   E,A,05-03-24,10\n\
                   E,A,10-01-2024,20\n";
        let log = TransactionLog::from_reader(csv.as_bytes()).unwrap();
        let report = match build_report(&log, "E") {
            ReportOutcome::Report(report) => report,
            ReportOutcome::NoData { .. } => panic!("expected a report"),
        };
        assert_eq!(report.exclusions.invalid_date, 1);
        assert_eq!(report.rows.len(), 1);
        let jan = row(&report, 2024, 1);
        assert_eq!((jan.new_shops, jan.repeated_shops), (1, 0));
    }

    #[test]
    fn test_json_outcome_shape() {
        let no_data = ReportOutcome::NoData {
            employee: "Z".to_string(),
        };
        let json = serde_json::to_value(&no_data).unwrap();
        assert_eq!(json, serde_json::json!({"status": "no_data", "employee": "Z"}));
        let back: ReportOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, no_data);

        let log = TransactionLog::from_transactions(vec![
            tx("E", "D", "10-01-2024", Some(100.0)),
            tx("E", "D", "10-02-2024", Some(50.0)),
        ]);
        let outcome = build_report(&log, "E");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "report");
        assert_eq!(json["employee"], "E");
        assert_eq!(json["rows"][1]["month"], "2024-02");
        assert_eq!(json["shop_breakdown"][1]["category"], "repeat");
        let back: ReportOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn test_idempotent() {
        let log = TransactionLog::from_transactions(vec![
            tx("E", "A", "01-01-2024", Some(1.5)),
            tx("E", "B", "03-02-2024", Some(2.25)),
            tx("E", "A", "07-03-2024", None),
        ]);
        assert_eq!(build_report(&log, "E"), build_report(&log, "E"));
    }

    #[test]
    fn test_breakdown_lists_shops_per_category() {
        let report = report_for(
            vec![
                tx("E", "A", "01-01-2024", Some(10.0)),
                tx("E", "A", "05-02-2024", Some(5.0)),
                tx("E", "A", "06-02-2024", Some(6.0)),
                tx("E", "B", "07-02-2024", Some(7.0)),
            ],
            "E",
        );
        let feb: Vec<(&str, Category, f64)> = report
            .shop_breakdown
            .iter()
            .filter(|s| s.month == MonthKey::new(2024, 2))
            .map(|s| (s.shop_name.as_str(), s.category, s.total_order_value))
            .collect();
        assert_eq!(feb, vec![("B", Category::New, 7.0), ("A", Category::Repeat, 11.0)]);
    }

    #[test]
    fn test_classify_stage() {
        let txs = vec![
            tx("E", "A", "15-01-2024", None),
            tx("E", "A", "02-01-2024", None),
            tx("E", "A", "01-03-2024", None),
        ];
        let filtered = filter_employee(&txs, "E");
        let first = first_order_dates(&filtered.orders);
        assert_eq!(first.get("A"), NaiveDate::from_ymd_opt(2024, 1, 2).as_ref());
        let labels: Vec<Category> = classify(&filtered.orders, &first)
            .iter()
            .map(|c| c.category)
            .collect();
        assert_eq!(labels, vec![Category::New, Category::New, Category::Repeat]);
    }
}
