use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Date layouts accepted for `Order Date`. Day-month-year is what the sales
/// export produces; ISO is accepted for logs that were already normalized.
const DATE_FORMATS: [&str; 4] = ["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d"];

/// Raw record from the CSV transaction log
#[derive(Debug, Deserialize)]
pub struct CsvRecord {
    #[serde(rename = "Employee Name")]
    pub employee_name: String,
    #[serde(rename = "Shop Name")]
    pub shop_name: String,
    #[serde(rename = "Order Date")]
    pub order_date: String,
    #[serde(rename = "Order Value", default)]
    pub order_value: Option<String>,
}

/// One normalized row of the transaction log.
///
/// `order_date` is `None` when the source text could not be parsed, and
/// `order_value` is `None` when the column is absent or malformed. Both are
/// kept on the record so the report can count what it excludes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub employee_name: String,
    pub shop_name: String,
    pub order_date: Option<NaiveDate>,
    pub order_value: Option<f64>,
}

impl Transaction {
    pub fn new(
        employee_name: impl Into<String>,
        shop_name: impl Into<String>,
        order_date: Option<NaiveDate>,
        order_value: Option<f64>,
    ) -> Self {
        Self {
            employee_name: employee_name.into(),
            shop_name: shop_name.into(),
            order_date,
            order_value,
        }
    }

    pub fn month(&self) -> Option<MonthKey> {
        self.order_date.map(MonthKey::from_date)
    }
}

impl From<CsvRecord> for Transaction {
    fn from(record: CsvRecord) -> Self {
        Self {
            order_date: parse_order_date(&record.order_date),
            order_value: record.order_value.as_deref().and_then(parse_order_value),
            employee_name: record.employee_name.trim().to_string(),
            shop_name: record.shop_name.trim().to_string(),
        }
    }
}

/// Best-effort date parsing; `None` is the invalid-date sentinel.
pub fn parse_order_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    // chrono's %Y takes any digit count, so "05-03-24" would land in year 24
    DATE_FORMATS
        .iter()
        .find_map(|fmt| {
            NaiveDate::parse_from_str(s, fmt)
                .ok()
                .filter(|d| (1000..=9999).contains(&d.year()))
        })
}

/// Parse a currency amount such as `1,250.50`. Returns `None` for empty,
/// non-numeric or non-finite input.
pub fn parse_order_value(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Calendar month used as the report's grouping axis. Ordering is
/// chronological because `year` is compared before `month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| anyhow::anyhow!("expected YYYY-MM, got {:?}", s))?;
        let year: i32 = year.parse()?;
        let month: u32 = month.parse()?;
        if !(1..=12).contains(&month) {
            anyhow::bail!("month out of range in {:?}", s);
        }
        Ok(Self { year, month })
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
