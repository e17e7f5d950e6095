use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};

use crate::models::{DividendSeries, PriceSeries};

/// Last calendar day of the quarter containing `date`
pub fn quarter_end(date: NaiveDate) -> NaiveDate {
    let quarter_last_month = ((date.month() - 1) / 3 + 1) * 3;
    let (year, next_month) = if quarter_last_month == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), quarter_last_month + 1)
    };
    // First day of the following month minus one day
    NaiveDate::from_ymd_opt(year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// Report dates this many days past a quarter-end still belong to that quarter
pub const FISCAL_SLACK_DAYS: i64 = 15;

/// Calendar quarter-end a statement period belongs to.
///
/// 52/53-week fiscal years close a few days either side of the calendar
/// quarter-end (e.g. 2023-04-01 or 2023-07-01), so a date within
/// [`FISCAL_SLACK_DAYS`] after a quarter-end snaps back to it.
pub fn nearest_quarter_end(date: NaiveDate) -> NaiveDate {
    let containing = quarter_end(date);
    let first_month = containing.month() - 2;
    let previous = NaiveDate::from_ymd_opt(containing.year(), first_month, 1).and_then(|d| d.pred_opt());
    match previous {
        Some(prev) if (date - prev).num_days() <= FISCAL_SLACK_DAYS => prev,
        _ => containing,
    }
}

/// Provider-style ticker spelling: `brk.b ` -> `BRK-B`
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().replace('.', "-").to_uppercase()
}

/// Split a comma separated symbol list, dropping blanks
pub fn parse_symbol_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(normalize_symbol)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a provider date. Accepts `YYYY-MM-DD` optionally followed by a time part.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    let date_part = trimmed
        .split(|c| c == ' ' || c == 'T')
        .next()
        .unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| anyhow!("Invalid date '{}': {}", value, e))
}

/// Resample daily closes to the last close within each calendar quarter,
/// keyed by quarter-end
pub fn resample_quarterly_last(prices: &PriceSeries) -> PriceSeries {
    let mut quarterly = BTreeMap::new();
    // Ascending iteration, so later closes overwrite earlier ones
    for (date, close) in prices {
        quarterly.insert(quarter_end(*date), *close);
    }
    quarterly
}

/// Sum dividend payments per calendar quarter, keyed by quarter-end
pub fn aggregate_quarterly_sum(dividends: &DividendSeries) -> BTreeMap<NaiveDate, f64> {
    let mut quarterly = BTreeMap::new();
    for (date, amount) in dividends {
        *quarterly.entry(quarter_end(*date)).or_insert(0.0) += amount;
    }
    quarterly
}

/// Sum dividend payments per calendar year
pub fn aggregate_annual_sum(dividends: &DividendSeries) -> BTreeMap<i32, f64> {
    let mut annual = BTreeMap::new();
    for (date, amount) in dividends {
        *annual.entry(date.year()).or_insert(0.0) += amount;
    }
    annual
}

/// Keep only the most recent `n` entries of a date-keyed series
pub fn keep_last<V: Clone>(series: &BTreeMap<NaiveDate, V>, n: usize) -> BTreeMap<NaiveDate, V> {
    let skip = series.len().saturating_sub(n);
    series
        .iter()
        .skip(skip)
        .map(|(d, v)| (*d, v.clone()))
        .collect()
}

/// Division that yields `None` for a missing or zero denominator
pub fn safe_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// Relative change from `previous` to `current`
pub fn pct_change(previous: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (previous, current) {
        (Some(p), Some(c)) if p != 0.0 => Some(c / p - 1.0),
        _ => None,
    }
}
