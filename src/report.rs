//! CSV persistence for panels and score reports.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{ReaderBuilder, Writer};
use serde::Deserialize;
use tracing::info;

use crate::error::ReportError;
use crate::models::{QuarterlyRow, QuarterlyTable, ScoreCard};
use crate::scoring::ScoreResult;

pub const PANEL_FILE_PREFIX: &str = "quarterly_panel_";

/// Output path of a symbol's panel
pub fn panel_path(dir: &Path, symbol: &str) -> PathBuf {
    dir.join(format!("{}{}.csv", PANEL_FILE_PREFIX, symbol))
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(String::new, |v| format!("{:.*}", precision, v))
}

fn io_err(path: &Path, source: std::io::Error) -> ReportError {
    ReportError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn csv_err(path: &Path, source: csv::Error) -> ReportError {
    ReportError::Csv {
        path: path.display().to_string(),
        source,
    }
}

fn create_writer(path: &Path) -> Result<Writer<File>, ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    Writer::from_path(path).map_err(|e| csv_err(path, e))
}

/// Write a panel with six-decimal floats; missing values are empty cells
pub fn write_panel(table: &QuarterlyTable, path: &Path) -> Result<(), ReportError> {
    let mut writer = create_writer(path)?;

    let mut header = vec!["quarter_end"];
    header.extend(QuarterlyRow::FEATURE_NAMES);
    header.extend(["next_price", "next_return", "target_up"]);
    writer.write_record(&header).map_err(|e| csv_err(path, e))?;

    for row in &table.rows {
        let mut record = vec![row.quarter_end.format("%Y-%m-%d").to_string()];
        record.extend(row.features().iter().map(|v| fmt_opt(*v, 6)));
        record.push(fmt_opt(row.next_price, 6));
        record.push(fmt_opt(row.next_return, 6));
        record.push(row.target_up.map_or_else(String::new, |t| t.to_string()));
        writer.write_record(&record).map_err(|e| csv_err(path, e))?;
    }
    writer.flush().map_err(|e| io_err(path, e))?;

    info!("💾 {} CSV saved: {}", table.symbol, path.display());
    Ok(())
}

#[derive(Debug, Deserialize)]
struct PanelRecord {
    quarter_end: NaiveDate,
    price: Option<f64>,
    eps: Option<f64>,
    revenue: Option<f64>,
    net_income: Option<f64>,
    ebit: Option<f64>,
    interest_expense: Option<f64>,
    equity: Option<f64>,
    operating_cashflow: Option<f64>,
    capex: Option<f64>,
    dividend: Option<f64>,
    eps_diff: Option<f64>,
    eps_pct: Option<f64>,
    revenue_diff: Option<f64>,
    revenue_pct: Option<f64>,
    net_income_diff: Option<f64>,
    net_income_pct: Option<f64>,
    net_margin: Option<f64>,
    roe: Option<f64>,
    interest_coverage: Option<f64>,
    free_cash_flow: Option<f64>,
    next_price: Option<f64>,
    next_return: Option<f64>,
    target_up: Option<u8>,
}

impl From<PanelRecord> for QuarterlyRow {
    fn from(r: PanelRecord) -> Self {
        QuarterlyRow {
            quarter_end: r.quarter_end,
            price: r.price,
            eps: r.eps,
            revenue: r.revenue,
            net_income: r.net_income,
            ebit: r.ebit,
            interest_expense: r.interest_expense,
            equity: r.equity,
            operating_cashflow: r.operating_cashflow,
            capex: r.capex,
            dividend: r.dividend.unwrap_or(0.0),
            eps_diff: r.eps_diff,
            eps_pct: r.eps_pct,
            revenue_diff: r.revenue_diff,
            revenue_pct: r.revenue_pct,
            net_income_diff: r.net_income_diff,
            net_income_pct: r.net_income_pct,
            net_margin: r.net_margin,
            roe: r.roe,
            interest_coverage: r.interest_coverage,
            free_cash_flow: r.free_cash_flow,
            next_price: r.next_price,
            next_return: r.next_return,
            target_up: r.target_up,
        }
    }
}

/// Read a persisted panel back. Rows keep file order.
pub fn read_panel(path: &Path) -> Result<Vec<QuarterlyRow>, ReportError> {
    let mut reader = ReaderBuilder::new().from_path(path).map_err(|e| csv_err(path, e))?;
    reader
        .deserialize::<PanelRecord>()
        .map(|r| r.map(QuarterlyRow::from).map_err(|e| csv_err(path, e)))
        .collect()
}

/// Symbol encoded in a panel file name, if it is one
pub fn panel_symbol(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(PANEL_FILE_PREFIX)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .filter(|_| path.extension().map_or(false, |e| e == "csv"))
}

fn yes_no(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "Y",
        Some(false) => "N",
        None => "N/A",
    }
}

/// One line per symbol: rule points, total, tier and valuation
pub fn write_score_summary(cards: &[ScoreCard], path: &Path) -> Result<(), ReportError> {
    let mut writer = create_writer(path)?;
    writer
        .write_record([
            "symbol",
            "eps_growth",
            "dividend_growth",
            "roe",
            "net_margin",
            "interest_coverage",
            "free_cash_flow",
            "total_score",
            "tier",
            "discount_rate",
            "eps_avg_growth",
            "latest_dividend",
            "expected_dividend",
            "fair_price",
            "current_price",
            "below_fair",
        ])
        .map_err(|e| csv_err(path, e))?;

    for card in cards {
        let s = &card.scores;
        writer
            .write_record([
                card.symbol.clone(),
                format!("{:.2}", s.eps_growth),
                format!("{:.2}", s.dividend_growth),
                format!("{:.2}", s.roe),
                format!("{:.2}", s.net_margin),
                format!("{:.2}", s.interest_coverage),
                format!("{:.2}", s.free_cash_flow),
                format!("{:.2}", card.total),
                card.tier.to_string(),
                format!("{:.0}%", card.discount_rate * 100.0),
                format!("{:.2}%", card.eps_avg_growth * 100.0),
                format!("{:.2}", card.latest_dividend),
                format!("{:.2}", card.expected_dividend),
                fmt_opt(card.fair_price, 2),
                fmt_opt(card.current_price, 2),
                yes_no(card.below_fair).to_string(),
            ])
            .map_err(|e| csv_err(path, e))?;
    }
    writer.flush().map_err(|e| io_err(path, e))?;
    info!("💾 Score summary saved: {}", path.display());
    Ok(())
}

/// Per-year factor values for every scored symbol
pub fn write_score_raw(results: &[ScoreResult], path: &Path) -> Result<(), ReportError> {
    let mut writer = create_writer(path)?;
    writer
        .write_record([
            "symbol",
            "year",
            "eps",
            "dividend",
            "roe",
            "net_margin",
            "free_cash_flow",
            "interest_coverage",
        ])
        .map_err(|e| csv_err(path, e))?;

    for result in results {
        for f in &result.factors {
            writer
                .write_record([
                    result.card.symbol.clone(),
                    f.year.to_string(),
                    fmt_opt(f.eps, 6),
                    fmt_opt(f.dividend, 6),
                    fmt_opt(f.roe, 6),
                    fmt_opt(f.net_margin, 6),
                    fmt_opt(f.free_cash_flow, 6),
                    fmt_opt(f.interest_coverage, 6),
                ])
                .map_err(|e| csv_err(path, e))?;
        }
    }
    writer.flush().map_err(|e| io_err(path, e))?;
    info!("💾 Raw factor data saved: {}", path.display());
    Ok(())
}
