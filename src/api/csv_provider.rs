//! Provider backed by CSV exports on disk.
//!
//! Layout per symbol, under `<data_dir>/<SYMBOL>/`:
//!
//! - `income_<period>.csv`, `balance_<period>.csv`, `cashflow_<period>.csv`:
//!   first column is the line-item label, every other header is a report date
//! - `prices.csv`: `Date` and `Close` columns
//! - `dividends.csv`: `Date` and `Dividends` columns
//!
//! A missing file is treated as "provider has nothing", not as an error.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use super::DataProvider;
use crate::error::ProviderError;
use crate::models::{DividendSeries, FinancialStatements, Period, PriceSeries, StatementSeries, StatementSheet};
use crate::utils::{normalize_symbol, parse_date};

pub struct CsvDirectoryProvider {
    root: PathBuf,
}

impl CsvDirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.root.join(normalize_symbol(symbol))
    }

    fn open(&self, symbol: &str, path: &Path) -> Result<Option<csv::Reader<File>>, ProviderError> {
        match File::open(path) {
            Ok(file) => Ok(Some(ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{}: {} not found", symbol, path.display());
                Ok(None)
            }
            Err(e) => Err(ProviderError::Io {
                symbol: symbol.to_string(),
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    fn read_sheet(&self, symbol: &str, path: &Path) -> Result<StatementSheet, ProviderError> {
        let mut sheet = StatementSheet::default();
        let Some(mut reader) = self.open(symbol, path)? else {
            return Ok(sheet);
        };
        let ctx = Ctx { symbol, path };

        let headers = reader.headers().map_err(|e| ctx.csv(e))?.clone();
        let dates: Vec<NaiveDate> = headers
            .iter()
            .skip(1)
            .map(|h| parse_date(h).map_err(|e| ctx.malformed(e.to_string())))
            .collect::<Result<_, _>>()?;

        for record in reader.records() {
            let record = record.map_err(|e| ctx.csv(e))?;
            let Some(label) = record.get(0).filter(|l| !l.is_empty()) else {
                continue;
            };
            let mut series = StatementSeries::new();
            for (date, cell) in dates.iter().zip(record.iter().skip(1)) {
                if let Some(value) = parse_cell(cell).map_err(|m| ctx.malformed(format!("{}: {}", label, m)))? {
                    series.insert(*date, value);
                }
            }
            sheet.insert(label, series);
        }

        debug!("{}: read {} line items from {}", symbol, sheet.rows.len(), path.display());
        Ok(sheet)
    }

    /// Two-column series (`Date` + `value_column`) from a long-format file
    fn read_dated_column(&self, symbol: &str, path: &Path, value_column: &str) -> Result<PriceSeries, ProviderError> {
        let mut series = PriceSeries::new();
        let Some(mut reader) = self.open(symbol, path)? else {
            return Ok(series);
        };
        let ctx = Ctx { symbol, path };

        let headers = reader.headers().map_err(|e| ctx.csv(e))?.clone();
        let date_idx = column_index(&headers, "Date").ok_or_else(|| ctx.malformed("missing Date column".to_string()))?;
        let value_idx = column_index(&headers, value_column)
            .ok_or_else(|| ctx.malformed(format!("missing {} column", value_column)))?;

        for record in reader.records() {
            let record = record.map_err(|e| ctx.csv(e))?;
            let (Some(date), Some(cell)) = (record.get(date_idx), record.get(value_idx)) else {
                continue;
            };
            let date = parse_date(date).map_err(|e| ctx.malformed(e.to_string()))?;
            match parse_cell(cell).map_err(|m| ctx.malformed(m))? {
                Some(value) => {
                    series.insert(date, value);
                }
                None => warn!("{}: empty {} on {} in {}", symbol, value_column, date, path.display()),
            }
        }
        Ok(series)
    }
}

impl DataProvider for CsvDirectoryProvider {
    fn statements(&self, symbol: &str, period: Period) -> Result<FinancialStatements, ProviderError> {
        let dir = self.symbol_dir(symbol);
        let file = |kind: &str| dir.join(format!("{}_{}.csv", kind, period.as_str()));
        Ok(FinancialStatements {
            income: self.read_sheet(symbol, &file("income"))?,
            balance: self.read_sheet(symbol, &file("balance"))?,
            cashflow: self.read_sheet(symbol, &file("cashflow"))?,
        })
    }

    fn daily_prices(&self, symbol: &str) -> Result<PriceSeries, ProviderError> {
        self.read_dated_column(symbol, &self.symbol_dir(symbol).join("prices.csv"), "Close")
    }

    fn dividends(&self, symbol: &str) -> Result<DividendSeries, ProviderError> {
        self.read_dated_column(symbol, &self.symbol_dir(symbol).join("dividends.csv"), "Dividends")
    }
}

struct Ctx<'a> {
    symbol: &'a str,
    path: &'a Path,
}

impl Ctx<'_> {
    fn csv(&self, source: csv::Error) -> ProviderError {
        ProviderError::Csv {
            symbol: self.symbol.to_string(),
            path: self.path.display().to_string(),
            source,
        }
    }

    fn malformed(&self, message: String) -> ProviderError {
        ProviderError::Malformed {
            symbol: self.symbol.to_string(),
            path: self.path.display().to_string(),
            message,
        }
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

/// Empty and NaN cells are missing values
fn parse_cell(cell: &str) -> Result<Option<f64>, String> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(|v| if v.is_nan() { None } else { Some(v) })
        .map_err(|_| format!("not a number: '{}'", cell))
}
