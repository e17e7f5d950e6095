//! Sequential per-symbol processing.
//!
//! Each symbol is handled on its own; an error is logged and the symbol is
//! skipped so the rest of the batch still runs.

use std::path::Path;

use tracing::{error, info};

use crate::api::{latest_close, DataProvider};
use crate::error::SymbolError;
use crate::ingest;
use crate::models::{Period, QuarterlyTable};
use crate::panel::PanelBuilder;
use crate::report::{panel_path, write_panel};
use crate::scoring::{self, ScoreResult, ScoringConfig};
use crate::utils::normalize_symbol;

/// Results of a batch: successes in input order plus failed symbols with their message
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<(String, String)>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

fn run_batch<T>(symbols: &[String], mut job: impl FnMut(&str) -> Result<T, SymbolError>) -> BatchOutcome<T> {
    let mut outcome = BatchOutcome::default();
    for raw in symbols {
        let symbol = normalize_symbol(raw);
        if symbol.is_empty() {
            continue;
        }
        match job(&symbol) {
            Ok(value) => outcome.succeeded.push(value),
            Err(e) => {
                error!("❌ {} failed: {}", symbol, e);
                outcome.failed.push((symbol, e.to_string()));
            }
        }
    }
    info!(
        "✅ Batch finished: {} succeeded, {} failed",
        outcome.succeeded.len(),
        outcome.failed.len()
    );
    outcome
}

/// Pull quarterly data for one symbol and build its panel
pub fn build_panel_for(
    provider: &dyn DataProvider,
    symbol: &str,
    builder: &PanelBuilder,
) -> Result<QuarterlyTable, SymbolError> {
    let statements = ingest::resolve(&provider.statements(symbol, Period::Quarterly)?);
    let prices = provider.daily_prices(symbol)?;
    let dividends = provider.dividends(symbol)?;
    Ok(builder.build(symbol, &statements, &prices, &dividends)?)
}

/// Build panels for every symbol, writing each to `output_dir` when given
pub fn build_panels(
    provider: &dyn DataProvider,
    symbols: &[String],
    builder: &PanelBuilder,
    output_dir: Option<&Path>,
) -> BatchOutcome<QuarterlyTable> {
    info!(
        "🚀 Building quarterly panels for {} symbols (horizon {})",
        symbols.len(),
        builder.horizon()
    );
    run_batch(symbols, |symbol| {
        let table = build_panel_for(provider, symbol, builder)?;
        if let Some(dir) = output_dir {
            write_panel(&table, &panel_path(dir, symbol))?;
        }
        Ok(table)
    })
}

/// Pull annual data for one symbol and score it
pub fn score_symbol(
    provider: &dyn DataProvider,
    symbol: &str,
    config: &ScoringConfig,
) -> Result<ScoreResult, SymbolError> {
    let annual = ingest::resolve(&provider.statements(symbol, Period::Annual)?);
    let dividends = provider.dividends(symbol)?;
    let current_price = latest_close(&provider.daily_prices(symbol)?);
    Ok(scoring::score(symbol, &annual, &dividends, current_price, config)?)
}

pub fn score_symbols(
    provider: &dyn DataProvider,
    symbols: &[String],
    config: &ScoringConfig,
) -> BatchOutcome<ScoreResult> {
    info!("🚀 Scoring {} symbols", symbols.len());
    run_batch(symbols, |symbol| score_symbol(provider, symbol, config))
}
