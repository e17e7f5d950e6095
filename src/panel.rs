//! Quarterly panel construction.
//!
//! Statement series arrive on irregular report dates and prices arrive as
//! daily closes. Everything is snapped to calendar quarter-ends, reindexed
//! onto the union of those dates, and enriched with ratios, period-over-period
//! changes and a forward-return label.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::PanelError;
use crate::models::{
    DividendSeries, FieldId, PriceSeries, QuarterlyRow, QuarterlyTable, StatementSeries, StatementSet,
};
use crate::utils::{aggregate_quarterly_sum, keep_last, nearest_quarter_end, pct_change, resample_quarterly_last, safe_div};

/// Builds [`QuarterlyTable`]s with a fixed label horizon
#[derive(Debug, Clone)]
pub struct PanelBuilder {
    horizon: usize,
    price_quarters: Option<usize>,
}

impl PanelBuilder {
    pub fn new(horizon: usize) -> Self {
        Self {
            horizon,
            price_quarters: None,
        }
    }

    /// Only keep the most recent `n` price quarters (None keeps all)
    pub fn with_price_quarters(mut self, n: Option<usize>) -> Self {
        self.price_quarters = n;
        self
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn build(
        &self,
        symbol: &str,
        statements: &StatementSet,
        prices: &PriceSeries,
        dividends: &DividendSeries,
    ) -> Result<QuarterlyTable, PanelError> {
        if self.horizon == 0 {
            return Err(PanelError::InvalidHorizon(self.horizon));
        }

        let mut quarterly_prices = resample_quarterly_last(prices);
        if let Some(n) = self.price_quarters {
            quarterly_prices = keep_last(&quarterly_prices, n);
        }

        let mut aligned = StatementSet::new();
        for (field, series) in statements.iter() {
            aligned.insert(*field, snap_to_quarter_end(symbol, *field, series));
        }

        let mut index: BTreeSet<NaiveDate> = quarterly_prices.keys().copied().collect();
        for (_, series) in aligned.iter() {
            index.extend(series.keys().copied());
        }
        if index.is_empty() {
            return Err(PanelError::NoQuarterlyData {
                symbol: symbol.to_string(),
            });
        }

        let quarterly_dividends = aggregate_quarterly_sum(dividends);

        let mut rows: Vec<QuarterlyRow> = index
            .into_iter()
            .map(|q| {
                let mut row = QuarterlyRow::new(q);
                row.price = quarterly_prices.get(&q).copied();
                for field in FieldId::ALL {
                    row.set_field(field, aligned.value(field, q));
                }
                row.dividend = quarterly_dividends.get(&q).copied().unwrap_or(0.0);
                derive_ratios(&mut row);
                row
            })
            .collect();

        derive_sequential(&mut rows);
        derive_labels(&mut rows, self.horizon);

        let labelled = rows.iter().filter(|r| r.target_up.is_some()).count();
        info!(
            "📊 {}: built {} quarterly rows ({} labelled, horizon {})",
            symbol,
            rows.len(),
            labelled,
            self.horizon
        );

        Ok(QuarterlyTable {
            symbol: symbol.to_string(),
            horizon: self.horizon,
            rows,
        })
    }
}

/// Build a panel with no price trimming
pub fn build(
    symbol: &str,
    statements: &StatementSet,
    prices: &PriceSeries,
    dividends: &DividendSeries,
    horizon: usize,
) -> Result<QuarterlyTable, PanelError> {
    PanelBuilder::new(horizon).build(symbol, statements, prices, dividends)
}

/// Re-key a series by its nearest calendar quarter-end; the latest report in a quarter wins
fn snap_to_quarter_end(symbol: &str, field: FieldId, series: &StatementSeries) -> StatementSeries {
    let mut snapped = StatementSeries::new();
    for (date, value) in series {
        let q = nearest_quarter_end(*date);
        if snapped.insert(q, *value).is_some() {
            warn!(
                "{}: multiple {} reports map to quarter ending {}, keeping the one from {}",
                symbol, field, q, date
            );
        }
    }
    snapped
}

fn derive_ratios(row: &mut QuarterlyRow) {
    row.net_margin = safe_div(row.net_income, row.revenue);
    row.roe = safe_div(row.net_income.map(|n| n * 4.0), row.equity);
    row.interest_coverage = safe_div(row.ebit, row.interest_expense);
    // Capex is reported as a negative outflow
    row.free_cash_flow = match (row.operating_cashflow, row.capex) {
        (Some(ocf), Some(capex)) => Some(ocf + capex),
        _ => None,
    };
}

fn diff(previous: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (previous, current) {
        (Some(p), Some(c)) => Some(c - p),
        _ => None,
    }
}

fn derive_sequential(rows: &mut [QuarterlyRow]) {
    for i in 1..rows.len() {
        let (prev_eps, prev_revenue, prev_net_income) = {
            let prev = &rows[i - 1];
            (prev.eps, prev.revenue, prev.net_income)
        };
        let row = &mut rows[i];
        row.eps_diff = diff(prev_eps, row.eps);
        row.eps_pct = pct_change(prev_eps, row.eps);
        row.revenue_diff = diff(prev_revenue, row.revenue);
        row.revenue_pct = pct_change(prev_revenue, row.revenue);
        row.net_income_diff = diff(prev_net_income, row.net_income);
        row.net_income_pct = pct_change(prev_net_income, row.net_income);
    }
}

fn derive_labels(rows: &mut [QuarterlyRow], horizon: usize) {
    for i in 0..rows.len() {
        let next_price = rows.get(i + horizon).and_then(|r| r.price);
        let row = &mut rows[i];
        row.next_price = next_price;
        row.next_return = pct_change(row.price, next_price);
        row.target_up = row.next_return.map(|r| u8::from(r > 0.0));
    }
}
