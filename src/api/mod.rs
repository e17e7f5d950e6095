use crate::error::ProviderError;
use crate::models::{DividendSeries, FinancialStatements, Period, PriceSeries};

pub mod csv_provider;
pub use csv_provider::CsvDirectoryProvider;

/// Source of statements, prices and dividends for a symbol.
///
/// Implementations return whatever the upstream has; missing line items or
/// periods are not errors.
#[cfg_attr(test, mockall::automock)]
pub trait DataProvider {
    /// Income statement, balance sheet and cash flow for the given period
    fn statements(&self, symbol: &str, period: Period) -> Result<FinancialStatements, ProviderError>;

    /// Daily closing prices
    fn daily_prices(&self, symbol: &str) -> Result<PriceSeries, ProviderError>;

    /// Dividend payments keyed by payment date
    fn dividends(&self, symbol: &str) -> Result<DividendSeries, ProviderError>;
}

/// Most recent close, used as the current price when scoring
pub fn latest_close(prices: &PriceSeries) -> Option<f64> {
    prices.values().next_back().copied()
}
