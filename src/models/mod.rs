use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical financial line items the rest of the crate works with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldId {
    Eps,
    Revenue,
    NetIncome,
    Ebit,
    InterestExpense,
    Equity,
    OperatingCashflow,
    Capex,
}

impl FieldId {
    pub const ALL: [FieldId; 8] = [
        FieldId::Eps,
        FieldId::Revenue,
        FieldId::NetIncome,
        FieldId::Ebit,
        FieldId::InterestExpense,
        FieldId::Equity,
        FieldId::OperatingCashflow,
        FieldId::Capex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldId::Eps => "eps",
            FieldId::Revenue => "revenue",
            FieldId::NetIncome => "net_income",
            FieldId::Ebit => "ebit",
            FieldId::InterestExpense => "interest_expense",
            FieldId::Equity => "equity",
            FieldId::OperatingCashflow => "operating_cashflow",
            FieldId::Capex => "capex",
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting frequency of a statement pull
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Quarterly,
    Annual,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Quarterly => "quarterly",
            Period::Annual => "annual",
        }
    }
}

/// Sparse date -> value series for a single line item
pub type StatementSeries = BTreeMap<NaiveDate, f64>;

/// Trading date -> closing price
pub type PriceSeries = BTreeMap<NaiveDate, f64>;

/// Payment date -> dividend amount
pub type DividendSeries = BTreeMap<NaiveDate, f64>;

/// Raw statement sheet as the provider returns it: line-item label -> dated values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementSheet {
    pub rows: BTreeMap<String, StatementSeries>,
}

impl StatementSheet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn insert(&mut self, label: impl Into<String>, series: StatementSeries) {
        self.rows.insert(label.into(), series);
    }
}

/// The three statements of one pull (income, balance sheet, cash flow)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialStatements {
    pub income: StatementSheet,
    pub balance: StatementSheet,
    pub cashflow: StatementSheet,
}

/// Canonical line items after label resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementSet {
    series: BTreeMap<FieldId, StatementSeries>,
}

impl StatementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: FieldId, series: StatementSeries) {
        self.series.insert(field, series);
    }

    /// Builder-style insert, mostly handy for fixtures
    pub fn with(mut self, field: FieldId, points: &[(NaiveDate, f64)]) -> Self {
        self.series.insert(field, points.iter().copied().collect());
        self
    }

    /// Series for a field; absent fields behave as empty series
    pub fn get(&self, field: FieldId) -> Option<&StatementSeries> {
        self.series.get(&field)
    }

    pub fn value(&self, field: FieldId, date: NaiveDate) -> Option<f64> {
        self.series.get(&field).and_then(|s| s.get(&date)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &StatementSeries)> {
        self.series.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(|s| s.is_empty())
    }
}

/// One aligned quarter of the panel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuarterlyRow {
    pub quarter_end: NaiveDate,
    pub price: Option<f64>,
    pub eps: Option<f64>,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub ebit: Option<f64>,
    pub interest_expense: Option<f64>,
    pub equity: Option<f64>,
    pub operating_cashflow: Option<f64>,
    pub capex: Option<f64>,
    pub dividend: f64,
    pub eps_diff: Option<f64>,
    pub eps_pct: Option<f64>,
    pub revenue_diff: Option<f64>,
    pub revenue_pct: Option<f64>,
    pub net_income_diff: Option<f64>,
    pub net_income_pct: Option<f64>,
    pub net_margin: Option<f64>,
    pub roe: Option<f64>,
    pub interest_coverage: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub next_price: Option<f64>,
    pub next_return: Option<f64>,
    pub target_up: Option<u8>,
}

impl QuarterlyRow {
    pub fn new(quarter_end: NaiveDate) -> Self {
        Self {
            quarter_end,
            ..Default::default()
        }
    }

    /// Column names of [`QuarterlyRow::features`], in order
    pub const FEATURE_NAMES: [&'static str; 20] = [
        "price",
        "eps",
        "revenue",
        "net_income",
        "ebit",
        "interest_expense",
        "equity",
        "operating_cashflow",
        "capex",
        "dividend",
        "eps_diff",
        "eps_pct",
        "revenue_diff",
        "revenue_pct",
        "net_income_diff",
        "net_income_pct",
        "net_margin",
        "roe",
        "interest_coverage",
        "free_cash_flow",
    ];

    /// Everything known at the quarter-end (excludes the forward label columns)
    pub fn features(&self) -> [Option<f64>; 20] {
        [
            self.price,
            self.eps,
            self.revenue,
            self.net_income,
            self.ebit,
            self.interest_expense,
            self.equity,
            self.operating_cashflow,
            self.capex,
            Some(self.dividend),
            self.eps_diff,
            self.eps_pct,
            self.revenue_diff,
            self.revenue_pct,
            self.net_income_diff,
            self.net_income_pct,
            self.net_margin,
            self.roe,
            self.interest_coverage,
            self.free_cash_flow,
        ]
    }

    pub(crate) fn set_field(&mut self, field: FieldId, value: Option<f64>) {
        let slot = match field {
            FieldId::Eps => &mut self.eps,
            FieldId::Revenue => &mut self.revenue,
            FieldId::NetIncome => &mut self.net_income,
            FieldId::Ebit => &mut self.ebit,
            FieldId::InterestExpense => &mut self.interest_expense,
            FieldId::Equity => &mut self.equity,
            FieldId::OperatingCashflow => &mut self.operating_cashflow,
            FieldId::Capex => &mut self.capex,
        };
        *slot = value;
    }
}

/// Quarterly panel for one symbol, sorted by quarter-end ascending
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterlyTable {
    pub symbol: String,
    pub horizon: usize,
    pub rows: Vec<QuarterlyRow>,
}

impl QuarterlyTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, quarter_end: NaiveDate) -> Option<&QuarterlyRow> {
        self.rows
            .binary_search_by_key(&quarter_end, |r| r.quarter_end)
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn quarter_ends(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.quarter_end).collect()
    }
}

/// Quality bucket derived from the total rubric score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    A,
    B,
    C,
}

impl Tier {
    pub fn from_score(total: f64) -> Self {
        if total >= 5.0 {
            Tier::A
        } else if total >= 3.0 {
            Tier::B
        } else {
            Tier::C
        }
    }

    /// Discount applied to the fair price for this tier
    pub fn discount_rate(&self) -> f64 {
        match self {
            Tier::A => 0.08,
            Tier::B => 0.10,
            Tier::C => 0.12,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::A => "A",
            Tier::B => "B",
            Tier::C => "C",
        };
        f.write_str(s)
    }
}

/// Points awarded per rubric rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleScores {
    pub eps_growth: f64,
    pub dividend_growth: f64,
    pub roe: f64,
    pub net_margin: f64,
    pub interest_coverage: f64,
    pub free_cash_flow: f64,
}

impl RuleScores {
    pub fn total(&self) -> f64 {
        self.eps_growth
            + self.dividend_growth
            + self.roe
            + self.net_margin
            + self.interest_coverage
            + self.free_cash_flow
    }
}

/// Score and valuation summary for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub symbol: String,
    pub scores: RuleScores,
    pub total: f64,
    pub tier: Tier,
    pub discount_rate: f64,
    pub eps_avg_growth: f64,
    pub latest_dividend: f64,
    pub expected_dividend: f64,
    pub fair_price: Option<f64>,
    pub current_price: Option<f64>,
    pub below_fair: Option<bool>,
}

/// Per-year factor values behind a score card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorYear {
    pub year: i32,
    pub eps: Option<f64>,
    pub dividend: Option<f64>,
    pub roe: Option<f64>,
    pub net_margin: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub interest_coverage: Option<f64>,
}

pub const DEFAULT_SYMBOLS: [&str; 12] = [
    "AMGN", "AAPL", "T", "XOM", "CVX", "MO", "KO", "VICI", "PEP", "JNJ", "PFE", "VZ",
];

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: String,
    pub output_dir: String,
    pub horizon: usize,
    pub price_quarters: Option<usize>,
    pub score_window_years: usize,
    pub target_dividend_yield: f64,
    pub symbols: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            output_dir: "output".to_string(),
            horizon: 1,
            price_quarters: Some(8),
            score_window_years: 5,
            target_dividend_yield: 0.05,
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let defaults = Config::default();
        let price_quarters = match std::env::var("PRICE_QUARTERS") {
            Ok(v) => match v.trim().parse::<usize>() {
                Ok(0) => None,
                Ok(n) => Some(n),
                Err(_) => return Err(anyhow::anyhow!("PRICE_QUARTERS must be a non-negative integer, got: {}", v)),
            },
            Err(_) => defaults.price_quarters,
        };

        let config = Config {
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(defaults.output_dir),
            horizon: parse_env("TARGET_HORIZON_Q", defaults.horizon)?,
            price_quarters,
            score_window_years: parse_env("SCORE_WINDOW_YEARS", defaults.score_window_years)?,
            target_dividend_yield: parse_env("TARGET_DIVIDEND_YIELD", defaults.target_dividend_yield)?,
            symbols: std::env::var("SYMBOLS")
                .map(|v| crate::utils::parse_symbol_list(&v))
                .unwrap_or(defaults.symbols),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.horizon == 0 {
            return Err(anyhow::anyhow!("Target horizon must be at least one quarter"));
        }
        if self.score_window_years < 2 {
            return Err(anyhow::anyhow!("Score window must cover at least two years, got: {}", self.score_window_years));
        }
        if self.target_dividend_yield <= 0.0 {
            return Err(anyhow::anyhow!("Target dividend yield must be positive, got: {}", self.target_dividend_yield));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, v)),
        Err(_) => Ok(default),
    }
}
