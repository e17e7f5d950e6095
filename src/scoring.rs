//! Annual quality rubric and dividend-discount fair value.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ScoringError;
use crate::models::{DividendSeries, FactorYear, FieldId, RuleScores, ScoreCard, StatementSet, Tier};
use crate::utils::{aggregate_annual_sum, pct_change, safe_div};

/// Growth used for the dividend projection is capped at this rate
pub const MAX_EPS_GROWTH: f64 = 0.15;

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub window_years: usize,
    pub target_dividend_yield: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            window_years: 5,
            target_dividend_yield: 0.05,
        }
    }
}

/// Score card plus the per-year factors it was computed from
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub card: ScoreCard,
    pub factors: Vec<FactorYear>,
}

/// Symbols bucketed by tier
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TierGroups {
    pub a: Vec<String>,
    pub b: Vec<String>,
    pub c: Vec<String>,
    pub below_fair: Vec<String>,
}

fn by_year(statements: &StatementSet, field: FieldId) -> BTreeMap<i32, f64> {
    statements
        .get(field)
        .map(|series| series.iter().map(|(date, v)| (date.year(), *v)).collect())
        .unwrap_or_default()
}

/// True when there are at least two values and each exceeds the previous
fn strictly_increasing(values: &[f64]) -> bool {
    values.len() >= 2 && values.windows(2).all(|w| w[1] > w[0])
}

/// Condition must hold for every year; a missing year fails the rule
fn every_year(values: &[Option<f64>], pred: impl Fn(f64) -> bool) -> bool {
    !values.is_empty() && values.iter().all(|v| v.map_or(false, &pred))
}

fn tiered(values: &[Option<f64>], full: f64, half: f64) -> f64 {
    if every_year(values, |v| v > full) {
        1.0
    } else if every_year(values, |v| v > half) {
        0.5
    } else {
        0.0
    }
}

/// Mean year-over-year EPS growth, floored at 0 and capped at [`MAX_EPS_GROWTH`]
pub fn eps_average_growth(eps: &[f64]) -> f64 {
    let rates: Vec<f64> = eps
        .windows(2)
        .filter_map(|w| pct_change(Some(w[0]), Some(w[1])))
        .collect();
    if rates.is_empty() {
        return 0.0;
    }
    let mean = rates.iter().sum::<f64>() / rates.len() as f64;
    if mean < 0.0 {
        0.0
    } else {
        mean.min(MAX_EPS_GROWTH)
    }
}

/// Score a company from annual statements and its dividend history
pub fn score(
    symbol: &str,
    annual: &StatementSet,
    dividends: &DividendSeries,
    current_price: Option<f64>,
    config: &ScoringConfig,
) -> Result<ScoreResult, ScoringError> {
    let eps_by_year = by_year(annual, FieldId::Eps);
    if eps_by_year.len() < 2 {
        return Err(ScoringError::InsufficientEps {
            symbol: symbol.to_string(),
            years: eps_by_year.len(),
        });
    }

    // Most recent window, oldest first
    let skip = eps_by_year.len().saturating_sub(config.window_years);
    let years: Vec<i32> = eps_by_year.keys().skip(skip).copied().collect();
    debug!("{}: scoring years {:?}", symbol, years);

    let net_income = by_year(annual, FieldId::NetIncome);
    let equity = by_year(annual, FieldId::Equity);
    let revenue = by_year(annual, FieldId::Revenue);
    let ebit = by_year(annual, FieldId::Ebit);
    let interest = by_year(annual, FieldId::InterestExpense);
    let op_cf = by_year(annual, FieldId::OperatingCashflow);
    let capex = by_year(annual, FieldId::Capex);
    let annual_dividends = aggregate_annual_sum(dividends);

    let factors: Vec<FactorYear> = years
        .iter()
        .map(|&year| {
            let ni = net_income.get(&year).copied();
            FactorYear {
                year,
                eps: eps_by_year.get(&year).copied(),
                dividend: annual_dividends.get(&year).copied(),
                roe: safe_div(ni, equity.get(&year).copied()),
                net_margin: safe_div(ni, revenue.get(&year).copied()),
                free_cash_flow: match (op_cf.get(&year), capex.get(&year)) {
                    (Some(ocf), Some(cx)) => Some(ocf + cx),
                    _ => None,
                },
                interest_coverage: safe_div(ebit.get(&year).copied(), interest.get(&year).map(|i| i.abs())),
            }
        })
        .collect();

    let eps: Vec<f64> = factors.iter().filter_map(|f| f.eps).collect();
    // Years without a payment are skipped, not treated as a cut
    let dividend_years: Vec<f64> = factors.iter().filter_map(|f| f.dividend).collect();
    let roe: Vec<Option<f64>> = factors.iter().map(|f| f.roe).collect();
    let margins: Vec<Option<f64>> = factors.iter().map(|f| f.net_margin).collect();
    let fcf: Vec<Option<f64>> = factors.iter().map(|f| f.free_cash_flow).collect();
    // Years without (or with zero) interest expense are skipped
    let coverage: Vec<Option<f64>> = factors
        .iter()
        .filter_map(|f| f.interest_coverage)
        .map(Some)
        .collect();

    let scores = RuleScores {
        eps_growth: if strictly_increasing(&eps) { 1.0 } else { 0.0 },
        dividend_growth: if strictly_increasing(&dividend_years) { 1.0 } else { 0.0 },
        roe: if every_year(&roe, |v| v > 0.2) { 1.0 } else { 0.0 },
        net_margin: tiered(&margins, 0.2, 0.1),
        interest_coverage: tiered(&coverage, 10.0, 4.0),
        free_cash_flow: if every_year(&fcf, |v| v > 0.0) { 1.0 } else { 0.0 },
    };

    let total = scores.total();
    let tier = Tier::from_score(total);
    let discount_rate = tier.discount_rate();

    let eps_avg_growth = eps_average_growth(&eps);
    let latest_dividend = dividend_years.last().copied().unwrap_or(0.0);
    let expected_dividend = latest_dividend * (1.0 + eps_avg_growth);
    let fair_price = if expected_dividend > 0.0 && config.target_dividend_yield > 0.0 {
        Some(expected_dividend / config.target_dividend_yield * (1.0 - discount_rate))
    } else {
        None
    };
    let below_fair = match (current_price, fair_price) {
        (Some(current), Some(fair)) => Some(current < fair),
        _ => None,
    };

    info!(
        "🧮 {}: score {:.1} (tier {}), fair price {}",
        symbol,
        total,
        tier,
        fair_price.map_or("n/a".to_string(), |p| format!("{:.2}", p))
    );

    Ok(ScoreResult {
        card: ScoreCard {
            symbol: symbol.to_string(),
            scores,
            total,
            tier,
            discount_rate,
            eps_avg_growth,
            latest_dividend,
            expected_dividend,
            fair_price,
            current_price,
            below_fair,
        },
        factors,
    })
}

/// Group score cards into tier lists and the below-fair-price list
pub fn group_by_tier(cards: &[ScoreCard]) -> TierGroups {
    let mut groups = TierGroups::default();
    for card in cards {
        let bucket = match card.tier {
            Tier::A => &mut groups.a,
            Tier::B => &mut groups.b,
            Tier::C => &mut groups.c,
        };
        bucket.push(card.symbol.clone());
        if card.below_fair == Some(true) {
            groups.below_fair.push(card.symbol.clone());
        }
    }
    groups
}
