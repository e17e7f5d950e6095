//! Rubric scoring and fair price tests

use test_log::test;
use pretty_assertions::assert_eq;
use stock_fundamentals::models::{DividendSeries, FieldId, StatementSet, Tier};
use stock_fundamentals::scoring::{eps_average_growth, group_by_tier, score, ScoringConfig};

use crate::common::test_data::{assert_close, dividend_series, yearly};

fn strong_company() -> StatementSet {
    let years = [2019, 2020, 2021, 2022, 2023];
    let flat = |v: f64| -> Vec<(i32, f64)> { years.iter().map(|y| (*y, v)).collect() };
    StatementSet::new()
        .with(
            FieldId::Eps,
            &yearly(&[(2019, 2.0), (2020, 2.2), (2021, 2.4), (2022, 2.6), (2023, 2.8)]),
        )
        .with(FieldId::NetIncome, &yearly(&flat(25.0)))
        .with(FieldId::Equity, &yearly(&flat(100.0)))
        .with(FieldId::Revenue, &yearly(&flat(100.0)))
        .with(FieldId::Ebit, &yearly(&flat(60.0)))
        .with(FieldId::InterestExpense, &yearly(&flat(-5.0)))
        .with(FieldId::OperatingCashflow, &yearly(&flat(30.0)))
        .with(FieldId::Capex, &yearly(&flat(-10.0)))
}

fn rising_dividends() -> DividendSeries {
    dividend_series(&[
        ("2019-03-01", 0.5),
        ("2019-09-01", 0.5),
        ("2020-03-01", 1.1),
        ("2021-03-01", 1.2),
        ("2022-03-01", 1.3),
        ("2023-03-01", 0.7),
        ("2023-09-01", 0.7),
    ])
}

#[test]
fn test_strong_company_scores_every_rule() {
    let result = score("GOOD", &strong_company(), &rising_dividends(), Some(20.0), &ScoringConfig::default()).unwrap();
    let card = &result.card;

    assert_eq!(card.scores.eps_growth, 1.0);
    assert_eq!(card.scores.dividend_growth, 1.0);
    assert_eq!(card.scores.roe, 1.0);
    assert_eq!(card.scores.net_margin, 1.0);
    assert_eq!(card.scores.interest_coverage, 1.0);
    assert_eq!(card.scores.free_cash_flow, 1.0);
    assert_eq!(card.total, 6.0);
    assert_eq!(card.tier, Tier::A);
    assert_eq!(card.discount_rate, 0.08);
    assert_eq!(result.factors.len(), 5);
}

#[test]
fn test_fair_price_formula() {
    let config = ScoringConfig::default();
    let result = score("GOOD", &strong_company(), &rising_dividends(), Some(20.0), &config).unwrap();
    let card = &result.card;

    let growth = eps_average_growth(&[2.0, 2.2, 2.4, 2.6, 2.8]);
    assert_close(card.eps_avg_growth, growth);
    assert_close(card.latest_dividend, 1.4);
    assert_close(card.expected_dividend, 1.4 * (1.0 + growth));

    let fair = card.fair_price.unwrap();
    assert_close(fair, 1.4 * (1.0 + growth) / config.target_dividend_yield * (1.0 - 0.08));
    assert_eq!(card.below_fair, Some(20.0 < fair));
}

#[test]
fn test_half_points_and_tier_b() {
    // Margin and coverage land in the half-point bands, ROE fails
    let years = [2021, 2022, 2023];
    let flat = |v: f64| -> Vec<(i32, f64)> { years.iter().map(|y| (*y, v)).collect() };
    let statements = StatementSet::new()
        .with(FieldId::Eps, &yearly(&[(2021, 1.0), (2022, 1.1), (2023, 1.2)]))
        .with(FieldId::NetIncome, &yearly(&flat(15.0)))
        .with(FieldId::Equity, &yearly(&flat(100.0)))
        .with(FieldId::Revenue, &yearly(&flat(100.0)))
        .with(FieldId::Ebit, &yearly(&flat(50.0)))
        .with(FieldId::InterestExpense, &yearly(&flat(10.0)))
        .with(FieldId::OperatingCashflow, &yearly(&flat(20.0)))
        .with(FieldId::Capex, &yearly(&flat(-5.0)));

    let result = score("MID", &statements, &DividendSeries::new(), None, &ScoringConfig::default()).unwrap();
    let card = &result.card;

    assert_eq!(card.scores.roe, 0.0);
    assert_eq!(card.scores.net_margin, 0.5);
    assert_eq!(card.scores.interest_coverage, 0.5);
    assert_eq!(card.scores.dividend_growth, 0.0);
    assert_eq!(card.total, 3.0);
    assert_eq!(card.tier, Tier::B);
    // No dividends, no valuation
    assert_eq!(card.fair_price, None);
    assert_eq!(card.below_fair, None);
}

#[test]
fn test_window_keeps_most_recent_years() {
    // Older dip falls outside a three year window
    let statements = StatementSet::new().with(
        FieldId::Eps,
        &yearly(&[(2019, 3.0), (2020, 1.0), (2021, 1.5), (2022, 2.0), (2023, 2.5)]),
    );
    let config = ScoringConfig {
        window_years: 3,
        ..ScoringConfig::default()
    };

    let result = score("WIN", &statements, &DividendSeries::new(), None, &config).unwrap();
    let years: Vec<i32> = result.factors.iter().map(|f| f.year).collect();
    assert_eq!(years, vec![2021, 2022, 2023]);
    assert_eq!(result.card.scores.eps_growth, 1.0);
    assert_eq!(result.card.tier, Tier::C);
}

#[test]
fn test_tier_grouping() {
    let good = score("GOOD", &strong_company(), &rising_dividends(), Some(1.0), &ScoringConfig::default())
        .unwrap()
        .card;
    let weak = score(
        "WEAK",
        &StatementSet::new().with(FieldId::Eps, &yearly(&[(2022, 2.0), (2023, 1.0)])),
        &DividendSeries::new(),
        Some(10.0),
        &ScoringConfig::default(),
    )
    .unwrap()
    .card;

    let groups = group_by_tier(&[good, weak]);
    assert_eq!(groups.a, vec!["GOOD".to_string()]);
    assert!(groups.b.is_empty());
    assert_eq!(groups.c, vec!["WEAK".to_string()]);
    assert_eq!(groups.below_fair, vec!["GOOD".to_string()]);
}
