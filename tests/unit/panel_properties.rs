//! Quarterly panel construction tests

use test_log::test;
use pretty_assertions::assert_eq;
use stock_fundamentals::models::{DividendSeries, FieldId, PriceSeries, StatementSet};
use stock_fundamentals::panel::{build, PanelBuilder};

use crate::common::test_data::{assert_close, date, dividend_series, points, price_series};

fn sample_statements() -> StatementSet {
    StatementSet::new()
        .with(
            FieldId::Eps,
            &points(&[("2022-02-14", 1.0), ("2022-05-10", 1.1), ("2022-08-09", 1.3)]),
        )
        .with(
            FieldId::Revenue,
            &points(&[("2022-03-31", 100.0), ("2022-06-30", 0.0), ("2022-09-30", 120.0)]),
        )
        .with(
            FieldId::NetIncome,
            &points(&[("2022-03-31", 10.0), ("2022-06-30", 5.0), ("2022-09-30", 12.0)]),
        )
}

fn sample_prices() -> PriceSeries {
    price_series(&[
        ("2022-01-03", 90.0),
        ("2022-03-30", 100.0),
        ("2022-06-29", 110.0),
        ("2022-09-29", 99.0),
        ("2022-12-30", 120.0),
    ])
}

#[test]
fn test_one_row_per_quarter_in_ascending_order() {
    let table = build("TEST", &sample_statements(), &sample_prices(), &DividendSeries::new(), 1).unwrap();

    assert_eq!(
        table.quarter_ends(),
        vec![date("2022-03-31"), date("2022-06-30"), date("2022-09-30"), date("2022-12-31")]
    );
    assert!(table.rows.windows(2).all(|w| w[0].quarter_end < w[1].quarter_end));
}

#[test]
fn test_statement_dates_snap_to_quarter_end() {
    let table = build("TEST", &sample_statements(), &sample_prices(), &DividendSeries::new(), 1).unwrap();

    assert_eq!(table.row(date("2022-03-31")).unwrap().eps, Some(1.0));
    assert_eq!(table.row(date("2022-06-30")).unwrap().eps, Some(1.1));
    assert_eq!(table.row(date("2022-12-31")).unwrap().eps, None);
}

#[test]
fn test_price_is_last_close_of_quarter() {
    let table = build("TEST", &sample_statements(), &sample_prices(), &DividendSeries::new(), 1).unwrap();

    assert_eq!(table.row(date("2022-03-31")).unwrap().price, Some(100.0));
    assert_eq!(table.row(date("2022-12-31")).unwrap().price, Some(120.0));
}

#[test]
fn test_net_margin_missing_for_zero_revenue() {
    let table = build("TEST", &sample_statements(), &sample_prices(), &DividendSeries::new(), 1).unwrap();

    assert_close(table.row(date("2022-03-31")).unwrap().net_margin.unwrap(), 0.1);
    assert_eq!(table.row(date("2022-06-30")).unwrap().net_margin, None);
    // Change against a zero base is missing as well
    assert_eq!(table.row(date("2022-09-30")).unwrap().revenue_pct, None);
    assert_eq!(table.row(date("2022-09-30")).unwrap().revenue_diff, Some(120.0));
}

#[test]
fn test_last_horizon_rows_have_no_label() {
    for horizon in 1..=3 {
        let table = build("TEST", &sample_statements(), &sample_prices(), &DividendSeries::new(), horizon).unwrap();
        let n = table.len();

        for (i, row) in table.rows.iter().enumerate() {
            if i + horizon >= n {
                assert_eq!(row.next_price, None, "row {} horizon {}", i, horizon);
                assert_eq!(row.target_up, None, "row {} horizon {}", i, horizon);
            } else {
                assert!(row.target_up.is_some(), "row {} horizon {}", i, horizon);
            }
        }
    }
}

#[test]
fn test_label_matches_sign_of_forward_return() {
    let table = build("TEST", &sample_statements(), &sample_prices(), &DividendSeries::new(), 2).unwrap();

    // 100 -> 99 two quarters later
    let march = table.row(date("2022-03-31")).unwrap();
    assert_eq!(march.next_price, Some(99.0));
    assert_close(march.next_return.unwrap(), -0.01);
    assert_eq!(march.target_up, Some(0));

    // 110 -> 120
    let june = table.row(date("2022-06-30")).unwrap();
    assert_eq!(june.target_up, Some(1));
}

#[test]
fn test_dividends_summed_per_quarter() {
    let dividends = dividend_series(&[("2022-02-01", 0.3), ("2022-03-15", 0.3), ("2022-08-01", 0.25)]);
    let table = build("TEST", &sample_statements(), &sample_prices(), &dividends, 1).unwrap();

    assert_close(table.row(date("2022-03-31")).unwrap().dividend, 0.6);
    assert_eq!(table.row(date("2022-06-30")).unwrap().dividend, 0.0);
    assert_close(table.row(date("2022-09-30")).unwrap().dividend, 0.25);
}

#[test]
fn test_dividend_in_unknown_quarter_adds_no_row() {
    let without = build("TEST", &sample_statements(), &sample_prices(), &DividendSeries::new(), 1).unwrap();
    // 2023 Q1 has neither statements nor prices
    let dividends = dividend_series(&[("2022-03-15", 0.3), ("2023-02-10", 0.4)]);
    let with = build("TEST", &sample_statements(), &sample_prices(), &dividends, 1).unwrap();

    assert_eq!(with.len(), without.len());
    assert_eq!(with.quarter_ends(), without.quarter_ends());
    assert!(with.row(date("2023-03-31")).is_none());
    assert_close(with.row(date("2022-03-31")).unwrap().dividend, 0.3);
}

#[test]
fn test_price_quarters_limit_only_trims_prices() {
    let builder = PanelBuilder::new(1).with_price_quarters(Some(2));
    let table = builder
        .build("TEST", &sample_statements(), &sample_prices(), &DividendSeries::new())
        .unwrap();

    // Statement quarters stay, only the two latest quarters keep a price
    assert_eq!(table.len(), 4);
    assert_eq!(table.row(date("2022-03-31")).unwrap().price, None);
    assert_eq!(table.row(date("2022-09-30")).unwrap().price, Some(99.0));
    assert_eq!(table.row(date("2022-12-31")).unwrap().price, Some(120.0));
}
