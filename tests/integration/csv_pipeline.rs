//! End-to-end tests over CSV exports on disk: provider, panels, reports and dataset prep

use std::fs;

use test_log::test;
use pretty_assertions::assert_eq;
use stock_fundamentals::api::{CsvDirectoryProvider, DataProvider};
use stock_fundamentals::batch::{build_panels, score_symbols};
use stock_fundamentals::dataset::{load_panels, prepare};
use stock_fundamentals::models::{Period, Tier};
use stock_fundamentals::panel::PanelBuilder;
use stock_fundamentals::report::{panel_path, read_panel, write_score_raw, write_score_summary};
use stock_fundamentals::scoring::ScoringConfig;

use crate::common::fixtures::DataDir;
use crate::common::logging::{init_test_logging, log_test_data, log_test_step};
use crate::common::test_data::{assert_close, date};

#[test]
fn test_provider_reads_wide_statement_sheets() {
    let data = DataDir::new().with_quarterly_company("KO");
    let provider = CsvDirectoryProvider::new(data.path());

    let statements = provider.statements("ko", Period::Quarterly).unwrap();
    let eps = statements.income.rows.get("Diluted EPS").unwrap();
    assert_eq!(eps.len(), 3);
    assert_eq!(eps.get(&date("2023-06-30")), Some(&1.2));

    // Empty cell is a missing value, not a zero
    let interest = statements.income.rows.get("Interest Expense").unwrap();
    assert_eq!(interest.len(), 2);

    // No annual exports for this symbol
    let annual = provider.statements("KO", Period::Annual).unwrap();
    assert!(annual.income.is_empty());
}

#[test]
fn test_panels_written_and_read_back() {
    init_test_logging();
    log_test_step("Building panels from CSV exports");

    let data = DataDir::new().with_quarterly_company("KO");
    let out = tempfile::tempdir().unwrap();
    let provider = CsvDirectoryProvider::new(data.path());
    let symbols = vec!["ko".to_string(), "MISSING".to_string()];

    let outcome = build_panels(&provider, &symbols, &PanelBuilder::new(1), Some(out.path()));
    assert_eq!(outcome.succeeded.len(), 1);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, "MISSING");

    let table = &outcome.succeeded[0];
    log_test_data("KO panel", table);
    assert_eq!(table.symbol, "KO");
    assert_eq!(table.len(), 3);

    let q1 = table.row(date("2023-03-31")).unwrap();
    assert_eq!(q1.price, Some(32.0));
    assert_close(q1.dividend, 0.6);
    assert_close(q1.net_margin.unwrap(), 0.1);
    assert_close(q1.roe.unwrap(), 0.2);
    assert_close(q1.interest_coverage.unwrap(), 10.0);
    assert_close(q1.free_cash_flow.unwrap(), 10.0);
    assert_close(q1.next_return.unwrap(), 0.125);
    assert_eq!(q1.target_up, Some(1));

    let q3 = table.row(date("2023-09-30")).unwrap();
    assert_eq!(q3.interest_coverage, None);
    assert_eq!(q3.target_up, None);

    let path = panel_path(out.path(), "KO");
    assert!(path.exists());
    assert!(!panel_path(out.path(), "MISSING").exists());

    let rows = read_panel(&path).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].quarter_end, date("2023-03-31"));
    assert_eq!(rows[0].price, Some(32.0));
    assert_eq!(rows[1].dividend, 0.0);
    assert_eq!(rows[1].target_up, Some(0));
    assert_eq!(rows[2].next_return, None);
    assert_eq!(rows[2].target_up, None);
}

#[test]
fn test_dataset_from_saved_panels() {
    let data = DataDir::new()
        .with_quarterly_company("KO")
        .with_quarterly_company("PEP");
    let out = tempfile::tempdir().unwrap();
    let provider = CsvDirectoryProvider::new(data.path());
    let symbols = vec!["KO".to_string(), "PEP".to_string()];
    build_panels(&provider, &symbols, &PanelBuilder::new(1), Some(out.path()));

    // Unrelated files in the directory are ignored
    fs::write(out.path().join("notes.txt"), "ignore me").unwrap();

    let panels = load_panels(out.path()).unwrap();
    assert_eq!(panels.len(), 2);
    assert_eq!(panels[0].0, "KO");

    let set = prepare(&panels, 0.5);
    assert_eq!(set.len(), 4);
    assert_eq!(set.train.len(), 2);
    assert_eq!(set.test.len(), 2);
    assert!(set.train.iter().all(|s| s.quarter_end == date("2023-03-31")));
    assert!(set.test.iter().all(|s| s.quarter_end == date("2023-06-30")));
    assert_eq!(set.train_positive_rate(), Some(1.0));
    assert!(set.train.iter().chain(set.test.iter()).all(|s| s.features.len() == set.columns.len()));
}

#[test]
fn test_scoring_from_annual_exports() {
    log_test_step("Scoring from annual CSV exports");

    let data = DataDir::new().with_annual_company("JNJ");
    let out = tempfile::tempdir().unwrap();
    let provider = CsvDirectoryProvider::new(data.path());

    let outcome = score_symbols(&provider, &["JNJ".to_string()], &ScoringConfig::default());
    assert!(outcome.failed.is_empty());

    let result = &outcome.succeeded[0];
    assert_eq!(result.card.total, 6.0);
    assert_eq!(result.card.tier, Tier::A);
    assert_eq!(result.card.current_price, Some(10.0));
    assert_eq!(result.card.below_fair, Some(true));

    let cards = vec![result.card.clone()];
    let summary = out.path().join("score_summary_JNJ.csv");
    let raw = out.path().join("score_raw_JNJ.csv");
    write_score_summary(&cards, &summary).unwrap();
    write_score_raw(&outcome.succeeded, &raw).unwrap();

    let text = fs::read_to_string(&summary).unwrap();
    let line = text.lines().nth(1).unwrap();
    assert!(line.starts_with("JNJ,1.00,1.00,1.00,1.00,1.00,1.00,6.00,A,8%,"));
    assert!(line.ends_with(",10.00,Y"));

    let raw_text = fs::read_to_string(&raw).unwrap();
    assert_eq!(raw_text.lines().count(), 6);
}
