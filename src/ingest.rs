//! Line-item label resolution.
//!
//! Providers spell the same line item several ways ("Diluted EPS", "Basic EPS",
//! ...). Every spelling is mapped onto a [`FieldId`] here, once, so the panel
//! and scoring code only ever see canonical fields.

use tracing::debug;

use crate::models::{FieldId, FinancialStatements, StatementSet, StatementSheet};

/// Which statement a field is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    Income,
    Balance,
    Cashflow,
}

/// Statement and accepted labels for a field, in priority order
pub fn aliases(field: FieldId) -> (Statement, &'static [&'static str]) {
    match field {
        FieldId::Eps => (Statement::Income, &["Diluted EPS", "Basic EPS", "Earnings Per Share"]),
        FieldId::Revenue => (Statement::Income, &["Total Revenue", "Revenue"]),
        FieldId::NetIncome => (Statement::Income, &["Net Income", "NetIncome", "NetIncomeLoss"]),
        FieldId::Ebit => (Statement::Income, &["EBIT", "Ebit", "Operating Income"]),
        FieldId::InterestExpense => (Statement::Income, &["Interest Expense", "InterestExpense"]),
        FieldId::Equity => (
            Statement::Balance,
            &["Stockholders Equity", "Total Stockholder Equity", "Total Equity"],
        ),
        FieldId::OperatingCashflow => (
            Statement::Cashflow,
            &[
                "Cash Flow From Continuing Operating Activities",
                "Net Cash Provided by Operating Activities",
                "Operating Cash Flow",
            ],
        ),
        FieldId::Capex => (Statement::Cashflow, &["Capital Expenditure", "Capital Expenditures"]),
    }
}

/// First label of `labels` present in the sheet with at least one value
pub fn resolve_row<'a>(sheet: &'a StatementSheet, labels: &[&str]) -> Option<(&'a str, &'a crate::models::StatementSeries)> {
    labels.iter().find_map(|label| {
        sheet
            .rows
            .get_key_value(*label)
            .filter(|(_, series)| !series.is_empty())
            .map(|(k, v)| (k.as_str(), v))
    })
}

/// Map raw provider sheets onto canonical fields. Fields with no matching
/// label are left out of the set.
pub fn resolve(statements: &FinancialStatements) -> StatementSet {
    let mut set = StatementSet::new();
    for field in FieldId::ALL {
        let (statement, labels) = aliases(field);
        let sheet = match statement {
            Statement::Income => &statements.income,
            Statement::Balance => &statements.balance,
            Statement::Cashflow => &statements.cashflow,
        };
        match resolve_row(sheet, labels) {
            Some((label, series)) => {
                debug!("Resolved {} from '{}' ({} points)", field, label, series.len());
                set.insert(field, series.clone());
            }
            None => debug!("No label found for {}", field),
        }
    }
    set
}
