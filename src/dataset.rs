//! Training set preparation from persisted panels.
//!
//! Panels of every symbol are stacked chronologically, unlabelled rows are
//! dropped, gaps are filled with column medians and the result is split
//! by time so the test block always follows the training block.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::ReportError;
use crate::models::QuarterlyRow;
use crate::report::{panel_symbol, read_panel};

/// One labelled observation
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub symbol: String,
    pub quarter_end: NaiveDate,
    pub features: Vec<f64>,
    pub label: u8,
}

/// Chronologically split, fully imputed training data
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub columns: Vec<&'static str>,
    pub train: Vec<Sample>,
    pub test: Vec<Sample>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.train.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Share of positive labels in the training block
    pub fn train_positive_rate(&self) -> Option<f64> {
        if self.train.is_empty() {
            return None;
        }
        let ups = self.train.iter().filter(|s| s.label == 1).count();
        Some(ups as f64 / self.train.len() as f64)
    }
}

/// Every `quarterly_panel_*.csv` in `dir`, tagged with its symbol, sorted by file name
pub fn load_panels(dir: &Path) -> Result<Vec<(String, Vec<QuarterlyRow>)>, ReportError> {
    let entries = fs::read_dir(dir).map_err(|e| ReportError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ReportError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if let Some(symbol) = panel_symbol(&path) {
            paths.push((symbol, path));
        }
    }
    paths.sort();

    let mut panels = Vec::with_capacity(paths.len());
    for (symbol, path) in paths {
        let rows = read_panel(&path)?;
        info!("📂 Loaded {} rows for {} from {}", rows.len(), symbol, path.display());
        panels.push((symbol, rows));
    }
    if panels.is_empty() {
        warn!("No panel files found in {}", dir.display());
    }
    Ok(panels)
}

/// Median of the present values; `None` when there are none
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Stack panels, drop unlabelled rows, impute medians and split chronologically.
///
/// `train_fraction` is clamped to `[0, 1]`; the split index is
/// `floor(rows * train_fraction)`.
pub fn prepare(panels: &[(String, Vec<QuarterlyRow>)], train_fraction: f64) -> TrainingSet {
    let mut rows: Vec<(&str, &QuarterlyRow)> = panels
        .iter()
        .flat_map(|(symbol, rows)| rows.iter().map(move |r| (symbol.as_str(), r)))
        .collect();
    // Stable sort keeps symbol order within a quarter
    rows.sort_by_key(|(_, r)| r.quarter_end);

    let dropped = rows.iter().filter(|(_, r)| r.target_up.is_none()).count();
    rows.retain(|(_, r)| r.target_up.is_some());
    if dropped > 0 {
        info!("Dropped {} rows without a forward label", dropped);
    }

    let columns: Vec<&'static str> = QuarterlyRow::FEATURE_NAMES.to_vec();
    let raw: Vec<[Option<f64>; 20]> = rows.iter().map(|(_, r)| r.features()).collect();

    let medians: Vec<f64> = (0..columns.len())
        .map(|c| {
            let present: Vec<f64> = raw.iter().filter_map(|f| f[c]).collect();
            median(&present).unwrap_or(0.0)
        })
        .collect();

    let samples: Vec<Sample> = rows
        .iter()
        .zip(raw.iter())
        .filter_map(|((symbol, row), features)| {
            Some(Sample {
                symbol: symbol.to_string(),
                quarter_end: row.quarter_end,
                features: features
                    .iter()
                    .zip(medians.iter())
                    .map(|(v, m)| v.unwrap_or(*m))
                    .collect(),
                label: row.target_up?,
            })
        })
        .collect();

    let fraction = train_fraction.clamp(0.0, 1.0);
    let split = (samples.len() as f64 * fraction).floor() as usize;
    let mut train = samples;
    let test = train.split_off(split);

    info!("🧪 Training set: {} train / {} test rows, {} features", train.len(), test.len(), columns.len());
    TrainingSet { columns, train, test }
}
