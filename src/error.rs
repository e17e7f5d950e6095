use thiserror::Error;

/// Failures raised while building a quarterly panel
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("{symbol}: no usable quarterly data")]
    NoQuarterlyData { symbol: String },

    #[error("horizon must be at least one quarter, got {0}")]
    InvalidHorizon(usize),
}

/// Failures raised by a data provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{symbol}: failed to read {path}: {source}")]
    Io {
        symbol: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{symbol}: malformed data in {path}: {message}")]
    Malformed {
        symbol: String,
        path: String,
        message: String,
    },

    #[error("{symbol}: CSV error in {path}: {source}")]
    Csv {
        symbol: String,
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Failures raised by the scoring rubric
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("{symbol}: not enough annual EPS history to score ({years} year(s))")]
    InsufficientEps { symbol: String, years: usize },
}

/// Failures raised while reading or writing report files
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Anything that makes the batch skip a symbol
#[derive(Debug, Error)]
pub enum SymbolError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Panel(#[from] PanelError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Report(#[from] ReportError),
}
