//! Domain error types.

/// Top-level error type for levtrader.
#[derive(Debug, thiserror::Error)]
pub enum LevtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("parameter grid is empty: {reason}")]
    EmptyGrid { reason: String },

    #[error("failed to fetch {symbol}: {reason}")]
    DataFetch { symbol: String, reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {rows} rows, need {minimum}")]
    InsufficientData {
        symbol: String,
        rows: usize,
        minimum: usize,
    },

    #[error("malformed series {symbol} at row {row}: {reason}")]
    MalformedSeries {
        symbol: String,
        row: usize,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LevtraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        LevtraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        LevtraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&LevtraderError> for std::process::ExitCode {
    fn from(err: &LevtraderError) -> Self {
        let code: u8 = match err {
            LevtraderError::Io(_) => 1,
            LevtraderError::ConfigParse { .. }
            | LevtraderError::ConfigMissing { .. }
            | LevtraderError::ConfigInvalid { .. } => 2,
            LevtraderError::EmptyGrid { .. } => 3,
            LevtraderError::DataFetch { .. }
            | LevtraderError::NoData { .. }
            | LevtraderError::InsufficientData { .. }
            | LevtraderError::MalformedSeries { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
