//! Domain error types.

/// Top-level error type for altdip.
#[derive(Debug, thiserror::Error)]
pub enum AltdipError {
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

    #[error("market data error: {reason}")]
    MarketData { reason: String },

    #[error("venue error on {symbol}: {reason}")]
    Venue { symbol: String, reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("persisted state is corrupt: {reason}")]
    StateCorrupt { reason: String },

    #[error("no data: {reason}")]
    NoData { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AltdipError {
    /// Provider and venue failures are retried by the polling loop on the
    /// next tick; everything else stops it.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AltdipError::MarketData { .. } | AltdipError::Venue { .. }
        )
    }

    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        AltdipError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn venue(symbol: &str, reason: impl Into<String>) -> Self {
        AltdipError::Venue {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&AltdipError> for std::process::ExitCode {
    fn from(err: &AltdipError) -> Self {
        let code: u8 = match err {
            AltdipError::Io(_) => 1,
            AltdipError::ConfigParse { .. }
            | AltdipError::ConfigMissing { .. }
            | AltdipError::ConfigInvalid { .. } => 2,
            AltdipError::Database { .. }
            | AltdipError::DatabaseQuery { .. }
            | AltdipError::StateCorrupt { .. }
            | AltdipError::Json(_) => 3,
            AltdipError::MarketData { .. } | AltdipError::Venue { .. } => 4,
            AltdipError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
