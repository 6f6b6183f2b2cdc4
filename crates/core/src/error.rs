//! Error types for the stress index system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the stress index system.
#[derive(Error, Debug)]
pub enum Error {
    /// No indicator is configured to take part in the composite.
    #[error("No indicators configured")]
    NoIndicatorsConfigured,

    /// Active indicators exist but none of them has observations.
    #[error("No indicator data found")]
    NoIndicatorData,

    /// Fewer mutually aligned months than the scoring window needs.
    #[error("Insufficient aligned data: {aligned_months} aligned months, {required} required")]
    InsufficientAlignedData {
        aligned_months: usize,
        required: usize,
    },

    /// The included indicators carry a total weight of zero.
    #[error("Degenerate weights: {indicator_count} indicators with zero total weight")]
    DegenerateWeights { indicator_count: usize },

    /// A market symbol has no price rows.
    #[error("No price data for {symbol}")]
    NoPriceData { symbol: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (invalid or malformed data).
    #[error("Data error: {0}")]
    Data(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A series id with no stored observations.
    #[error("Series not found: {series_id}")]
    SeriesNotFound { series_id: String },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Error::Database(msg.into())
    }

    /// Whether the failure means "not enough data yet" rather than a fault.
    ///
    /// Callers typically retry these on the next refresh once sources have posted.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            Error::NoIndicatorData | Error::InsufficientAlignedData { .. }
        )
    }
}
