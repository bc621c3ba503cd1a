use thiserror::Error;

/// Validation errors for domain types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("bar high must be >= low")]
    InvalidBarRange,
    #[error("bar open/close must be within high/low range")]
    InvalidBarBounds,

    #[error("bar at index {index} is not after the previous bar")]
    OutOfOrderBar { index: usize },
    #[error("bar at index {index} duplicates the previous timestamp")]
    DuplicateBarTimestamp { index: usize },
}

/// Errors from the signal computation path.
///
/// `InsufficientData` is benign: the caller treats it as "no signal yet",
/// never as a failure to surface.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("insufficient data: have {have} bars, need at least {need}")]
    InsufficientData { have: usize, need: usize },
    #[error("lookback period must be at least 1")]
    InvalidLookback,
    #[error("key value multiplier must be finite and positive: {value}")]
    InvalidKeyValue { value: f64 },
}

impl EngineError {
    pub const fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
