use thiserror::Error;

/// Validation and contract errors exposed by `twmon-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("stock id cannot be empty")]
    EmptyStockId,
    #[error("stock id length {len} exceeds max {max}")]
    StockIdTooLong { len: usize, max: usize },
    #[error("stock id contains invalid character '{ch}' at index {index}")]
    StockIdInvalidChar { ch: char, index: usize },

    #[error("invalid sector '{value}', expected one of semiconductor, shipping, ai, power")]
    InvalidSector { value: String },
    #[error("invalid source '{value}', expected one of yahoo, finmind, fixture, catalog")]
    InvalidSource { value: String },

    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error("currency must be a 3-letter uppercase ISO code: '{value}'")]
    InvalidCurrency { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("observation high must be >= low")]
    InvalidBarRange,
    #[error("observation open/close must be within high/low range")]
    InvalidBarBounds,
    #[error("observations must be strictly chronological; offending index {index}")]
    ObservationsOutOfOrder { index: usize },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("trace_id must be 32 hex characters")]
    InvalidTraceId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("source_chain must contain at least one source")]
    EmptySourceChain,

    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}
