use crate::core::symbol::Symbol;
use thiserror::Error;

/// Input validation failures for keys and ranges.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter or '^': '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },
    #[error("invalid series range '{value}', expected one of 1M, 3M, 6M, YTD, 1Y, 5Y, MAX")]
    InvalidRange { value: String },
}

/// Fatal outcomes of a snapshot aggregation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("no data for symbol {0}")]
    NotFound(Symbol),
    #[error("identity record for {symbol} is invalid: {reason}")]
    InvalidIdentity { symbol: Symbol, reason: String },
    #[error("identity record for {symbol} could not be fetched: {reason}")]
    Unavailable { symbol: Symbol, reason: String },
}

/// Reasons a derived metric has no value.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MetricError {
    #[error("division by zero")]
    DivisionUndefined,
    #[error("window needs {required} observations, {available} available")]
    InsufficientWindow { required: usize, available: usize },
    #[error("growth rate is undefined for the given inputs")]
    UndefinedGrowth,
    #[error("input is not a finite number")]
    NonFinite,
}
