//! Shared error type across promtrack crates.

use thiserror::Error;

use crate::descriptor::MetricKind;

/// Stable error codes (safe to match on in callers and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A family with the same name is already registered.
    DuplicateName,
    /// Label value count does not match the declared label names.
    LabelArity,
    /// Negative (or NaN) counter increment.
    InvalidDelta,
    /// NaN histogram observation.
    InvalidObservation,
    /// Series accumulator does not match the requested kind.
    UnknownKind,
    /// Metric or label name is not a valid exposition identifier.
    InvalidName,
    /// Histogram boundaries are empty, non-finite or not strictly ascending.
    InvalidBuckets,
    /// Startup configuration rejected.
    BadConfig,
    /// I/O or runtime failure in an outer shim.
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::DuplicateName => "DUPLICATE_NAME",
            ErrorCode::LabelArity => "LABEL_ARITY",
            ErrorCode::InvalidDelta => "INVALID_DELTA",
            ErrorCode::InvalidObservation => "INVALID_OBSERVATION",
            ErrorCode::UnknownKind => "UNKNOWN_KIND",
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::InvalidBuckets => "INVALID_BUCKETS",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by core and tracker.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metric already registered: {0}")]
    DuplicateName(String),
    #[error("{name}: expected {expected} label values, got {actual}")]
    LabelArity {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("counter delta must be non-negative, got {0}")]
    InvalidDelta(f64),
    #[error("histogram observation must be a number")]
    InvalidObservation,
    #[error("{name}: series is not a {expected}")]
    UnknownKind { name: String, expected: MetricKind },
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("invalid buckets: {0}")]
    InvalidBuckets(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricsError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MetricsError::DuplicateName(_) => ErrorCode::DuplicateName,
            MetricsError::LabelArity { .. } => ErrorCode::LabelArity,
            MetricsError::InvalidDelta(_) => ErrorCode::InvalidDelta,
            MetricsError::InvalidObservation => ErrorCode::InvalidObservation,
            MetricsError::UnknownKind { .. } => ErrorCode::UnknownKind,
            MetricsError::InvalidName(_) => ErrorCode::InvalidName,
            MetricsError::InvalidBuckets(_) => ErrorCode::InvalidBuckets,
            MetricsError::BadConfig(_) => ErrorCode::BadConfig,
            MetricsError::Internal(_) => ErrorCode::Internal,
        }
    }
}
