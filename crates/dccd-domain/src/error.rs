//! Domain error types for archive operations.

use thiserror::Error;

/// Domain-specific errors for TRiDaS and project operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Error parsing a TRiDaS document.
    #[error("tridas parse error: {message}")]
    TridasParse { message: String },

    /// Error serializing a TRiDaS document.
    #[error("tridas serialize error: {message}")]
    TridasSerialize { message: String },

    /// A required field is missing from the TRiDaS document.
    #[error("missing required tridas field: {field}")]
    MissingField { field: String },

    /// Unknown permission level name.
    #[error("unknown permission level: {value}")]
    UnknownPermissionLevel { value: String },

    /// I/O failure while reading project source files.
    #[error("project file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
