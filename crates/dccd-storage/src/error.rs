//! Storage error types.

use thiserror::Error;

/// Errors from the archive's external service boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Project not found.
    #[error("project not found: {sid}")]
    ProjectNotFound { sid: String },

    /// File unit not found on a project.
    #[error("file unit not found: {sid}/{unit_id}")]
    FileUnitNotFound { sid: String, unit_id: String },

    /// User not found.
    #[error("user not found: {user_id}")]
    UserNotFound { user_id: String },

    /// The acting user may not perform this operation.
    #[error("not allowed: {message}")]
    NotAllowed { message: String },

    /// Invalid request input.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Backend connection failure.
    #[error("service connection error: {message}")]
    ConnectionError { message: String },

    /// Internal backend failure.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
