//! # AppError
//!
//! Centralized error handling for the bill-board ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all bb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Referenced entity does not resolve (e.g. Entry, Comment, Category)
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, String),

    /// Actor lacks the required privilege or ownership relationship.
    /// Terminal, never retried.
    #[error("access denied: {0}")]
    PermissionDenied(String),

    /// Submitted content violates a field constraint (blank title,
    /// unsupported image type, ...). Recoverable by the submitting actor.
    #[error("validation error: {0}")]
    Validation(String),

    /// Image re-encoding failed. Terminal for that upload, nothing persists.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Operation makes no sense in the current system state
    /// (e.g. no category exists yet when an add is attempted).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Infrastructure failure (store write failed, file unwritable, ...)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand used by the adapters to wrap infrastructure errors.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// A specialized Result type for bill-board logic.
pub type Result<T> = std::result::Result<T, AppError>;
