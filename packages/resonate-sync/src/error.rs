//! Centralized error types for the sync core.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to machine-readable codes for the embedding UI

use serde::Serialize;
use thiserror::Error;

use crate::session::store::StoreError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateId(_) => "duplicate_session_id",
            Self::Backend(_) => "store_backend_error",
        }
    }
}

/// Crate-wide error type for session operations.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum SyncError {
    /// No session exists for the given join code.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The session exists but is past its expiry; joining it must fail.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// Could not allocate an unused join code within the retry limit.
    #[error("Could not allocate a unique join code")]
    CodeExhausted,

    /// The session store failed (backend I/O, connection loss, etc.).
    #[error("Store operation failed: {0}")]
    Store(String),
}

impl SyncError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "session_not_found",
            Self::SessionExpired(_) => "session_expired",
            Self::CodeExhausted => "join_code_exhausted",
            Self::Store(_) => "store_error",
        }
    }
}

/// Convenient Result alias for crate-wide operations.
pub type SyncResult<T> = Result<T, SyncError>;

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_not_found_returns_correct_code() {
        let err = SyncError::SessionNotFound("abc123".into());
        assert_eq!(err.code(), "session_not_found");
    }

    #[test]
    fn store_error_converts_and_keeps_message() {
        let err: SyncError = StoreError::Backend("connection reset".into()).into();
        assert_eq!(err.code(), "store_error");
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn store_error_codes() {
        assert_eq!(
            StoreError::DuplicateId("abc123".into()).code(),
            "duplicate_session_id"
        );
        assert_eq!(StoreError::Backend("x".into()).code(), "store_backend_error");
    }
}
