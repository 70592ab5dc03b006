//! Error types for the marksync libraries.
//!
//! This module provides a unified error type with explicit variants for
//! input validation, missing authentication, store reads, store writes,
//! and session-provider failures.

use thiserror::Error;

/// The unified error type for marksync operations.
///
/// Every failure mode a caller can observe is an explicit variant here,
/// so the presentation layer can produce a distinguishable message for
/// each without string matching.
#[derive(Debug, Error)]
pub enum Error {
    /// Input validation errors (empty title, malformed target URL).
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// A mutation was attempted with no current identity.
    #[error("not signed in")]
    Unauthenticated,

    /// The record store failed to serve a read.
    #[error("store read failed: {0}")]
    StoreRead(#[from] StoreReadError),

    /// The record store rejected or failed a write.
    #[error("store write failed: {0}")]
    StoreWrite(#[from] StoreWriteError),

    /// The session provider failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// Input validation errors.
///
/// These are surfaced before any store call is issued and are never
/// retried.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Bookmark title is empty.
    #[error("title must not be empty")]
    EmptyTitle,

    /// Bookmark target is empty.
    #[error("target must not be empty")]
    EmptyTarget,

    /// Bookmark target is not a parseable absolute URL.
    #[error("invalid target URL '{value}': {reason}")]
    TargetUrl { value: String, reason: String },

    /// Invalid record id format.
    #[error("invalid record id '{value}': {reason}")]
    RecordId { value: String, reason: String },

    /// Invalid owner id format.
    #[error("invalid owner id '{value}': {reason}")]
    OwnerId { value: String, reason: String },

    /// Generic invalid input.
    #[error("{message}")]
    Other { message: String },
}

/// Read failures from the record store.
#[derive(Debug, Error)]
pub enum StoreReadError {
    /// The store could not be reached (network, filesystem).
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// Stored data could not be decoded.
    #[error("corrupt record data: {message}")]
    Corrupt { message: String },

    /// The backend answered with an error status.
    #[error("backend error: HTTP {status}{}", message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Backend { status: u16, message: Option<String> },
}

/// Write failures from the record store.
#[derive(Debug, Error)]
pub enum StoreWriteError {
    /// The write violated a store-side constraint.
    #[error("constraint violation: {message}")]
    Constraint { message: String },

    /// The store denied the write (ownership or policy check).
    #[error("write denied: {message}")]
    Denied { message: String },

    /// The store could not be reached (network, filesystem).
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// The backend answered with an error status.
    #[error("backend error: HTTP {status}{}", message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Backend { status: u16, message: Option<String> },
}

/// Failures from the session provider.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The provider could not be reached.
    #[error("session provider unavailable: {message}")]
    Unavailable { message: String },

    /// The provider rejected the intent.
    #[error("rejected: {message}")]
    Rejected { message: String },

    /// The operation is not supported by this provider.
    #[error("not supported: {message}")]
    Unsupported { message: String },
}
