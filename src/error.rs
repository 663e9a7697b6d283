//! Error types for the gitsnap library
//!
//! This module defines all error types that can occur during snapshot
//! operations. The taxonomy mirrors the stages of a snapshot attempt:
//! preflight checks, scanning, object upload, tree/commit assembly, and
//! branch reconciliation. Errors carry enough context for a caller to
//! understand which stage failed and whether the failure left any remote
//! state behind (it never does before reconciliation: objects are inert
//! until a branch points at them).

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the gitsnap library
pub type Result<T> = std::result::Result<T, GitsnapError>;

/// Main error type for all gitsnap operations
#[derive(Debug, Error)]
pub enum GitsnapError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP errors (connection, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote store rejected a request with an error status
    #[error("remote store error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the store
        status: u16,
        /// Error message extracted from the response body
        message: String,
    },

    /// Credentials or repository could not be validated before any write
    #[error("preflight check failed: {0}")]
    Preflight(String),

    /// The scan produced zero eligible files
    #[error("no eligible files found, refusing to record an empty snapshot")]
    EmptySnapshot,

    /// Every blob upload failed; there is nothing to reference in a tree
    #[error("nothing to upload: all {attempted} file uploads failed")]
    NothingToUpload {
        /// Number of files for which an upload was attempted
        attempted: usize,
    },

    /// Tree or commit creation was rejected by the remote store
    #[error("assembly failed: {0}")]
    Assembly(String),

    /// Branch update was rejected as a non-fast-forward
    ///
    /// Recoverable: the reconciler retries once with a forced update.
    #[error("non-fast-forward update rejected for branch '{branch}'")]
    NonFastForward {
        /// Branch whose update was rejected
        branch: String,
    },

    /// Branch reconciliation failed even after the forced retry
    #[error("failed to reconcile branch '{branch}': {reason}")]
    Reconciliation {
        /// Branch that could not be updated
        branch: String,
        /// Remote error detail from the final attempt
        reason: String,
    },

    /// A fatal failure on the local-tooling sync path
    #[error("local sync failed: {0}")]
    LocalSync(String),

    /// Invalid operation configuration
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A scanned path could not be represented on the wire
    #[error("path is not valid UTF-8: {0:?}")]
    PathConversion(PathBuf),
}

impl GitsnapError {
    /// Create a preflight error with a custom message
    pub fn preflight(msg: impl Into<String>) -> Self {
        GitsnapError::Preflight(msg.into())
    }

    /// Create an assembly error with a custom message
    pub fn assembly(msg: impl Into<String>) -> Self {
        GitsnapError::Assembly(msg.into())
    }

    /// Create a local-sync error with a custom message
    pub fn local_sync(msg: impl Into<String>) -> Self {
        GitsnapError::LocalSync(msg.into())
    }

    /// Create a configuration error with a custom message
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        GitsnapError::InvalidConfiguration(msg.into())
    }

    /// Check if this error has a safe retry fallback
    ///
    /// A recoverable error means the operation may still succeed through a
    /// retry with different parameters (currently only the forced branch
    /// update after a non-fast-forward rejection).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GitsnapError::NonFastForward { .. })
    }

    /// Check if this error occurred before any remote write
    pub fn is_preflight(&self) -> bool {
        match self {
            GitsnapError::Preflight(_) => true,
            GitsnapError::Api { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }
}
