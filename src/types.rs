//! Core data types used throughout the gitsnap library
//!
//! This module contains the data model shared across components:
//!
//! - **Configuration**: [`RemoteConfig`], [`BackupOptions`] - identifies the
//!   remote store and selects the snapshot path
//! - **Scan output**: [`FileRecord`] - one eligible file with metadata
//! - **Remote objects**: [`ObjectRef`], [`TreeRef`], [`CommitRef`],
//!   [`BranchPointer`] - the append-only object model; only the branch
//!   pointer is ever updated in place
//! - **Results**: [`BackupResult`], [`RestoreResult`] - the terminal record
//!   of one operation, returned to the caller and never persisted here

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{GitsnapError, Result};

/// Identifies the remote store and the branch a snapshot operation updates
///
/// Provided per operation; the library keeps no process-wide configuration
/// state. `api_base` and `push_url` exist so operations can be pointed at a
/// compatible store other than the default hosted one (a test double, an
/// enterprise deployment behind a different host).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Account or organization that owns the repository
    pub owner: String,
    /// Repository name
    pub repository: String,
    /// Access token; its shape selects the authentication header scheme
    pub auth_token: String,
    /// Branch whose pointer the operation advances
    pub branch: String,
    /// Base URL of the store's HTTP API
    pub api_base: String,
    /// Override for the clone/push URL used by the local sync path
    pub push_url_override: Option<String>,
}

impl RemoteConfig {
    /// Default API base for the hosted store
    pub const DEFAULT_API_BASE: &'static str = "https://api.github.com";

    /// Create a configuration tracking the `main` branch
    pub fn new(
        owner: impl Into<String>,
        repository: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            auth_token: auth_token.into(),
            branch: "main".to_string(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            push_url_override: None,
        }
    }

    /// Set the tracked branch
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set an explicit clone/push URL for the local sync path
    pub fn with_push_url(mut self, url: impl Into<String>) -> Self {
        self.push_url_override = Some(url.into());
        self
    }

    /// URL used by the local sync path to fetch and push
    ///
    /// Embeds the access token unless an override was provided.
    pub fn push_url(&self) -> String {
        self.push_url_override.clone().unwrap_or_else(|| {
            format!(
                "https://{}@github.com/{}/{}.git",
                self.auth_token, self.owner, self.repository
            )
        })
    }

    /// Validate that all required fields are present
    pub fn validate(&self) -> Result<()> {
        if self.owner.is_empty() || self.repository.is_empty() {
            return Err(GitsnapError::invalid_configuration(
                "owner and repository are required",
            ));
        }
        if self.auth_token.is_empty() {
            return Err(GitsnapError::invalid_configuration(
                "an access token is required",
            ));
        }
        if self.branch.is_empty() {
            return Err(GitsnapError::invalid_configuration("a branch is required"));
        }
        Ok(())
    }
}

/// Per-operation switches for a snapshot attempt
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BackupOptions {
    /// Route the operation through the local working-copy sync path
    /// instead of the remote object API
    pub use_local_sync: bool,
    /// Skip the fast-forward attempt and update the branch pointer with
    /// force on the first try
    pub force: bool,
}

/// One eligible file produced by a directory scan
///
/// Immutable once scanned. The path is relative to the scan root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the scanned root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification timestamp
    pub modified: DateTime<Utc>,
    /// Whether the file is executable (selects the tree entry mode)
    pub executable: bool,
}

/// File mode of a tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileMode {
    /// Regular file (`100644`)
    Regular,
    /// Executable file (`100755`)
    Executable,
}

impl FileMode {
    /// Wire representation of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
            FileMode::Executable => "100755",
        }
    }
}

/// Kind of object a tree entry references
///
/// Snapshots only ever reference file content directly; nested directories
/// are expressed through entry paths, so the only kind produced is a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// An immutable unit of file content
    Blob,
}

/// A successfully uploaded file, ready to be listed in a tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Slash-separated path relative to the repository root
    pub path: String,
    /// Entry mode
    pub mode: FileMode,
    /// Kind of the referenced object
    pub kind: ObjectKind,
    /// Content-addressed identifier returned by the store
    pub content_id: String,
}

/// One point-in-time directory structure recorded in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeRef {
    /// Content-addressed identifier of the tree
    pub content_id: String,
}

/// A snapshot event referencing one tree and zero or one parent commit
///
/// A commit with no parent is the first snapshot in a branch's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRef {
    /// Content-addressed identifier of the commit
    pub content_id: String,
    /// Identifier of the tree this commit records
    pub tree_id: String,
    /// Identifier of the parent commit, when one exists
    pub parent_id: Option<String>,
    /// Commit message with embedded snapshot statistics
    pub message: String,
    /// When the commit was authored
    pub authored_at: DateTime<Utc>,
}

/// The tracked branch pointer, the only mutable remote entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchPointer {
    /// Branch name
    pub branch: String,
    /// Commit currently considered the head of the branch
    pub head_commit_id: String,
}

/// Metadata of an existing commit, as read back from the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Commit identifier
    pub id: String,
    /// Full commit message
    pub message: String,
    /// Author name
    pub author: String,
    /// Authoring timestamp
    pub date: DateTime<Utc>,
    /// Tree recorded by the commit, when the read endpoint returns it
    pub tree_id: Option<String>,
}

/// State attached to a commit by the post-reconciliation status marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    /// Operation still in progress
    Pending,
    /// Operation completed successfully
    Success,
    /// Operation hit an internal error
    Error,
    /// Operation failed
    Failure,
}

impl StatusState {
    /// Wire representation of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusState::Pending => "pending",
            StatusState::Success => "success",
            StatusState::Error => "error",
            StatusState::Failure => "failure",
        }
    }
}

/// Terminal record of one backup operation
///
/// Every failure path is converted into a result with `succeeded` unset and
/// an error description; nothing escapes the engines as a panic or an
/// unhandled error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupResult {
    /// Whether the operation succeeded
    pub succeeded: bool,
    /// Unique identifier of this operation attempt
    pub operation_id: String,
    /// Commit recorded by the snapshot, when one was created
    pub commit_id: Option<String>,
    /// When the operation finished
    pub timestamp: DateTime<Utc>,
    /// Number of files included in the snapshot
    pub file_count: Option<usize>,
    /// Total size of the included files in bytes
    pub total_size: Option<u64>,
    /// Whether the snapshot reached the remote store
    ///
    /// The local sync path can succeed with a local-only commit when every
    /// push attempt fails; this flag records the difference.
    pub pushed_to_remote: bool,
    /// Whether the branch pointer required a forced update
    pub forced: bool,
    /// Whether the tracked branch was created by this operation
    pub branch_created: bool,
    /// Diagnostic detail: the failure description, or on a degraded
    /// success the reason the remote could not be reached
    pub error: Option<String>,
}

impl BackupResult {
    /// Build a failed result from an error
    pub fn failure(error: &GitsnapError) -> Self {
        Self {
            succeeded: false,
            operation_id: Uuid::new_v4().to_string(),
            commit_id: None,
            timestamp: Utc::now(),
            file_count: None,
            total_size: None,
            pushed_to_remote: false,
            forced: false,
            branch_created: false,
            error: Some(error.to_string()),
        }
    }
}

/// Terminal record of one restore operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreResult {
    /// Whether the restore succeeded
    pub succeeded: bool,
    /// Commit the working copy was reset to
    pub commit_id: Option<String>,
    /// When the operation finished
    pub timestamp: DateTime<Utc>,
    /// Number of tracked files after the restore, when it could be counted
    pub file_count: Option<usize>,
    /// Diagnostic detail for failed operations
    pub error: Option<String>,
}
