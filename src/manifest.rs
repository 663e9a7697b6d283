//! Snapshot manifest construction
//!
//! Aggregates scan output into a single descriptive record: creation
//! timestamp, file count, total byte size, and the per-file metadata in
//! scan order. The manifest is read-only after creation and feeds the
//! statistics embedded in snapshot commit messages. Ordering is preserved
//! for deterministic diagnostics; later stages do not depend on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::FileRecord;

/// Subject prefix shared by every snapshot commit message
///
/// The history listing uses this prefix to tell snapshot commits apart
/// from commits recorded by other tools.
pub const COMMIT_SUBJECT_PREFIX: &str = "Backup:";

/// Format a timestamp for commit subjects (filesystem-safe, no colons)
pub fn timestamp_label(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S%.3fZ").to_string()
}

/// Descriptive record of one snapshot attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// When the manifest was built
    pub created_at: DateTime<Utc>,
    /// Number of eligible files
    pub file_count: usize,
    /// Sum of all file sizes in bytes
    pub total_size: u64,
    /// Per-file metadata in scan order
    pub files: Vec<FileRecord>,
}

impl Manifest {
    /// Aggregate scan output into a manifest
    pub fn from_records(files: Vec<FileRecord>) -> Self {
        let total_size = files.iter().map(|f| f.size).sum();
        Self {
            created_at: Utc::now(),
            file_count: files.len(),
            total_size,
            files,
        }
    }

    /// Timestamp formatted for commit subjects (filesystem-safe, no colons)
    pub fn timestamp_label(&self) -> String {
        timestamp_label(self.created_at)
    }

    /// Total size expressed in megabytes
    pub fn total_size_mb(&self) -> f64 {
        self.total_size as f64 / 1024.0 / 1024.0
    }

    /// Render the commit message for this snapshot
    ///
    /// The subject carries the `Backup:` prefix and the timestamp; the body
    /// embeds the statistics a reader needs to size up the snapshot without
    /// opening it.
    pub fn commit_message(&self) -> String {
        format!(
            "{} {}\n\nFiles: {}\nSize: {:.2} MB\nTimestamp: {}",
            COMMIT_SUBJECT_PREFIX,
            self.timestamp_label(),
            self.file_count,
            self.total_size_mb(),
            self.timestamp_label(),
        )
    }
}
