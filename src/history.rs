//! Listing recorded snapshots
//!
//! Reads the tracked branch's recent commits and keeps the ones whose
//! subject carries the snapshot prefix. When the branch has activity but
//! no snapshot commits, the most recent commits are returned instead so a
//! caller can still show what the branch contains.

use tracing::debug;

use crate::error::Result;
use crate::manifest::COMMIT_SUBJECT_PREFIX;
use crate::store::ObjectStore;
use crate::types::CommitInfo;

/// Default number of commits fetched when listing history
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Number of recent commits shown when no snapshot commits exist
const FALLBACK_LIMIT: usize = 10;

/// Recorded snapshots on the tracked branch
#[derive(Debug, Clone)]
pub struct BackupHistory {
    /// Matching commits, newest first
    pub entries: Vec<CommitInfo>,
    /// Whether the entries are snapshot commits or the recent-activity
    /// fallback
    pub snapshots_only: bool,
}

/// List the snapshots recorded on a branch, newest first
///
/// An empty repository yields an empty history, not an error.
pub async fn backup_history(
    store: &dyn ObjectStore,
    branch: &str,
    limit: usize,
) -> Result<BackupHistory> {
    let commits = store.list_commits(branch, limit).await?;
    let total = commits.len();
    let snapshots: Vec<CommitInfo> = commits
        .iter()
        .filter(|c| c.message.starts_with(COMMIT_SUBJECT_PREFIX))
        .cloned()
        .collect();
    debug!(
        "{} snapshot commits out of {} on branch '{}'",
        snapshots.len(),
        total,
        branch
    );

    if snapshots.is_empty() && !commits.is_empty() {
        return Ok(BackupHistory {
            entries: commits.into_iter().take(FALLBACK_LIMIT).collect(),
            snapshots_only: false,
        });
    }
    Ok(BackupHistory {
        entries: snapshots,
        snapshots_only: true,
    })
}
