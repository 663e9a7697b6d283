//! Snapshot construction through a local working copy
//!
//! The alternate backup route: instead of writing objects through the
//! remote API, drive the local `git` tooling to commit the working copy
//! and push it to the configured store. Selected when the operation is a
//! pure local-tooling backup rather than remote-object orchestration.
//!
//! The path is deliberately tolerant. Fetching remote history is best
//! effort: when the remote is unreachable the backup degrades to local
//! state instead of failing. When the tracked branch exists remotely, the
//! working copy is hard-reset to match it before committing, so every
//! snapshot layers on the latest remote state; local-only history on the
//! tracked branch is discarded by this policy. A clean working tree is
//! not a failure: any unpushed commits are pushed instead, and the
//! operation reports success either way. A commit that cannot be pushed
//! even with force still counts as a (local-only) backup.

use chrono::Utc;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::engine::SnapshotEngine;
use crate::error::{GitsnapError, Result};
use crate::git;
use crate::manifest::{timestamp_label, COMMIT_SUBJECT_PREFIX};
use crate::types::{BackupOptions, BackupResult, RemoteConfig};

/// Snapshot engine driving the local git tooling
pub struct LocalSyncEngine {
    config: RemoteConfig,
    workdir: PathBuf,
    options: BackupOptions,
}

impl LocalSyncEngine {
    /// Create an engine operating on the working copy at `workdir`
    pub fn new(
        config: RemoteConfig,
        workdir: impl Into<PathBuf>,
        options: BackupOptions,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            workdir: workdir.into(),
            options,
        })
    }

    fn redact(&self, text: &str) -> String {
        git::redact(text, &self.config.auth_token)
    }

    async fn git(&self, args: &[&str]) -> Result<git::GitOutput> {
        git::run(&self.workdir, args).await
    }

    /// Point `origin` at the configured store
    ///
    /// Degraded on failure: the commit still happens, only the push will
    /// be unable to reach the remote.
    async fn configure_remote(&self) {
        let url = self.config.push_url();
        let set = self
            .git(&["remote", "set-url", "origin", &url])
            .await;
        if matches!(&set, Ok(output) if output.success) {
            return;
        }
        let add = self.git(&["remote", "add", "origin", &url]).await;
        if !matches!(&add, Ok(output) if output.success) {
            warn!("could not configure remote, continuing with local state");
        }
    }

    /// Sync the working copy onto the latest remote state
    ///
    /// Returns whether the tracked branch exists on the remote. Every step
    /// is best effort; failure means continuing from local state.
    async fn sync_from_remote(&self) -> bool {
        match self.git(&["fetch", "origin"]).await {
            Ok(output) if output.success => debug!("fetched latest remote history"),
            Ok(output) => warn!(
                "fetch failed, continuing with local state: {}",
                self.redact(&output.text())
            ),
            Err(err) => warn!("fetch failed, continuing with local state: {}", err),
        }

        let exists = match self
            .git(&["ls-remote", "--heads", "origin", &self.config.branch])
            .await
        {
            Ok(output) if output.success => !output.stdout.trim().is_empty(),
            _ => false,
        };

        if exists {
            // Layer the snapshot on the latest remote state, discarding
            // local-only history on the tracked branch.
            let target = format!("origin/{}", self.config.branch);
            match self.git(&["reset", "--hard", &target]).await {
                Ok(output) if output.success => debug!("reset working copy to {}", target),
                Ok(output) => warn!(
                    "could not reset to {}: {}",
                    target,
                    self.redact(&output.text())
                ),
                Err(err) => warn!("could not reset to {}: {}", target, err),
            }
        } else {
            debug!(
                "remote branch '{}' does not exist, it will be created on push",
                self.config.branch
            );
        }
        exists
    }

    async fn head_commit(&self) -> Option<String> {
        match self.git(&["rev-parse", "HEAD"]).await {
            Ok(output) if output.success => Some(output.stdout.trim().to_string()),
            _ => None,
        }
    }

    /// Push the tracked branch, retrying once with force
    ///
    /// The first attempt already forces when the remote branch does not
    /// exist yet (first-time setup) or when the operation requested a
    /// forced backup. Returns `(pushed, forced, failure detail)`.
    async fn push(&self, remote_branch_exists: bool) -> (bool, bool, Option<String>) {
        let branch = self.config.branch.as_str();
        let first_forced = !remote_branch_exists || self.options.force;
        let first: Vec<&str> = if first_forced {
            vec!["push", "-u", "origin", branch, "--force"]
        } else {
            vec!["push", "-u", "origin", branch]
        };

        let first_detail = match self.git(&first).await {
            Ok(output) if output.success => return (true, first_forced, None),
            Ok(output) => self.redact(&output.text()),
            Err(err) => err.to_string(),
        };
        warn!("push failed, retrying with force: {}", first_detail);

        let retry: Vec<&str> = if remote_branch_exists {
            vec!["push", "-f", "origin", branch]
        } else {
            vec!["push", "-u", "origin", branch, "--force"]
        };
        match self.git(&retry).await {
            Ok(output) if output.success => (true, true, None),
            Ok(output) => {
                let detail = self.redact(&output.text());
                warn!("forced push also failed: {}", detail);
                (false, true, Some(detail))
            }
            Err(err) => {
                warn!("forced push also failed: {}", err);
                (false, true, Some(err.to_string()))
            }
        }
    }

    fn result(
        &self,
        commit_id: Option<String>,
        pushed: bool,
        forced: bool,
        branch_created: bool,
        detail: Option<String>,
    ) -> BackupResult {
        BackupResult {
            succeeded: true,
            operation_id: Uuid::new_v4().to_string(),
            commit_id,
            timestamp: Utc::now(),
            file_count: None,
            total_size: None,
            pushed_to_remote: pushed,
            forced,
            branch_created,
            error: detail,
        }
    }

    #[instrument(skip(self), fields(branch = %self.config.branch))]
    async fn run(&self) -> Result<BackupResult> {
        // Clear any partially staged state from an earlier attempt.
        if let Ok(output) = self.git(&["reset"]).await {
            if !output.success {
                debug!("ignoring reset failure: {}", self.redact(&output.text()));
            }
        }

        self.configure_remote().await;
        let remote_branch_exists = self.sync_from_remote().await;

        let staged = self.git(&["add", "-A"]).await?;
        if !staged.success {
            return Err(GitsnapError::local_sync(format!(
                "staging failed: {}",
                self.redact(&staged.text())
            )));
        }

        let message = format!("{} {}", COMMIT_SUBJECT_PREFIX, timestamp_label(Utc::now()));
        let committed = self.git(&["commit", "-m", &message]).await?;
        if !committed.success {
            if committed.mentions("nothing to commit") || committed.mentions("working tree clean")
            {
                // A clean tree is not a failure: push whatever unpushed
                // commits exist, and succeed either way.
                info!("working tree clean, pushing existing commits");
                let (pushed, forced, detail) = self.push(remote_branch_exists).await;
                let commit_id = if pushed { self.head_commit().await } else { None };
                return Ok(self.result(
                    commit_id,
                    pushed,
                    pushed && forced,
                    pushed && !remote_branch_exists,
                    detail,
                ));
            }
            return Err(GitsnapError::local_sync(format!(
                "commit failed: {}",
                self.redact(&committed.text())
            )));
        }

        let commit_id = self.head_commit().await;
        info!(
            "recorded local commit {}",
            commit_id.as_deref().unwrap_or("(unknown)")
        );

        let (pushed, forced, detail) = self.push(remote_branch_exists).await;
        if pushed {
            info!("pushed snapshot to remote branch '{}'", self.config.branch);
        } else {
            warn!("push failed after retry, local commit remains as backup");
        }
        Ok(self.result(
            commit_id,
            pushed,
            pushed && forced,
            pushed && !remote_branch_exists,
            detail,
        ))
    }
}

#[async_trait::async_trait]
impl SnapshotEngine for LocalSyncEngine {
    fn name(&self) -> &'static str {
        "local-sync"
    }

    async fn backup(&self) -> BackupResult {
        match self.run().await {
            Ok(result) => result,
            Err(err) => {
                error!("local sync failed: {}", err);
                BackupResult::failure(&err)
            }
        }
    }
}
