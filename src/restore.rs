//! Reconstructing prior state from recorded snapshots
//!
//! Restoring brings the local working copy back to the latest snapshot on
//! the tracked branch: configure the remote, fetch, resolve the remote
//! head, stash whatever is dirty locally, hard-reset onto the remote
//! state, and clean untracked files. Stash and clean are best effort; the
//! fetch, head resolution, and reset are the load-bearing steps and fail
//! the restore when they fail.
//!
//! Inspecting an individual snapshot without touching the working copy
//! goes through the remote store instead, see [`snapshot_info`].

use chrono::Utc;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{GitsnapError, Result};
use crate::git;
use crate::store::ObjectStore;
use crate::types::{CommitInfo, RemoteConfig, RestoreResult};

/// Stash marker left when local changes are set aside before a restore
const STASH_MESSAGE: &str = "gitsnap: auto-stash before restore";

/// Reset the working copy to the latest snapshot on the tracked branch
///
/// Every failure is converted into a terminal [`RestoreResult`]; nothing
/// escapes as an error.
pub async fn restore_latest(config: &RemoteConfig, workdir: &Path) -> RestoreResult {
    match run_restore(config, workdir).await {
        Ok(result) => result,
        Err(err) => {
            error!("restore failed: {}", err);
            RestoreResult {
                succeeded: false,
                commit_id: None,
                timestamp: Utc::now(),
                file_count: None,
                error: Some(err.to_string()),
            }
        }
    }
}

/// Read one snapshot's metadata from the remote store
pub async fn snapshot_info(store: &dyn ObjectStore, commit_id: &str) -> Result<CommitInfo> {
    store.read_commit(commit_id).await
}

#[instrument(skip(config, workdir), fields(branch = %config.branch))]
async fn run_restore(config: &RemoteConfig, workdir: &Path) -> Result<RestoreResult> {
    config.validate()?;
    let redact = |text: &str| git::redact(text, &config.auth_token);

    // Configure the remote; unlike the backup path this is load-bearing,
    // a restore without a reachable remote has nothing to restore from.
    let url = config.push_url();
    let set = git::run(workdir, &["remote", "set-url", "origin", &url]).await?;
    if !set.success {
        let add = git::run(workdir, &["remote", "add", "origin", &url]).await?;
        if !add.success {
            return Err(GitsnapError::local_sync(format!(
                "could not configure remote: {}",
                redact(&add.text())
            )));
        }
    }

    let fetched = git::run(workdir, &["fetch", "origin"]).await?;
    if !fetched.success {
        return Err(GitsnapError::local_sync(format!(
            "fetch failed: {}",
            redact(&fetched.text())
        )));
    }

    let target = format!("origin/{}", config.branch);
    let resolved = git::run(workdir, &["rev-parse", &target]).await?;
    if !resolved.success {
        return Err(GitsnapError::local_sync(format!(
            "could not resolve {}: {}",
            target,
            redact(&resolved.text())
        )));
    }
    let commit_id = resolved.stdout.trim().to_string();
    debug!("latest snapshot on {} is {}", target, commit_id);

    match git::run(workdir, &["stash", "push", "-m", STASH_MESSAGE]).await {
        Ok(output) if output.success => debug!("stashed local changes"),
        Ok(_) => debug!("nothing to stash"),
        Err(err) => warn!("stash failed: {}", err),
    }

    let reset = git::run(workdir, &["reset", "--hard", &target]).await?;
    if !reset.success {
        return Err(GitsnapError::local_sync(format!(
            "reset to {} failed: {}",
            target,
            redact(&reset.text())
        )));
    }

    match git::run(workdir, &["clean", "-fd"]).await {
        Ok(output) if output.success => {}
        Ok(output) => warn!("could not clean untracked files: {}", redact(&output.text())),
        Err(err) => warn!("could not clean untracked files: {}", err),
    }

    let file_count = match git::run(workdir, &["ls-files"]).await {
        Ok(output) if output.success => {
            Some(output.stdout.lines().filter(|l| !l.is_empty()).count())
        }
        _ => None,
    };

    info!("restored working copy to {}", commit_id);
    Ok(RestoreResult {
        succeeded: true,
        commit_id: Some(commit_id),
        timestamp: Utc::now(),
        file_count,
        error: None,
    })
}
