//! Snapshot engine selection
//!
//! The two backup routes, remote object API and local working-copy sync,
//! are implementations of one capability interface. The triggering caller
//! picks a route per operation through [`BackupOptions`]; nothing about
//! the choice is cached across operations.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::Result;
use crate::local_sync::LocalSyncEngine;
use crate::remote::RemoteSnapshotEngine;
use crate::types::{BackupOptions, BackupResult, RemoteConfig};

/// A backup route that produces one snapshot per invocation
///
/// Implementations never let an error escape: every failure path inside
/// [`backup`](Self::backup) terminates in a [`BackupResult`] with
/// `succeeded` unset and diagnostic detail attached.
#[async_trait]
pub trait SnapshotEngine: Send + Sync {
    /// Short identifier of the route, for logs and result displays
    fn name(&self) -> &'static str;

    /// Record one snapshot and advance the tracked branch
    async fn backup(&self) -> BackupResult;
}

/// Build the engine selected by the operation's options
///
/// `root` is the project directory to snapshot; on the local sync route it
/// must be the working copy of the tracked repository.
pub fn engine_for(
    config: RemoteConfig,
    options: BackupOptions,
    root: impl Into<PathBuf>,
) -> Result<Box<dyn SnapshotEngine>> {
    if options.use_local_sync {
        Ok(Box::new(LocalSyncEngine::new(config, root, options)?))
    } else {
        Ok(Box::new(RemoteSnapshotEngine::new(config, root, options)?))
    }
}
