//! Snapshot construction over the remote object API
//!
//! The primary backup route: scan the project tree, upload every eligible
//! file as a content-addressed blob, assemble the blobs into a tree,
//! record a commit over the tree, and reconcile the tracked branch onto
//! the new commit.
//!
//! Blob uploads are the dominant I/O cost and fan out concurrently with a
//! bounded number of in-flight requests. Each upload fails in isolation: a
//! file that cannot be read or uploaded is logged and left out of the
//! tree, and only a snapshot with zero successful uploads fails outright.
//! Tree assembly, commit creation, and reconciliation run sequentially,
//! each consuming the identifier returned by the previous step.
//!
//! There is no cancellation mid-snapshot. An abandoned attempt leaves
//! nothing visible behind: uploaded blobs are inert until a tree and a
//! branch reference them.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::engine::SnapshotEngine;
use crate::error::{GitsnapError, Result};
use crate::manifest::Manifest;
use crate::reconcile::{RefReconciler, RefUpdate};
use crate::scanner::TreeScanner;
use crate::store::{GitHubStore, ObjectStore};
use crate::types::{
    BackupOptions, BackupResult, CommitRef, FileMode, ObjectKind, ObjectRef, RemoteConfig,
    StatusState,
};

/// Default bound on concurrent blob uploads
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Snapshot engine writing through the remote object API
pub struct RemoteSnapshotEngine {
    store: Arc<dyn ObjectStore>,
    config: RemoteConfig,
    scanner: TreeScanner,
    options: BackupOptions,
    max_in_flight: usize,
}

struct SnapshotOutcome {
    commit: CommitRef,
    file_count: usize,
    total_size: u64,
    update: RefUpdate,
}

impl RemoteSnapshotEngine {
    /// Create an engine backed by the hosted store
    pub fn new(
        config: RemoteConfig,
        root: impl Into<PathBuf>,
        options: BackupOptions,
    ) -> Result<Self> {
        let store = Arc::new(GitHubStore::new(&config)?);
        Self::with_store(store, config, root, options)
    }

    /// Create an engine over an explicit store implementation
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        config: RemoteConfig,
        root: impl Into<PathBuf>,
        options: BackupOptions,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            scanner: TreeScanner::new(root)?,
            options,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        })
    }

    /// Replace the scanner (custom exclusion rules)
    pub fn with_scanner(mut self, scanner: TreeScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Bound the number of concurrent blob uploads
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    #[instrument(skip(self), fields(branch = %self.config.branch))]
    async fn run(&self) -> Result<SnapshotOutcome> {
        // Cheap preflight: resolve the branch state before any write.
        let mut reconciler = RefReconciler::new(
            self.store.as_ref(),
            self.config.branch.as_str(),
            self.options.force,
        );
        let prior_head = reconciler.preflight().await?;

        let records = self.scanner.scan()?;
        if records.is_empty() {
            return Err(GitsnapError::EmptySnapshot);
        }
        let manifest = Manifest::from_records(records);
        info!(
            "snapshotting {} files ({:.2} MB)",
            manifest.file_count,
            manifest.total_size_mb()
        );

        let entries = self.upload_blobs(&manifest).await?;

        let base_tree = match &prior_head {
            Some(head) => match self.store.read_commit(head).await {
                Ok(info) => info.tree_id,
                Err(err) => {
                    warn!("could not resolve prior tree from {}: {}", head, err);
                    None
                }
            },
            None => None,
        };

        let tree = self
            .store
            .create_tree(&entries, base_tree.as_deref())
            .await
            .map_err(|e| GitsnapError::assembly(format!("tree creation rejected: {}", e)))?;
        debug!("assembled tree {}", tree.content_id);

        let commit = self
            .store
            .create_commit(
                &manifest.commit_message(),
                &tree.content_id,
                prior_head.as_deref(),
            )
            .await
            .map_err(|e| GitsnapError::assembly(format!("commit creation rejected: {}", e)))?;
        debug!("recorded commit {}", commit.content_id);

        let update = reconciler.advance(&commit.content_id).await?;
        reconciler
            .record_status(
                &commit.content_id,
                StatusState::Success,
                "Backup completed successfully",
            )
            .await;

        Ok(SnapshotOutcome {
            commit,
            file_count: manifest.file_count,
            total_size: manifest.total_size,
            update,
        })
    }

    /// Upload every manifest file as a blob, concurrently and in isolation
    ///
    /// Files that cannot be read or uploaded are logged and dropped from
    /// the result; the snapshot fails only when nothing uploads at all.
    async fn upload_blobs(&self, manifest: &Manifest) -> Result<Vec<ObjectRef>> {
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let mut uploads: JoinSet<Option<ObjectRef>> = JoinSet::new();

        for record in &manifest.files {
            let wire = match wire_path(&record.path) {
                Ok(wire) => wire,
                Err(_) => {
                    warn!("skipping non-UTF-8 path {:?}", record.path);
                    continue;
                }
            };
            let mode = if record.executable {
                FileMode::Executable
            } else {
                FileMode::Regular
            };
            let absolute = self.scanner.root().join(&record.path);
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);

            uploads.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return None,
                };
                let content = match tokio::fs::read(&absolute).await {
                    Ok(content) => content,
                    Err(err) => {
                        warn!("could not read {}: {}", wire, err);
                        return None;
                    }
                };
                match store.create_blob(&content).await {
                    Ok(content_id) => Some(ObjectRef {
                        path: wire,
                        mode,
                        kind: ObjectKind::Blob,
                        content_id,
                    }),
                    Err(err) => {
                        warn!("upload failed for {}: {}", wire, err);
                        None
                    }
                }
            });
        }

        let attempted = manifest.file_count;
        let mut entries = Vec::new();
        while let Some(joined) = uploads.join_next().await {
            match joined {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(err) => warn!("upload task failed: {}", err),
            }
        }

        if entries.is_empty() {
            return Err(GitsnapError::NothingToUpload { attempted });
        }
        if entries.len() < attempted {
            warn!(
                "{} of {} files failed to upload and are absent from this snapshot",
                attempted - entries.len(),
                attempted
            );
        }
        Ok(entries)
    }
}

#[async_trait::async_trait]
impl SnapshotEngine for RemoteSnapshotEngine {
    fn name(&self) -> &'static str {
        "remote-object-api"
    }

    async fn backup(&self) -> BackupResult {
        match self.run().await {
            Ok(outcome) => BackupResult {
                succeeded: true,
                operation_id: Uuid::new_v4().to_string(),
                commit_id: Some(outcome.commit.content_id),
                timestamp: Utc::now(),
                file_count: Some(outcome.file_count),
                total_size: Some(outcome.total_size),
                pushed_to_remote: true,
                forced: outcome.update == RefUpdate::Forced,
                branch_created: outcome.update == RefUpdate::Created,
                error: None,
            },
            Err(err) => {
                error!("snapshot failed: {}", err);
                BackupResult::failure(&err)
            }
        }
    }
}

/// Convert a scanned relative path to its slash-separated wire form
fn wire_path(path: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component.as_os_str().to_str() {
            Some(part) => parts.push(part),
            None => return Err(GitsnapError::PathConversion(path.to_path_buf())),
        }
    }
    Ok(parts.join("/"))
}
