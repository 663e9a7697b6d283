//! # Gitsnap - Project snapshots in a remote object store
//!
//! A backup engine that snapshots an entire project directory tree into a
//! remote content-addressable object store (a Git-compatible hosting API)
//! and can reconstruct prior state from any recorded snapshot. It is
//! designed as an out-of-band backup facility for a hosted application,
//! independent of the application's own database.
//!
//! ## Overview
//!
//! One invocation produces one snapshot: an append-only chain of
//! immutable objects (blob, tree, commit) plus a single mutable branch
//! pointer advanced to the new commit. Two routes produce that snapshot:
//!
//! - **Remote object API**: scan the tree, upload blobs concurrently,
//!   assemble a tree, record a commit, reconcile the branch pointer with
//!   fast-forward detection and a bounded forced-update fallback.
//! - **Local sync**: drive the local `git` tooling on a working copy,
//!   reconciling local and remote history before committing and pushing.
//!
//! Both routes terminate in a [`BackupResult`] describing success or
//! failure with diagnostic detail; no error escapes an engine.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gitsnap::{engine_for, BackupOptions, RemoteConfig, SnapshotEngine};
//!
//! # #[tokio::main]
//! # async fn main() -> gitsnap::Result<()> {
//! let config = RemoteConfig::new("acme", "widgets", "ghp_token").with_branch("backups");
//! let engine = engine_for(config, BackupOptions::default(), "./my_project")?;
//!
//! let result = engine.backup().await;
//! if result.succeeded {
//!     println!("snapshot {} recorded", result.commit_id.unwrap_or_default());
//! } else {
//!     eprintln!("backup failed: {}", result.error.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **PathFilter / TreeScanner**: recursive scan with exclusion rules;
//!   dependency caches, build output, VCS metadata, environment files,
//!   logs, and OS artifacts are pruned without being descended into.
//! - **Manifest**: one descriptive record per snapshot attempt, feeding
//!   the statistics embedded in commit messages.
//! - **ObjectStore**: the transport seam. The production implementation
//!   speaks the hosted Git data API over authenticated HTTPS; tests
//!   substitute an in-memory store.
//! - **RefReconciler**: an explicit state machine advancing the branch
//!   pointer, with at most one forced retry after a non-fast-forward
//!   rejection.
//!
//! ## Consistency model
//!
//! Every object written to the store is immutable and content-addressed;
//! uploading identical content twice yields the same identifier. The
//! branch pointer is the only mutable entity. An abandoned snapshot
//! attempt leaves nothing visible: unreferenced objects are inert. Two
//! concurrent snapshot attempts against the same branch are not
//! serialized by this crate; the later forced update wins. Callers are
//! expected to serialize snapshots per branch.
//!
//! ## Error Handling
//!
//! Operations return `Result<T, GitsnapError>` internally; the engines
//! convert every failure into a terminal result record. The taxonomy
//! distinguishes preflight failures (nothing written), partial upload
//! failures (tolerated while any file succeeds), assembly failures
//! (fatal, nothing half-referenced remains), and reconciliation conflicts
//! (recoverable through a single forced retry).
//!
//! ## Module Organization
//!
//! - [`filter`]: exclusion rules applied to scanned entries
//! - [`scanner`]: recursive directory scanning
//! - [`manifest`]: snapshot manifest and commit message construction
//! - [`store`]: the remote object store trait and its HTTP implementation
//! - [`remote`]: the remote-object-API snapshot engine
//! - [`reconcile`]: the branch pointer state machine
//! - [`local_sync`]: the local working-copy snapshot engine
//! - [`restore`]: reconstructing prior state from recorded snapshots
//! - [`history`]: listing recorded snapshots
//! - [`engine`]: the capability interface and route selection
//! - [`types`]: common data structures
//! - [`error`]: error types and handling

// Public API modules
pub mod engine;
pub mod error;
pub mod filter;
pub mod history;
pub mod local_sync;
pub mod manifest;
pub mod reconcile;
pub mod remote;
pub mod restore;
pub mod scanner;
pub mod store;
pub mod types;

// Internal modules (not part of the public API)
mod git;

// Re-export main types for convenience
pub use engine::{engine_for, SnapshotEngine};
pub use error::{GitsnapError, Result};
pub use filter::PathFilter;
pub use history::{backup_history, BackupHistory};
pub use local_sync::LocalSyncEngine;
pub use manifest::Manifest;
pub use reconcile::{ReconcileState, RefReconciler, RefUpdate};
pub use remote::RemoteSnapshotEngine;
pub use restore::{restore_latest, snapshot_info};
pub use scanner::TreeScanner;
pub use store::{GitHubStore, ObjectStore};
pub use types::*;
