//! Integration tests for the remote-object-API snapshot path
//!
//! These run the full engine pipeline (scan, upload, assemble, commit,
//! reconcile) against the in-memory store, which implements real
//! content-addressing and fast-forward semantics.

use crate::support::InMemoryStore;
use gitsnap::engine::SnapshotEngine;
use gitsnap::{
    backup_history, BackupOptions, ObjectStore, RemoteConfig, RemoteSnapshotEngine,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn touch(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn config() -> RemoteConfig {
    RemoteConfig::new("acme", "widgets", "ghp_test").with_branch("backups")
}

fn engine(store: &Arc<InMemoryStore>, root: &Path) -> RemoteSnapshotEngine {
    engine_with_options(store, root, BackupOptions::default())
}

fn engine_with_options(
    store: &Arc<InMemoryStore>,
    root: &Path,
    options: BackupOptions,
) -> RemoteSnapshotEngine {
    let store: Arc<dyn ObjectStore> = store.clone();
    RemoteSnapshotEngine::with_store(store, config(), root, options).unwrap()
}

#[tokio::test]
async fn test_first_snapshot_bootstraps_branch() {
    let root = TempDir::new().unwrap();
    touch(&root.path().join("package.json"), "{}");
    touch(&root.path().join("src/index.ts"), "export {}");

    let store = Arc::new(InMemoryStore::new());
    let result = engine(&store, root.path()).backup().await;

    assert!(result.succeeded, "{:?}", result.error);
    assert!(result.branch_created);
    assert!(!result.forced);
    assert_eq!(result.file_count, Some(2));

    // A subsequent branch read returns the new commit.
    let commit_id = result.commit_id.unwrap();
    assert_eq!(store.branch("backups").as_deref(), Some(commit_id.as_str()));

    // The first snapshot has no parent.
    let commit = store.commit(&commit_id).unwrap();
    assert_eq!(commit.parent_id, None);

    // The tree lists exactly the scanned files.
    let mut paths: Vec<String> = store
        .tree_entries(&commit.tree_id)
        .iter()
        .map(|e| e.path.clone())
        .collect();
    paths.sort();
    assert_eq!(paths, vec!["package.json", "src/index.ts"]);
}

#[tokio::test]
async fn test_second_snapshot_fast_forwards() {
    let root = TempDir::new().unwrap();
    touch(&root.path().join("a.txt"), "one");

    let store = Arc::new(InMemoryStore::new());
    let first = engine(&store, root.path()).backup().await;
    assert!(first.succeeded);

    touch(&root.path().join("a.txt"), "two");
    let second = engine(&store, root.path()).backup().await;
    assert!(second.succeeded, "{:?}", second.error);
    assert!(!second.branch_created);
    assert!(!second.forced);

    let second_id = second.commit_id.unwrap();
    assert_eq!(store.branch("backups").as_deref(), Some(second_id.as_str()));
    assert_eq!(
        store.commit(&second_id).unwrap().parent_id,
        first.commit_id,
        "the new snapshot chains onto the prior head"
    );
}

#[tokio::test]
async fn test_content_addressing_is_idempotent() {
    let store = InMemoryStore::new();
    let first = store.create_blob(b"identical bytes").await.unwrap();
    let second = store.create_blob(b"identical bytes").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(store.blobs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_identical_files_share_one_blob() {
    let root = TempDir::new().unwrap();
    touch(&root.path().join("a.txt"), "same content");
    touch(&root.path().join("b.txt"), "same content");

    let store = Arc::new(InMemoryStore::new());
    let result = engine(&store, root.path()).backup().await;
    assert!(result.succeeded);

    let commit = store.commit(&result.commit_id.unwrap()).unwrap();
    let entries = store.tree_entries(&commit.tree_id);
    assert_eq!(entries.len(), 2);
    assert_eq!(
        entries[0].content_id, entries[1].content_id,
        "identical content yields the identical identifier"
    );
    assert_eq!(store.blobs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_externally_advanced_branch_is_force_updated() {
    let root = TempDir::new().unwrap();
    touch(&root.path().join("a.txt"), "one");

    let store = Arc::new(InMemoryStore::new());
    let first = engine(&store, root.path()).backup().await;
    assert!(first.succeeded);

    // A concurrent writer moves the branch onto unrelated history after
    // this engine reads the head but before it updates the reference.
    let external = store.external_commit("feat: unrelated work", None);
    *store.branch_move_on_commit.lock().unwrap() =
        Some(("backups".to_string(), external.clone()));

    touch(&root.path().join("a.txt"), "two");
    let second = engine(&store, root.path()).backup().await;
    assert!(second.succeeded, "{:?}", second.error);
    assert!(
        second.forced,
        "the fast-forward rejection is recovered through a forced update"
    );
    assert_eq!(
        store.branch("backups"),
        second.commit_id,
        "the branch head ends at the new snapshot"
    );
}

#[tokio::test]
async fn test_empty_tree_is_rejected_before_any_write() {
    let root = TempDir::new().unwrap();
    let store = Arc::new(InMemoryStore::new());

    let result = engine(&store, root.path()).backup().await;
    assert!(!result.succeeded);
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("no eligible files"));

    // Only the preflight branch read reached the store.
    let calls = store.calls.lock().unwrap().clone();
    assert_eq!(calls, vec!["branch_head"]);
}

#[tokio::test]
async fn test_failed_upload_is_absent_from_tree() {
    let root = TempDir::new().unwrap();
    touch(&root.path().join("good.txt"), "fine");
    touch(&root.path().join("bad.txt"), "poisoned");

    let store = Arc::new(InMemoryStore::new());
    store
        .failing_contents
        .lock()
        .unwrap()
        .push(b"poisoned".to_vec());

    let result = engine(&store, root.path()).backup().await;
    assert!(result.succeeded, "{:?}", result.error);

    let commit = store.commit(&result.commit_id.unwrap()).unwrap();
    let entries = store.tree_entries(&commit.tree_id);
    let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["good.txt"]);
}

#[tokio::test]
async fn test_all_uploads_failing_fails_the_snapshot() {
    let root = TempDir::new().unwrap();
    touch(&root.path().join("only.txt"), "poisoned");

    let store = Arc::new(InMemoryStore::new());
    store
        .failing_contents
        .lock()
        .unwrap()
        .push(b"poisoned".to_vec());

    let result = engine(&store, root.path()).backup().await;
    assert!(!result.succeeded);
    assert!(result.error.as_deref().unwrap().contains("nothing to upload"));
    assert!(store.branch("backups").is_none(), "no branch was touched");
}

#[tokio::test]
async fn test_force_option_forces_first_update() {
    let root = TempDir::new().unwrap();
    touch(&root.path().join("a.txt"), "one");

    let store = Arc::new(InMemoryStore::new());
    let first = engine(&store, root.path()).backup().await;
    assert!(first.succeeded);

    touch(&root.path().join("a.txt"), "two");
    let options = BackupOptions {
        use_local_sync: false,
        force: true,
    };
    let second = engine_with_options(&store, root.path(), options)
        .backup()
        .await;
    assert!(second.succeeded);
    assert!(second.forced);
}

#[tokio::test]
async fn test_status_marker_is_attached_on_success() {
    let root = TempDir::new().unwrap();
    touch(&root.path().join("a.txt"), "one");

    let store = Arc::new(InMemoryStore::new());
    let result = engine(&store, root.path()).backup().await;
    assert!(result.succeeded);

    let statuses = store.statuses.lock().unwrap().clone();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].0, result.commit_id.unwrap());
    assert_eq!(statuses[0].1, "success");
}

#[tokio::test]
async fn test_history_lists_snapshot_commits() {
    let root = TempDir::new().unwrap();
    touch(&root.path().join("a.txt"), "one");

    let store = Arc::new(InMemoryStore::new());
    let first = engine(&store, root.path()).backup().await;
    assert!(first.succeeded);
    touch(&root.path().join("a.txt"), "two");
    let second = engine(&store, root.path()).backup().await;
    assert!(second.succeeded);

    let history = backup_history(store.as_ref(), "backups", 50).await.unwrap();
    assert!(history.snapshots_only);
    assert_eq!(history.entries.len(), 2);
    assert_eq!(history.entries[0].id, second.commit_id.unwrap());
    assert!(history.entries[0].message.starts_with("Backup:"));
}

#[tokio::test]
async fn test_history_falls_back_to_recent_activity() {
    let store = InMemoryStore::new();
    let base = store.external_commit("feat: initial import", None);
    let head = store.external_commit("fix: typo", Some(&base));
    store.set_branch("backups", &head);

    let history = backup_history(&store, "backups", 50).await.unwrap();
    assert!(!history.snapshots_only);
    assert_eq!(history.entries.len(), 2);
}

#[tokio::test]
async fn test_history_of_empty_branch_is_empty() {
    let store = InMemoryStore::new();
    let history = backup_history(&store, "backups", 50).await.unwrap();
    assert!(history.snapshots_only);
    assert!(history.entries.is_empty());
}
