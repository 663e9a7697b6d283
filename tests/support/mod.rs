//! Shared test support: an in-memory object store
//!
//! Implements the store contract the snapshot engines depend on, with
//! content-addressed identifiers and real fast-forward semantics, so the
//! remote path can be exercised end-to-end without a network.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gitsnap::{
    BranchPointer, CommitInfo, GitsnapError, ObjectRef, ObjectStore, StatusState, TreeRef,
};
use gitsnap::types::CommitRef;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct StoredCommit {
    pub tree_id: String,
    pub parent_id: Option<String>,
    pub message: String,
    pub date: DateTime<Utc>,
}

/// In-memory object store with content-addressed identifiers
#[derive(Default)]
pub struct InMemoryStore {
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
    pub trees: Mutex<HashMap<String, Vec<ObjectRef>>>,
    pub commits: Mutex<HashMap<String, StoredCommit>>,
    pub branches: Mutex<HashMap<String, String>>,
    pub statuses: Mutex<Vec<(String, String)>>,
    /// Blob contents that fail to upload, for partial-failure tests
    pub failing_contents: Mutex<Vec<Vec<u8>>>,
    /// Branch move applied when the next commit is created, simulating a
    /// concurrent writer advancing the branch between the engine's head
    /// read and its reference update
    pub branch_move_on_commit: Mutex<Option<(String, String)>>,
    /// Every trait call in order, for call-sequence assertions
    pub calls: Mutex<Vec<&'static str>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn hash(parts: &[&[u8]]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        format!("{:x}", hasher.finalize())
    }

    /// Record a commit directly, bypassing the engine (external history)
    pub fn external_commit(
        &self,
        message: &str,
        parent_id: Option<&str>,
    ) -> String {
        let tree_id = Self::hash(&[b"external-tree".as_slice(), message.as_bytes()]);
        let id = Self::hash(&[
            b"commit".as_slice(),
            tree_id.as_bytes(),
            parent_id.unwrap_or("").as_bytes(),
            message.as_bytes(),
        ]);
        self.commits.lock().unwrap().insert(
            id.clone(),
            StoredCommit {
                tree_id,
                parent_id: parent_id.map(str::to_string),
                message: message.to_string(),
                date: Utc::now(),
            },
        );
        id
    }

    /// Move a branch pointer directly, bypassing the engine
    pub fn set_branch(&self, branch: &str, commit_id: &str) {
        self.branches
            .lock()
            .unwrap()
            .insert(branch.to_string(), commit_id.to_string());
    }

    pub fn branch(&self, branch: &str) -> Option<String> {
        self.branches.lock().unwrap().get(branch).cloned()
    }

    pub fn tree_entries(&self, tree_id: &str) -> Vec<ObjectRef> {
        self.trees
            .lock()
            .unwrap()
            .get(tree_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn commit(&self, commit_id: &str) -> Option<StoredCommit> {
        self.commits.lock().unwrap().get(commit_id).cloned()
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        let commits = self.commits.lock().unwrap();
        let mut cursor = Some(descendant.to_string());
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = commits.get(&id).and_then(|c| c.parent_id.clone());
        }
        false
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn check_repository(&self) -> gitsnap::Result<()> {
        self.record("check_repository");
        Ok(())
    }

    async fn branch_head(&self, branch: &str) -> gitsnap::Result<Option<BranchPointer>> {
        self.record("branch_head");
        Ok(self.branch(branch).map(|head| BranchPointer {
            branch: branch.to_string(),
            head_commit_id: head,
        }))
    }

    async fn create_blob(&self, content: &[u8]) -> gitsnap::Result<String> {
        self.record("create_blob");
        if self
            .failing_contents
            .lock()
            .unwrap()
            .iter()
            .any(|c| c == content)
        {
            return Err(GitsnapError::Api {
                status: 500,
                message: "injected upload failure".to_string(),
            });
        }
        let id = Self::hash(&[b"blob".as_slice(), content]);
        self.blobs
            .lock()
            .unwrap()
            .insert(id.clone(), content.to_vec());
        Ok(id)
    }

    async fn create_tree(
        &self,
        entries: &[ObjectRef],
        base_tree: Option<&str>,
    ) -> gitsnap::Result<TreeRef> {
        self.record("create_tree");
        // Layer over the base tree: new entries win by path.
        let mut merged: HashMap<String, ObjectRef> = HashMap::new();
        if let Some(base) = base_tree {
            for entry in self.tree_entries(base) {
                merged.insert(entry.path.clone(), entry);
            }
        }
        for entry in entries {
            merged.insert(entry.path.clone(), entry.clone());
        }
        let mut listed: Vec<ObjectRef> = merged.into_values().collect();
        listed.sort_by(|a, b| a.path.cmp(&b.path));

        let mut parts: Vec<Vec<u8>> = vec![b"tree".to_vec()];
        for entry in &listed {
            parts.push(entry.path.clone().into_bytes());
            parts.push(entry.content_id.clone().into_bytes());
        }
        let borrowed: Vec<&[u8]> = parts.iter().map(|p| p.as_slice()).collect();
        let id = Self::hash(&borrowed);
        self.trees.lock().unwrap().insert(id.clone(), listed);
        Ok(TreeRef { content_id: id })
    }

    async fn create_commit(
        &self,
        message: &str,
        tree_id: &str,
        parent_id: Option<&str>,
    ) -> gitsnap::Result<CommitRef> {
        self.record("create_commit");
        if let Some(parent) = parent_id {
            if !self.commits.lock().unwrap().contains_key(parent) {
                return Err(GitsnapError::Api {
                    status: 422,
                    message: format!("parent commit {} does not exist", parent),
                });
            }
        }
        let id = Self::hash(&[
            b"commit".as_slice(),
            tree_id.as_bytes(),
            parent_id.unwrap_or("").as_bytes(),
            message.as_bytes(),
        ]);
        let date = Utc::now();
        self.commits.lock().unwrap().insert(
            id.clone(),
            StoredCommit {
                tree_id: tree_id.to_string(),
                parent_id: parent_id.map(str::to_string),
                message: message.to_string(),
                date,
            },
        );
        if let Some((branch, moved_to)) = self.branch_move_on_commit.lock().unwrap().take() {
            self.set_branch(&branch, &moved_to);
        }
        Ok(CommitRef {
            content_id: id,
            tree_id: tree_id.to_string(),
            parent_id: parent_id.map(str::to_string),
            message: message.to_string(),
            authored_at: date,
        })
    }

    async fn create_branch(&self, branch: &str, commit_id: &str) -> gitsnap::Result<BranchPointer> {
        self.record("create_branch");
        let mut branches = self.branches.lock().unwrap();
        if branches.contains_key(branch) {
            return Err(GitsnapError::Api {
                status: 422,
                message: "Reference already exists".to_string(),
            });
        }
        branches.insert(branch.to_string(), commit_id.to_string());
        Ok(BranchPointer {
            branch: branch.to_string(),
            head_commit_id: commit_id.to_string(),
        })
    }

    async fn update_branch(
        &self,
        branch: &str,
        commit_id: &str,
        force: bool,
    ) -> gitsnap::Result<BranchPointer> {
        self.record("update_branch");
        let current = self.branch(branch);
        if let Some(current) = current {
            if !force && !self.is_ancestor(&current, commit_id) {
                return Err(GitsnapError::NonFastForward {
                    branch: branch.to_string(),
                });
            }
        }
        self.set_branch(branch, commit_id);
        Ok(BranchPointer {
            branch: branch.to_string(),
            head_commit_id: commit_id.to_string(),
        })
    }

    async fn attach_status(
        &self,
        commit_id: &str,
        state: StatusState,
        _description: &str,
    ) -> gitsnap::Result<()> {
        self.record("attach_status");
        self.statuses
            .lock()
            .unwrap()
            .push((commit_id.to_string(), state.as_str().to_string()));
        Ok(())
    }

    async fn read_commit(&self, commit_id: &str) -> gitsnap::Result<CommitInfo> {
        self.record("read_commit");
        let commit = self.commit(commit_id).ok_or_else(|| GitsnapError::Api {
            status: 404,
            message: "commit not found".to_string(),
        })?;
        Ok(CommitInfo {
            id: commit_id.to_string(),
            message: commit.message,
            author: "in-memory".to_string(),
            date: commit.date,
            tree_id: Some(commit.tree_id),
        })
    }

    async fn list_commits(&self, branch: &str, limit: usize) -> gitsnap::Result<Vec<CommitInfo>> {
        self.record("list_commits");
        let mut listed = Vec::new();
        let mut cursor = self.branch(branch);
        while let Some(id) = cursor {
            if listed.len() >= limit {
                break;
            }
            let Some(commit) = self.commit(&id) else {
                break;
            };
            listed.push(CommitInfo {
                id: id.clone(),
                message: commit.message.clone(),
                author: "in-memory".to_string(),
                date: commit.date,
                tree_id: Some(commit.tree_id.clone()),
            });
            cursor = commit.parent_id;
        }
        Ok(listed)
    }
}
