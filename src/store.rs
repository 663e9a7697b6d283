//! Remote object store access
//!
//! The store is a Git-compatible hosting API speaking authenticated HTTPS
//! and JSON. This module defines the [`ObjectStore`] trait, the seam
//! between snapshot orchestration and transport, and [`GitHubStore`], the
//! production implementation backed by `reqwest`.
//!
//! Every request carries a bounded timeout so a single unreachable host
//! cannot hang a snapshot indefinitely. Error responses are classified
//! into the crate error taxonomy: a 404 on the tracked ref is "branch
//! missing" (distinct from repository-not-found, which the preflight check
//! resolves), and a rejected branch update whose message names a
//! fast-forward violation becomes the recoverable
//! [`GitsnapError::NonFastForward`] variant.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::error::{GitsnapError, Result};
use crate::types::{
    BranchPointer, CommitInfo, CommitRef, ObjectRef, RemoteConfig, StatusState, TreeRef,
};

/// Default timeout applied to every individual store request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status-marker context attached to snapshot commits
const STATUS_CONTEXT: &str = "gitsnap";

/// Authentication header scheme, selected by token shape
///
/// Classic personal access tokens use the legacy `token` scheme; every
/// other token shape (fine-grained tokens, OAuth and installation tokens)
/// uses `Bearer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// Legacy `token <value>` header
    Token,
    /// `Bearer <value>` header
    Bearer,
}

impl AuthScheme {
    /// Detect the scheme matching a token's shape
    pub fn detect(token: &str) -> Self {
        if token.starts_with("ghp_") {
            AuthScheme::Token
        } else {
            AuthScheme::Bearer
        }
    }

    fn header_value(&self, token: &str) -> String {
        match self {
            AuthScheme::Token => format!("token {}", token),
            AuthScheme::Bearer => format!("Bearer {}", token),
        }
    }
}

/// Operations the snapshot engines need from a remote object store
///
/// The production implementation is [`GitHubStore`]; tests substitute an
/// in-memory store. All object-creating operations are append-only; only
/// the two branch operations mutate visible state.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Verify the repository exists and the credentials can reach it
    async fn check_repository(&self) -> Result<()>;

    /// Read the current head of a branch
    ///
    /// Returns `Ok(None)` when the branch does not exist (including the
    /// empty-repository case); repository-missing and credential failures
    /// are errors.
    async fn branch_head(&self, branch: &str) -> Result<Option<BranchPointer>>;

    /// Upload file content as an immutable blob, returning its content id
    ///
    /// The id is a pure function of the content: uploading identical bytes
    /// twice yields the same id, and the second upload is a no-op at the
    /// store.
    async fn create_blob(&self, content: &[u8]) -> Result<String>;

    /// Record a tree listing the given entries, optionally layered on a
    /// previous tree
    async fn create_tree(&self, entries: &[ObjectRef], base_tree: Option<&str>) -> Result<TreeRef>;

    /// Record a commit pointing at a tree, with zero or one parent
    async fn create_commit(
        &self,
        message: &str,
        tree_id: &str,
        parent_id: Option<&str>,
    ) -> Result<CommitRef>;

    /// Create a branch pointing directly at a commit
    async fn create_branch(&self, branch: &str, commit_id: &str) -> Result<BranchPointer>;

    /// Move an existing branch pointer to a commit
    ///
    /// Without `force` the store only accepts fast-forward moves; a
    /// rejection surfaces as [`GitsnapError::NonFastForward`].
    async fn update_branch(
        &self,
        branch: &str,
        commit_id: &str,
        force: bool,
    ) -> Result<BranchPointer>;

    /// Attach a status marker to a commit
    async fn attach_status(
        &self,
        commit_id: &str,
        state: StatusState,
        description: &str,
    ) -> Result<()>;

    /// Read an existing commit's metadata
    async fn read_commit(&self, commit_id: &str) -> Result<CommitInfo>;

    /// List the most recent commits reachable from a branch, newest first
    ///
    /// An empty repository yields an empty list, not an error.
    async fn list_commits(&self, branch: &str, limit: usize) -> Result<Vec<CommitInfo>>;
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ShaResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CommitIdentity {
    #[serde(default)]
    name: String,
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GitCommitResponse {
    sha: String,
    #[serde(default)]
    message: String,
    author: Option<CommitIdentity>,
    tree: Option<ShaResponse>,
}

#[derive(Debug, Deserialize)]
struct ListedCommit {
    sha: String,
    commit: ListedCommitBody,
}

#[derive(Debug, Deserialize)]
struct ListedCommitBody {
    message: String,
    author: CommitIdentity,
}

/// Remote store client for the hosted Git data API
#[derive(Debug, Clone)]
pub struct GitHubStore {
    client: Client,
    api_base: String,
    owner: String,
    repository: String,
    auth_header: String,
}

impl GitHubStore {
    /// Build a client for the repository named by the configuration
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("gitsnap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let scheme = AuthScheme::detect(&config.auth_token);
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repository: config.repository.clone(),
            auth_header: scheme.header_value(&config.auth_token),
        })
    }

    fn repo_url(&self) -> String {
        format!("{}/repos/{}/{}", self.api_base, self.owner, self.repository)
    }

    fn url(&self, tail: &str) -> String {
        format!("{}/{}", self.repo_url(), tail)
    }

    fn decorate(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/vnd.github.v3+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn ok_or_error(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .json::<ApiError>()
            .await
            .map(|e| e.message)
            .unwrap_or_default();
        let message = if message.is_empty() {
            "unknown error".to_string()
        } else {
            message
        };
        Err(GitsnapError::Api { status, message })
    }
}

/// Build the JSON body of a tree-creation request
///
/// The `base_tree` key is omitted entirely when there is no previous tree;
/// the store treats a present-but-null key differently from an absent one.
fn tree_request_body(entries: &[ObjectRef], base_tree: Option<&str>) -> serde_json::Value {
    let listed: Vec<serde_json::Value> = entries
        .iter()
        .map(|entry| {
            json!({
                "path": entry.path,
                "mode": entry.mode.as_str(),
                "type": "blob",
                "sha": entry.content_id,
            })
        })
        .collect();
    let mut body = json!({ "tree": listed });
    if let Some(base) = base_tree {
        body["base_tree"] = json!(base);
    }
    body
}

/// Build the JSON body of a commit-creation request
///
/// The `parents` key is omitted when the snapshot has no predecessor.
fn commit_request_body(message: &str, tree_id: &str, parent_id: Option<&str>) -> serde_json::Value {
    let mut body = json!({ "message": message, "tree": tree_id });
    if let Some(parent) = parent_id {
        body["parents"] = json!([parent]);
    }
    body
}

#[async_trait]
impl ObjectStore for GitHubStore {
    async fn check_repository(&self) -> Result<()> {
        let response = self.decorate(self.client.get(self.repo_url())).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GitsnapError::preflight(format!(
                "repository {}/{} not found or not accessible",
                self.owner, self.repository
            )));
        }
        Self::ok_or_error(response).await?;
        Ok(())
    }

    async fn branch_head(&self, branch: &str) -> Result<Option<BranchPointer>> {
        let url = self.url(&format!("git/refs/heads/{}", branch));
        let response = self.decorate(self.client.get(url)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                // The ref endpoint returns 404 both for a missing branch and
                // a missing repository; the repository read tells them apart.
                self.check_repository().await?;
                debug!("branch '{}' not found, repository reachable", branch);
                Ok(None)
            }
            StatusCode::CONFLICT => Ok(None),
            _ => {
                let response = Self::ok_or_error(response).await?;
                let body: RefResponse = response.json().await?;
                Ok(Some(BranchPointer {
                    branch: branch.to_string(),
                    head_commit_id: body.object.sha,
                }))
            }
        }
    }

    async fn create_blob(&self, content: &[u8]) -> Result<String> {
        let body = json!({ "content": BASE64.encode(content), "encoding": "base64" });
        let response = self
            .decorate(self.client.post(self.url("git/blobs")))
            .json(&body)
            .send()
            .await?;
        let response = Self::ok_or_error(response).await?;
        let sha: ShaResponse = response.json().await?;
        Ok(sha.sha)
    }

    async fn create_tree(&self, entries: &[ObjectRef], base_tree: Option<&str>) -> Result<TreeRef> {
        let body = tree_request_body(entries, base_tree);
        let response = self
            .decorate(self.client.post(self.url("git/trees")))
            .json(&body)
            .send()
            .await?;
        let response = Self::ok_or_error(response).await?;
        let sha: ShaResponse = response.json().await?;
        Ok(TreeRef {
            content_id: sha.sha,
        })
    }

    async fn create_commit(
        &self,
        message: &str,
        tree_id: &str,
        parent_id: Option<&str>,
    ) -> Result<CommitRef> {
        let body = commit_request_body(message, tree_id, parent_id);
        let response = self
            .decorate(self.client.post(self.url("git/commits")))
            .json(&body)
            .send()
            .await?;
        let response = Self::ok_or_error(response).await?;
        let created: GitCommitResponse = response.json().await?;
        Ok(CommitRef {
            content_id: created.sha,
            tree_id: tree_id.to_string(),
            parent_id: parent_id.map(str::to_string),
            message: message.to_string(),
            authored_at: created
                .author
                .map(|a| a.date)
                .unwrap_or_else(Utc::now),
        })
    }

    async fn create_branch(&self, branch: &str, commit_id: &str) -> Result<BranchPointer> {
        let body = json!({ "ref": format!("refs/heads/{}", branch), "sha": commit_id });
        let response = self
            .decorate(self.client.post(self.url("git/refs")))
            .json(&body)
            .send()
            .await?;
        let response = Self::ok_or_error(response).await?;
        let created: RefResponse = response.json().await?;
        Ok(BranchPointer {
            branch: branch.to_string(),
            head_commit_id: created.object.sha,
        })
    }

    async fn update_branch(
        &self,
        branch: &str,
        commit_id: &str,
        force: bool,
    ) -> Result<BranchPointer> {
        let url = self.url(&format!("git/refs/heads/{}", branch));
        let body = json!({ "sha": commit_id, "force": force });
        let response = self.decorate(self.client.patch(url)).json(&body).send().await?;
        let response = match Self::ok_or_error(response).await {
            Ok(response) => response,
            Err(GitsnapError::Api { status, message })
                if status == 422 && message.to_lowercase().contains("fast forward") =>
            {
                return Err(GitsnapError::NonFastForward {
                    branch: branch.to_string(),
                });
            }
            Err(other) => return Err(other),
        };
        let updated: RefResponse = response.json().await?;
        Ok(BranchPointer {
            branch: branch.to_string(),
            head_commit_id: updated.object.sha,
        })
    }

    async fn attach_status(
        &self,
        commit_id: &str,
        state: StatusState,
        description: &str,
    ) -> Result<()> {
        let body = json!({
            "state": state.as_str(),
            "description": description,
            "context": STATUS_CONTEXT,
        });
        let response = self
            .decorate(self.client.post(self.url(&format!("statuses/{}", commit_id))))
            .json(&body)
            .send()
            .await?;
        Self::ok_or_error(response).await?;
        Ok(())
    }

    async fn read_commit(&self, commit_id: &str) -> Result<CommitInfo> {
        let url = self.url(&format!("git/commits/{}", commit_id));
        let response = self.decorate(self.client.get(url)).send().await?;
        let response = Self::ok_or_error(response).await?;
        let commit: GitCommitResponse = response.json().await?;
        let (author, date) = commit
            .author
            .map(|a| (a.name, a.date))
            .unwrap_or_else(|| (String::new(), Utc::now()));
        Ok(CommitInfo {
            id: commit.sha,
            message: commit.message,
            author,
            date,
            tree_id: commit.tree.map(|t| t.sha),
        })
    }

    async fn list_commits(&self, branch: &str, limit: usize) -> Result<Vec<CommitInfo>> {
        let url = self.url(&format!("commits?sha={}&per_page={}", branch, limit));
        let response = self.decorate(self.client.get(url)).send().await?;
        if response.status() == StatusCode::CONFLICT {
            // The commit listing answers 409 for a repository with no history.
            return Ok(Vec::new());
        }
        let response = Self::ok_or_error(response).await?;
        let listed: Vec<ListedCommit> = response.json().await?;
        Ok(listed
            .into_iter()
            .map(|c| CommitInfo {
                id: c.sha,
                message: c.commit.message,
                author: c.commit.author.name,
                date: c.commit.author.date,
                tree_id: None,
            })
            .collect())
    }
}
