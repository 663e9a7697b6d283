//! Branch pointer reconciliation
//!
//! The one stateful step of a snapshot: advancing the tracked branch to
//! the freshly created commit. Modeled as an explicit state machine with a
//! bounded retry, one forced attempt after a non-fast-forward rejection,
//! rather than recursive retries that could loop on a persistently
//! conflicting branch.
//!
//! ```text
//! Unknown -> BranchMissing | BranchPresent(head) -> Updated | Conflict
//!         -> ForcedUpdated | Failed
//! ```
//!
//! Known limitation: two concurrent snapshot attempts against the same
//! branch can interleave between the head read and the update, in which
//! case the later forced update wins. Updates to one branch are expected
//! to be serialized by the caller; this crate does not lock the branch.

use tracing::{debug, info, warn};

use crate::error::{GitsnapError, Result};
use crate::store::ObjectStore;
use crate::types::StatusState;

/// Position of the reconciler in its state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileState {
    /// No branch read performed yet
    Unknown,
    /// The tracked branch does not exist on the remote
    BranchMissing,
    /// The tracked branch exists with the recorded head
    BranchPresent {
        /// Current head commit of the branch
        head: String,
    },
    /// Branch advanced by creation or fast-forward
    Updated,
    /// Fast-forward was rejected; the forced retry is in flight
    Conflict,
    /// Branch advanced by a forced update
    ForcedUpdated,
    /// Reconciliation failed; the snapshot attempt fails with it
    Failed,
}

/// How the branch pointer ended up at the new commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefUpdate {
    /// The branch did not exist and was created
    Created,
    /// The pointer advanced along existing history
    FastForwarded,
    /// The pointer was moved with force after a conflict
    Forced,
}

/// Drives the tracked branch to a new commit
pub struct RefReconciler<'a> {
    store: &'a dyn ObjectStore,
    branch: String,
    force: bool,
    state: ReconcileState,
}

impl<'a> RefReconciler<'a> {
    /// Create a reconciler for a branch
    ///
    /// With `force` set, the fast-forward attempt is skipped and the first
    /// update is already forced.
    pub fn new(store: &'a dyn ObjectStore, branch: impl Into<String>, force: bool) -> Self {
        Self {
            store,
            branch: branch.into(),
            force,
            state: ReconcileState::Unknown,
        }
    }

    /// Current state of the reconciler
    pub fn state(&self) -> &ReconcileState {
        &self.state
    }

    /// Read the branch head before anything is written
    ///
    /// Returns the prior head commit id when the branch exists. A missing
    /// branch is a valid starting state; any other failure (repository
    /// missing, bad credentials) aborts the snapshot attempt before any
    /// object is created.
    pub async fn preflight(&mut self) -> Result<Option<String>> {
        match self.store.branch_head(&self.branch).await {
            Ok(Some(pointer)) => {
                debug!(
                    "branch '{}' present at {}",
                    self.branch, pointer.head_commit_id
                );
                self.state = ReconcileState::BranchPresent {
                    head: pointer.head_commit_id.clone(),
                };
                Ok(Some(pointer.head_commit_id))
            }
            Ok(None) => {
                debug!("branch '{}' missing, will be created", self.branch);
                self.state = ReconcileState::BranchMissing;
                Ok(None)
            }
            Err(err) => {
                self.state = ReconcileState::Failed;
                if err.is_preflight() {
                    Err(err)
                } else {
                    Err(GitsnapError::preflight(err.to_string()))
                }
            }
        }
    }

    /// Advance the branch pointer to the new commit
    ///
    /// Must be called after a successful [`preflight`](Self::preflight).
    /// Performs at most two remote updates: the initial attempt and, on a
    /// non-fast-forward rejection, one forced retry.
    pub async fn advance(&mut self, commit_id: &str) -> Result<RefUpdate> {
        match self.state.clone() {
            ReconcileState::BranchMissing => self.bootstrap(commit_id).await,
            ReconcileState::BranchPresent { .. } => self.update(commit_id).await,
            other => {
                self.state = ReconcileState::Failed;
                Err(GitsnapError::Reconciliation {
                    branch: self.branch.clone(),
                    reason: format!("advance called in state {:?}", other),
                })
            }
        }
    }

    async fn bootstrap(&mut self, commit_id: &str) -> Result<RefUpdate> {
        match self.store.create_branch(&self.branch, commit_id).await {
            Ok(_) => {
                info!("created branch '{}' at {}", self.branch, commit_id);
                self.state = ReconcileState::Updated;
                Ok(RefUpdate::Created)
            }
            Err(err) => {
                // The branch can appear between the head read and here;
                // a forced update resolves that without another read.
                warn!(
                    "branch creation failed ({}), retrying as forced update",
                    err
                );
                self.state = ReconcileState::Conflict;
                self.forced(commit_id).await
            }
        }
    }

    async fn update(&mut self, commit_id: &str) -> Result<RefUpdate> {
        if self.force {
            self.state = ReconcileState::Conflict;
            return self.forced(commit_id).await;
        }
        match self
            .store
            .update_branch(&self.branch, commit_id, false)
            .await
        {
            Ok(_) => {
                info!("fast-forwarded branch '{}' to {}", self.branch, commit_id);
                self.state = ReconcileState::Updated;
                Ok(RefUpdate::FastForwarded)
            }
            Err(GitsnapError::NonFastForward { .. }) => {
                warn!(
                    "fast-forward rejected for branch '{}', retrying with force",
                    self.branch
                );
                self.state = ReconcileState::Conflict;
                self.forced(commit_id).await
            }
            Err(err) => {
                self.state = ReconcileState::Failed;
                Err(err)
            }
        }
    }

    async fn forced(&mut self, commit_id: &str) -> Result<RefUpdate> {
        match self.store.update_branch(&self.branch, commit_id, true).await {
            Ok(_) => {
                info!("force-updated branch '{}' to {}", self.branch, commit_id);
                self.state = ReconcileState::ForcedUpdated;
                Ok(RefUpdate::Forced)
            }
            Err(err) => {
                self.state = ReconcileState::Failed;
                Err(GitsnapError::Reconciliation {
                    branch: self.branch.clone(),
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Attach the operation outcome to the commit as a status marker
    ///
    /// Best effort only: a failure here is logged and never surfaced, the
    /// snapshot already succeeded by the time this runs.
    pub async fn record_status(&self, commit_id: &str, state: StatusState, description: &str) {
        if let Err(err) = self
            .store
            .attach_status(commit_id, state, description)
            .await
        {
            warn!("could not attach status marker to {}: {}", commit_id, err);
        }
    }
}
