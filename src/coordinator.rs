//! Optimistic mutation protocol over a client-side view of the issue list.
//!
//! Each write moves through four phases:
//!
//! ```text
//! begin()     snapshot cache -> apply intended end state to cache
//! dispatch()  write to the store
//! settle()    ok:  keep cache, invalidate
//!             err: restore snapshot, invalidate
//!             when nothing else is in flight: re-fetch from the store
//! ```
//!
//! Every mutation kind rolls back to its own full snapshot. Snapshots are
//! taken at `begin`, so with interleaved mutations a failing one can wipe
//! another's optimistic change from the cache; the re-fetch after the last
//! settle brings back whatever the store actually committed. Two failures
//! racing each other can still leave a stale view until the next refresh.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::error::Result;
use crate::models::{Comment, Issue, Status};
use crate::store::IssueStore;
use crate::validation::{CreateIssueInput, NewComment, UpdateIssueInput};

/// A write the caller wants applied to the issue list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationIntent {
    ChangeStatus { id: String, status: Status },
    Update { id: String, patch: UpdateIssueInput },
    Delete { id: String },
    Create { issue: Issue },
    AddComment { issue_id: String, comment: Comment },
}

impl MutationIntent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChangeStatus { .. } => "change-status",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Create { .. } => "create",
            Self::AddComment { .. } => "add-comment",
        }
    }

    /// Id of the issue the intent touches.
    pub fn target(&self) -> &str {
        match self {
            Self::ChangeStatus { id, .. } | Self::Update { id, .. } | Self::Delete { id } => id,
            Self::Create { issue } => &issue.id,
            Self::AddComment { issue_id, .. } => issue_id,
        }
    }
}

/// Client-side view of the full issue list, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueCache {
    issues: Vec<Issue>,
}

impl IssueCache {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn get(&self, id: &str) -> Option<&Issue> {
        self.issues.iter().find(|i| i.id == id)
    }

    pub fn replace(&mut self, issues: Vec<Issue>) {
        self.issues = issues;
    }
}

/// Pre-mutation snapshot, able to put the cache back the way it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollback {
    previous: Vec<Issue>,
}

impl Rollback {
    pub fn snapshot(&self) -> &[Issue] {
        &self.previous
    }

    pub fn restore(self, cache: &mut IssueCache) {
        cache.replace(self.previous);
    }
}

/// Compute the optimistic next state for `intent` without touching any
/// store. Intents aimed at an id missing from `current` leave the list as
/// it is; the store will report the miss.
pub fn apply_optimistic(
    current: &[Issue],
    intent: &MutationIntent,
    now: DateTime<Utc>,
) -> (Vec<Issue>, Rollback) {
    let rollback = Rollback {
        previous: current.to_vec(),
    };
    let mut next = current.to_vec();

    match intent {
        MutationIntent::ChangeStatus { id, status } => {
            if let Some(issue) = next.iter_mut().find(|i| &i.id == id) {
                issue.status = *status;
                issue.touch(now);
            }
        }
        MutationIntent::Update { id, patch } => {
            if let Some(issue) = next.iter_mut().find(|i| &i.id == id) {
                patch.apply_to(issue, now);
            }
        }
        MutationIntent::Delete { id } => next.retain(|i| &i.id != id),
        MutationIntent::Create { issue } => next.insert(0, issue.clone()),
        MutationIntent::AddComment { issue_id, comment } => {
            if let Some(issue) = next.iter_mut().find(|i| &i.id == issue_id) {
                issue.comments.insert(0, comment.clone());
                issue.touch(now);
            }
        }
    }

    (next, rollback)
}

/// A mutation that has been applied to the cache but not yet settled.
///
/// Consumed by [`MutationCoordinator::settle`], so it settles exactly once.
#[derive(Debug)]
pub struct PendingMutation {
    seq: u64,
    intent: MutationIntent,
    rollback: Rollback,
}

impl PendingMutation {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn intent(&self) -> &MutationIntent {
        &self.intent
    }

    pub fn rollback(&self) -> &Rollback {
        &self.rollback
    }
}

/// What happened when a mutation settled.
#[derive(Debug)]
pub struct Settled {
    pub seq: u64,
    /// The store's answer: the stored issue for update/comment writes.
    pub result: Result<Option<Issue>>,
    pub rolled_back: bool,
    /// A re-fetch ran and replaced the cache.
    pub reconciled: bool,
}

pub struct MutationCoordinator<S> {
    store: S,
    cache: IssueCache,
    next_seq: u64,
    in_flight: BTreeSet<u64>,
    stale: bool,
}

impl<S: IssueStore> MutationCoordinator<S> {
    /// Coordinator with an empty, stale cache. Call [`refresh`](Self::refresh)
    /// or use [`load`](Self::load) to populate it.
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: IssueCache::default(),
            next_seq: 0,
            in_flight: BTreeSet::new(),
            stale: true,
        }
    }

    /// Coordinator with the cache filled from the store.
    pub fn load(store: S) -> Result<Self> {
        let mut coordinator = Self::new(store);
        coordinator.cache.replace(coordinator.store.list()?);
        coordinator.stale = false;
        Ok(coordinator)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &IssueCache {
        &self.cache
    }

    pub fn issues(&self) -> &[Issue] {
        self.cache.issues()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Re-fetch from the store. A failed read is logged and leaves the
    /// cache as it was.
    pub fn refresh(&mut self) -> bool {
        match self.store.list() {
            Ok(issues) => {
                tracing::debug!(count = issues.len(), "reconciled issue cache");
                self.cache.replace(issues);
                self.stale = false;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to reconcile issue cache");
                false
            }
        }
    }

    /// Phases 1 and 2: snapshot, then apply the intent to the cache.
    pub fn begin(&mut self, intent: MutationIntent) -> PendingMutation {
        let seq = self.next_seq;
        self.next_seq += 1;

        let (next, rollback) = apply_optimistic(self.cache.issues(), &intent, Utc::now());
        self.cache.replace(next);
        self.in_flight.insert(seq);

        tracing::debug!(seq, kind = intent.kind(), issue = intent.target(), "applied optimistic mutation");
        PendingMutation {
            seq,
            intent,
            rollback,
        }
    }

    /// Phase 3: perform the write against the store.
    pub fn dispatch(&self, pending: &PendingMutation) -> Result<Option<Issue>> {
        match &pending.intent {
            MutationIntent::ChangeStatus { id, status } => self
                .store
                .update(id, &UpdateIssueInput::status(*status))
                .map(Some),
            MutationIntent::Update { id, patch } => self.store.update(id, patch).map(Some),
            MutationIntent::Delete { id } => self.store.delete(id).map(|()| None),
            MutationIntent::Create { issue } => self.store.create(issue.clone()).map(|()| None),
            MutationIntent::AddComment { issue_id, comment } => {
                self.store.add_comment(issue_id, comment.clone()).map(Some)
            }
        }
    }

    /// Phase 4: roll back on failure, invalidate, and re-fetch once no other
    /// mutation is in flight.
    pub fn settle(&mut self, pending: PendingMutation, result: Result<Option<Issue>>) -> Settled {
        let PendingMutation {
            seq,
            intent,
            rollback,
        } = pending;

        self.in_flight.remove(&seq);
        self.stale = true;

        let rolled_back = match &result {
            Ok(_) => false,
            Err(e) => {
                tracing::warn!(seq, kind = intent.kind(), issue = intent.target(), error = %e, "mutation failed, rolling back");
                rollback.restore(&mut self.cache);
                true
            }
        };

        let reconciled = self.in_flight.is_empty() && self.refresh();

        Settled {
            seq,
            result,
            rolled_back,
            reconciled,
        }
    }

    /// Run one mutation through all phases.
    pub fn mutate(&mut self, intent: MutationIntent) -> Result<Option<Issue>> {
        let pending = self.begin(intent);
        let result = self.dispatch(&pending);
        self.settle(pending, result).result
    }

    /// Validate and create an issue. Validation failures reach neither the
    /// cache nor the store.
    pub fn create_issue(&mut self, input: CreateIssueInput) -> Result<Issue> {
        input.validate()?;
        let issue = input.into_issue(Utc::now());
        self.mutate(MutationIntent::Create {
            issue: issue.clone(),
        })?;
        Ok(issue)
    }

    pub fn change_status(&mut self, id: &str, status: Status) -> Result<Issue> {
        let updated = self.mutate(MutationIntent::ChangeStatus {
            id: id.to_string(),
            status,
        })?;
        self.expect_issue(id, updated)
    }

    pub fn update_issue(&mut self, id: &str, patch: UpdateIssueInput) -> Result<Issue> {
        patch.validate()?;
        let updated = self.mutate(MutationIntent::Update {
            id: id.to_string(),
            patch,
        })?;
        self.expect_issue(id, updated)
    }

    pub fn delete_issue(&mut self, id: &str) -> Result<()> {
        self.mutate(MutationIntent::Delete { id: id.to_string() })?;
        Ok(())
    }

    pub fn add_comment(&mut self, issue_id: &str, comment: NewComment) -> Result<Issue> {
        comment.validate()?;
        let updated = self.mutate(MutationIntent::AddComment {
            issue_id: issue_id.to_string(),
            comment: comment.into_comment(Utc::now()),
        })?;
        self.expect_issue(issue_id, updated)
    }

    fn expect_issue(&self, id: &str, returned: Option<Issue>) -> Result<Issue> {
        match returned {
            Some(issue) => Ok(issue),
            None => self
                .cache
                .get(id)
                .cloned()
                .ok_or_else(|| crate::error::Error::not_found(id)),
        }
    }
}
