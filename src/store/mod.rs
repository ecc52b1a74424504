//! Persistence media for the issue list.
//!
//! Every backend honours the same contract: `list` returns issues newest
//! first, `create` prepends, `update`/`add_comment` fail with
//! [`Error::NotFound`] for unknown ids, and `delete` of an unknown id is a
//! no-op. Each call is atomic from the caller's side; nothing serializes
//! separate calls, so two writers racing on the same medium get
//! last-write-wins.

mod json_file;
mod memory;
mod sqlite;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::models::{Comment, Issue};
use crate::validation::UpdateIssueInput;

pub trait IssueStore {
    fn list(&self) -> Result<Vec<Issue>>;

    fn create(&self, issue: Issue) -> Result<()>;

    fn update(&self, id: &str, patch: &UpdateIssueInput) -> Result<Issue>;

    fn delete(&self, id: &str) -> Result<()>;

    fn add_comment(&self, issue_id: &str, comment: Comment) -> Result<Issue>;

    fn get(&self, id: &str) -> Result<Option<Issue>> {
        Ok(self.list()?.into_iter().find(|i| i.id == id))
    }

    /// Resolve a full id or a unique id prefix to the stored id.
    fn resolve_id(&self, prefix: &str) -> Result<String> {
        let issues = self.list()?;
        if issues.iter().any(|i| i.id == prefix) {
            return Ok(prefix.to_string());
        }
        let matches: Vec<&Issue> = issues.iter().filter(|i| i.id.starts_with(prefix)).collect();
        match matches.as_slice() {
            [] => Err(Error::not_found(prefix)),
            [only] => Ok(only.id.clone()),
            many => Err(Error::AmbiguousId {
                prefix: prefix.to_string(),
                count: many.len(),
            }),
        }
    }
}

impl<S: IssueStore + ?Sized> IssueStore for Box<S> {
    fn list(&self) -> Result<Vec<Issue>> {
        (**self).list()
    }

    fn create(&self, issue: Issue) -> Result<()> {
        (**self).create(issue)
    }

    fn update(&self, id: &str, patch: &UpdateIssueInput) -> Result<Issue> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: &str) -> Result<()> {
        (**self).delete(id)
    }

    fn add_comment(&self, issue_id: &str, comment: Comment) -> Result<Issue> {
        (**self).add_comment(issue_id, comment)
    }

    fn get(&self, id: &str) -> Result<Option<Issue>> {
        (**self).get(id)
    }
}

// Whole-list mutations shared by the backends that rewrite the full list.

pub(crate) fn update_in_list(
    issues: &mut [Issue],
    id: &str,
    patch: &UpdateIssueInput,
    now: DateTime<Utc>,
) -> Result<Issue> {
    let issue = issues
        .iter_mut()
        .find(|i| i.id == id)
        .ok_or_else(|| Error::not_found(id))?;
    patch.apply_to(issue, now);
    Ok(issue.clone())
}

pub(crate) fn comment_in_list(
    issues: &mut [Issue],
    issue_id: &str,
    comment: Comment,
    now: DateTime<Utc>,
) -> Result<Issue> {
    let issue = issues
        .iter_mut()
        .find(|i| i.id == issue_id)
        .ok_or_else(|| Error::not_found(issue_id))?;
    issue.comments.insert(0, comment);
    issue.touch(now);
    Ok(issue.clone())
}
