use chrono::Utc;
use std::sync::{Mutex, MutexGuard};

use super::{comment_in_list, update_in_list, IssueStore};
use crate::error::{PersistenceError, Result};
use crate::models::{Comment, Issue};
use crate::validation::UpdateIssueInput;

/// Ephemeral store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    issues: Mutex<Vec<Issue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with an existing list, newest first.
    pub fn with_issues(issues: Vec<Issue>) -> Self {
        Self {
            issues: Mutex::new(issues),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Issue>>> {
        self.issues
            .lock()
            .map_err(|_| PersistenceError::Poisoned.into())
    }
}

impl IssueStore for MemoryStore {
    fn list(&self) -> Result<Vec<Issue>> {
        Ok(self.lock()?.clone())
    }

    fn create(&self, issue: Issue) -> Result<()> {
        self.lock()?.insert(0, issue);
        Ok(())
    }

    fn update(&self, id: &str, patch: &UpdateIssueInput) -> Result<Issue> {
        update_in_list(&mut self.lock()?, id, patch, Utc::now())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.lock()?.retain(|i| i.id != id);
        Ok(())
    }

    fn add_comment(&self, issue_id: &str, comment: Comment) -> Result<Issue> {
        comment_in_list(&mut self.lock()?, issue_id, comment, Utc::now())
    }
}
