//! Subcommand handlers. Each one prints its own output and returns
//! `anyhow::Result` so `main` can report failures uniformly.

pub mod board;
pub mod comment;
pub mod create;
pub mod delete;
pub mod export;
pub mod init;
pub mod list;
pub mod show;
pub mod status;
pub mod update;

use anyhow::Result;

use crate::coordinator::MutationCoordinator;
use crate::models::Issue;
use crate::store::IssueStore;

/// Resolve a full id or unique prefix to the issue in the cache.
pub(crate) fn find_issue<'a, S: IssueStore>(
    tracker: &'a MutationCoordinator<S>,
    prefix: &str,
) -> Result<&'a Issue> {
    let id = tracker.store().resolve_id(prefix)?;
    match tracker.cache().get(&id) {
        Some(issue) => Ok(issue),
        None => Err(crate::error::Error::not_found(id).into()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::coordinator::MutationCoordinator;
    use crate::store::{IssueStore, JsonFileStore, SqliteStore};
    use tempfile::tempdir;

    pub(crate) fn setup_json() -> (MutationCoordinator<JsonFileStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(&dir.path().join("issues.json")).unwrap();
        (MutationCoordinator::load(store).unwrap(), dir)
    }

    pub(crate) fn setup_sqlite() -> (MutationCoordinator<SqliteStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("issues.db")).unwrap();
        (MutationCoordinator::load(store).unwrap(), dir)
    }

    pub(crate) fn seed<S: IssueStore>(tracker: &mut MutationCoordinator<S>, title: &str) -> String {
        tracker
            .create_issue(crate::validation::CreateIssueInput::new(title))
            .unwrap()
            .id
    }
}
