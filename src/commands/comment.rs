use anyhow::{bail, Result};
use serde_json::json;

use crate::commands::find_issue;
use crate::coordinator::MutationCoordinator;
use crate::models::User;
use crate::store::IssueStore;
use crate::validation::validate_comment;

pub fn run<S: IssueStore>(
    tracker: &mut MutationCoordinator<S>,
    id: &str,
    text: &str,
    author: Option<&User>,
) -> Result<()> {
    let Some(author) = author else {
        bail!("No user configured. Run 'kanban init --force' with --first, --last, --email and --avatar.");
    };

    let id = find_issue(tracker, id)?.id.clone();
    let comment = validate_comment(&json!({ "content": text, "author": author }))?;
    let issue = tracker.add_comment(&id, comment)?;
    println!("Added comment to issue {}", issue.short_id());

    Ok(())
}
