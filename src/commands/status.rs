use anyhow::{anyhow, Result};

use crate::board::{locate, plan_drop, DropResult, Position};
use crate::commands::find_issue;
use crate::coordinator::MutationCoordinator;
use crate::models::{short_id, Status};
use crate::store::IssueStore;

/// Move an issue to `status`, the way dropping a card on a column does.
/// `index` defaults to the end of the destination column.
pub fn run<S: IssueStore>(
    tracker: &mut MutationCoordinator<S>,
    id: &str,
    status: &str,
    index: Option<usize>,
) -> Result<()> {
    let status: Status = status.parse().map_err(|e: String| anyhow!(e))?;
    let id = find_issue(tracker, id)?.id.clone();

    let source = locate(tracker.issues(), &id).ok_or_else(|| anyhow!("Issue {} not found", id))?;
    let index = index.unwrap_or_else(|| {
        tracker
            .issues()
            .iter()
            .filter(|i| i.status == status)
            .count()
    });
    let drop = DropResult {
        issue_id: id,
        source,
        destination: Some(Position {
            column: status,
            index,
        }),
    };

    let Some(intent) = plan_drop(&drop) else {
        println!("Issue {} is already in {}", short_id(&drop.issue_id), status.title());
        return Ok(());
    };

    tracker.mutate(intent)?;
    println!("Moved issue {} to {}", short_id(&drop.issue_id), status.title());
    Ok(())
}
