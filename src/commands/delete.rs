use anyhow::Result;
use std::io::{self, Write};

use crate::commands::find_issue;
use crate::coordinator::MutationCoordinator;
use crate::models::short_id;
use crate::store::IssueStore;

pub fn run<S: IssueStore>(tracker: &mut MutationCoordinator<S>, id: &str, force: bool) -> Result<()> {
    let issue = find_issue(tracker, id)?;
    let (id, title) = (issue.id.clone(), issue.title.clone());

    if !force {
        print!("Delete issue \"{}\"? [y/N] ", title);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    tracker.delete_issue(&id)?;
    println!("Deleted issue {}", short_id(&id));

    Ok(())
}

/// Internal function for testing without stdin interaction
#[cfg(test)]
pub fn run_force<S: IssueStore>(tracker: &mut MutationCoordinator<S>, id: &str) -> Result<()> {
    run(tracker, id, true)
}
