use anyhow::Result;

use crate::commands::find_issue;
use crate::coordinator::MutationCoordinator;
use crate::store::IssueStore;

pub fn run<S: IssueStore>(tracker: &MutationCoordinator<S>, id: &str) -> Result<()> {
    let issue = find_issue(tracker, id)?;

    println!("Issue {}: {}", issue.id, issue.title);
    println!("Status: {}", issue.status.title());
    println!("Priority: {}", issue.priority);
    println!("Type: {}", issue.issue_type);
    if let Some(reporter) = &issue.reporter {
        println!("Reporter: {} <{}>", reporter.display_name(), reporter.email);
    }
    println!("Created: {}", issue.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated: {}", issue.updated_at.format("%Y-%m-%d %H:%M:%S"));

    if !issue.content.is_empty() {
        println!("\nDescription:");
        for line in issue.content.lines() {
            println!("  {}", line);
        }
    }

    if !issue.comments.is_empty() {
        println!("\nComments ({}):", issue.comments.len());
        for comment in &issue.comments {
            println!(
                "  [{}] {}: {}",
                comment.created_at.format("%Y-%m-%d %H:%M"),
                comment.author.display_name(),
                comment.content
            );
        }
    }

    Ok(())
}
