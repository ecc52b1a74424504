use anyhow::{anyhow, Result};

use crate::board::truncate;
use crate::filter::{parse_choice, IssueFilter};
use crate::models::Issue;

/// Filter flags shared by `list` and `board`. `all` disables a flag.
#[derive(Debug, Default, Clone)]
pub struct FilterArgs<'a> {
    pub search: Option<&'a str>,
    pub issue_type: Option<&'a str>,
    pub priority: Option<&'a str>,
    pub status: Option<&'a str>,
}

impl FilterArgs<'_> {
    pub fn to_filter(&self) -> Result<IssueFilter> {
        Ok(IssueFilter {
            search: self.search.map(str::to_string),
            issue_type: parse_choice(self.issue_type).map_err(|e| anyhow!(e))?,
            priority: parse_choice(self.priority).map_err(|e| anyhow!(e))?,
            status: parse_choice(self.status).map_err(|e| anyhow!(e))?,
        })
    }
}

pub fn run(issues: &[Issue], args: &FilterArgs<'_>) -> Result<()> {
    let filter = args.to_filter()?;
    let found = filter.apply(issues);

    if found.is_empty() {
        println!("No issues found.");
        return Ok(());
    }

    for issue in found {
        println!("{}", format_row(issue));
    }

    Ok(())
}

fn format_row(issue: &Issue) -> String {
    let status_display = format!("[{}]", issue.status);
    format!(
        "{:8} {:13} {:<40} {:6} {:5} {}",
        issue.short_id(),
        status_display,
        truncate(&issue.title, 40),
        issue.priority,
        issue.issue_type,
        issue.created_at.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueType, Priority, Status};
    use crate::store::tests::new_issue;

    #[test]
    fn test_filter_args_all_means_none() {
        let args = FilterArgs {
            search: Some("login"),
            issue_type: Some("all"),
            priority: Some("high"),
            status: None,
        };
        let filter = args.to_filter().unwrap();
        assert_eq!(filter.search.as_deref(), Some("login"));
        assert_eq!(filter.issue_type, None);
        assert_eq!(filter.priority, Some(Priority::High));
    }

    #[test]
    fn test_filter_args_invalid() {
        let args = FilterArgs {
            status: Some("closed"),
            ..Default::default()
        };
        let err = args.to_filter().unwrap_err();
        assert!(err.to_string().contains("Invalid status"));
    }

    #[test]
    fn test_run_empty_and_filtered() {
        assert!(run(&[], &FilterArgs::default()).is_ok());

        let mut bug = new_issue("Crash on save");
        bug.issue_type = IssueType::Bug;
        let issues = vec![bug, new_issue("Write docs")];
        let args = FilterArgs {
            issue_type: Some("bug"),
            ..Default::default()
        };
        assert!(run(&issues, &args).is_ok());
    }

    #[test]
    fn test_format_row() {
        let mut issue = new_issue("A very long title that keeps going well past the column width");
        issue.status = Status::InProgress;
        let row = format_row(&issue);
        assert!(row.starts_with(issue.short_id()));
        assert!(row.contains("[in-progress]"));
        assert!(row.contains("..."));
        assert!(row.contains("medium"));
        assert!(row.contains("task"));
    }
}
