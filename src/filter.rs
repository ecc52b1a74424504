use std::str::FromStr;

use crate::models::{Issue, IssueType, Priority, Status};

/// Board and list filters. Every set predicate must hold for an issue to
/// pass; `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    /// Case-insensitive substring of the title or the content.
    pub search: Option<String>,
    pub issue_type: Option<IssueType>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
}

impl IssueFilter {
    pub fn is_empty(&self) -> bool {
        self.search.as_deref().map_or(true, str::is_empty)
            && self.issue_type.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }

    pub fn matches(&self, issue: &Issue) -> bool {
        if let Some(needle) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            if !issue.title.to_lowercase().contains(&needle)
                && !issue.content.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        self.issue_type.map_or(true, |t| issue.issue_type == t)
            && self.priority.map_or(true, |p| issue.priority == p)
            && self.status.map_or(true, |s| issue.status == s)
    }

    /// Matching issues, in their original order.
    pub fn apply<'a>(&self, issues: &'a [Issue]) -> Vec<&'a Issue> {
        issues.iter().filter(|i| self.matches(i)).collect()
    }
}

/// Parse an enumerated filter option where `all` means no constraint.
pub fn parse_choice<T>(value: Option<&str>) -> Result<Option<T>, String>
where
    T: FromStr<Err = String>,
{
    match value {
        None => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("all") => Ok(None),
        Some(v) => v.parse().map(Some),
    }
}
