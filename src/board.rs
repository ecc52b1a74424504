//! Column grouping and drag-and-drop planning for the board view.

use std::fmt::Write as _;

use crate::coordinator::MutationIntent;
use crate::filter::IssueFilter;
use crate::models::{Issue, Status};

/// One board column: every filtered issue whose status matches, in cache
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column<'a> {
    pub status: Status,
    pub issues: Vec<&'a Issue>,
}

impl Column<'_> {
    pub fn title(&self) -> &'static str {
        self.status.title()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Group the filtered issues into the three columns, todo first.
pub fn columns<'a>(issues: &'a [Issue], filter: &IssueFilter) -> Vec<Column<'a>> {
    let visible = filter.apply(issues);
    Status::ALL
        .iter()
        .map(|&status| Column {
            status,
            issues: visible.iter().copied().filter(|i| i.status == status).collect(),
        })
        .collect()
}

/// A slot on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub column: Status,
    pub index: usize,
}

/// Outcome of a drag gesture. No destination means the card was dropped
/// outside every column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropResult {
    pub issue_id: String,
    pub source: Position,
    pub destination: Option<Position>,
}

/// Turn a drop into the mutation it implies, if any.
///
/// Order inside a column is not persisted, so only a move to another column
/// produces a write.
pub fn plan_drop(drop: &DropResult) -> Option<MutationIntent> {
    let destination = drop.destination?;
    if destination == drop.source {
        return None;
    }
    if destination.column == drop.source.column {
        tracing::debug!(id = %drop.issue_id, index = destination.index, "reorder within column ignored");
        return None;
    }
    Some(MutationIntent::ChangeStatus {
        id: drop.issue_id.clone(),
        status: destination.column,
    })
}

/// Current position of an issue on the unfiltered board.
pub fn locate(issues: &[Issue], id: &str) -> Option<Position> {
    let issue = issues.iter().find(|i| i.id == id)?;
    let index = issues
        .iter()
        .filter(|i| i.status == issue.status)
        .position(|i| i.id == id)?;
    Some(Position {
        column: issue.status,
        index,
    })
}

pub fn render_board(columns: &[Column<'_>]) -> String {
    let mut out = String::new();
    for (n, column) in columns.iter().enumerate() {
        if n > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{} ({})", column.title(), column.len());
        let _ = writeln!(out, "{}", "-".repeat(40));
        if column.is_empty() {
            out.push_str("  (empty)\n");
            continue;
        }
        for issue in &column.issues {
            let _ = writeln!(
                out,
                "  {:8}  {:<5} {:<6} {}",
                issue.short_id(),
                issue.issue_type,
                issue.priority,
                truncate(&issue.title, 48)
            );
        }
    }
    out
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueType, Priority};
    use crate::store::tests::new_issue;
    use proptest::prelude::*;

    fn with_status(title: &str, status: Status) -> Issue {
        let mut issue = new_issue(title);
        issue.status = status;
        issue
    }

    fn pos(column: Status, index: usize) -> Position {
        Position { column, index }
    }

    // ==================== Unit Tests ====================

    #[test]
    fn test_columns_group_by_status_in_order() {
        let issues = vec![
            with_status("A", Status::Done),
            with_status("B", Status::Todo),
            with_status("C", Status::Todo),
        ];
        let cols = columns(&issues, &IssueFilter::default());
        assert_eq!(cols.len(), 3);
        assert_eq!(cols[0].title(), "To Do");
        assert_eq!(cols[1].title(), "In Progress");
        assert_eq!(cols[2].title(), "Done");

        let todo: Vec<&str> = cols[0].issues.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(todo, vec!["B", "C"]);
        assert!(cols[1].is_empty());
        assert_eq!(cols[2].len(), 1);
    }

    #[test]
    fn test_columns_respect_filter() {
        let mut bug = with_status("Crash", Status::Todo);
        bug.issue_type = IssueType::Bug;
        let issues = vec![bug, with_status("Docs", Status::Todo)];
        let filter = IssueFilter {
            issue_type: Some(IssueType::Bug),
            ..Default::default()
        };
        let cols = columns(&issues, &filter);
        assert_eq!(cols[0].len(), 1);
        assert_eq!(cols[0].issues[0].title, "Crash");
    }

    #[test]
    fn test_drop_outside_is_noop() {
        let drop = DropResult {
            issue_id: "a".to_string(),
            source: pos(Status::Todo, 0),
            destination: None,
        };
        assert_eq!(plan_drop(&drop), None);
    }

    #[test]
    fn test_drop_same_column_other_index_is_noop() {
        let drop = DropResult {
            issue_id: "a".to_string(),
            source: pos(Status::Todo, 0),
            destination: Some(pos(Status::Todo, 2)),
        };
        assert_eq!(plan_drop(&drop), None);
    }

    #[test]
    fn test_drop_other_column_changes_status() {
        let drop = DropResult {
            issue_id: "a".to_string(),
            source: pos(Status::Todo, 0),
            destination: Some(pos(Status::Done, 0)),
        };
        assert_eq!(
            plan_drop(&drop),
            Some(MutationIntent::ChangeStatus {
                id: "a".to_string(),
                status: Status::Done
            })
        );
    }

    #[test]
    fn test_locate() {
        let issues = vec![
            with_status("A", Status::Todo),
            with_status("B", Status::Done),
            with_status("C", Status::Todo),
        ];
        assert_eq!(locate(&issues, &issues[2].id), Some(pos(Status::Todo, 1)));
        assert_eq!(locate(&issues, &issues[1].id), Some(pos(Status::Done, 0)));
        assert_eq!(locate(&issues, "missing"), None);
    }

    #[test]
    fn test_render_board() {
        let mut issue = with_status("Fix login bug", Status::InProgress);
        issue.priority = Priority::High;
        issue.issue_type = IssueType::Bug;
        let issues = vec![issue.clone()];
        let out = render_board(&columns(&issues, &IssueFilter::default()));

        assert!(out.contains("To Do (0)"));
        assert!(out.contains("In Progress (1)"));
        assert!(out.contains("Done (0)"));
        assert!(out.contains("(empty)"));
        assert!(out.contains(issue.short_id()));
        assert!(out.contains("bug"));
        assert!(out.contains("high"));
        assert!(out.contains("Fix login bug"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("日本語テキスト", 5), "日本...");
    }

    // ==================== Property-Based Tests ====================

    proptest! {
        #[test]
        fn prop_unchanged_position_dispatches_nothing(
            column in prop::sample::select(Status::ALL.to_vec()),
            index in 0usize..50,
        ) {
            let drop = DropResult {
                issue_id: "x".to_string(),
                source: pos(column, index),
                destination: Some(pos(column, index)),
            };
            prop_assert!(plan_drop(&drop).is_none());
        }

        #[test]
        fn prop_column_change_targets_destination(
            from in prop::sample::select(Status::ALL.to_vec()),
            to in prop::sample::select(Status::ALL.to_vec()),
            a in 0usize..10,
            b in 0usize..10,
        ) {
            let drop = DropResult {
                issue_id: "x".to_string(),
                source: pos(from, a),
                destination: Some(pos(to, b)),
            };
            match plan_drop(&drop) {
                Some(MutationIntent::ChangeStatus { id, status }) => {
                    prop_assert_ne!(from, to);
                    prop_assert_eq!(id, "x");
                    prop_assert_eq!(status, to);
                }
                Some(other) => prop_assert!(false, "unexpected intent {:?}", other),
                None => prop_assert_eq!(from, to),
            }
        }

        #[test]
        fn prop_columns_partition_filtered_issues(
            statuses in proptest::collection::vec(prop::sample::select(Status::ALL.to_vec()), 0..15)
        ) {
            let issues: Vec<Issue> = statuses
                .iter()
                .enumerate()
                .map(|(i, s)| with_status(&format!("Issue {}", i), *s))
                .collect();
            let cols = columns(&issues, &IssueFilter::default());
            let total: usize = cols.iter().map(Column::len).sum();
            prop_assert_eq!(total, issues.len());
            for col in &cols {
                prop_assert!(col.issues.iter().all(|i| i.status == col.status));
            }
        }
    }
}
