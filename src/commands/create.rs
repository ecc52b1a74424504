use anyhow::Result;
use serde_json::{Map, Value};

use crate::coordinator::MutationCoordinator;
use crate::models::User;
use crate::store::IssueStore;
use crate::validation::validate_create;

#[derive(Debug, Default, Clone)]
pub struct CreateArgs<'a> {
    pub title: &'a str,
    pub content: Option<&'a str>,
    pub status: Option<&'a str>,
    pub priority: Option<&'a str>,
    pub issue_type: Option<&'a str>,
}

impl CreateArgs<'_> {
    /// Raw payload as a form would submit it; omitted flags stay absent so
    /// the validator applies its defaults.
    fn payload(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("title".into(), self.title.into());
        let optional = [
            ("content", self.content),
            ("status", self.status),
            ("priority", self.priority),
            ("type", self.issue_type),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                obj.insert(key.into(), v.into());
            }
        }
        Value::Object(obj)
    }
}

pub fn run<S: IssueStore>(
    tracker: &mut MutationCoordinator<S>,
    args: &CreateArgs<'_>,
    reporter: Option<&User>,
) -> Result<String> {
    let input = validate_create(&args.payload())?.with_reporter(reporter.cloned());
    let issue = tracker.create_issue(input)?;
    println!("Created issue {} \"{}\"", issue.short_id(), issue.title);
    Ok(issue.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{setup_json, setup_sqlite};
    use crate::models::{IssueType, Priority, Status};
    use crate::store::tests::test_user;
    use proptest::prelude::*;

    fn args(title: &str) -> CreateArgs<'_> {
        CreateArgs {
            title,
            ..Default::default()
        }
    }

    // ==================== Unit Tests ====================

    #[test]
    fn test_create_defaults() {
        let (mut tracker, _dir) = setup_json();
        let id = run(&mut tracker, &args("Write docs"), None).unwrap();

        let issue = tracker.store().get(&id).unwrap().unwrap();
        assert_eq!(issue.status, Status::Todo);
        assert_eq!(issue.priority, Priority::Medium);
        assert_eq!(issue.issue_type, IssueType::Task);
        assert_eq!(issue.content, "");
        assert!(issue.reporter.is_none());
    }

    #[test]
    fn test_create_all_fields_with_reporter() {
        let (mut tracker, _dir) = setup_sqlite();
        let full = CreateArgs {
            title: "Fix login bug",
            content: Some("Users are logged out"),
            status: Some("in-progress"),
            priority: Some("high"),
            issue_type: Some("bug"),
        };
        let id = run(&mut tracker, &full, Some(&test_user())).unwrap();

        let issue = tracker.cache().get(&id).unwrap();
        assert_eq!(issue.status, Status::InProgress);
        assert_eq!(issue.issue_type, IssueType::Bug);
        assert_eq!(issue.reporter, Some(test_user()));
        assert_eq!(tracker.store().get(&id).unwrap().as_ref(), Some(issue));
    }

    #[test]
    fn test_create_invalid_priority() {
        let (mut tracker, _dir) = setup_json();
        let bad = CreateArgs {
            priority: Some("critical"),
            ..args("Test")
        };
        let err = run(&mut tracker, &bad, None).unwrap_err();
        assert!(err.to_string().contains("Invalid priority"));
        assert!(tracker.store().list().unwrap().is_empty());
    }

    #[test]
    fn test_create_reports_all_bad_fields() {
        let (mut tracker, _dir) = setup_json();
        let bad = CreateArgs {
            title: " ",
            content: None,
            status: Some("blocked"),
            priority: Some("urgent"),
            issue_type: Some("epic"),
        };
        let msg = run(&mut tracker, &bad, None).unwrap_err().to_string();
        assert!(msg.contains("title"));
        assert!(msg.contains("status"));
        assert!(msg.contains("priority"));
        assert!(msg.contains("type"));
    }

    #[test]
    fn test_create_prepends() {
        let (mut tracker, _dir) = setup_json();
        run(&mut tracker, &args("First"), None).unwrap();
        run(&mut tracker, &args("Second"), None).unwrap();

        let titles: Vec<String> = tracker.issues().iter().map(|i| i.title.clone()).collect();
        assert_eq!(titles, vec!["Second", "First"]);
    }

    // ==================== Property-Based Tests ====================

    proptest! {
        #[test]
        fn prop_create_unique_ids(count in 1usize..8) {
            let (mut tracker, _dir) = setup_json();
            let mut ids = std::collections::HashSet::new();
            for i in 0..count {
                let title = format!("Issue {}", i);
                ids.insert(run(&mut tracker, &args(&title), None).unwrap());
            }
            prop_assert_eq!(ids.len(), count);
        }

        #[test]
        fn prop_created_timestamps_equal(title in "[a-zA-Z0-9][a-zA-Z0-9 ]{0,30}") {
            let (mut tracker, _dir) = setup_sqlite();
            let id = run(&mut tracker, &args(&title), None).unwrap();
            let issue = tracker.store().get(&id).unwrap().unwrap();
            prop_assert_eq!(issue.created_at, issue.updated_at);
            prop_assert_eq!(issue.title, title);
        }
    }
}
