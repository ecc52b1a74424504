use chrono::Utc;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::{comment_in_list, update_in_list, IssueStore};
use crate::error::{Error, PersistenceError, Result};
use crate::models::{Comment, Issue};
use crate::validation::{validate_issue, UpdateIssueInput};

/// Issue list kept as one pretty-printed JSON array on disk.
///
/// Every mutation is a full read-modify-write. Writes land in a sibling
/// temp file first and are renamed over the target, so a reader sees either
/// the old list or the new one.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the store, creating an empty list if the file does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let store = JsonFileStore {
            path: path.to_path_buf(),
        };
        if !path.exists() {
            store.write(&[])?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A corrupt file is an error, never an empty list, so writes cannot clobber it.
    fn read(&self) -> Result<Vec<Issue>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }

        let value: Value = serde_json::from_str(&data).map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "issue file is not valid JSON");
            PersistenceError::Json(e)
        })?;
        let Value::Array(items) = value else {
            tracing::error!(path = %self.path.display(), "issue file does not hold a list");
            return Err(PersistenceError::Corrupt("expected a JSON array of issues".to_string()).into());
        };

        items
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                validate_issue(raw).map_err(|e| {
                    tracing::error!(path = %self.path.display(), index = i, error = %e, "invalid issue record");
                    Error::from(PersistenceError::Corrupt(format!("record {}: {}", i, e)))
                })
            })
            .collect()
    }

    fn write(&self, issues: &[Issue]) -> Result<()> {
        let json = serde_json::to_string_pretty(issues)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), count = issues.len(), "wrote issue file");
        Ok(())
    }

    fn modify<T>(&self, f: impl FnOnce(&mut Vec<Issue>) -> Result<T>) -> Result<T> {
        let mut issues = self.read()?;
        let out = f(&mut issues)?;
        self.write(&issues)?;
        Ok(out)
    }
}

impl IssueStore for JsonFileStore {
    fn list(&self) -> Result<Vec<Issue>> {
        self.read()
    }

    fn create(&self, issue: Issue) -> Result<()> {
        self.modify(|issues| {
            issues.insert(0, issue);
            Ok(())
        })
    }

    fn update(&self, id: &str, patch: &UpdateIssueInput) -> Result<Issue> {
        self.modify(|issues| update_in_list(issues, id, patch, Utc::now()))
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.modify(|issues| {
            issues.retain(|i| i.id != id);
            Ok(())
        })
    }

    fn add_comment(&self, issue_id: &str, comment: Comment) -> Result<Issue> {
        self.modify(|issues| comment_in_list(issues, issue_id, comment, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{new_issue, run_contract};
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn setup_test_store() -> (JsonFileStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(&dir.path().join("issues.json")).unwrap();
        (store, dir)
    }

    // ==================== Unit Tests ====================

    #[test]
    fn test_json_contract() {
        let dirs = std::cell::RefCell::new(Vec::new());
        run_contract(|| {
            let (store, dir) = setup_test_store();
            dirs.borrow_mut().push(dir);
            Box::new(store)
        });
    }

    #[test]
    fn test_open_creates_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("issues.json");
        let store = JsonFileStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.list().unwrap().is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn test_persists_across_reopen() {
        let (store, _dir) = setup_test_store();
        let issue = new_issue("Survives");
        store.create(issue.clone()).unwrap();

        let reopened = JsonFileStore::open(store.path()).unwrap();
        assert_eq!(reopened.list().unwrap(), vec![issue]);
    }

    #[test]
    fn test_reads_camel_case_records() {
        let (store, _dir) = setup_test_store();
        fs::write(
            store.path(),
            r#"[{
                "id": "7f1e", "title": "Imported", "content": "",
                "status": "in-progress", "priority": "high", "type": "story",
                "createdAt": "2024-05-01T10:00:00.000Z",
                "updatedAt": "2024-05-02T10:00:00.000Z"
            }]"#,
        )
        .unwrap();
        let issues = store.list().unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].title, "Imported");
        assert!(issues[0].comments.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_persistence_error() {
        let (store, _dir) = setup_test_store();
        fs::write(store.path(), "{not json").unwrap();
        let err = store.list().unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[test]
    fn test_invalid_record_rejected() {
        let (store, _dir) = setup_test_store();
        fs::write(
            store.path(),
            r#"[{"id": "x", "title": "", "status": "todo", "priority": "low", "type": "task",
                 "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"}]"#,
        )
        .unwrap();
        let err = store.list().unwrap_err();
        assert!(err.to_string().contains("record 0"));
    }

    #[test]
    fn test_far_future_timestamp_rejected_before_update() {
        let (store, _dir) = setup_test_store();
        fs::write(
            store.path(),
            r#"[{"id": "x", "title": "Edge", "status": "todo", "priority": "low", "type": "task",
                 "createdAt": "2024-01-01T00:00:00Z",
                 "updatedAt": "+262142-12-31T23:59:59.999999999Z"}]"#,
        )
        .unwrap();

        assert!(matches!(store.list().unwrap_err(), Error::Persistence(_)));
        let patch = UpdateIssueInput {
            priority: Some(crate::models::Priority::High),
            ..Default::default()
        };
        assert!(store.update("x", &patch).is_err());
    }

    #[test]
    fn test_write_does_not_clobber_corrupt_file() {
        let (store, _dir) = setup_test_store();
        fs::write(store.path(), "{not json").unwrap();
        assert!(store.create(new_issue("New")).is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{not json");
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let (store, dir) = setup_test_store();
        store.create(new_issue("Clean")).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_unicode_round_trip() {
        let (store, _dir) = setup_test_store();
        let issue = new_issue("Test 🐛 αβγ バグ");
        store.create(issue.clone()).unwrap();
        assert_eq!(store.list().unwrap()[0].title, "Test 🐛 αβγ バグ");
    }

    // ==================== Property-Based Tests ====================

    proptest! {
        #[test]
        fn prop_delete_removes_id(count in 1usize..6, victim in 0usize..6) {
            let (store, _dir) = setup_test_store();
            let mut ids = Vec::new();
            for i in 0..count {
                let issue = new_issue(&format!("Issue {}", i));
                ids.push(issue.id.clone());
                store.create(issue).unwrap();
            }
            let victim_id = ids[victim % count].clone();

            store.delete(&victim_id).unwrap();

            let remaining = store.list().unwrap();
            prop_assert_eq!(remaining.len(), count - 1);
            prop_assert!(remaining.iter().all(|i| i.id != victim_id));
        }

        #[test]
        fn prop_delete_missing_is_noop(count in 0usize..5) {
            let (store, _dir) = setup_test_store();
            for i in 0..count {
                store.create(new_issue(&format!("Issue {}", i))).unwrap();
            }
            let before = store.list().unwrap();
            store.delete("does-not-exist").unwrap();
            prop_assert_eq!(store.list().unwrap(), before);
        }
    }
}
