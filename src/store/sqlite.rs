use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

use super::IssueStore;
use crate::error::{Error, PersistenceError, Result};
use crate::models::{next_timestamp, Comment, Issue, User};
use crate::validation::{check_issue, UpdateIssueInput};

const SCHEMA_VERSION: i32 = 1;

const ISSUE_COLUMNS: &str =
    "id, title, content, status, priority, issue_type, reporter, created_at, updated_at";

pub struct SqliteStore {
    conn: Connection,
}

/// Raw column values before they are parsed into an [`Issue`].
struct IssueRow {
    id: String,
    title: String,
    content: String,
    status: String,
    priority: String,
    issue_type: String,
    reporter: Option<String>,
    created_at: String,
    updated_at: String,
}

struct CommentRow {
    issue_id: String,
    id: String,
    content: String,
    author: String,
    created_at: String,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = SqliteStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version < SCHEMA_VERSION {
            self.conn.execute_batch(
                r#"
                -- Insertion order is the board order (newest first via seq DESC)
                CREATE TABLE IF NOT EXISTS issues (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    title TEXT NOT NULL,
                    content TEXT NOT NULL DEFAULT '',
                    status TEXT NOT NULL DEFAULT 'todo',
                    priority TEXT NOT NULL DEFAULT 'medium',
                    issue_type TEXT NOT NULL DEFAULT 'task',
                    reporter TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                -- Comments (author stored as JSON)
                CREATE TABLE IF NOT EXISTS comments (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    issue_id TEXT NOT NULL,
                    content TEXT NOT NULL,
                    author TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
                CREATE INDEX IF NOT EXISTS idx_comments_issue ON comments(issue_id);
                "#,
            )?;

            self.conn
                .execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
        }

        self.conn.execute_batch("PRAGMA foreign_keys = ON")?;

        Ok(())
    }

    fn query_issue_rows(&self, id: Option<&str>) -> Result<Vec<IssueRow>> {
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<IssueRow> {
            Ok(IssueRow {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                status: row.get(3)?,
                priority: row.get(4)?,
                issue_type: row.get(5)?,
                reporter: row.get(6)?,
                created_at: row.get(7)?,
                updated_at: row.get(8)?,
            })
        };

        let rows = match id {
            Some(id) => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT {} FROM issues WHERE id = ?1", ISSUE_COLUMNS))?;
                let rows = stmt
                    .query_map([id], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT {} FROM issues ORDER BY seq DESC", ISSUE_COLUMNS))?;
                let rows = stmt
                    .query_map([], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    }

    fn query_comment_rows(&self, issue_id: Option<&str>) -> Result<Vec<CommentRow>> {
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<CommentRow> {
            Ok(CommentRow {
                issue_id: row.get(0)?,
                id: row.get(1)?,
                content: row.get(2)?,
                author: row.get(3)?,
                created_at: row.get(4)?,
            })
        };

        let rows = match issue_id {
            Some(issue_id) => {
                let mut stmt = self.conn.prepare(
                    "SELECT issue_id, id, content, author, created_at FROM comments WHERE issue_id = ?1 ORDER BY seq DESC",
                )?;
                let rows = stmt
                    .query_map([issue_id], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT issue_id, id, content, author, created_at FROM comments ORDER BY seq DESC",
                )?;
                let rows = stmt
                    .query_map([], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    }

    fn load(&self, id: Option<&str>) -> Result<Vec<Issue>> {
        let mut comments: HashMap<String, Vec<Comment>> = HashMap::new();
        for row in self.query_comment_rows(id)? {
            let issue_id = row.issue_id.clone();
            comments.entry(issue_id).or_default().push(parse_comment(row)?);
        }

        self.query_issue_rows(id)?
            .into_iter()
            .map(|row| -> Result<Issue> {
                let issue_comments = comments.remove(&row.id).unwrap_or_default();
                let issue = parse_issue(row, issue_comments)?;
                check_issue(&issue).map_err(|e| {
                    tracing::error!(id = %issue.id, error = %e, "invalid issue row");
                    PersistenceError::Corrupt(format!("issue {}: {}", issue.id, e))
                })?;
                Ok(issue)
            })
            .collect()
    }

    fn insert_comment(&self, issue_id: &str, comment: &Comment) -> Result<()> {
        self.conn.execute(
            "INSERT INTO comments (id, issue_id, content, author, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id,
                issue_id,
                comment.content,
                serde_json::to_string(&comment.author)?,
                format_datetime(comment.created_at),
            ],
        )?;
        Ok(())
    }

    fn fetch(&self, id: &str) -> Result<Issue> {
        self.load(Some(id))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(id))
    }

    fn touch(&self, id: &str) -> Result<()> {
        let current: Option<String> = self
            .conn
            .query_row("SELECT updated_at FROM issues WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        let Some(current) = current else {
            return Err(Error::not_found(id));
        };
        let next = next_timestamp(parse_datetime(&current)?, Utc::now());
        self.conn.execute(
            "UPDATE issues SET updated_at = ?1 WHERE id = ?2",
            params![format_datetime(next), id],
        )?;
        Ok(())
    }
}

impl IssueStore for SqliteStore {
    fn list(&self) -> Result<Vec<Issue>> {
        self.load(None)
    }

    fn get(&self, id: &str) -> Result<Option<Issue>> {
        Ok(self.load(Some(id))?.into_iter().next())
    }

    fn create(&self, issue: Issue) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let reporter = issue.reporter.as_ref().map(serde_json::to_string).transpose()?;
        self.conn.execute(
            "INSERT INTO issues (id, title, content, status, priority, issue_type, reporter, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                issue.id,
                issue.title,
                issue.content,
                issue.status.as_str(),
                issue.priority.as_str(),
                issue.issue_type.as_str(),
                reporter,
                format_datetime(issue.created_at),
                format_datetime(issue.updated_at),
            ],
        )?;
        // Stored newest first; insert oldest first so seq order matches.
        for comment in issue.comments.iter().rev() {
            self.insert_comment(&issue.id, comment)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn update(&self, id: &str, patch: &UpdateIssueInput) -> Result<Issue> {
        let tx = self.conn.unchecked_transaction()?;
        let mut issue = self.fetch(id)?;
        patch.apply_to(&mut issue, Utc::now());

        let reporter = issue.reporter.as_ref().map(serde_json::to_string).transpose()?;
        self.conn.execute(
            "UPDATE issues SET title = ?1, content = ?2, status = ?3, priority = ?4, issue_type = ?5, reporter = ?6, updated_at = ?7 WHERE id = ?8",
            params![
                issue.title,
                issue.content,
                issue.status.as_str(),
                issue.priority.as_str(),
                issue.issue_type.as_str(),
                reporter,
                format_datetime(issue.updated_at),
                id,
            ],
        )?;
        tx.commit()?;
        Ok(issue)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM issues WHERE id = ?1", [id])?;
        Ok(())
    }

    fn add_comment(&self, issue_id: &str, comment: Comment) -> Result<Issue> {
        let tx = self.conn.unchecked_transaction()?;
        self.touch(issue_id)?;
        self.insert_comment(issue_id, &comment)?;
        tx.commit()?;
        self.fetch(issue_id)
    }
}

fn parse_issue(row: IssueRow, comments: Vec<Comment>) -> Result<Issue> {
    let corrupt = |what: String| Error::from(PersistenceError::Corrupt(format!("issue {}: {}", row.id, what)));
    let reporter = row
        .reporter
        .as_deref()
        .map(serde_json::from_str::<User>)
        .transpose()?;
    Ok(Issue {
        status: row.status.parse().map_err(corrupt)?,
        priority: row.priority.parse().map_err(corrupt)?,
        issue_type: row.issue_type.parse().map_err(corrupt)?,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
        reporter,
        comments,
        id: row.id,
        title: row.title,
        content: row.content,
    })
}

fn parse_comment(row: CommentRow) -> Result<Comment> {
    Ok(Comment {
        author: serde_json::from_str(&row.author)?,
        created_at: parse_datetime(&row.created_at)?,
        id: row.id,
        content: row.content,
    })
}

fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PersistenceError::Corrupt(format!("bad timestamp '{}': {}", s, e)).into())
}
