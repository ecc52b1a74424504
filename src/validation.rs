//! Payload validation and normalization.
//!
//! Untyped JSON payloads (from a form, an import file, or another process)
//! are turned into typed inputs here. Every function collects all field
//! problems before failing, so callers can show one complete message.
//! Typed inputs built directly in Rust go through the same rules via their
//! `validate` methods.

use chrono::{DateTime, Datelike, Utc};
use serde_json::{Map, Value};

use crate::error::{FieldError, ValidationError};
use crate::models::{generate_id, Comment, Issue, IssueType, Picture, Priority, Status, User, UserName};

/// Latest year a stored timestamp may carry (four-digit RFC 3339 years).
const MAX_YEAR: i32 = 9999;

/// Fields the caller may never set.
const READ_ONLY_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// Normalized input for creating an issue. Defaults are already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIssueInput {
    pub title: String,
    pub content: String,
    pub status: Status,
    pub priority: Priority,
    pub issue_type: IssueType,
    pub reporter: Option<User>,
}

impl CreateIssueInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: String::new(),
            status: Status::Todo,
            priority: Priority::Medium,
            issue_type: IssueType::Task,
            reporter: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_type(mut self, issue_type: IssueType) -> Self {
        self.issue_type = issue_type;
        self
    }

    pub fn with_reporter(mut self, reporter: Option<User>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        check_title(&self.title, &mut errors);
        if let Some(reporter) = &self.reporter {
            check_user(reporter, "reporter", &mut errors);
        }
        finish((), errors)
    }

    /// Materialize the issue with a fresh id and `created_at == updated_at`.
    pub fn into_issue(self, now: DateTime<Utc>) -> Issue {
        Issue {
            id: generate_id(),
            title: self.title,
            content: self.content,
            status: self.status,
            priority: self.priority,
            issue_type: self.issue_type,
            reporter: self.reporter,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateIssueInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub issue_type: Option<IssueType>,
    pub reporter: Option<User>,
}

impl UpdateIssueInput {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.issue_type.is_none()
            && self.reporter.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            check_title(title, &mut errors);
        }
        if let Some(reporter) = &self.reporter {
            check_user(reporter, "reporter", &mut errors);
        }
        finish((), errors)
    }

    /// Merge into `issue` and refresh its `updated_at`.
    pub fn apply_to(&self, issue: &mut Issue, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            issue.title = title.clone();
        }
        if let Some(content) = &self.content {
            issue.content = content.clone();
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
        if let Some(priority) = self.priority {
            issue.priority = priority;
        }
        if let Some(issue_type) = self.issue_type {
            issue.issue_type = issue_type;
        }
        if let Some(reporter) = &self.reporter {
            issue.reporter = Some(reporter.clone());
        }
        issue.touch(now);
    }
}

/// A comment that has passed validation but has no id or timestamp yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub content: String,
    pub author: User,
}

impl NewComment {
    pub fn new(content: impl Into<String>, author: User) -> Self {
        Self {
            content: content.into(),
            author,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        check_comment_content(&self.content, "content", &mut errors);
        check_user(&self.author, "author", &mut errors);
        finish((), errors)
    }

    pub fn into_comment(self, now: DateTime<Utc>) -> Comment {
        Comment {
            id: generate_id(),
            content: self.content,
            author: self.author,
            created_at: now,
        }
    }
}

pub fn validate_create(raw: &Value) -> Result<CreateIssueInput, ValidationError> {
    let obj = as_object(raw)?;
    let mut errors = Vec::new();

    let title = match obj.get("title") {
        None | Some(Value::Null) => {
            errors.push(FieldError::new("title", "Title is required"));
            None
        }
        Some(_) => string_field(obj, "title", &mut errors),
    };
    if let Some(t) = &title {
        check_title(t, &mut errors);
    }
    let content = string_field(obj, "content", &mut errors).unwrap_or_default();
    let status = enum_field::<Status>(obj, "status", &mut errors).unwrap_or(Status::Todo);
    let priority = enum_field::<Priority>(obj, "priority", &mut errors).unwrap_or(Priority::Medium);
    let issue_type = enum_field::<IssueType>(obj, "type", &mut errors).unwrap_or(IssueType::Task);
    let reporter = user_field(obj, "reporter", &mut errors);

    finish(
        CreateIssueInput {
            title: title.unwrap_or_default(),
            content,
            status,
            priority,
            issue_type,
            reporter,
        },
        errors,
    )
}

pub fn validate_update(raw: &Value) -> Result<UpdateIssueInput, ValidationError> {
    let obj = as_object(raw)?;
    let mut errors = Vec::new();

    for field in READ_ONLY_FIELDS {
        if obj.contains_key(field) {
            errors.push(FieldError::new(field, "Field is read-only"));
        }
    }

    let title = string_field(obj, "title", &mut errors);
    if let Some(t) = &title {
        check_title(t, &mut errors);
    }

    let input = UpdateIssueInput {
        title,
        content: string_field(obj, "content", &mut errors),
        status: enum_field(obj, "status", &mut errors),
        priority: enum_field(obj, "priority", &mut errors),
        issue_type: enum_field(obj, "type", &mut errors),
        reporter: user_field(obj, "reporter", &mut errors),
    };
    finish(input, errors)
}

pub fn validate_comment(raw: &Value) -> Result<NewComment, ValidationError> {
    let obj = as_object(raw)?;
    let mut errors = Vec::new();

    let content = string_field(obj, "content", &mut errors);
    match &content {
        Some(c) => check_comment_content(c, "content", &mut errors),
        None if !errors.iter().any(|e| e.field == "content") => {
            errors.push(FieldError::new("content", "Comment cannot be empty"));
        }
        None => {}
    }
    let author = user_field(obj, "author", &mut errors);
    if author.is_none() && !errors.iter().any(|e| e.field.starts_with("author")) {
        errors.push(FieldError::new("author", "Author is required"));
    }

    match (content, author) {
        (Some(content), Some(author)) if errors.is_empty() => Ok(NewComment { content, author }),
        _ => Err(ValidationError { fields: errors }),
    }
}

/// Validate a stored record: shape via serde, then the field rules that the
/// type system cannot express.
pub fn validate_issue(raw: &Value) -> Result<Issue, ValidationError> {
    let issue: Issue = serde_json::from_value(raw.clone())
        .map_err(|e| ValidationError::single("issue", e.to_string()))?;
    check_issue(&issue)?;
    Ok(issue)
}

pub fn check_issue(issue: &Issue) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    if issue.id.is_empty() {
        errors.push(FieldError::new("id", "Id cannot be empty"));
    }
    check_title(&issue.title, &mut errors);
    if issue.updated_at < issue.created_at {
        errors.push(FieldError::new("updatedAt", "Must not precede createdAt"));
    }
    for (field, ts) in [("createdAt", issue.created_at), ("updatedAt", issue.updated_at)] {
        if ts.year() > MAX_YEAR {
            errors.push(FieldError::new(field, "Timestamp out of range"));
        }
    }
    if let Some(reporter) = &issue.reporter {
        check_user(reporter, "reporter", &mut errors);
    }
    for (i, comment) in issue.comments.iter().enumerate() {
        check_comment_content(&comment.content, &format!("comments[{i}].content"), &mut errors);
        check_user(&comment.author, &format!("comments[{i}].author"), &mut errors);
    }
    finish((), errors)
}

/// Check a user read from configuration.
pub fn validate_user(user: &User) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    if user.name.first.trim().is_empty() {
        errors.push(FieldError::new("user.name.first", "Cannot be empty"));
    }
    check_user(user, "user", &mut errors);
    finish((), errors)
}

fn finish<T>(value: T, errors: Vec<FieldError>) -> Result<T, ValidationError> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(ValidationError { fields: errors })
    }
}

fn as_object(raw: &Value) -> Result<&Map<String, Value>, ValidationError> {
    raw.as_object()
        .ok_or_else(|| ValidationError::single("payload", "Expected an object"))
}

fn string_field(obj: &Map<String, Value>, key: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        _ => {
            errors.push(FieldError::new(key, "Expected a string"));
            None
        }
    }
}

fn enum_field<T>(obj: &Map<String, Value>, key: &str, errors: &mut Vec<FieldError>) -> Option<T>
where
    T: std::str::FromStr<Err = String>,
{
    let s = string_field(obj, key, errors)?;
    match s.parse::<T>() {
        Ok(v) => Some(v),
        Err(msg) => {
            errors.push(FieldError::new(key, msg));
            None
        }
    }
}

fn user_field(obj: &Map<String, Value>, key: &str, errors: &mut Vec<FieldError>) -> Option<User> {
    let raw = obj.get(key)?;
    let Some(user) = raw.as_object() else {
        errors.push(FieldError::new(key, "Expected an object"));
        return None;
    };

    let before = errors.len();
    let name = user.get("name").and_then(Value::as_object);
    let first = name.and_then(|n| n.get("first")).and_then(Value::as_str);
    let last = name.and_then(|n| n.get("last")).and_then(Value::as_str);
    if first.is_none() {
        errors.push(FieldError::new(format!("{key}.name.first"), "Expected a string"));
    }
    if last.is_none() {
        errors.push(FieldError::new(format!("{key}.name.last"), "Expected a string"));
    }
    let email = user.get("email").and_then(Value::as_str);
    if email.is_none() {
        errors.push(FieldError::new(format!("{key}.email"), "Expected a string"));
    }
    let thumbnail = user
        .get("picture")
        .and_then(Value::as_object)
        .and_then(|p| p.get("thumbnail"))
        .and_then(Value::as_str);
    if thumbnail.is_none() {
        errors.push(FieldError::new(format!("{key}.picture.thumbnail"), "Expected a string"));
    }
    if errors.len() > before {
        return None;
    }

    let parsed = User {
        name: UserName {
            first: first.unwrap_or_default().to_string(),
            last: last.unwrap_or_default().to_string(),
        },
        email: email.unwrap_or_default().to_string(),
        picture: Picture {
            thumbnail: thumbnail.unwrap_or_default().to_string(),
        },
    };
    check_user(&parsed, key, errors);
    (errors.len() == before).then_some(parsed)
}

fn check_title(title: &str, errors: &mut Vec<FieldError>) {
    if title.trim().is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
    }
}

fn check_comment_content(content: &str, field: &str, errors: &mut Vec<FieldError>) {
    if content.trim().is_empty() {
        errors.push(FieldError::new(field, "Comment cannot be empty"));
    }
}

fn check_user(user: &User, field: &str, errors: &mut Vec<FieldError>) {
    if !looks_like_email(&user.email) {
        errors.push(FieldError::new(format!("{field}.email"), "Invalid email"));
    }
    if !looks_like_url(&user.picture.thumbnail) {
        errors.push(FieldError::new(format!("{field}.picture.thumbnail"), "Invalid url"));
    }
}

fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

fn looks_like_url(s: &str) -> bool {
    // The parser trims surrounding spaces; a stored URL must not carry them.
    if s.trim() != s {
        return false;
    }
    match url::Url::parse(s) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}
