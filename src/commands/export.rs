use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};

use crate::models::{Issue, Status};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData<'a> {
    pub version: i32,
    pub exported_at: String,
    pub issues: &'a [Issue],
}

pub fn run(issues: &[Issue], format: &str, output_path: Option<&str>) -> Result<()> {
    let rendered = match format {
        "json" => render_json(issues)?,
        "markdown" | "md" => render_markdown(issues),
        other => bail!("Unknown export format '{}'. Use json or markdown", other),
    };

    match output_path {
        Some(path) => {
            fs::write(path, rendered).context("Failed to write export file")?;
            eprintln!("Exported {} issues to {}", issues.len(), path);
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", rendered)?;
        }
    }
    Ok(())
}

pub fn render_json(issues: &[Issue]) -> Result<String> {
    let data = ExportData {
        version: 1,
        exported_at: chrono::Utc::now().to_rfc3339(),
        issues,
    };
    Ok(serde_json::to_string_pretty(&data)?)
}

pub fn render_markdown(issues: &[Issue]) -> String {
    let mut md = String::new();

    md.push_str("# Kanban Issues Export\n\n");
    let _ = write!(
        md,
        "Exported: {}\n\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );

    for status in Status::ALL {
        let group: Vec<&Issue> = issues.iter().filter(|i| i.status == status).collect();
        if group.is_empty() {
            continue;
        }
        let _ = write!(md, "## {}\n\n", status.title());
        for issue in group {
            write_issue_md(&mut md, issue);
        }
    }

    md
}

fn write_issue_md(md: &mut String, issue: &Issue) {
    let checkbox = if issue.status == Status::Done {
        "[x]"
    } else {
        "[ ]"
    };

    let _ = write!(md, "### {} {}: {}\n\n", checkbox, issue.short_id(), issue.title);
    let _ = writeln!(md, "- **Type:** {}", issue.issue_type);
    let _ = writeln!(md, "- **Priority:** {}", issue.priority);
    if let Some(reporter) = &issue.reporter {
        let _ = writeln!(md, "- **Reporter:** {}", reporter.display_name());
    }
    let _ = writeln!(md, "- **Created:** {}", issue.created_at.format("%Y-%m-%d"));

    if !issue.content.is_empty() {
        let _ = write!(md, "\n{}\n", issue.content);
    }

    if !issue.comments.is_empty() {
        md.push_str("\n**Comments:**\n");
        for comment in &issue.comments {
            let _ = writeln!(
                md,
                "- [{}] {}: {}",
                comment.created_at.format("%Y-%m-%d %H:%M"),
                comment.author.display_name(),
                comment.content
            );
        }
    }

    md.push_str("\n---\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{new_comment, new_issue};
    use crate::validation::validate_issue;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn sample() -> Vec<Issue> {
        let mut done = new_issue("Ship release");
        done.status = Status::Done;
        done.content = "Tagged v1".to_string();
        done.comments.push(new_comment("Great work"));
        vec![done, new_issue("Write docs")]
    }

    // ==================== Unit Tests ====================

    #[test]
    fn test_json_export_uses_record_shape() {
        let issues = sample();
        let json = render_json(&issues).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], 1);
        assert!(value.get("exportedAt").is_some());
        let exported = value["issues"].as_array().unwrap();
        assert_eq!(exported.len(), 2);
        assert_eq!(validate_issue(&exported[0]).unwrap(), issues[0]);
    }

    #[test]
    fn test_markdown_groups_by_status() {
        let md = render_markdown(&sample());
        let todo = md.find("## To Do").unwrap();
        let done = md.find("## Done").unwrap();
        assert!(todo < done);
        assert!(!md.contains("## In Progress"));
        assert!(md.contains("[x]"));
        assert!(md.contains("Great work"));
        assert!(md.contains("Ada Lovelace"));
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.md");
        run(&sample(), "markdown", path.to_str()).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Kanban Issues Export"));
    }

    #[test]
    fn test_export_unknown_format() {
        let err = run(&[], "csv", None).unwrap_err();
        assert!(err.to_string().contains("Unknown export format"));
    }

    // ==================== Property-Based Tests ====================

    proptest! {
        #[test]
        fn prop_markdown_lists_every_issue(count in 0usize..8) {
            let issues: Vec<Issue> = (0..count).map(|i| new_issue(&format!("Issue {}", i))).collect();
            let md = render_markdown(&issues);
            for issue in &issues {
                prop_assert!(md.contains(&issue.title));
            }
        }
    }
}
