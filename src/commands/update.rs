use anyhow::{bail, Result};
use serde_json::{Map, Value};

use crate::commands::find_issue;
use crate::coordinator::MutationCoordinator;
use crate::store::IssueStore;
use crate::validation::validate_update;

#[derive(Debug, Default, Clone)]
pub struct UpdateArgs<'a> {
    pub title: Option<&'a str>,
    pub content: Option<&'a str>,
    pub status: Option<&'a str>,
    pub priority: Option<&'a str>,
    pub issue_type: Option<&'a str>,
}

impl UpdateArgs<'_> {
    fn payload(&self) -> Value {
        let fields = [
            ("title", self.title),
            ("content", self.content),
            ("status", self.status),
            ("priority", self.priority),
            ("type", self.issue_type),
        ];
        let obj: Map<String, Value> = fields
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), Value::from(v))))
            .collect();
        Value::Object(obj)
    }
}

pub fn run<S: IssueStore>(tracker: &mut MutationCoordinator<S>, id: &str, args: &UpdateArgs<'_>) -> Result<()> {
    let patch = validate_update(&args.payload())?;
    if patch.is_empty() {
        bail!("Nothing to update. Use --title, --content, --status, --priority, or --type");
    }

    let id = find_issue(tracker, id)?.id.clone();
    let issue = tracker.update_issue(&id, patch)?;
    println!("Updated issue {}", issue.short_id());

    Ok(())
}
