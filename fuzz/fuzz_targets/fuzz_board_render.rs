#![no_main]

//! Fuzz target for board rendering and drop planning.
//!
//! Titles may hold any Unicode, so truncation must never slice inside a
//! multi-byte character.

use arbitrary::Arbitrary;
use chrono::Utc;
use libfuzzer_sys::fuzz_target;

use kanban::board::{columns, locate, plan_drop, render_board, DropResult, Position};
use kanban::filter::IssueFilter;
use kanban::models::{IssueType, Priority, Status};
use kanban::validation::CreateIssueInput;

#[derive(Arbitrary, Debug)]
struct BoardInput {
    titles: Vec<String>,
    content: String,
    search: Option<String>,
    statuses: Vec<u8>,
    drop_target: u8,
    drop_index: u8,
}

fn pick<T: Copy>(all: &[T; 3], n: u8) -> T {
    all[n as usize % 3]
}

fuzz_target!(|input: BoardInput| {
    let now = Utc::now();
    let issues: Vec<_> = input
        .titles
        .iter()
        .take(30)
        .enumerate()
        .map(|(i, title)| {
            let n = input.statuses.get(i).copied().unwrap_or(0);
            CreateIssueInput::new(title.clone())
                .with_content(input.content.clone())
                .with_status(pick(&Status::ALL, n))
                .with_priority(pick(&Priority::ALL, n / 3))
                .with_type(pick(&IssueType::ALL, n / 9))
                .into_issue(now)
        })
        .collect();

    let filter = IssueFilter {
        search: input.search,
        ..Default::default()
    };
    let cols = columns(&issues, &filter);
    let _ = render_board(&cols);

    if let Some(first) = issues.first() {
        if let Some(source) = locate(&issues, &first.id) {
            let drop = DropResult {
                issue_id: first.id.clone(),
                source,
                destination: Some(Position {
                    column: pick(&Status::ALL, input.drop_target),
                    index: input.drop_index as usize,
                }),
            };
            if let Some(intent) = plan_drop(&drop) {
                assert_ne!(source.column, pick(&Status::ALL, input.drop_target));
                assert_eq!(intent.target(), first.id);
            }
        }
    }
});
