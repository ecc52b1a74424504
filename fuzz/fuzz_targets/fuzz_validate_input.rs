#![no_main]

//! Fuzz target for payload validation.
//!
//! Arbitrary bytes are parsed as JSON and fed to every validator. None of
//! them may panic, and anything accepted must produce a record that passes
//! the stored-record check.

use chrono::Utc;
use libfuzzer_sys::fuzz_target;

use kanban::validation::{check_issue, validate_comment, validate_create, validate_issue, validate_update};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    if let Ok(input) = validate_create(&raw) {
        let issue = input.into_issue(Utc::now());
        assert!(check_issue(&issue).is_ok());
    }
    let _ = validate_update(&raw);
    let _ = validate_comment(&raw);
    let _ = validate_issue(&raw);
});
