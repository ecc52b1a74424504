//! Single-project Kanban issue tracker.
//!
//! Issues live in a persistence medium behind [`store::IssueStore`]; every
//! write goes through the [`coordinator::MutationCoordinator`], which
//! updates a client-side cache optimistically, rolls back on failure and
//! reconciles with the store once the write settles.

pub mod board;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod models;
pub mod store;
pub mod validation;

pub use coordinator::{MutationCoordinator, MutationIntent};
pub use error::{Error, Result};
pub use models::{Comment, Issue, IssueType, Priority, Status, User};
pub use store::IssueStore;
