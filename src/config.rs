//! Project directory discovery and `.kanban/config.json`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::models::User;
use crate::store::{IssueStore, JsonFileStore, MemoryStore, SqliteStore};
use crate::validation::validate_user;

pub const KANBAN_DIR: &str = ".kanban";
pub const CONFIG_FILE: &str = "config.json";

/// Where the issue list lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Json,
    Sqlite,
    /// Not persisted; only useful when embedding the library.
    #[serde(skip)]
    Memory,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }

    /// Store file inside the project directory.
    pub fn store_path(self, kanban_dir: &Path) -> Option<PathBuf> {
        match self {
            Self::Json => Some(kanban_dir.join("issues.json")),
            Self::Sqlite => Some(kanban_dir.join("issues.db")),
            Self::Memory => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(format!("Invalid backend '{}'. Must be one of: json, sqlite", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: Backend,
    /// Identity used as reporter and comment author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl Config {
    /// Read `config.json` from the project directory. A missing file gives
    /// the defaults.
    pub fn load(kanban_dir: &Path) -> Result<Self> {
        let path = kanban_dir.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, kanban_dir: &Path) -> Result<()> {
        self.validate()?;
        let path = kanban_dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(user) = &self.user {
            validate_user(user).context("Invalid user in config")?;
        }
        Ok(())
    }
}

/// Walk up from `start` looking for a `.kanban` directory.
pub fn find_kanban_dir(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let candidate = current.join(KANBAN_DIR);
        if candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            bail!("Not a kanban project (or any parent). Run 'kanban init' first.");
        }
    }
}

/// Open the configured store inside the project directory.
pub fn open_store(kanban_dir: &Path, backend: Backend) -> Result<Box<dyn IssueStore>> {
    let store: Box<dyn IssueStore> = match (backend, backend.store_path(kanban_dir)) {
        (Backend::Json, Some(path)) => {
            Box::new(JsonFileStore::open(&path).context("Failed to open issue file")?)
        }
        (Backend::Sqlite, Some(path)) => {
            Box::new(SqliteStore::open(&path).context("Failed to open database")?)
        }
        _ => Box::new(MemoryStore::new()),
    };
    tracing::debug!(dir = %kanban_dir.display(), backend = %backend, "opened store");
    Ok(store)
}
