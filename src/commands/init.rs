use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::{open_store, Backend, Config, KANBAN_DIR};
use crate::models::{Picture, User, UserName};

/// Identity flags passed to `init`. All four must be present to configure
/// a user.
#[derive(Debug, Default, Clone)]
pub struct UserArgs {
    pub first: Option<String>,
    pub last: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

impl UserArgs {
    fn into_user(self) -> Result<Option<User>> {
        match (self.first, self.last, self.email, self.avatar) {
            (None, None, None, None) => Ok(None),
            (Some(first), Some(last), Some(email), Some(thumbnail)) => Ok(Some(User {
                name: UserName { first, last },
                email,
                picture: Picture { thumbnail },
            })),
            _ => anyhow::bail!("--first, --last, --email and --avatar must be given together"),
        }
    }
}

pub fn run(path: &Path, backend: Backend, user: UserArgs, force: bool) -> Result<()> {
    let kanban_dir = path.join(KANBAN_DIR);

    if kanban_dir.exists() && !force {
        println!("Already initialized at {}", path.display());
        println!("Use --force to rewrite the configuration.");
        return Ok(());
    }

    let config = Config {
        backend,
        user: user.into_user()?,
    };

    fs::create_dir_all(&kanban_dir).context("Failed to create .kanban directory")?;
    config.save(&kanban_dir)?;
    open_store(&kanban_dir, backend)?;
    println!("Created {} ({} backend)", kanban_dir.display(), backend);

    if config.user.is_none() {
        println!("No user configured; comments will be unavailable.");
    }

    println!("Kanban initialized successfully!");
    println!("\nNext steps:");
    println!("  kanban create \"Task\"     # Create an issue");
    println!("  kanban board             # Show the board");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE;
    use tempfile::tempdir;

    fn ada() -> UserArgs {
        UserArgs {
            first: Some("Ada".to_string()),
            last: Some("Lovelace".to_string()),
            email: Some("ada@example.com".to_string()),
            avatar: Some("https://example.com/ada.png".to_string()),
        }
    }

    #[test]
    fn test_run_fresh_init() {
        let dir = tempdir().unwrap();
        let result = run(dir.path(), Backend::Json, UserArgs::default(), false);
        assert!(result.is_ok());

        assert!(dir.path().join(".kanban").is_dir());
        assert!(dir.path().join(".kanban/config.json").exists());
        assert!(dir.path().join(".kanban/issues.json").exists());
    }

    #[test]
    fn test_run_sqlite_backend() {
        let dir = tempdir().unwrap();
        run(dir.path(), Backend::Sqlite, ada(), false).unwrap();

        assert!(dir.path().join(".kanban/issues.db").exists());
        let config = Config::load(&dir.path().join(KANBAN_DIR)).unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.user.unwrap().name.first, "Ada");
    }

    #[test]
    fn test_run_already_initialized_no_force() {
        let dir = tempdir().unwrap();
        run(dir.path(), Backend::Json, UserArgs::default(), false).unwrap();

        let result = run(dir.path(), Backend::Sqlite, ada(), false);
        assert!(result.is_ok());

        let config = Config::load(&dir.path().join(KANBAN_DIR)).unwrap();
        assert_eq!(config.backend, Backend::Json);
        assert!(config.user.is_none());
    }

    #[test]
    fn test_run_force_rewrites_config() {
        let dir = tempdir().unwrap();
        run(dir.path(), Backend::Json, UserArgs::default(), false).unwrap();
        run(dir.path(), Backend::Json, ada(), true).unwrap();

        let raw = fs::read_to_string(dir.path().join(".kanban").join(CONFIG_FILE)).unwrap();
        assert!(raw.contains("ada@example.com"));
    }

    #[test]
    fn test_run_partial_user_rejected() {
        let dir = tempdir().unwrap();
        let partial = UserArgs {
            first: Some("Ada".to_string()),
            ..Default::default()
        };
        assert!(run(dir.path(), Backend::Json, partial, false).is_err());
    }

    #[test]
    fn test_run_invalid_email_rejected() {
        let dir = tempdir().unwrap();
        let mut user = ada();
        user.email = Some("not-an-email".to_string());
        assert!(run(dir.path(), Backend::Json, user, false).is_err());
        assert!(!dir.path().join(".kanban/config.json").exists());
    }
}
