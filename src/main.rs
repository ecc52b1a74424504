use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::{Path, PathBuf};

use kanban::commands;
use kanban::config::{find_kanban_dir, open_store, Backend, Config, KANBAN_DIR};
use kanban::{IssueStore, MutationCoordinator};

#[derive(Parser)]
#[command(name = "kanban")]
#[command(about = "A single-project Kanban issue tracker")]
#[command(version)]
struct Cli {
    /// Project directory containing .kanban/ (default: search upward from cwd)
    #[arg(long, global = true, env = "KANBAN_DIR")]
    dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a kanban project in the current directory
    Init {
        /// Storage backend (json, sqlite)
        #[arg(long, default_value = "json")]
        backend: String,
        /// Your first name
        #[arg(long)]
        first: Option<String>,
        /// Your last name
        #[arg(long)]
        last: Option<String>,
        /// Your email address
        #[arg(long)]
        email: Option<String>,
        /// Avatar thumbnail URL
        #[arg(long)]
        avatar: Option<String>,
        /// Rewrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Create a new issue
    Create {
        /// Issue title
        title: String,
        /// Issue description
        #[arg(short, long)]
        content: Option<String>,
        /// Status (todo, in-progress, done)
        #[arg(short, long)]
        status: Option<String>,
        /// Priority (low, medium, high)
        #[arg(short, long)]
        priority: Option<String>,
        /// Type (task, bug, story)
        #[arg(short = 't', long = "type")]
        issue_type: Option<String>,
    },

    /// List issues
    List {
        /// Search title and description
        #[arg(short = 'q', long)]
        search: Option<String>,
        /// Filter by type (task, bug, story, all)
        #[arg(short = 't', long = "type")]
        issue_type: Option<String>,
        /// Filter by priority (low, medium, high, all)
        #[arg(short, long)]
        priority: Option<String>,
        /// Filter by status (todo, in-progress, done, all)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show the board
    Board {
        /// Search title and description
        #[arg(short = 'q', long)]
        search: Option<String>,
        /// Filter by type (task, bug, story, all)
        #[arg(short = 't', long = "type")]
        issue_type: Option<String>,
        /// Filter by priority (low, medium, high, all)
        #[arg(short, long)]
        priority: Option<String>,
    },

    /// Show issue details
    Show {
        /// Issue ID or unique prefix
        id: String,
    },

    /// Update an issue
    Update {
        /// Issue ID or unique prefix
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long)]
        content: Option<String>,
        /// New status
        #[arg(long)]
        status: Option<String>,
        /// New priority
        #[arg(long)]
        priority: Option<String>,
        /// New type
        #[arg(long = "type")]
        issue_type: Option<String>,
    },

    /// Move an issue to another column
    Move {
        /// Issue ID or unique prefix
        id: String,
        /// Destination column (todo, in-progress, done)
        status: String,
        /// Position in the destination column
        #[arg(long)]
        index: Option<usize>,
    },

    /// Delete an issue
    Delete {
        /// Issue ID or unique prefix
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Add a comment to an issue
    Comment {
        /// Issue ID or unique prefix
        id: String,
        /// Comment text
        text: String,
    },

    /// Export issues
    Export {
        /// Output format (json, markdown)
        #[arg(short, long, default_value = "json")]
        format: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn init_tracing(verbose: bool, json: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_env("KANBAN_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

/// `--dir` may name the project root or the `.kanban` directory itself.
fn locate_kanban_dir(dir: Option<&Path>) -> Result<PathBuf> {
    match dir {
        Some(path) if path.file_name().is_some_and(|name| name == KANBAN_DIR) => Ok(path.to_path_buf()),
        Some(path) => find_kanban_dir(path),
        None => find_kanban_dir(&env::current_dir()?),
    }
}

struct Project {
    tracker: MutationCoordinator<Box<dyn IssueStore>>,
    config: Config,
}

fn open_project(dir: Option<&Path>) -> Result<Project> {
    let kanban_dir = locate_kanban_dir(dir)?;
    let config = Config::load(&kanban_dir)?;
    let store = open_store(&kanban_dir, config.backend)?;
    let tracker = MutationCoordinator::load(store).context("Failed to load issues")?;
    Ok(Project { tracker, config })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json)?;
    let dir = cli.dir.as_deref();

    match cli.command {
        Commands::Init {
            backend,
            first,
            last,
            email,
            avatar,
            force,
        } => {
            let backend: Backend = backend.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let root = match dir {
                Some(path) if path.file_name().is_some_and(|name| name == KANBAN_DIR) => {
                    path.parent().map(Path::to_path_buf).context("--dir has no parent")?
                }
                Some(path) => path.to_path_buf(),
                None => env::current_dir()?,
            };
            let user = commands::init::UserArgs {
                first,
                last,
                email,
                avatar,
            };
            commands::init::run(&root, backend, user, force)
        }

        Commands::Create {
            title,
            content,
            status,
            priority,
            issue_type,
        } => {
            let mut project = open_project(dir)?;
            let args = commands::create::CreateArgs {
                title: &title,
                content: content.as_deref(),
                status: status.as_deref(),
                priority: priority.as_deref(),
                issue_type: issue_type.as_deref(),
            };
            commands::create::run(&mut project.tracker, &args, project.config.user.as_ref())?;
            Ok(())
        }

        Commands::List {
            search,
            issue_type,
            priority,
            status,
        } => {
            let project = open_project(dir)?;
            let args = commands::list::FilterArgs {
                search: search.as_deref(),
                issue_type: issue_type.as_deref(),
                priority: priority.as_deref(),
                status: status.as_deref(),
            };
            commands::list::run(project.tracker.issues(), &args)
        }

        Commands::Board {
            search,
            issue_type,
            priority,
        } => {
            let project = open_project(dir)?;
            let args = commands::list::FilterArgs {
                search: search.as_deref(),
                issue_type: issue_type.as_deref(),
                priority: priority.as_deref(),
                status: None,
            };
            commands::board::run(project.tracker.issues(), &args)
        }

        Commands::Show { id } => {
            let project = open_project(dir)?;
            commands::show::run(&project.tracker, &id)
        }

        Commands::Update {
            id,
            title,
            content,
            status,
            priority,
            issue_type,
        } => {
            let mut project = open_project(dir)?;
            let args = commands::update::UpdateArgs {
                title: title.as_deref(),
                content: content.as_deref(),
                status: status.as_deref(),
                priority: priority.as_deref(),
                issue_type: issue_type.as_deref(),
            };
            commands::update::run(&mut project.tracker, &id, &args)
        }

        Commands::Move { id, status, index } => {
            let mut project = open_project(dir)?;
            commands::status::run(&mut project.tracker, &id, &status, index)
        }

        Commands::Delete { id, force } => {
            let mut project = open_project(dir)?;
            commands::delete::run(&mut project.tracker, &id, force)
        }

        Commands::Comment { id, text } => {
            let mut project = open_project(dir)?;
            commands::comment::run(&mut project.tracker, &id, &text, project.config.user.as_ref())
        }

        Commands::Export { format, output } => {
            let project = open_project(dir)?;
            commands::export::run(project.tracker.issues(), &format, output.as_deref())
        }
    }
}
