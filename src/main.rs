//! td - a filesystem-backed task board.

use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use taskdeck::cli::{Cli, Commands, ConfigCommands, NotifyCommands};
use taskdeck::commands::{self, NotifyChange, Output};
use taskdeck::storage::{NewTask, TaskFilter, board_root, find_project_root};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const SYNC_HINT: &str = "run `td sync` if task files were changed outside td";

fn main() {
    // Logs go to stderr so JSON on stdout stays parseable. Default: warnings only.
    let filter = env::var("RUST_LOG")
        .ok()
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    let human = cli.human_readable;

    // Determine project path: --repo flag > TD_REPO env > nearest board > cwd
    let project = resolve_project_path(cli.repo_path, human);
    let root = board_root(&project);

    if let Err(e) = run_command(cli.command, &root, human) {
        let hint = e.suggests_sync().then_some(SYNC_HINT);
        if human {
            eprintln!("Error: {}", e);
            if let Some(hint) = hint {
                eprintln!("Hint: {}", hint);
            }
        } else {
            let mut err = serde_json::json!({ "error": e.to_string() });
            if let Some(hint) = hint {
                err["hint"] = hint.into();
            }
            eprintln!("{}", err);
        }
        process::exit(1);
    }
}

/// Resolve the project directory holding `.taskdeck/`.
///
/// An explicit path (via -C/--repo or TD_REPO) is used literally and must
/// exist. Otherwise the nearest ancestor of the current directory holding a
/// board is used, falling back to the current directory.
fn resolve_project_path(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.exists() {
                let message = format!("Specified repo path does not exist: {}", path.display());
                if human {
                    eprintln!("Error: {}", message);
                } else {
                    eprintln!("{}", serde_json::json!({ "error": message }));
                }
                process::exit(1);
            }
            path
        }
        None => {
            let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            find_project_root(&cwd).unwrap_or(cwd)
        }
    }
}

fn run_command(command: Commands, root: &Path, human: bool) -> Result<(), taskdeck::Error> {
    match command {
        Commands::Init { name } => {
            let result = commands::init(root, name)?;
            output(&result, human);
        }

        Commands::Create {
            title,
            priority,
            column,
            tag,
            assignee,
            description,
            notes,
        } => {
            let new = NewTask {
                title,
                column,
                priority,
                tags: tag,
                assignee,
                description,
                notes,
            };
            let result = commands::task_create(root, new)?;
            output(&result, human);
        }

        Commands::Move { id, column } => {
            let result = commands::task_move(root, &id, &column)?;
            output(&result, human);
        }

        Commands::Delete { id } => {
            let result = commands::task_delete(root, &id)?;
            output(&result, human);
        }

        Commands::List {
            column,
            priority,
            tag,
            assignee,
        } => {
            let filter = TaskFilter {
                column,
                priority,
                tag,
                assignee,
            };
            let result = commands::task_list(root, &filter)?;
            output(&result, human);
        }

        Commands::Show { id } => {
            let result = commands::task_show(root, &id)?;
            output(&result, human);
        }

        Commands::Board { compact } => {
            let result = commands::board(root, compact)?;
            output(&result, human);
        }

        Commands::Sync => {
            let result = commands::sync(root)?;
            output(&result, human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => {
                let result = commands::config_get(root, &key)?;
                output(&result, human);
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config_set(root, &key, &value)?;
                output(&result, human);
            }
            ConfigCommands::List => {
                let result = commands::config_list(root)?;
                output(&result, human);
            }
        },

        Commands::Notify { command } => {
            let change = match command {
                NotifyCommands::Status => None,
                NotifyCommands::Enable => Some(NotifyChange::Enable),
                NotifyCommands::Disable => Some(NotifyChange::Disable),
                NotifyCommands::All { enabled } => Some(NotifyChange::AllChanges(enabled)),
                NotifyCommands::Add { column } => Some(NotifyChange::AddColumn(column)),
                NotifyCommands::Remove { column } => Some(NotifyChange::RemoveColumn(column)),
            };
            let result = match change {
                Some(change) => commands::notify_update(root, change)?,
                None => commands::notify_status(root)?,
            };
            output(&result, human);
        }

        #[cfg(feature = "gui")]
        Commands::Serve { port, host } => {
            run_server(root, port, &host)?;
        }
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Run the web viewer until interrupted
#[cfg(feature = "gui")]
fn run_server(root: &Path, port: Option<u16>, host: &str) -> Result<(), taskdeck::Error> {
    use taskdeck::gui::{DEFAULT_PORT, find_available_port};
    use taskdeck::storage::Board;

    // Fail before binding anything when there is no board.
    Board::open(root)?;

    let actual_port = match port {
        Some(p) => p,
        None => find_available_port(host, DEFAULT_PORT).ok_or_else(|| {
            taskdeck::Error::Other(format!(
                "Could not find an available port starting from {}",
                DEFAULT_PORT
            ))
        })?,
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| taskdeck::Error::Other(format!("Failed to create runtime: {}", e)))?
        .block_on(async {
            taskdeck::gui::start_server(root, actual_port, host)
                .await
                .map_err(|e| taskdeck::Error::Other(format!("Server error: {}", e)))
        })
}
