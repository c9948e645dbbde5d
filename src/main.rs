//! # tb - Taskboard
//!
//! A terminal client for a project/task REST backend: a kanban board with
//! optimistic drag-and-drop, plus an AI assistant that summarises projects and
//! answers questions about tasks.
//!
//! ## Key Features
//!
//! - **Kanban Board**: To Do, In Progress and Done columns for the selected project
//! - **Optimistic Moves**: cards move at once and roll back if the server refuses
//! - **AI Assistant**: project summaries, task Q&A and task suggestions
//! - **Scriptable CLI**: every board action is also a subcommand
//!
//! ## Quick Start
//!
//! ```bash
//! # Open the board against a local backend
//! tb ui
//!
//! # Point at another server
//! tb --api-url https://tasks.example.com/api projects
//!
//! # Move a task
//! tb task move <project-id> <task-id> done
//!
//! # Ask the assistant
//! tb ai summarize <project-id>
//! ```
//!
//! ## Key Commands
//!
//! - `tb ui` - Launch the board
//! - `tb projects` / `tb project add|update|delete` - Manage projects
//! - `tb tasks <project-id>` - Print a project's board
//! - `tb task add|update|move|delete` - Manage tasks
//! - `tb stats <project-id>` - Counts and completion percentage
//! - `tb ai summarize|ask|suggest` - AI assistant
//!
//! The last opened project is remembered in `~/.taskboard/session.json`. The
//! board writes its log to `~/.taskboard/taskboard.log`.

use std::fs::{self, OpenOptions};
use std::io;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod api;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod drag;
pub mod error;
pub mod fields;
pub mod project;
pub mod session;
pub mod store;
pub mod task;
#[cfg(test)]
mod test_support;
pub mod tui {
    pub mod assistant;
    pub mod board;
    pub mod board_run;
    pub mod colors;
    pub mod enums;
    pub mod forms;
    pub mod input;
    pub mod worker;
}

use api::{ApiClient, Backend};
use cli::Cli;
use cmd::*;
use config::Config;
use error::Error;

/// Print a user-facing error and exit with status 1.
fn fail(err: Error) -> ! {
    tracing::error!(error = %err, "command failed");
    eprintln!("Error: {}", err.message());
    std::process::exit(1);
}

/// Logs go to stderr for subcommands. The board owns the terminal, so it logs
/// to a file under the data directory instead.
fn init_logging(config: &Config, to_file: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("taskboard=info"));
    let registry = tracing_subscriber::registry().with(filter);

    if to_file {
        fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("creating data directory {}", config.data_dir.display()))?;
        let path = config.log_path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return Ok(());
    }

    let config = Config::load(&cli).unwrap_or_else(|e| fail(e));
    let is_ui = matches!(cli.command, Commands::Ui);
    init_logging(&config, is_ui)?;
    tracing::debug!(api_url = %config.api_url, data_dir = %config.data_dir.display(), "configuration loaded");

    let client = ApiClient::new(&config.api_url).unwrap_or_else(|e| fail(e));
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    match cli.command {
        Commands::Ui => {
            let backend: Arc<dyn Backend> = Arc::new(client);
            tui::board_run::run_board_tui(&config, backend, runtime.handle().clone())
                .context("running the board")?;
        }
        command => {
            let mut stdout = io::stdout();
            if let Err(e) = runtime.block_on(run_command(command, &client, &mut stdout)) {
                fail(e);
            }
        }
    }
    Ok(())
}
