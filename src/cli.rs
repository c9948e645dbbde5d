use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Kanban client for a project/task REST backend.
/// Run `tb ui` for the board, or use the subcommands for scripting.
#[derive(Parser)]
#[command(name = "tb", version, about = "Kanban board client with an AI assistant")]
pub struct Cli {
    /// Backend base URL, e.g. http://localhost:5000/api.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Directory for the session file and the board log.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log debug output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
