//! Board TUI entry point and setup.

use std::io;
use std::sync::Arc;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};
use tokio::runtime::Handle;

use crate::api::Backend;
use crate::config::Config;
use crate::tui::board::BoardApp;
use crate::tui::worker::Worker;

/// Initialise and run the board terminal user interface.
///
/// Must be called off the runtime's worker threads; backend calls are spawned
/// onto `runtime` while this thread draws.
pub fn run_board_tui(config: &Config, backend: Arc<dyn Backend>, runtime: Handle) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let worker = Worker::new(backend, runtime);
    let mut app = BoardApp::new(worker, config.session_path());
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
