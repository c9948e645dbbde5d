//! Kanban board interface.
//!
//! Shows the selected project's tasks in three status columns. Cards are moved
//! by picking them up with Space, carrying them with the arrow keys and
//! dropping them with Space again. Every backend call goes through the
//! [`Worker`], so the loop keeps drawing while requests are in flight.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend as TerminalBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::drag::DragController;
use crate::error::Error;
use crate::fields::{format_status, Status};
use crate::project::pick_initial_project;
use crate::session::Session;
use crate::store::{Settled, Store};
use crate::task::Task;
use crate::tui::assistant::{AssistantAction, AssistantPanel};
use crate::tui::colors::{status_color, DARK_RED, PURPLE, SLATE};
use crate::tui::enums::{ConfirmAction, Mode};
use crate::tui::forms::{FormAction, ProjectForm, TaskForm};
use crate::tui::worker::{BackendEvent, Worker};

const HELP_LINES: &[&str] = &[
    "←/→        Select column (moves the carried card while dragging)",
    "↑/↓        Select card",
    "Space      Pick up card / drop it on the highlighted column",
    "Esc        Cancel dragging",
    "a          Add task to the selected column",
    "e          Edit selected task",
    "x          Delete selected task",
    "p          Projects: Enter select, n new, e edit, x delete",
    "i          AI assistant",
    "r          Reload from the server",
    "q          Quit",
];

/// Main board application state
pub struct BoardApp {
    store: Store,
    drag: DragController,
    worker: Worker,
    session_path: PathBuf,
    last_project_id: Option<String>,
    mode: Mode,
    selected_column: usize,
    selected_card: usize,
    project_cursor: usize,
    task_form: Option<TaskForm>,
    project_form: Option<ProjectForm>,
    /// A task form submit is waiting for the backend.
    task_saving: bool,
    project_saving: bool,
    confirm: Option<ConfirmAction>,
    assistant: AssistantPanel,
    status_message: String,
    status_is_error: bool,
    loading: bool,
    quit: bool,
}

impl BoardApp {
    /// Create the board and start fetching projects.
    pub fn new(worker: Worker, session_path: PathBuf) -> Self {
        let last_project_id = Session::load(&session_path).last_project_id;
        let mut app = BoardApp {
            store: Store::new(),
            drag: DragController::new(),
            worker,
            session_path,
            last_project_id,
            mode: Mode::Board,
            selected_column: 0,
            selected_card: 0,
            project_cursor: 0,
            task_form: None,
            project_form: None,
            task_saving: false,
            project_saving: false,
            confirm: None,
            assistant: AssistantPanel::new(),
            status_message: String::new(),
            status_is_error: false,
            loading: true,
            quit: false,
        };
        app.worker.load_projects();
        app
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
        self.status_is_error = false;
    }

    fn set_error(&mut self, context: &str, err: &Error) {
        tracing::warn!(error = %err, "{context}");
        self.status_message = format!("{context}: {}", err.message());
        self.status_is_error = true;
    }

    fn selected_status(&self) -> Status {
        Status::from_column(self.selected_column).unwrap_or(Status::Todo)
    }

    fn selected_task(&self) -> Option<&Task> {
        self.store
            .column(self.selected_status())
            .get(self.selected_card)
            .copied()
    }

    fn clamp_selection(&mut self) {
        let len = self.store.column(self.selected_status()).len();
        if len == 0 {
            self.selected_card = 0;
        } else if self.selected_card >= len {
            self.selected_card = len - 1;
        }
    }

    /// Select `id`, fetch its tasks and remember it for the next start.
    fn open_project(&mut self, id: &str) {
        if self.store.select_project(id) {
            self.loading = true;
            self.worker.load_tasks(id.to_string());
            Session::remember(&self.session_path, Some(id));
            self.selected_column = 0;
            self.selected_card = 0;
        }
    }

    fn reload(&mut self) {
        self.loading = true;
        self.worker.load_projects();
        if let Some(id) = self.store.selected_project_id() {
            self.worker.load_tasks(id.to_string());
        }
        self.set_status_message("Reloading...");
    }

    // ---- input ----

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }
        match self.mode {
            Mode::Board => self.handle_board_key(key.code),
            Mode::TaskForm => self.handle_task_form_key(key.code),
            Mode::ProjectPanel => self.handle_project_panel_key(key.code),
            Mode::ProjectForm => self.handle_project_form_key(key.code),
            Mode::Assistant => self.handle_assistant_key(key.code),
            Mode::Confirm => self.handle_confirm_key(key.code),
            Mode::Help => self.mode = Mode::Board,
        }
    }

    fn handle_board_key(&mut self, code: KeyCode) {
        if self.drag.is_dragging() {
            self.handle_drag_key(code);
            return;
        }
        match code {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Left => {
                if self.selected_column > 0 {
                    self.selected_column -= 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Right => {
                if self.selected_column + 1 < Status::ALL.len() {
                    self.selected_column += 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Up => self.selected_card = self.selected_card.saturating_sub(1),
            KeyCode::Down => {
                self.selected_card += 1;
                self.clamp_selection();
            }
            KeyCode::Char(' ') => {
                if let Some(task) = self.selected_task().cloned() {
                    self.set_status_message(format!(
                        "Carrying '{}': ←/→ choose column, Space drop, Esc cancel",
                        task.title
                    ));
                    self.drag.start(task);
                }
            }
            KeyCode::Char('a') => {
                if self.store.selected_project().is_some() {
                    self.task_form = Some(TaskForm::new(self.selected_status()));
                    self.mode = Mode::TaskForm;
                } else {
                    self.set_status_message("Select or create a project first (p)");
                }
            }
            KeyCode::Char('e') => {
                if let Some(task) = self.selected_task() {
                    self.task_form = Some(TaskForm::from_task(task));
                    self.mode = Mode::TaskForm;
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(task) = self.selected_task() {
                    self.confirm = Some(ConfirmAction::DeleteTask {
                        id: task.id.clone(),
                        title: task.title.clone(),
                    });
                    self.mode = Mode::Confirm;
                }
            }
            KeyCode::Char('p') => {
                self.project_cursor = self
                    .store
                    .selected_project_id()
                    .and_then(|id| self.store.projects().iter().position(|p| p.id == id))
                    .unwrap_or(0);
                self.mode = Mode::ProjectPanel;
            }
            KeyCode::Char('i') => {
                if self.store.selected_project().is_some() {
                    self.assistant.reset();
                    self.mode = Mode::Assistant;
                } else {
                    self.set_status_message("Select a project to use the assistant");
                }
            }
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('?') | KeyCode::Char('h') => self.mode = Mode::Help,
            _ => {}
        }
    }

    fn handle_drag_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Left | KeyCode::Right => {
                let current = self.drag.hover().map(Status::column).unwrap_or(self.selected_column);
                let next = if code == KeyCode::Left {
                    current.saturating_sub(1)
                } else {
                    (current + 1).min(Status::ALL.len() - 1)
                };
                if let Some(column) = Status::from_column(next) {
                    self.drag.drag_over(column);
                    self.selected_column = next;
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                let Some(request) = self.drag.drop_here() else {
                    self.clear_drag_message();
                    return;
                };
                match self.store.begin_status_transition(&request.task_id, request.to) {
                    Some(pending) => {
                        self.worker.persist_status(pending);
                        self.set_status_message(format!("Moved to {}", format_status(request.to)));
                        if let Some(pos) = self
                            .store
                            .column(request.to)
                            .iter()
                            .position(|t| t.id == request.task_id)
                        {
                            self.selected_card = pos;
                        }
                    }
                    None => self.clear_drag_message(),
                }
                self.clamp_selection();
            }
            KeyCode::Esc => {
                if let Some(task) = self.drag.dragged() {
                    self.selected_column = task.status.column();
                }
                self.drag.cancel();
                self.set_status_message("Move cancelled");
                self.clamp_selection();
            }
            KeyCode::Char('q') => {
                self.drag.cancel();
                self.quit = true;
            }
            _ => {}
        }
    }

    fn clear_drag_message(&mut self) {
        self.status_message.clear();
        self.status_is_error = false;
    }

    fn handle_task_form_key(&mut self, code: KeyCode) {
        let Some(form) = self.task_form.as_mut() else {
            self.mode = Mode::Board;
            return;
        };
        match form.handle_key(code) {
            FormAction::None => {}
            FormAction::Cancel => {
                self.task_form = None;
                self.task_saving = false;
                self.mode = Mode::Board;
            }
            FormAction::Submit if self.task_saving => {}
            FormAction::Submit => {
                let form = form.clone();
                let sent = match (&form.editing, self.store.selected_project_id()) {
                    (Some(id), _) => form.to_edit().map(|edit| self.worker.update_task(id.clone(), edit)),
                    (None, Some(project_id)) => {
                        let project_id = project_id.to_string();
                        form.to_new_task(&project_id).map(|input| self.worker.create_task(input))
                    }
                    (None, None) => Err(Error::validation("Project is required")),
                };
                match sent {
                    Ok(()) => {
                        self.task_saving = true;
                        self.set_status_message("Saving task...");
                    }
                    Err(e) => self.set_error("Cannot save task", &e),
                }
            }
        }
    }

    fn handle_project_panel_key(&mut self, code: KeyCode) {
        let count = self.store.projects().len();
        match code {
            KeyCode::Esc | KeyCode::Char('q') => self.mode = Mode::Board,
            KeyCode::Up => self.project_cursor = self.project_cursor.saturating_sub(1),
            KeyCode::Down => {
                if self.project_cursor + 1 < count {
                    self.project_cursor += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(id) = self.store.projects().get(self.project_cursor).map(|p| p.id.clone()) {
                    self.open_project(&id);
                    self.mode = Mode::Board;
                }
            }
            KeyCode::Char('n') | KeyCode::Char('a') => {
                self.project_form = Some(ProjectForm::new());
                self.mode = Mode::ProjectForm;
            }
            KeyCode::Char('e') => {
                if let Some(project) = self.store.projects().get(self.project_cursor) {
                    self.project_form = Some(ProjectForm::from_project(project));
                    self.mode = Mode::ProjectForm;
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(project) = self.store.projects().get(self.project_cursor) {
                    self.confirm = Some(ConfirmAction::DeleteProject {
                        id: project.id.clone(),
                        name: project.name.clone(),
                    });
                    self.mode = Mode::Confirm;
                }
            }
            _ => {}
        }
    }

    fn handle_project_form_key(&mut self, code: KeyCode) {
        let Some(form) = self.project_form.as_mut() else {
            self.mode = Mode::ProjectPanel;
            return;
        };
        match form.handle_key(code) {
            FormAction::None => {}
            FormAction::Cancel => {
                self.project_form = None;
                self.project_saving = false;
                self.mode = Mode::ProjectPanel;
            }
            FormAction::Submit if self.project_saving => {}
            FormAction::Submit => {
                let editing = form.editing.clone();
                match form.to_input() {
                    Ok(input) => {
                        match editing {
                            Some(id) => self.worker.update_project(id, input),
                            None => self.worker.create_project(input),
                        }
                        self.project_saving = true;
                        self.set_status_message("Saving project...");
                    }
                    Err(e) => self.set_error("Cannot save project", &e),
                }
            }
        }
    }

    fn handle_assistant_key(&mut self, code: KeyCode) {
        let tasks: Vec<&Task> = self.store.visible_tasks().collect();
        match self.assistant.handle_key(code, &tasks) {
            AssistantAction::None => {}
            AssistantAction::Close => self.mode = Mode::Board,
            AssistantAction::Run { mode, task_id, question } => {
                if let Some(project_id) = self.store.selected_project_id() {
                    let project_id = project_id.to_string();
                    self.worker.ask_ai(mode, project_id, task_id, question);
                }
            }
        }
    }

    fn handle_confirm_key(&mut self, code: KeyCode) {
        let Some(action) = self.confirm.take() else {
            self.mode = Mode::Board;
            return;
        };
        let back = match action {
            ConfirmAction::DeleteTask { .. } => Mode::Board,
            ConfirmAction::DeleteProject { .. } => Mode::ProjectPanel,
        };
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                match action {
                    ConfirmAction::DeleteTask { id, .. } => self.worker.delete_task(id),
                    ConfirmAction::DeleteProject { id, .. } => self.worker.delete_project(id),
                }
                self.set_status_message("Deleting...");
                self.mode = back;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.mode = back,
            _ => self.confirm = Some(action),
        }
    }

    // ---- backend events ----

    /// Apply every finished request. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.worker.try_next() {
            self.apply_event(event);
            applied += 1;
        }
        if self.worker.in_flight() == 0 {
            self.loading = false;
        }
        applied
    }

    pub fn apply_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::ProjectsLoaded(Ok(projects)) => {
                self.store.set_projects(projects);
                if self.store.selected_project().is_none() {
                    let initial = pick_initial_project(self.store.projects(), self.last_project_id.as_deref())
                        .map(|p| p.id.clone());
                    if let Some(id) = initial {
                        self.open_project(&id);
                    }
                }
                self.project_cursor = self.project_cursor.min(self.store.projects().len().saturating_sub(1));
            }
            BackendEvent::ProjectsLoaded(Err(e)) => self.set_error(
                "Failed to fetch projects. Make sure the backend server is running",
                &e,
            ),
            BackendEvent::TasksLoaded { project_id, result } => {
                if self.store.selected_project_id() != Some(project_id.as_str()) {
                    tracing::debug!(%project_id, "dropping tasks of a project no longer selected");
                    return;
                }
                match result {
                    Ok(tasks) => {
                        self.store.set_tasks(tasks);
                        self.clamp_selection();
                    }
                    Err(e) => self.set_error("Failed to fetch tasks", &e),
                }
            }
            BackendEvent::ProjectCreated(result) => {
                self.project_saving = false;
                match result {
                    Ok(project) => {
                        let id = project.id.clone();
                        self.set_status_message(format!("Created project '{}'", project.name));
                        self.store.add_project(project);
                        self.project_form = None;
                        self.open_project(&id);
                        self.mode = Mode::Board;
                    }
                    Err(e) => self.set_error("Failed to create project", &e),
                }
            }
            BackendEvent::ProjectUpdated(result) => {
                self.project_saving = false;
                match result {
                    Ok(project) => {
                        self.set_status_message(format!("Updated project '{}'", project.name));
                        self.store.replace_project(project);
                        self.project_form = None;
                        if self.mode == Mode::ProjectForm {
                            self.mode = Mode::ProjectPanel;
                        }
                    }
                    Err(e) => self.set_error("Failed to update project", &e),
                }
            }
            BackendEvent::ProjectDeleted { id, result } => match result {
                Ok(()) => {
                    let was_selected = self.store.selected_project_id() == Some(id.as_str());
                    if let Some(next) = self.store.remove_project(&id) {
                        self.loading = true;
                        self.worker.load_tasks(next.clone());
                        Session::remember(&self.session_path, Some(&next));
                    } else if was_selected {
                        Session::remember(&self.session_path, None);
                    }
                    self.project_cursor = self.project_cursor.min(self.store.projects().len().saturating_sub(1));
                    self.clamp_selection();
                    self.set_status_message("Project deleted");
                }
                Err(e) => self.set_error("Failed to delete project", &e),
            },
            BackendEvent::TaskCreated(result) => {
                self.task_saving = false;
                match result {
                    Ok(task) => {
                        self.set_status_message(format!("Added '{}'", task.title));
                        self.store.add_task(task);
                        self.task_form = None;
                        if self.mode == Mode::TaskForm {
                            self.mode = Mode::Board;
                        }
                    }
                    Err(e) => self.set_error("Failed to create task", &e),
                }
            }
            BackendEvent::TaskUpdated(result) => {
                self.task_saving = false;
                match result {
                    Ok(task) => {
                        self.set_status_message(format!("Updated '{}'", task.title));
                        self.store.replace_task(task);
                        self.task_form = None;
                        if self.mode == Mode::TaskForm {
                            self.mode = Mode::Board;
                        }
                    }
                    Err(e) => self.set_error("Failed to update task", &e),
                }
            }
            BackendEvent::TaskDeleted { id, result } => match result {
                Ok(()) => {
                    self.store.remove_task(&id);
                    self.clamp_selection();
                    self.set_status_message("Task deleted");
                }
                Err(e) => self.set_error("Failed to delete task", &e),
            },
            BackendEvent::StatusSettled { pending, result } => {
                let settled = self.store.settle_status_transition(&pending, &result);
                if let Err(e) = &result {
                    self.set_error("Failed to update task status", e);
                } else if settled == Settled::Confirmed {
                    tracing::debug!(task_id = %pending.task_id, to = %pending.to, "status change saved");
                }
                self.clamp_selection();
            }
            BackendEvent::AiAnswered { mode, result } => self.assistant.receive(mode, result),
        }
    }

    // ---- rendering ----

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(1), // Stats
                Constraint::Min(0),    // Board
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_stats(f, chunks[1]);
        self.render_board(f, chunks[2]);
        self.render_status_bar(f, chunks[3]);

        match self.mode {
            Mode::TaskForm => self.render_task_form(f),
            Mode::ProjectPanel => self.render_project_panel(f),
            Mode::ProjectForm => {
                self.render_project_panel(f);
                self.render_project_form(f);
            }
            Mode::Assistant => {
                let area = centered_rect(f.area(), 80, 80);
                let name = self.store.selected_project().map(|p| p.name.as_str()).unwrap_or("-");
                let tasks: Vec<&Task> = self.store.visible_tasks().collect();
                self.assistant.render(f, area, name, &tasks);
            }
            Mode::Confirm => self.render_confirm(f),
            Mode::Help => self.render_help(f),
            Mode::Board => {}
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let (name, description) = match self.store.selected_project() {
            Some(p) => (p.name.clone(), p.description.clone()),
            None if self.loading => ("Loading...".to_string(), String::new()),
            None => ("No project selected (press p)".to_string(), String::new()),
        };
        let header = Paragraph::new(Line::from(vec![
            Span::styled("TASKBOARD", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(name, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(description, Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC)),
        ]))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_stats(&self, f: &mut Frame, area: Rect) {
        let stats = self.store.stats();
        let line = Line::from(vec![
            Span::raw(format!(" Total {}  ", stats.total)),
            Span::styled(format!("To Do {}  ", stats.todo), Style::default().fg(status_color(Status::Todo))),
            Span::styled(
                format!("In Progress {}  ", stats.in_progress),
                Style::default().fg(status_color(Status::InProgress)),
            ),
            Span::styled(format!("Done {}  ", stats.done), Style::default().fg(status_color(Status::Done))),
            Span::styled(
                format!("{}% complete", stats.completion_percent()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]);
        f.render_widget(Paragraph::new(line), area);
    }

    fn render_board(&self, f: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3); 3])
            .split(area);
        for (status, &column_area) in Status::ALL.iter().zip(columns.iter()) {
            self.render_column(f, column_area, *status);
        }
    }

    fn render_column(&self, f: &mut Frame, area: Rect, status: Status) {
        let tasks = self.store.column(status);
        let is_selected = status.column() == self.selected_column;
        let is_drop_target = self.drag.is_dragging() && self.drag.hover() == Some(status);
        let color = status_color(status);

        let border_style = if is_drop_target {
            Style::default().fg(color).add_modifier(Modifier::BOLD | Modifier::RAPID_BLINK)
        } else if is_selected {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(SLATE)
        };
        let mut title = format!(" {} ({}) ", format_status(status), tasks.len());
        if is_drop_target {
            title.push_str("⇣ drop here ");
        }
        let block = Block::default().borders(Borders::ALL).title(title).border_style(border_style);
        let inner = block.inner(area);
        f.render_widget(block, area);

        if tasks.is_empty() {
            let empty = Paragraph::new("No tasks").style(Style::default().fg(Color::DarkGray)).alignment(Alignment::Center);
            f.render_widget(empty, inner);
            return;
        }

        let card_height = 4usize;
        let visible = (inner.height as usize / card_height).max(1);
        let offset = if is_selected && self.selected_card >= visible {
            self.selected_card + 1 - visible
        } else {
            0
        };

        for (i, task) in tasks.iter().enumerate().skip(offset).take(visible) {
            let y = inner.y + ((i - offset) * card_height) as u16;
            if y + card_height as u16 > inner.y + inner.height {
                break;
            }
            let card_area = Rect { x: inner.x, y, width: inner.width, height: card_height as u16 };
            self.render_card(f, card_area, task, is_selected && i == self.selected_card);
        }

        if offset + visible < tasks.len() {
            let more = Paragraph::new(format!("▼ +{} below", tasks.len() - offset - visible)).style(Style::default().fg(Color::Cyan));
            f.render_widget(more, Rect { x: inner.x, y: inner.y + inner.height - 1, width: inner.width, height: 1 });
        }
    }

    fn render_card(&self, f: &mut Frame, area: Rect, task: &Task, is_selected: bool) {
        let carried = self.drag.dragged().map(|t| t.id == task.id).unwrap_or(false);
        let color = status_color(task.status);
        let style = if carried {
            Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD | Modifier::ITALIC)
        } else if is_selected {
            Style::default().bg(color).fg(Color::Black).add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(Color::DarkGray)
        };
        let text = vec![
            Line::from(task.title.clone()),
            Line::from(Span::styled(task.description.clone(), Style::default().add_modifier(Modifier::DIM))),
        ];
        let card = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL))
            .style(style)
            .wrap(Wrap { trim: true });
        f.render_widget(card, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else if self.loading {
            "Loading...".to_string()
        } else {
            "Space: Move | a: Add | e: Edit | x: Delete | p: Projects | i: AI | r: Reload | ?: Help | q: Quit".to_string()
        };
        let bg = if self.status_is_error { DARK_RED } else { SLATE };
        let status = Paragraph::new(text).style(Style::default().bg(bg).fg(Color::White));
        f.render_widget(status, area);
    }

    fn render_task_form(&self, f: &mut Frame) {
        let Some(form) = &self.task_form else { return };
        let area = centered_rect(f.area(), 60, 40);
        f.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", form.heading()))
            .border_style(Style::default().fg(status_color(form.status)).add_modifier(Modifier::BOLD));
        let inner = block.inner(area);
        f.render_widget(block, area);
        render_fields(
            f,
            inner,
            &[("Title", form.title.display_with_cursor()), ("Description", form.description.display_with_cursor())],
            form.current_field,
        );
    }

    fn render_project_panel(&self, f: &mut Frame) {
        let area = centered_rect(f.area(), 50, 60);
        f.render_widget(Clear, area);
        let items: Vec<ListItem> = self
            .store
            .projects()
            .iter()
            .map(|p| {
                let marker = if Some(p.id.as_str()) == self.store.selected_project_id() { "● " } else { "  " };
                ListItem::new(vec![
                    Line::from(format!("{marker}{}", p.name)),
                    Line::from(Span::styled(
                        format!("    {}", p.created_date()),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect();
        let mut state = ListState::default();
        if !items.is_empty() {
            state.select(Some(self.project_cursor));
        }
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Projects · Enter: Open | n: New | e: Edit | x: Delete | Esc: Back ")
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        f.render_stateful_widget(list, area, &mut state);
    }

    fn render_project_form(&self, f: &mut Frame) {
        let Some(form) = &self.project_form else { return };
        let area = centered_rect(f.area(), 60, 40);
        f.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", form.heading()))
            .border_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        let inner = block.inner(area);
        f.render_widget(block, area);
        render_fields(
            f,
            inner,
            &[("Name", form.name.display_with_cursor()), ("Description", form.description.display_with_cursor())],
            form.current_field,
        );
    }

    fn render_confirm(&self, f: &mut Frame) {
        let Some(action) = &self.confirm else { return };
        let area = centered_rect(f.area(), 50, 20);
        f.render_widget(Clear, area);
        let popup = Paragraph::new(action.prompt())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Confirm ")
                    .border_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(popup, area);
    }

    fn render_help(&self, f: &mut Frame) {
        let area = centered_rect(f.area(), 70, 60);
        f.render_widget(Clear, area);
        let lines: Vec<Line> = HELP_LINES.iter().map(|l| Line::from(*l)).collect();
        let popup = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Keys (any key to close) ")
                .border_style(Style::default().fg(PURPLE)),
        );
        f.render_widget(popup, area);
    }

    /// Main event loop
    pub fn run<B: TerminalBackend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        while !self.quit {
            self.pump();
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Labelled input boxes stacked top to bottom.
fn render_fields(f: &mut Frame, area: Rect, fields: &[(&str, String)], current: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            fields
                .iter()
                .map(|_| Constraint::Length(3))
                .chain(std::iter::once(Constraint::Min(1)))
                .collect::<Vec<_>>(),
        )
        .split(area);
    for (i, (label, value)) in fields.iter().enumerate() {
        let style = if i == current { Style::default().fg(Color::Yellow) } else { Style::default() };
        let widget = Paragraph::new(value.as_str())
            .block(Block::default().borders(Borders::ALL).title(*label).border_style(style));
        f.render_widget(widget, chunks[i]);
    }
    let hint = Paragraph::new("Tab: Next field | Enter: Save | Esc: Cancel").style(Style::default().fg(Color::DarkGray));
    f.render_widget(hint, chunks[fields.len()]);
}

/// A rectangle centred in `area` taking the given percentages of it.
fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let scale = |len: u16, percent: u16| (u32::from(len) * u32::from(percent.min(100)) / 100) as u16;
    let width = scale(area.width, percent_x);
    let height = scale(area.height, percent_y);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::test_support::{project, task, FakeBackend};
    use crate::tui::enums::AiMode;

    struct Harness {
        _runtime: tokio::runtime::Runtime,
        _dir: tempfile::TempDir,
        backend: Arc<FakeBackend>,
        app: BoardApp,
    }

    impl Harness {
        fn new(backend: FakeBackend) -> Self {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let dir = tempfile::tempdir().unwrap();
            let backend = Arc::new(backend);
            let worker = Worker::new(backend.clone(), runtime.handle().clone());
            let app = BoardApp::new(worker, dir.path().join("session.json"));
            let mut harness = Harness { _runtime: runtime, _dir: dir, backend, app };
            harness.settle();
            harness
        }

        /// Apply events until no request is outstanding.
        fn settle(&mut self) {
            for _ in 0..400 {
                self.app.pump();
                if self.app.worker.in_flight() == 0 {
                    return;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            panic!("requests did not finish");
        }

        fn press(&mut self, code: KeyCode) {
            self.app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
        }

        fn type_text(&mut self, text: &str) {
            for c in text.chars() {
                self.press(KeyCode::Char(c));
            }
        }
    }

    fn launch_backend() -> FakeBackend {
        FakeBackend::with_data(
            vec![project("p1", "Launch"), project("p2", "Docs")],
            vec![
                task("t1", "p1", Status::Todo),
                task("t2", "p1", Status::Done),
                task("t3", "p2", Status::Todo),
            ],
        )
    }

    #[test]
    fn test_startup_selects_first_project_and_loads_tasks() {
        let h = Harness::new(launch_backend());
        assert_eq!(h.app.store().selected_project_id(), Some("p1"));
        assert_eq!(h.app.store().visible_tasks().count(), 2);
        assert_eq!(h.app.store().stats().done, 1);
        assert!(!h.app.loading);
    }

    #[test]
    fn test_startup_reopens_remembered_project() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let session_path = dir.path().join("session.json");
        Session::remember(&session_path, Some("p2"));

        let backend = Arc::new(launch_backend());
        let worker = Worker::new(backend.clone(), runtime.handle().clone());
        let app = BoardApp::new(worker, session_path);
        let mut h = Harness { _runtime: runtime, _dir: dir, backend, app };
        h.settle();
        assert_eq!(h.app.store().selected_project_id(), Some("p2"));
    }

    #[test]
    fn test_carry_and_drop_moves_card() {
        let mut h = Harness::new(launch_backend());
        h.press(KeyCode::Char(' '));
        assert!(h.app.drag.is_dragging());
        h.press(KeyCode::Right);
        assert_eq!(h.app.drag.hover(), Some(Status::InProgress));
        h.press(KeyCode::Char(' '));
        assert!(!h.app.drag.is_dragging());

        // Optimistic before the backend answers.
        assert_eq!(h.app.store().task("t1").unwrap().status, Status::InProgress);
        h.settle();
        assert_eq!(h.app.store().task("t1").unwrap().status, Status::InProgress);
        assert!(h.backend.calls().contains(&"set_task_status t1 inprogress".to_string()));
        assert_eq!(h.app.selected_column, 1);
    }

    #[test]
    fn test_refused_drop_rolls_back_and_reports() {
        let mut h = Harness::new(launch_backend());
        h.backend.fail_with(Error::Backend { status: 500, message: "Task not found".into() });
        h.press(KeyCode::Char(' '));
        h.press(KeyCode::Right);
        h.press(KeyCode::Right);
        h.press(KeyCode::Char(' '));
        h.settle();

        assert_eq!(h.app.store().task("t1").unwrap().status, Status::Todo);
        assert!(h.app.status_is_error);
        assert_eq!(h.app.status_message, "Failed to update task status: Task not found");
    }

    #[test]
    fn test_escape_and_same_column_drop_make_no_request() {
        let mut h = Harness::new(launch_backend());
        h.press(KeyCode::Char(' '));
        h.press(KeyCode::Right);
        h.press(KeyCode::Esc);
        assert_eq!(h.app.selected_column, 0);
        h.press(KeyCode::Char(' '));
        assert!(h.app.drag.is_dragging());
        h.press(KeyCode::Char(' '));
        h.settle();

        assert!(!h.app.drag.is_dragging());
        assert_eq!(h.app.store().task("t1").unwrap().status, Status::Todo);
        assert!(!h.backend.calls().iter().any(|c| c.starts_with("set_task_status")));
    }

    #[test]
    fn test_add_task_through_form() {
        let mut h = Harness::new(launch_backend());
        h.press(KeyCode::Right);
        h.press(KeyCode::Char('a'));
        assert_eq!(h.app.mode(), Mode::TaskForm);

        h.press(KeyCode::Enter);
        assert_eq!(h.app.status_message, "Cannot save task: Task title is required");
        assert_eq!(h.app.mode(), Mode::TaskForm);

        h.type_text("Ship it");
        h.press(KeyCode::Enter);
        h.settle();
        assert_eq!(h.app.mode(), Mode::Board);
        let column = h.app.store().column(Status::InProgress);
        assert_eq!(column.len(), 1);
        assert_eq!(column[0].title, "Ship it");
    }

    #[test]
    fn test_repeated_enter_saves_task_once() {
        let mut h = Harness::new(launch_backend());
        h.press(KeyCode::Char('a'));
        h.type_text("Ship it");
        h.press(KeyCode::Enter);
        h.press(KeyCode::Enter);
        h.settle();

        let creates = h.backend.calls().iter().filter(|c| c.starts_with("create_task")).count();
        assert_eq!(creates, 1);
        assert_eq!(h.app.store().column(Status::Todo).len(), 2);
        assert_eq!(h.app.mode(), Mode::Board);
    }

    #[test]
    fn test_failed_save_allows_retry() {
        let mut h = Harness::new(launch_backend());
        h.press(KeyCode::Char('p'));
        h.press(KeyCode::Char('n'));
        h.type_text("Launch 2");
        h.backend.fail_with(Error::Network("timeout".into()));
        h.press(KeyCode::Enter);
        h.press(KeyCode::Enter);
        h.settle();
        assert_eq!(h.app.mode(), Mode::ProjectForm);
        assert_eq!(h.app.status_message, "Failed to create project: timeout");

        h.press(KeyCode::Enter);
        h.settle();
        assert_eq!(h.app.mode(), Mode::Board);
        let creates = h.backend.calls().iter().filter(|c| c.starts_with("create_project")).count();
        assert_eq!(creates, 2);
    }

    #[test]
    fn test_centered_rect_on_wide_terminal() {
        let area = Rect::new(0, 0, 1000, 50);
        let rect = centered_rect(area, 80, 70);
        assert_eq!(rect, Rect::new(100, 7, 800, 35));

        let full = centered_rect(Rect::new(2, 3, u16::MAX - 2, 40), 100, 100);
        assert_eq!(full, Rect::new(2, 3, u16::MAX - 2, 40));
    }

    #[test]
    fn test_delete_task_asks_first() {
        let mut h = Harness::new(launch_backend());
        h.press(KeyCode::Char('x'));
        assert_eq!(h.app.mode(), Mode::Confirm);
        h.press(KeyCode::Char('n'));
        assert_eq!(h.app.mode(), Mode::Board);
        assert!(h.app.store().task("t1").is_some());

        h.press(KeyCode::Char('x'));
        h.press(KeyCode::Char('y'));
        h.settle();
        assert!(h.app.store().task("t1").is_none());
        assert!(h.backend.calls().contains(&"delete_task t1".to_string()));
    }

    #[test]
    fn test_deleting_selected_project_opens_next() {
        let mut h = Harness::new(launch_backend());
        h.press(KeyCode::Char('p'));
        assert_eq!(h.app.mode(), Mode::ProjectPanel);
        h.press(KeyCode::Char('x'));
        h.press(KeyCode::Char('y'));
        h.settle();

        assert_eq!(h.app.mode(), Mode::ProjectPanel);
        assert_eq!(h.app.store().projects().len(), 1);
        assert_eq!(h.app.store().selected_project_id(), Some("p2"));
        assert_eq!(h.app.store().visible_tasks().count(), 1);
        assert!(h.app.store().tasks().iter().all(|t| t.project_id != "p1"));
        assert_eq!(
            Session::load(&h.app.session_path).last_project_id.as_deref(),
            Some("p2")
        );
    }

    #[test]
    fn test_switch_project_from_panel() {
        let mut h = Harness::new(launch_backend());
        h.press(KeyCode::Char('p'));
        h.press(KeyCode::Down);
        h.press(KeyCode::Enter);
        h.settle();
        assert_eq!(h.app.mode(), Mode::Board);
        assert_eq!(h.app.store().selected_project_id(), Some("p2"));
        assert_eq!(h.app.store().column(Status::Todo)[0].id, "t3");
    }

    #[test]
    fn test_create_project_selects_it() {
        let mut h = Harness::new(FakeBackend::new());
        assert!(h.app.store().selected_project().is_none());
        h.press(KeyCode::Char('p'));
        h.press(KeyCode::Char('n'));
        h.type_text("Launch");
        h.press(KeyCode::Enter);
        h.settle();
        assert_eq!(h.app.mode(), Mode::Board);
        assert_eq!(h.app.store().selected_project().map(|p| p.name.as_str()), Some("Launch"));
    }

    #[test]
    fn test_stale_task_list_is_ignored() {
        let mut h = Harness::new(launch_backend());
        h.app.apply_event(BackendEvent::TasksLoaded {
            project_id: "p2".into(),
            result: Ok(vec![task("t9", "p2", Status::Done)]),
        });
        assert!(h.app.store().task("t9").is_none());
        assert_eq!(h.app.store().visible_tasks().count(), 2);
    }

    #[test]
    fn test_assistant_summary() {
        let mut h = Harness::new(launch_backend());
        h.press(KeyCode::Char('i'));
        assert_eq!(h.app.mode(), Mode::Assistant);
        h.press(KeyCode::Enter);
        h.settle();
        assert_eq!(h.app.assistant.mode, AiMode::Summarize);
        assert!(!h.app.assistant.loading);
        assert!(!h.app.assistant.response.is_empty());
        assert!(h.backend.calls().contains(&"summarize_project p1".to_string()));
        h.press(KeyCode::Esc);
        assert_eq!(h.app.mode(), Mode::Board);
    }

    #[test]
    fn test_quit_keys() {
        let mut h = Harness::new(launch_backend());
        h.app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(h.app.should_quit());
    }
}
