//! AI assistant panel.
//!
//! Offers a project summary, a question about one task, or suggestions for
//! one task. The panel owns only its own input; requests go through the
//! board's worker.

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::error::{Error, Result};
use crate::task::Task;
use crate::tui::colors::PURPLE;
use crate::tui::enums::AiMode;
use crate::tui::input::InputField;

/// What the board should do after a key went to the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantAction {
    None,
    Close,
    /// Send a request: mode, task id for task modes, question for `Ask`.
    Run { mode: AiMode, task_id: Option<String>, question: String },
}

#[derive(Debug, Clone)]
pub struct AssistantPanel {
    pub mode: AiMode,
    pub task_index: usize,
    pub question: InputField,
    pub response: String,
    pub loading: bool,
}

impl AssistantPanel {
    pub fn new() -> Self {
        Self {
            mode: AiMode::Summarize,
            task_index: 0,
            question: InputField::new(),
            response: String::new(),
            loading: false,
        }
    }

    /// Reset to the summary mode with an empty response, as when reopened.
    pub fn reset(&mut self) {
        self.mode = AiMode::Summarize;
        self.response.clear();
        self.loading = false;
    }

    /// Check the inputs for the current mode before anything is sent.
    pub fn validate(&self, tasks: &[&Task]) -> Result<AssistantAction> {
        let task_id = if self.mode.needs_task() {
            let task = tasks
                .get(self.task_index)
                .ok_or_else(|| Error::validation("Please select a task"))?;
            Some(task.id.clone())
        } else {
            None
        };
        if self.mode == AiMode::Ask && self.question.value.trim().is_empty() {
            return Err(Error::validation("Please select a task and enter a question"));
        }
        Ok(AssistantAction::Run {
            mode: self.mode,
            task_id,
            question: self.question.value.trim().to_string(),
        })
    }

    pub fn handle_key(&mut self, key: KeyCode, tasks: &[&Task]) -> AssistantAction {
        if self.loading {
            // Only closing is allowed while a request is pending.
            return if key == KeyCode::Esc { AssistantAction::Close } else { AssistantAction::None };
        }
        match key {
            KeyCode::Esc => return AssistantAction::Close,
            KeyCode::Tab => {
                self.mode = self.mode.next();
                self.response.clear();
                self.question.active = self.mode == AiMode::Ask;
            }
            KeyCode::Up if self.mode.needs_task() => {
                self.task_index = self.task_index.saturating_sub(1);
            }
            KeyCode::Down if self.mode.needs_task() => {
                if self.task_index + 1 < tasks.len() {
                    self.task_index += 1;
                }
            }
            KeyCode::Enter => match self.validate(tasks) {
                Ok(action) => {
                    self.loading = true;
                    self.response.clear();
                    return action;
                }
                Err(e) => self.response = e.message(),
            },
            KeyCode::Left if self.mode == AiMode::Ask => self.question.move_cursor_left(),
            KeyCode::Right if self.mode == AiMode::Ask => self.question.move_cursor_right(),
            KeyCode::Backspace if self.mode == AiMode::Ask => self.question.handle_backspace(),
            KeyCode::Char(c) if self.mode == AiMode::Ask => self.question.handle_char(c),
            _ => {}
        }
        AssistantAction::None
    }

    /// Show the outcome of a request for `mode`. Late answers for a mode the
    /// user has since left are dropped.
    pub fn receive(&mut self, mode: AiMode, result: Result<String>) {
        if mode != self.mode {
            return;
        }
        self.loading = false;
        self.response = match result {
            Ok(text) => text,
            Err(e) => format!("Failed to {}: {}", mode.action(), e.message()),
        };
    }

    pub fn render(&self, f: &mut Frame, area: Rect, project_name: &str, tasks: &[&Task]) {
        f.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" AI Assistant · {project_name} "))
            .border_style(Style::default().fg(PURPLE).add_modifier(Modifier::BOLD));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(if self.mode.needs_task() { 7 } else { 0 }),
                Constraint::Length(if self.mode == AiMode::Ask { 3 } else { 0 }),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(inner);

        let tabs: Vec<Span> = [AiMode::Summarize, AiMode::Ask, AiMode::Suggest]
            .iter()
            .flat_map(|&m| {
                let style = if m == self.mode {
                    Style::default().bg(PURPLE).fg(Color::White).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                [Span::styled(format!(" {} ", m.title()), style), Span::raw(" ")]
            })
            .collect();
        f.render_widget(Paragraph::new(Line::from(tabs)), chunks[0]);

        if self.mode.needs_task() {
            let items: Vec<ListItem> = tasks
                .iter()
                .map(|t| ListItem::new(format!("{} ({})", t.title, t.status)))
                .collect();
            let mut state = ListState::default();
            if !tasks.is_empty() {
                state.select(Some(self.task_index.min(tasks.len() - 1)));
            }
            let list = List::new(items)
                .block(Block::default().borders(Borders::ALL).title("Select Task"))
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
            f.render_stateful_widget(list, chunks[1], &mut state);
        }

        if self.mode == AiMode::Ask {
            let question = Paragraph::new(self.question.display_with_cursor())
                .block(Block::default().borders(Borders::ALL).title("Your Question"));
            f.render_widget(question, chunks[2]);
        }

        let body = if self.loading {
            "Thinking...".to_string()
        } else if self.response.is_empty() {
            match self.mode {
                AiMode::Summarize => "Press Enter for a summary of the project's status and progress.".to_string(),
                AiMode::Ask => "Pick a task, type a question, press Enter.".to_string(),
                AiMode::Suggest => "Pick a task and press Enter for suggestions.".to_string(),
            }
        } else {
            self.response.clone()
        };
        let response = Paragraph::new(body)
            .block(Block::default().borders(Borders::ALL).title("AI Response"))
            .wrap(Wrap { trim: false });
        f.render_widget(response, chunks[3]);

        f.render_widget(
            Paragraph::new("Tab: Mode | ↑/↓: Task | Enter: Run | Esc: Close")
                .style(Style::default().fg(Color::DarkGray)),
            chunks[4],
        );
    }
}

impl Default for AssistantPanel {
    fn default() -> Self {
        Self::new()
    }
}
