//! Task and project forms for the terminal user interface.
//!
//! Forms only collect and validate input. Submitting one produces the request
//! body; the board sends it and updates the store once the backend confirms.

use crossterm::event::KeyCode;

use crate::error::Result;
use crate::fields::Status;
use crate::project::{Project, ProjectInput};
use crate::task::{NewTask, Task, TaskEdit};
use crate::tui::input::InputField;

/// Result of feeding a key to a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    None,
    Submit,
    Cancel,
}

/// Shared key handling for forms made of text fields.
fn handle_form_key(fields: &mut [&mut InputField], current: &mut usize, key: KeyCode) -> FormAction {
    match key {
        KeyCode::Esc => return FormAction::Cancel,
        KeyCode::Enter => return FormAction::Submit,
        KeyCode::Tab | KeyCode::Down => *current = (*current + 1) % fields.len(),
        KeyCode::BackTab | KeyCode::Up => *current = (*current + fields.len() - 1) % fields.len(),
        KeyCode::Left => fields[*current].move_cursor_left(),
        KeyCode::Right => fields[*current].move_cursor_right(),
        KeyCode::Backspace => fields[*current].handle_backspace(),
        KeyCode::Delete => fields[*current].handle_delete(),
        KeyCode::Char(c) => fields[*current].handle_char(c),
        _ => {}
    }
    for (i, field) in fields.iter_mut().enumerate() {
        field.active = i == *current;
    }
    FormAction::None
}

/// Form for adding a task to a column or editing an existing one.
#[derive(Debug, Clone)]
pub struct TaskForm {
    pub title: InputField,
    pub description: InputField,
    /// Column the task is added to. Ignored when editing.
    pub status: Status,
    pub current_field: usize,
    /// Id of the task being edited, `None` when adding.
    pub editing: Option<String>,
}

impl TaskForm {
    /// Empty form for a new task in `status`'s column.
    pub fn new(status: Status) -> Self {
        let mut title = InputField::new();
        title.active = true;
        Self {
            title,
            description: InputField::new(),
            status,
            current_field: 0,
            editing: None,
        }
    }

    /// Form prefilled from an existing task.
    pub fn from_task(task: &Task) -> Self {
        let mut title = InputField::with_value(&task.title);
        title.active = true;
        Self {
            title,
            description: InputField::with_value(&task.description),
            status: task.status,
            current_field: 0,
            editing: Some(task.id.clone()),
        }
    }

    pub fn heading(&self) -> String {
        match self.editing {
            Some(_) => "Edit Task".to_string(),
            None => format!("New Task in {}", crate::fields::format_status(self.status)),
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> FormAction {
        let mut fields = [&mut self.title, &mut self.description];
        handle_form_key(&mut fields, &mut self.current_field, key)
    }

    pub fn to_new_task(&self, project_id: &str) -> Result<NewTask> {
        let input = NewTask::new(project_id, &self.title.value, &self.description.value, self.status);
        input.validate()?;
        Ok(input)
    }

    pub fn to_edit(&self) -> Result<TaskEdit> {
        let input = TaskEdit::new(&self.title.value, &self.description.value);
        input.validate()?;
        Ok(input)
    }
}

/// Form for creating or editing a project.
#[derive(Debug, Clone)]
pub struct ProjectForm {
    pub name: InputField,
    pub description: InputField,
    pub current_field: usize,
    pub editing: Option<String>,
}

impl ProjectForm {
    pub fn new() -> Self {
        let mut name = InputField::new();
        name.active = true;
        Self {
            name,
            description: InputField::new(),
            current_field: 0,
            editing: None,
        }
    }

    pub fn from_project(project: &Project) -> Self {
        let input = ProjectInput::from_project(project);
        let mut name = InputField::with_value(&input.name);
        name.active = true;
        Self {
            name,
            description: InputField::with_value(&input.description),
            current_field: 0,
            editing: Some(project.id.clone()),
        }
    }

    pub fn heading(&self) -> &'static str {
        match self.editing {
            Some(_) => "Edit Project",
            None => "New Project",
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> FormAction {
        let mut fields = [&mut self.name, &mut self.description];
        handle_form_key(&mut fields, &mut self.current_field, key)
    }

    pub fn to_input(&self) -> Result<ProjectInput> {
        let input = ProjectInput::new(&self.name.value, &self.description.value);
        input.validate()?;
        Ok(input)
    }
}

impl Default for ProjectForm {
    fn default() -> Self {
        Self::new()
    }
}
