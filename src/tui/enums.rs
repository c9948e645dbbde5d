//! Enumerations for TUI state management.

/// Which screen or overlay currently receives key presses.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Board,
    TaskForm,
    ProjectPanel,
    ProjectForm,
    Assistant,
    Confirm,
    Help,
}

/// The three things the AI assistant can do.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AiMode {
    Summarize,
    Ask,
    Suggest,
}

impl AiMode {
    pub fn next(self) -> Self {
        match self {
            AiMode::Summarize => AiMode::Ask,
            AiMode::Ask => AiMode::Suggest,
            AiMode::Suggest => AiMode::Summarize,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AiMode::Summarize => "Summarize Project",
            AiMode::Ask => "Ask Question",
            AiMode::Suggest => "Get Suggestions",
        }
    }

    /// Verb used in failure messages ("Failed to ...").
    pub fn action(self) -> &'static str {
        match self {
            AiMode::Summarize => "generate summary",
            AiMode::Ask => "get answer",
            AiMode::Suggest => "get suggestions",
        }
    }

    /// Whether the mode works on a single task rather than the project.
    pub fn needs_task(self) -> bool {
        !matches!(self, AiMode::Summarize)
    }
}

/// Destructive action awaiting a y/n answer.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ConfirmAction {
    DeleteTask { id: String, title: String },
    DeleteProject { id: String, name: String },
}

impl ConfirmAction {
    pub fn prompt(&self) -> String {
        match self {
            ConfirmAction::DeleteTask { title, .. } => format!("Delete task '{title}'? (y/n)"),
            ConfirmAction::DeleteProject { name, .. } => {
                format!("Delete project '{name}' and all its tasks? (y/n)")
            }
        }
    }
}
