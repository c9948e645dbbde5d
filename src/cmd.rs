//! Command implementations for the CLI interface.
//!
//! Each handler talks to the backend through the [`Backend`] trait and writes
//! plain-text output, so the same code runs against the HTTP client in
//! `main` and against the in-memory fake in tests.

use std::io::Write;

use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::api::Backend;
use crate::error::{Error, Result};
use crate::fields::{format_status, Status};
use crate::project::{Project, ProjectInput};
use crate::store::Store;
use crate::task::{NewTask, Task, TaskEdit};

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the kanban board interface.
    Ui,

    /// List all projects.
    Projects,

    /// Create, update or delete a project.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Show a project's tasks grouped by status.
    Tasks {
        /// Project ID.
        project_id: String,
    },

    /// Create, edit, move or delete a task.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Task counts and completion for a project.
    Stats {
        /// Project ID.
        project_id: String,
    },

    /// Ask the AI assistant about a project or task.
    Ai {
        #[command(subcommand)]
        action: AiAction,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project.
    Add {
        name: String,
        /// Optional description.
        #[arg(long)]
        desc: Option<String>,
    },
    /// Rename a project or change its description.
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        desc: Option<String>,
    },
    /// Delete a project and all of its tasks.
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to a project.
    Add {
        project_id: String,
        title: String,
        #[arg(long)]
        desc: Option<String>,
        /// Column to add the task to: todo | inprogress | done.
        #[arg(long, value_enum, default_value_t = Status::Todo)]
        status: Status,
    },
    /// Change a task's title or description.
    Update {
        project_id: String,
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
    },
    /// Move a task to another column.
    Move {
        project_id: String,
        task_id: String,
        /// Target status: todo | inprogress | done.
        #[arg(value_enum)]
        status: Status,
    },
    /// Delete a task.
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum AiAction {
    /// Summarise a project's status and progress.
    Summarize { project_id: String },
    /// Ask a question about a task.
    Ask { task_id: String, question: String },
    /// Get suggestions for completing a task.
    Suggest { task_id: String },
}

/// Run every command except `ui` and `completions`, which `main` handles.
pub async fn run_command(command: Commands, backend: &dyn Backend, out: &mut dyn Write) -> Result<()> {
    let mut store = Store::new();
    match command {
        Commands::Ui => unreachable!("UI command handled in main"),
        Commands::Completions { .. } => unreachable!("completions handled in main"),

        Commands::Projects => cmd_projects(backend, out).await,

        Commands::Project { action } => match action {
            ProjectAction::Add { name, desc } => cmd_project_add(backend, out, &name, desc).await,
            ProjectAction::Update { id, name, desc } => {
                cmd_project_update(backend, out, &id, name, desc).await
            }
            ProjectAction::Delete { id } => cmd_project_delete(backend, out, &id).await,
        },

        Commands::Tasks { project_id } => cmd_tasks(backend, &mut store, out, &project_id).await,

        Commands::Task { action } => match action {
            TaskAction::Add { project_id, title, desc, status } => {
                cmd_task_add(backend, out, &project_id, &title, desc, status).await
            }
            TaskAction::Update { project_id, id, title, desc } => {
                cmd_task_update(backend, &mut store, out, &project_id, &id, title, desc).await
            }
            TaskAction::Move { project_id, task_id, status } => {
                cmd_task_move(backend, &mut store, out, &project_id, &task_id, status).await
            }
            TaskAction::Delete { id } => cmd_task_delete(backend, out, &id).await,
        },

        Commands::Stats { project_id } => cmd_stats(backend, &mut store, out, &project_id).await,

        Commands::Ai { action } => match action {
            AiAction::Summarize { project_id } => cmd_ai_summarize(backend, out, &project_id).await,
            AiAction::Ask { task_id, question } => cmd_ai_ask(backend, out, &task_id, &question).await,
            AiAction::Suggest { task_id } => cmd_ai_suggest(backend, out, &task_id).await,
        },
    }
}

/// Shorten `s` to `width` characters, ending with an ellipsis when cut.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Fetch projects, select `project_id` and fetch its tasks into `store`.
async fn load_project(backend: &dyn Backend, store: &mut Store, project_id: &str) -> Result<()> {
    store.set_projects(backend.list_projects().await?);
    if !store.select_project(project_id) {
        return Err(Error::validation(format!("Project {project_id} not found")));
    }
    store.set_tasks(backend.list_tasks_by_project(project_id).await?);
    Ok(())
}

fn find_task<'a>(store: &'a Store, id: &str) -> Result<&'a Task> {
    store
        .task(id)
        .ok_or_else(|| Error::validation(format!("Task {id} not found")))
}

/// List all projects.
pub async fn cmd_projects(backend: &dyn Backend, out: &mut dyn Write) -> Result<()> {
    let projects = backend.list_projects().await?;
    if projects.is_empty() {
        writeln!(out, "No projects yet. Create one with `tb project add <name>`.")?;
        return Ok(());
    }
    writeln!(out, "{:<26} {:<24} {:<11} {}", "ID", "Name", "Created", "Description")?;
    for p in &projects {
        writeln!(
            out,
            "{:<26} {:<24} {:<11} {}",
            truncate(&p.id, 26),
            truncate(&p.name, 24),
            p.created_date(),
            truncate(&p.description, 40)
        )?;
    }
    Ok(())
}

pub async fn cmd_project_add(backend: &dyn Backend, out: &mut dyn Write, name: &str, desc: Option<String>) -> Result<()> {
    let input = ProjectInput::new(name, desc.as_deref().unwrap_or(""));
    input.validate()?;
    let project = backend.create_project(&input).await?;
    writeln!(out, "Created project {}: {}", project.id, project.name)?;
    Ok(())
}

pub async fn cmd_project_update(
    backend: &dyn Backend,
    out: &mut dyn Write,
    id: &str,
    name: Option<String>,
    desc: Option<String>,
) -> Result<()> {
    let projects = backend.list_projects().await?;
    let existing: &Project = projects
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| Error::validation(format!("Project {id} not found")))?;

    let mut input = ProjectInput::from_project(existing);
    if let Some(name) = name {
        input.name = name.trim().to_string();
    }
    if let Some(desc) = desc {
        input.description = desc.trim().to_string();
    }
    input.validate()?;

    let project = backend.update_project(id, &input).await?;
    writeln!(out, "Updated project {}: {}", project.id, project.name)?;
    Ok(())
}

pub async fn cmd_project_delete(backend: &dyn Backend, out: &mut dyn Write, id: &str) -> Result<()> {
    backend.delete_project(id).await?;
    writeln!(out, "Deleted project {id} and its tasks")?;
    Ok(())
}

/// Print a project's tasks column by column.
pub async fn cmd_tasks(backend: &dyn Backend, store: &mut Store, out: &mut dyn Write, project_id: &str) -> Result<()> {
    load_project(backend, store, project_id).await?;
    if let Some(project) = store.selected_project() {
        writeln!(out, "{}", project.name)?;
        if !project.description.is_empty() {
            writeln!(out, "{}", project.description)?;
        }
    }
    for status in Status::ALL {
        let column = store.column(status);
        writeln!(out)?;
        writeln!(out, "== {} ({}) ==", format_status(status), column.len())?;
        for task in column {
            writeln!(out, "  {:<26} {}", truncate(&task.id, 26), truncate(&task.title, 50))?;
        }
    }
    Ok(())
}

pub async fn cmd_task_add(
    backend: &dyn Backend,
    out: &mut dyn Write,
    project_id: &str,
    title: &str,
    desc: Option<String>,
    status: Status,
) -> Result<()> {
    let input = NewTask::new(project_id, title, desc.as_deref().unwrap_or(""), status);
    input.validate()?;
    let task = backend.create_task(&input).await?;
    writeln!(out, "Added task {} to {}: {}", task.id, format_status(task.status), task.title)?;
    Ok(())
}

pub async fn cmd_task_update(
    backend: &dyn Backend,
    store: &mut Store,
    out: &mut dyn Write,
    project_id: &str,
    id: &str,
    title: Option<String>,
    desc: Option<String>,
) -> Result<()> {
    load_project(backend, store, project_id).await?;
    let mut edit = TaskEdit::from_task(find_task(store, id)?);
    if let Some(title) = title {
        edit.title = title.trim().to_string();
    }
    if let Some(desc) = desc {
        edit.description = desc.trim().to_string();
    }
    edit.validate()?;

    let task = backend.update_task(id, &edit).await?;
    store.replace_task(task.clone());
    writeln!(out, "Updated task {}: {}", task.id, task.title)?;
    Ok(())
}

/// Move a task through the store's optimistic transition.
pub async fn cmd_task_move(
    backend: &dyn Backend,
    store: &mut Store,
    out: &mut dyn Write,
    project_id: &str,
    task_id: &str,
    status: Status,
) -> Result<()> {
    load_project(backend, store, project_id).await?;
    let title = find_task(store, task_id)?.title.clone();

    match store.apply_status_transition(backend, task_id, status).await? {
        Some(_) => writeln!(out, "Moved '{}' to {}", title, format_status(status))?,
        None => writeln!(out, "'{}' is already in {}", title, format_status(status))?,
    }
    Ok(())
}

pub async fn cmd_task_delete(backend: &dyn Backend, out: &mut dyn Write, id: &str) -> Result<()> {
    backend.delete_task(id).await?;
    writeln!(out, "Deleted task {id}")?;
    Ok(())
}

pub async fn cmd_stats(backend: &dyn Backend, store: &mut Store, out: &mut dyn Write, project_id: &str) -> Result<()> {
    load_project(backend, store, project_id).await?;
    let stats = store.stats();
    let name = store.selected_project().map(|p| p.name.as_str()).unwrap_or(project_id);
    writeln!(out, "{name}")?;
    writeln!(out, "{:<12} {}", "Total", stats.total)?;
    writeln!(out, "{:<12} {}", "To Do", stats.todo)?;
    writeln!(out, "{:<12} {}", "In Progress", stats.in_progress)?;
    writeln!(out, "{:<12} {}", "Done", stats.done)?;
    writeln!(out, "{:<12} {}%", "Complete", stats.completion_percent())?;
    Ok(())
}

pub async fn cmd_ai_summarize(backend: &dyn Backend, out: &mut dyn Write, project_id: &str) -> Result<()> {
    let summary = backend.summarize_project(project_id).await?;
    writeln!(out, "{summary}")?;
    Ok(())
}

pub async fn cmd_ai_ask(backend: &dyn Backend, out: &mut dyn Write, task_id: &str, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(Error::validation("Please select a task and enter a question"));
    }
    let answer = backend.answer_task_question(task_id, question.trim()).await?;
    writeln!(out, "{answer}")?;
    Ok(())
}

pub async fn cmd_ai_suggest(backend: &dyn Backend, out: &mut dyn Write, task_id: &str) -> Result<()> {
    let suggestions = backend.suggest_for_task(task_id).await?;
    writeln!(out, "{suggestions}")?;
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{project, task, FakeBackend};

    fn launch_backend() -> FakeBackend {
        FakeBackend::with_data(
            vec![project("p1", "Launch"), project("p2", "Docs")],
            vec![
                task("t1", "p1", Status::Todo),
                task("t2", "p1", Status::Done),
                task("t3", "p2", Status::InProgress),
            ],
        )
    }

    async fn run(backend: &FakeBackend, command: Commands) -> (Result<()>, String) {
        let mut out = Vec::new();
        let result = run_command(command, backend, &mut out).await;
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long title", 6), "a lon…");
        assert_eq!(truncate("ñññ", 3), "ñññ");
    }

    #[tokio::test]
    async fn test_tasks_grouped_by_column() {
        let backend = launch_backend();
        let (result, out) = run(&backend, Commands::Tasks { project_id: "p1".into() }).await;
        result.unwrap();
        assert!(out.starts_with("Launch\n"));
        assert!(out.contains("== To Do (1) =="));
        assert!(out.contains("== In Progress (0) =="));
        assert!(out.contains("== Done (1) =="));
        assert!(!out.contains("Task t3"));
    }

    #[tokio::test]
    async fn test_unknown_project_is_reported() {
        let backend = launch_backend();
        let (result, _) = run(&backend, Commands::Stats { project_id: "nope".into() }).await;
        assert_eq!(result.unwrap_err().message(), "Project nope not found");
    }

    #[tokio::test]
    async fn test_stats_output() {
        let backend = launch_backend();
        let (result, out) = run(&backend, Commands::Stats { project_id: "p1".into() }).await;
        result.unwrap();
        assert!(out.contains("Total        2"));
        assert!(out.contains("Complete     50%"));
    }

    #[tokio::test]
    async fn test_project_add_validates_before_request() {
        let backend = FakeBackend::new();
        let action = ProjectAction::Add { name: "   ".into(), desc: None };
        let (result, _) = run(&backend, Commands::Project { action }).await;
        assert_eq!(result.unwrap_err().message(), "Project name is required");
        assert!(backend.calls().is_empty());

        let action = ProjectAction::Add { name: " Launch ".into(), desc: Some("Q3".into()) };
        let (result, out) = run(&backend, Commands::Project { action }).await;
        result.unwrap();
        assert_eq!(out, "Created project p100: Launch\n");
        assert_eq!(backend.stored_projects()[0].description, "Q3");
    }

    #[tokio::test]
    async fn test_project_update_keeps_unset_fields() {
        let backend = launch_backend();
        let action = ProjectAction::Update { id: "p1".into(), name: None, desc: Some("Go live".into()) };
        let (result, _) = run(&backend, Commands::Project { action }).await;
        result.unwrap();
        let stored = backend.stored_projects();
        assert_eq!(stored[0].name, "Launch");
        assert_eq!(stored[0].description, "Go live");
    }

    #[tokio::test]
    async fn test_task_move_persists() {
        let backend = launch_backend();
        let action = TaskAction::Move { project_id: "p1".into(), task_id: "t1".into(), status: Status::InProgress };
        let (result, out) = run(&backend, Commands::Task { action }).await;
        result.unwrap();
        assert_eq!(out, "Moved 'Task t1' to In Progress\n");
        assert_eq!(backend.stored_tasks()[0].status, Status::InProgress);
    }

    #[tokio::test]
    async fn test_task_move_to_same_status_makes_no_request() {
        let backend = launch_backend();
        let action = TaskAction::Move { project_id: "p1".into(), task_id: "t2".into(), status: Status::Done };
        let (result, out) = run(&backend, Commands::Task { action }).await;
        result.unwrap();
        assert_eq!(out, "'Task t2' is already in Done\n");
        assert!(!backend.calls().iter().any(|c| c.starts_with("set_task_status")));
    }

    #[tokio::test]
    async fn test_task_move_failure_rolls_back() {
        let backend = launch_backend();
        let mut store = Store::new();
        load_project(&backend, &mut store, "p1").await.unwrap();
        backend.fail_with(Error::Backend { status: 500, message: "Task not found".into() });

        let mut out = Vec::new();
        let err = cmd_task_move(&backend, &mut store, &mut out, "p1", "t1", Status::Done)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Task not found");
        assert_eq!(store.task("t1").unwrap().status, Status::Todo);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_task_add_and_update() {
        let backend = launch_backend();
        let action = TaskAction::Add {
            project_id: "p1".into(),
            title: "Write docs".into(),
            desc: None,
            status: Status::InProgress,
        };
        let (result, out) = run(&backend, Commands::Task { action }).await;
        result.unwrap();
        assert_eq!(out, "Added task t100 to In Progress: Write docs\n");

        let action = TaskAction::Update {
            project_id: "p1".into(),
            id: "t100".into(),
            title: Some("Write more docs".into()),
            desc: None,
        };
        let (result, _) = run(&backend, Commands::Task { action }).await;
        result.unwrap();
        let stored = backend.stored_tasks();
        assert_eq!(stored.last().unwrap().title, "Write more docs");
        assert_eq!(stored.last().unwrap().status, Status::InProgress);
    }

    #[tokio::test]
    async fn test_ai_ask_requires_question() {
        let backend = launch_backend();
        let action = AiAction::Ask { task_id: "t1".into(), question: "  ".into() };
        let (result, _) = run(&backend, Commands::Ai { action }).await;
        assert_eq!(result.unwrap_err().message(), "Please select a task and enter a question");
        assert!(backend.calls().is_empty());

        let action = AiAction::Suggest { task_id: "t1".into() };
        let (result, out) = run(&backend, Commands::Ai { action }).await;
        result.unwrap();
        assert_eq!(out, "Suggestions for t1\n");
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_message() {
        let backend = launch_backend();
        backend.fail_with(Error::Network("connection refused".into()));
        let (result, out) = run(&backend, Commands::Projects).await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert_eq!(err.message(), "connection refused");
        assert!(out.is_empty());
    }
}
