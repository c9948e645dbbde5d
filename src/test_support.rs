//! In-memory backend and fixtures for unit tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::Backend;
use crate::error::{Error, Result};
use crate::fields::Status;
use crate::project::{Project, ProjectInput};
use crate::task::{NewTask, Task, TaskEdit};

pub fn project(id: &str, name: &str) -> Project {
    Project {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        created_at: None,
    }
}

pub fn task(id: &str, project_id: &str, status: Status) -> Task {
    Task {
        id: id.to_string(),
        project_id: project_id.to_string(),
        title: format!("Task {id}"),
        description: String::new(),
        status,
    }
}

/// Backend that keeps its data in memory, records every call, and can be
/// told to fail the next one.
#[derive(Default)]
pub struct FakeBackend {
    projects: Mutex<Vec<Project>>,
    tasks: Mutex<Vec<Task>>,
    calls: Mutex<Vec<String>>,
    next_failure: Mutex<Option<Error>>,
    next_id: AtomicU64,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(projects: Vec<Project>, tasks: Vec<Task>) -> Self {
        let backend = Self::new();
        *backend.projects.lock().unwrap() = projects;
        *backend.tasks.lock().unwrap() = tasks;
        backend
    }

    /// Make the next call fail with `error`.
    pub fn fail_with(&self, error: Error) {
        *self.next_failure.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stored_tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn stored_projects(&self) -> Vec<Project> {
        self.projects.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.next_failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn fresh_id(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 100)
    }

    fn not_found(what: &str) -> Error {
        Error::Backend { status: 404, message: format!("{what} not found") }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.record("list_projects".into())?;
        Ok(self.stored_projects())
    }

    async fn create_project(&self, input: &ProjectInput) -> Result<Project> {
        self.record(format!("create_project {}", input.name))?;
        let created = Project {
            id: self.fresh_id("p"),
            name: input.name.clone(),
            description: input.description.clone(),
            created_at: None,
        };
        self.projects.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_project(&self, id: &str, input: &ProjectInput) -> Result<Project> {
        self.record(format!("update_project {id}"))?;
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Self::not_found("Project"))?;
        project.name = input.name.clone();
        project.description = input.description.clone();
        Ok(project.clone())
    }

    async fn delete_project(&self, id: &str) -> Result<()> {
        self.record(format!("delete_project {id}"))?;
        self.projects.lock().unwrap().retain(|p| p.id != id);
        self.tasks.lock().unwrap().retain(|t| t.project_id != id);
        Ok(())
    }

    async fn list_tasks_by_project(&self, project_id: &str) -> Result<Vec<Task>> {
        self.record(format!("list_tasks {project_id}"))?;
        Ok(self
            .stored_tasks()
            .into_iter()
            .filter(|t| t.project_id == project_id)
            .collect())
    }

    async fn create_task(&self, input: &NewTask) -> Result<Task> {
        self.record(format!("create_task {}", input.title))?;
        let created = Task {
            id: self.fresh_id("t"),
            project_id: input.project_id.clone(),
            title: input.title.clone(),
            description: input.description.clone(),
            status: input.status,
        };
        self.tasks.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_task(&self, id: &str, input: &TaskEdit) -> Result<Task> {
        self.record(format!("update_task {id}"))?;
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Self::not_found("Task"))?;
        task.title = input.title.clone();
        task.description = input.description.clone();
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.record(format!("delete_task {id}"))?;
        self.tasks.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }

    async fn set_task_status(&self, id: &str, status: Status) -> Result<Task> {
        self.record(format!("set_task_status {id} {status}"))?;
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.status = status;
                Ok(task.clone())
            }
            // Store tests do not seed the fake; echo a plausible task back.
            None => Ok(task(id, "p1", status)),
        }
    }

    async fn summarize_project(&self, project_id: &str) -> Result<String> {
        self.record(format!("summarize_project {project_id}"))?;
        Ok(format!("Summary of {project_id}"))
    }

    async fn answer_task_question(&self, task_id: &str, question: &str) -> Result<String> {
        self.record(format!("answer_task_question {task_id} {question}"))?;
        Ok(format!("Answer about {task_id}"))
    }

    async fn suggest_for_task(&self, task_id: &str) -> Result<String> {
        self.record(format!("suggest_for_task {task_id}"))?;
        Ok(format!("Suggestions for {task_id}"))
    }
}
