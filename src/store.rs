//! In-memory store of projects and of the selected project's tasks.
//!
//! The store mirrors backend state: most mutations are applied only after the
//! backend confirmed them. Status transitions are the exception. They are
//! applied optimistically and rolled back if the backend refuses them.
//!
//! Rollback rules for a failed transition:
//! - nothing else touched the collection since it began: the full snapshot is
//!   restored;
//! - it is still the newest transition for its task: only that task's status
//!   is reverted;
//! - a later transition on the same task superseded it: nothing is reverted.
//!
//! A reverted task goes back to the last status the backend confirmed, not to
//! the status the failed move started from, so two overlapping moves that both
//! fail leave the task where it was before either.

use std::collections::HashMap;

use crate::api::Backend;
use crate::error::Result;
use crate::fields::Status;
use crate::project::Project;
use crate::task::Task;

/// Task counts for the selected project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl Stats {
    /// Share of done tasks, rounded to the nearest whole percent.
    pub fn completion_percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.done as f64 / self.total as f64) * 100.0).round() as u32
    }
}

/// An optimistic status change waiting for the backend's verdict.
#[derive(Debug, Clone)]
pub struct PendingTransition {
    pub task_id: String,
    pub from: Status,
    pub to: Status,
    token: u64,
    generation: u64,
    snapshot: Vec<Task>,
}

impl PendingTransition {
    /// The collection as it was before this transition was applied.
    pub fn snapshot(&self) -> &[Task] {
        &self.snapshot
    }
}

/// What settling a transition did to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// Backend accepted the change; the optimistic state stays.
    Confirmed,
    /// Backend refused; the whole collection was restored from the snapshot.
    RolledBack,
    /// Backend refused; only this task's status was reverted.
    Reverted,
    /// Backend refused, but a newer transition on the task is in charge now.
    Superseded,
}

/// Application state shared by the CLI and the board.
#[derive(Debug, Default)]
pub struct Store {
    projects: Vec<Project>,
    selected_project: Option<String>,
    tasks: Vec<Task>,
    /// Bumped on every change to `tasks`.
    generation: u64,
    next_token: u64,
    /// Unsettled transitions per task id.
    in_flight: HashMap<String, TaskFlight>,
}

/// Bookkeeping for the transitions of one task that are still unsettled.
#[derive(Debug)]
struct TaskFlight {
    latest: u64,
    pending: usize,
    /// Status the backend last agreed to.
    confirmed: Status,
    latest_failed: bool,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- projects ----

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn set_projects(&mut self, projects: Vec<Project>) {
        self.projects = projects;
        if let Some(id) = &self.selected_project {
            if !self.projects.iter().any(|p| &p.id == id) {
                self.selected_project = None;
                self.set_tasks(Vec::new());
            }
        }
    }

    pub fn add_project(&mut self, project: Project) {
        self.projects.push(project);
    }

    pub fn replace_project(&mut self, project: Project) {
        if let Some(slot) = self.projects.iter_mut().find(|p| p.id == project.id) {
            *slot = project;
        }
    }

    /// Remove a project together with every local task that belongs to it.
    ///
    /// If it was the selected project, the first remaining project becomes
    /// selected and its id is returned so the caller can fetch its tasks.
    pub fn remove_project(&mut self, id: &str) -> Option<String> {
        self.projects.retain(|p| p.id != id);
        let before = self.tasks.len();
        self.tasks.retain(|t| t.project_id != id);
        if self.tasks.len() != before {
            self.touch();
        }

        if self.selected_project.as_deref() == Some(id) {
            self.selected_project = self.projects.first().map(|p| p.id.clone());
            return self.selected_project.clone();
        }
        None
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.selected_project
            .as_deref()
            .and_then(|id| self.project(id))
    }

    pub fn selected_project_id(&self) -> Option<&str> {
        self.selected_project.as_deref()
    }

    /// Select a project. Its tasks must be loaded with [`Store::set_tasks`].
    pub fn select_project(&mut self, id: &str) -> bool {
        if self.project(id).is_none() {
            return false;
        }
        if self.selected_project.as_deref() != Some(id) {
            self.selected_project = Some(id.to_string());
            self.set_tasks(Vec::new());
        }
        true
    }

    // ---- tasks ----

    /// All tasks held locally, in order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Replace the whole collection, e.g. after fetching the active project.
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.in_flight.clear();
        self.touch();
    }

    /// Append a task the backend has just created.
    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
        self.touch();
    }

    /// Swap in the backend's copy of an edited task.
    pub fn replace_task(&mut self, task: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
            self.touch();
        }
    }

    /// Drop a task the backend has deleted.
    pub fn remove_task(&mut self, id: &str) {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() != before {
            self.in_flight.remove(id);
            self.touch();
        }
    }

    /// Tasks of the selected project.
    pub fn visible_tasks(&self) -> impl Iterator<Item = &Task> {
        let selected = self.selected_project.as_deref();
        self.tasks
            .iter()
            .filter(move |t| Some(t.project_id.as_str()) == selected)
    }

    /// Tasks of the selected project in one column, in collection order.
    pub fn column(&self, status: Status) -> Vec<&Task> {
        self.visible_tasks().filter(|t| t.status == status).collect()
    }

    pub fn stats(&self) -> Stats {
        self.visible_tasks().fold(Stats::default(), |mut s, t| {
            s.total += 1;
            match t.status {
                Status::Todo => s.todo += 1,
                Status::InProgress => s.in_progress += 1,
                Status::Done => s.done += 1,
            }
            s
        })
    }

    // ---- optimistic status transitions ----

    /// Apply a status change locally and hand back what is needed to settle it.
    ///
    /// Returns `None` when the task is unknown or already has that status; no
    /// request should be made then.
    pub fn begin_status_transition(&mut self, task_id: &str, to: Status) -> Option<PendingTransition> {
        let from = self.task(task_id)?.status;
        if from == to {
            return None;
        }

        let snapshot = self.tasks.clone();
        self.next_token += 1;
        let token = self.next_token;
        let flight = self.in_flight.entry(task_id.to_string()).or_insert(TaskFlight {
            latest: token,
            pending: 0,
            confirmed: from,
            latest_failed: false,
        });
        flight.latest = token;
        flight.pending += 1;
        flight.latest_failed = false;

        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) {
            task.status = to;
        }
        self.touch();

        tracing::debug!(task_id, %from, %to, token, "optimistic status change");
        Some(PendingTransition {
            task_id: task_id.to_string(),
            from,
            to,
            token,
            generation: self.generation,
            snapshot,
        })
    }

    /// Record the backend's verdict on a transition started with
    /// [`Store::begin_status_transition`].
    pub fn settle_status_transition<T>(&mut self, pending: &PendingTransition, outcome: &Result<T>) -> Settled {
        let task_id = pending.task_id.as_str();
        let Some(flight) = self.in_flight.get_mut(task_id) else {
            // The collection was replaced or the task deleted meanwhile.
            return if outcome.is_ok() { Settled::Confirmed } else { Settled::Superseded };
        };
        flight.pending = flight.pending.saturating_sub(1);
        let newest = flight.latest == pending.token;
        let confirmed = match outcome {
            Ok(_) => {
                flight.confirmed = pending.to;
                flight.latest_failed = false;
                pending.to
            }
            Err(_) => {
                if newest {
                    flight.latest_failed = true;
                }
                flight.confirmed
            }
        };
        let newer_failed = !newest && flight.latest_failed;
        if flight.pending == 0 {
            self.in_flight.remove(task_id);
        }

        if outcome.is_ok() {
            if newer_failed {
                // The newer move was refused, so this one is the last agreed state.
                tracing::info!(task_id, to = %pending.to, "older status change confirmed after newer one failed");
                self.set_status(task_id, pending.to);
            }
            return Settled::Confirmed;
        }

        if !newest {
            tracing::info!(task_id, "failed status change was superseded, keeping newer state");
            return Settled::Superseded;
        }

        if self.generation == pending.generation {
            tracing::info!(task_id, to = %pending.to, "status change refused, restoring snapshot");
            self.tasks = pending.snapshot.clone();
            if let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) {
                task.status = confirmed;
            }
            self.touch();
            return Settled::RolledBack;
        }

        tracing::info!(task_id, status = %confirmed, "status change refused, reverting task");
        self.set_status(task_id, confirmed);
        Settled::Reverted
    }

    /// Optimistically move a task and persist the move.
    ///
    /// On failure local state is rolled back and the backend error returned.
    /// A move to the task's current status is a no-op and makes no request.
    pub async fn apply_status_transition<B>(&mut self, backend: &B, task_id: &str, to: Status) -> Result<Option<Settled>>
    where
        B: Backend + ?Sized,
    {
        let Some(pending) = self.begin_status_transition(task_id, to) else {
            return Ok(None);
        };
        let outcome = backend.set_task_status(task_id, to).await;
        let settled = self.settle_status_transition(&pending, &outcome);
        outcome.map(|_| Some(settled))
    }

    fn set_status(&mut self, task_id: &str, status: Status) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) {
            task.status = status;
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.generation += 1;
    }
}
