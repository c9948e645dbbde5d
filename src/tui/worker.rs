//! Background requests for the board.
//!
//! The board runs its event loop on the main thread. Every backend call is
//! spawned onto the tokio runtime and its outcome comes back as a
//! [`BackendEvent`] over a channel that the loop drains between frames.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::api::Backend;
use crate::error::Result;
use crate::project::{Project, ProjectInput};
use crate::store::PendingTransition;
use crate::task::{NewTask, Task, TaskEdit};
use crate::tui::enums::AiMode;

/// Outcome of a backend call, delivered to the board.
#[derive(Debug)]
pub enum BackendEvent {
    ProjectsLoaded(Result<Vec<Project>>),
    TasksLoaded { project_id: String, result: Result<Vec<Task>> },
    ProjectCreated(Result<Project>),
    ProjectUpdated(Result<Project>),
    ProjectDeleted { id: String, result: Result<()> },
    TaskCreated(Result<Task>),
    TaskUpdated(Result<Task>),
    TaskDeleted { id: String, result: Result<()> },
    StatusSettled { pending: PendingTransition, result: Result<Task> },
    AiAnswered { mode: AiMode, result: Result<String> },
}

/// Spawns backend calls and collects their outcomes.
pub struct Worker {
    backend: Arc<dyn Backend>,
    runtime: Handle,
    tx: Sender<BackendEvent>,
    rx: Receiver<BackendEvent>,
    in_flight: usize,
}

impl Worker {
    pub fn new(backend: Arc<dyn Backend>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            runtime,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Number of requests that have not reported back yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Next finished request, if any, without blocking.
    pub fn try_next(&mut self) -> Option<BackendEvent> {
        match self.rx.try_recv() {
            Ok(event) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(event)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn spawn<F, Fut>(&mut self, call: F)
    where
        F: FnOnce(Arc<dyn Backend>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = BackendEvent> + Send + 'static,
    {
        self.in_flight += 1;
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let event = call(backend).await;
            if tx.send(event).is_err() {
                tracing::debug!("board closed before request finished");
            }
        });
    }

    pub fn load_projects(&mut self) {
        self.spawn(move |b| async move { BackendEvent::ProjectsLoaded(b.list_projects().await) });
    }

    pub fn load_tasks(&mut self, project_id: String) {
        self.spawn(move |b| async move {
            let result = b.list_tasks_by_project(&project_id).await;
            BackendEvent::TasksLoaded { project_id, result }
        });
    }

    pub fn create_project(&mut self, input: ProjectInput) {
        self.spawn(move |b| async move { BackendEvent::ProjectCreated(b.create_project(&input).await) });
    }

    pub fn update_project(&mut self, id: String, input: ProjectInput) {
        self.spawn(move |b| async move {
            BackendEvent::ProjectUpdated(b.update_project(&id, &input).await)
        });
    }

    pub fn delete_project(&mut self, id: String) {
        self.spawn(move |b| async move {
            let result = b.delete_project(&id).await;
            BackendEvent::ProjectDeleted { id, result }
        });
    }

    pub fn create_task(&mut self, input: NewTask) {
        self.spawn(move |b| async move { BackendEvent::TaskCreated(b.create_task(&input).await) });
    }

    pub fn update_task(&mut self, id: String, input: TaskEdit) {
        self.spawn(move |b| async move { BackendEvent::TaskUpdated(b.update_task(&id, &input).await) });
    }

    pub fn delete_task(&mut self, id: String) {
        self.spawn(move |b| async move {
            let result = b.delete_task(&id).await;
            BackendEvent::TaskDeleted { id, result }
        });
    }

    /// Persist a transition the store has already applied.
    pub fn persist_status(&mut self, pending: PendingTransition) {
        self.spawn(move |b| async move {
            let result = b.set_task_status(&pending.task_id, pending.to).await;
            BackendEvent::StatusSettled { pending, result }
        });
    }

    pub fn ask_ai(&mut self, mode: AiMode, project_id: String, task_id: Option<String>, question: String) {
        self.spawn(move |b| async move {
            let result = match (mode, task_id) {
                (AiMode::Summarize, _) => b.summarize_project(&project_id).await,
                (AiMode::Ask, Some(task_id)) => b.answer_task_question(&task_id, &question).await,
                (AiMode::Suggest, Some(task_id)) => b.suggest_for_task(&task_id).await,
                (_, None) => Err(crate::error::Error::validation("Please select a task")),
            };
            BackendEvent::AiAnswered { mode, result }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::Error;
    use crate::fields::Status;
    use crate::store::{Settled, Store};
    use crate::test_support::{project, task, FakeBackend};

    fn drain(worker: &mut Worker) -> Vec<BackendEvent> {
        let mut events = Vec::new();
        for _ in 0..200 {
            while let Some(event) = worker.try_next() {
                events.push(event);
            }
            if worker.in_flight() == 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        events
    }

    #[test]
    fn test_status_round_trip_through_worker() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let backend = Arc::new(FakeBackend::with_data(
            vec![project("p1", "Launch")],
            vec![task("t1", "p1", Status::Todo)],
        ));
        let mut worker = Worker::new(backend.clone(), runtime.handle().clone());

        let mut store = Store::new();
        store.set_tasks(backend.stored_tasks());
        let pending = store.begin_status_transition("t1", Status::Done).unwrap();
        worker.persist_status(pending);
        assert_eq!(worker.in_flight(), 1);

        let events = drain(&mut worker);
        assert_eq!(events.len(), 1);
        match events.into_iter().next() {
            Some(BackendEvent::StatusSettled { pending, result }) => {
                assert_eq!(pending.to, Status::Done);
                assert_eq!(store.settle_status_transition(&pending, &result), Settled::Confirmed);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(store.task("t1").unwrap().status, Status::Done);
        assert_eq!(backend.stored_tasks()[0].status, Status::Done);
    }

    #[test]
    fn test_ai_without_task_fails_locally() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        let mut worker = Worker::new(backend.clone(), runtime.handle().clone());

        worker.ask_ai(AiMode::Suggest, "p1".into(), None, String::new());
        let events = drain(&mut worker);
        match events.into_iter().next() {
            Some(BackendEvent::AiAnswered { result: Err(Error::Validation(_)), .. }) => {}
            other => panic!("unexpected event {other:?}"),
        }
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_ai_answer_carries_mode() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        let mut worker = Worker::new(backend.clone(), runtime.handle().clone());

        worker.ask_ai(AiMode::Ask, "p1".into(), Some("t1".into()), "Blocked?".into());
        let events = drain(&mut worker);
        match events.into_iter().next() {
            Some(BackendEvent::AiAnswered { mode: AiMode::Ask, result: Ok(text) }) => {
                assert_eq!(text, "Answer about t1");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(backend.calls(), ["answer_task_question t1 Blocked?"]);
    }
}
