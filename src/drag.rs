//! Drag interaction controller.
//!
//! Tracks the card being carried between columns and turns a drop into a
//! status-transition request. It never talks to the backend itself; the
//! request it returns is handed to the store.

use crate::fields::Status;
use crate::task::Task;

/// Controller state. `Resolving` only exists inside [`DragController::drop_on`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(Task),
}

/// A status change the store should apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub task_id: String,
    pub from: Status,
    pub to: Status,
}

#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
    /// Column the carried card currently hovers over.
    hover: Option<Status>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// The task being carried, if any.
    pub fn dragged(&self) -> Option<&Task> {
        match &self.state {
            DragState::Dragging(task) => Some(task),
            DragState::Idle => None,
        }
    }

    pub fn hover(&self) -> Option<Status> {
        self.hover
    }

    /// Pick up a task. A second start replaces the first; only one drag exists.
    pub fn start(&mut self, task: Task) {
        self.hover = Some(task.status);
        self.state = DragState::Dragging(task);
    }

    /// A drag-over on `column`. Accepting it is what makes the later drop land.
    pub fn drag_over(&mut self, column: Status) -> bool {
        if !self.is_dragging() {
            return false;
        }
        self.hover = Some(column);
        true
    }

    /// Finish the drag. Always returns to `Idle`.
    ///
    /// `target` is the column under the drop, or `None` if the drop did not
    /// land on a column. A request is produced only when the target differs
    /// from the task's current status.
    pub fn drop_on(&mut self, target: Option<Status>) -> Option<TransitionRequest> {
        let state = std::mem::take(&mut self.state);
        self.hover = None;

        let DragState::Dragging(task) = state else {
            return None;
        };
        let to = target?;
        if task.status == to {
            tracing::debug!(task_id = %task.id, %to, "dropped on own column");
            return None;
        }
        Some(TransitionRequest {
            task_id: task.id,
            from: task.status,
            to,
        })
    }

    /// Drop onto whatever column the card hovers over.
    pub fn drop_here(&mut self) -> Option<TransitionRequest> {
        let target = self.hover;
        self.drop_on(target)
    }

    /// Abandon the drag; same as dropping outside every column.
    pub fn cancel(&mut self) {
        self.drop_on(None);
    }
}
