//! Task data structures.
//!
//! A task is a unit of work owned by exactly one project, sitting in one of
//! the three status columns.

use serde::{Deserialize, Serialize};

use crate::error::{require_non_empty, Result};
use crate::fields::Status;

/// A task as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: Status,
}

/// Body of `POST /tasks`. The status is the column the task was added to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub status: Status,
}

impl NewTask {
    pub fn new(project_id: &str, title: &str, description: &str, status: Status) -> Self {
        NewTask {
            project_id: project_id.to_string(),
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            status,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.project_id, "Project")?;
        require_non_empty(&self.title, "Task title")
    }
}

/// Body of `PUT /tasks/:id`. Status changes go through the status endpoint instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskEdit {
    pub title: String,
    pub description: String,
}

impl TaskEdit {
    pub fn new(title: &str, description: &str) -> Self {
        TaskEdit {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
        }
    }

    pub fn from_task(task: &Task) -> Self {
        TaskEdit {
            title: task.title.clone(),
            description: task.description.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.title, "Task title")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_wire_format() {
        let json = r#"{"_id":"t1","projectId":"p1","title":"Write docs","status":"inprogress"}"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert_eq!(t.id, "t1");
        assert_eq!(t.project_id, "p1");
        assert_eq!(t.status, Status::InProgress);
        assert_eq!(t.description, "");
    }

    #[test]
    fn test_new_task_body() {
        let body = NewTask::new("p1", " Ship it ", "", Status::Done);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["projectId"], "p1");
        assert_eq!(value["title"], "Ship it");
        assert_eq!(value["status"], "done");
    }

    #[test]
    fn test_validation() {
        assert!(NewTask::new("p1", "", "", Status::Todo).validate().is_err());
        assert!(NewTask::new("", "Title", "", Status::Todo).validate().is_err());
        assert!(TaskEdit::new("Title", "").validate().is_ok());
        assert_eq!(
            TaskEdit::new(" ", "x").validate().unwrap_err().message(),
            "Task title is required"
        );
    }
}
