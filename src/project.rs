//! Project data structures.
//!
//! Projects are named containers for tasks. They are owned by the backend;
//! this module only describes their wire shape and the form input used to
//! create or edit them.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{require_non_empty, Result};

/// A project as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Project {
    /// Creation date in local time, or "-" when the backend omitted it.
    pub fn created_date(&self) -> String {
        self.created_at
            .map(|at| at.with_timezone(&Local).format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Body of `POST /projects` and `PUT /projects/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectInput {
    pub name: String,
    pub description: String,
}

impl ProjectInput {
    pub fn new(name: &str, description: &str) -> Self {
        ProjectInput {
            name: name.trim().to_string(),
            description: description.trim().to_string(),
        }
    }

    /// Prefill from an existing project, for edit forms.
    pub fn from_project(project: &Project) -> Self {
        ProjectInput {
            name: project.name.clone(),
            description: project.description.clone(),
        }
    }

    /// A project needs a non-blank name.
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.name, "Project name")
    }
}

/// Pick the project to open: the remembered one if it still exists, else the first.
pub fn pick_initial_project<'a>(projects: &'a [Project], last_id: Option<&str>) -> Option<&'a Project> {
    last_id
        .and_then(|id| projects.iter().find(|p| p.id == id))
        .or_else(|| projects.first())
}
