//! Enumerations and field types for the board.
//!
//! This module defines the closed set of task statuses that make up the board
//! columns, together with their display and parsing helpers.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task status. Each status is one board column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Todo,
    #[value(name = "inprogress", alias = "in-progress")]
    InProgress,
    Done,
}

impl Status {
    /// All statuses in column order.
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Done];

    /// Wire spelling, as the backend expects it.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "inprogress",
            Status::Done => "done",
        }
    }

    /// Column position on the board.
    pub fn column(self) -> usize {
        match self {
            Status::Todo => 0,
            Status::InProgress => 1,
            Status::Done => 2,
        }
    }

    /// Status for a column position, if the position names a column.
    pub fn from_column(index: usize) -> Option<Status> {
        Status::ALL.get(index).copied()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "todo" | "to-do" => Ok(Status::Todo),
            "inprogress" | "in-progress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            other => Err(format!("unknown status '{other}' (expected todo, inprogress or done)")),
        }
    }
}

/// Column title for a status.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Todo => "To Do",
        Status::InProgress => "In Progress",
        Status::Done => "Done",
    }
}
