//! Reminder tasks.
//!
//! A task is a to-do item with an optional due date. Tasks with a due date
//! get a one-shot reminder at that instant.

mod repository;

pub use repository::{KvTaskRepository, TaskRepository};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::reminder::{ReminderHandle, ReminderRequest};
use crate::wire;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "TODO")]
    Todo,
    #[serde(alias = "DONE")]
    Done,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "todo"),
            TaskStatus::Done => write!(f, "done"),
        }
    }
}

/// Due date of a task and the reminder scheduled for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNotification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ReminderHandle>,
    #[serde(default, deserialize_with = "wire::opt_timestamp")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<TaskNotification>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.notification.as_ref().and_then(|n| n.date)
    }

    pub fn reminder_handle(&self) -> Option<&ReminderHandle> {
        self.notification.as_ref().and_then(|n| n.id.as_ref())
    }

    /// Due strictly before `now`. Tasks without a due date never expire.
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.due_at().is_some_and(|due| due < now)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }
        Ok(())
    }

    /// Reminder for the due date, if the task has one.
    pub(crate) fn reminder_request(&self) -> Option<ReminderRequest> {
        let due = self.due_at()?;
        Some(ReminderRequest::new(
            self.title.clone(),
            self.description.clone().unwrap_or_default(),
            due,
        ))
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }
}

/// Tasks split for display: still upcoming (or undated) first, past due after.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuePartition {
    pub upcoming: Vec<Task>,
    pub past: Vec<Task>,
}

impl DuePartition {
    /// Upcoming tasks followed by past ones, the order the list is shown in.
    pub fn into_display_order(self) -> Vec<Task> {
        let mut all = self.upcoming;
        all.extend(self.past);
        all
    }
}

pub fn partition_due(tasks: Vec<Task>, now: DateTime<Utc>) -> DuePartition {
    let (past, upcoming) = tasks.into_iter().partition(|t| t.is_past(now));
    DuePartition { upcoming, past }
}
