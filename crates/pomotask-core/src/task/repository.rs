//! Task persistence with reminder bookkeeping.
//!
//! Tasks live as one ordered JSON array. A reminder is scheduled for every
//! open task with a due date; whenever a task is edited or dropped its old
//! reminder is cancelled first.

use chrono::{DateTime, Utc};

use super::{partition_due, DuePartition, NewTask, Task, TaskNotification, TaskStatus};
use crate::error::{CoreError, Result};
use crate::ids::new_id;
use crate::reminder::{ReminderHandle, ReminderScheduler};
use crate::storage::{keys, read_record, write_record, Archive, KvStore};

pub trait TaskRepository {
    /// All tasks in stored order. Unreadable storage yields an empty list.
    fn list(&self) -> Vec<Task>;

    fn get(&self, id: &str) -> Option<Task> {
        self.list().into_iter().find(|t| t.id == id)
    }

    /// Store a new task, scheduling its reminder. Returns the generated id.
    fn create(&self, task: NewTask) -> Result<String>;

    /// Replace a stored task and reschedule its reminder.
    fn update(&self, task: Task) -> Result<()>;

    fn set_status(&self, id: &str, status: TaskStatus) -> Result<Task> {
        let mut task = self.get(id).ok_or_else(|| CoreError::NotFound {
            kind: "task",
            id: id.to_string(),
        })?;
        task.status = status;
        self.update(task.clone())?;
        Ok(self.get(id).unwrap_or(task))
    }

    /// Cancel the reminder of a task, remove it and archive it.
    fn remove(&self, id: &str) -> Result<Task>;

    /// Cancel and remove every task due before `now`. Returns what went.
    fn remove_expired(&self, now: DateTime<Utc>) -> Result<Vec<Task>>;

    fn partition_due(&self, now: DateTime<Utc>) -> DuePartition {
        partition_due(self.list(), now)
    }
}

/// [`TaskRepository`] over a [`KvStore`] and a [`ReminderScheduler`].
pub struct KvTaskRepository<'a> {
    kv: &'a dyn KvStore,
    reminders: &'a dyn ReminderScheduler,
}

impl<'a> KvTaskRepository<'a> {
    pub fn new(kv: &'a dyn KvStore, reminders: &'a dyn ReminderScheduler) -> Self {
        Self { kv, reminders }
    }

    /// Archive of removed tasks.
    pub fn archive(&self) -> Archive<'a> {
        Archive::new(self.kv, keys::REMOVED_TASKS)
    }

    fn store(&self, tasks: &[Task]) -> Result<()> {
        write_record(self.kv, keys::TASKS, tasks)?;
        Ok(())
    }

    fn cancel(&self, handle: &ReminderHandle) {
        if let Err(e) = self.reminders.cancel(handle) {
            tracing::warn!(handle = %handle, error = %e, "failed to cancel task reminder");
        }
    }

    /// Schedule the due-date reminder of an open task, replacing any handle.
    fn schedule(&self, task: &mut Task) {
        let request = match task.status {
            TaskStatus::Todo => task.reminder_request(),
            TaskStatus::Done => None,
        };
        let handle = request.and_then(|req| match self.reminders.schedule(&req) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(task_id = %task.id, error = %e, "failed to schedule task reminder");
                None
            }
        });
        if let Some(notification) = task.notification.as_mut() {
            notification.id = handle;
        }
    }
}

impl TaskRepository for KvTaskRepository<'_> {
    fn list(&self) -> Vec<Task> {
        read_record(self.kv, keys::TASKS).unwrap_or_default()
    }

    fn create(&self, new: NewTask) -> Result<String> {
        let mut task = Task {
            id: new_id("task"),
            title: new.title.trim().to_string(),
            description: new.description.filter(|d| !d.trim().is_empty()),
            notification: new.due_at.map(|date| TaskNotification {
                id: None,
                date: Some(date),
            }),
            status: TaskStatus::Todo,
        };
        task.validate()?;
        self.schedule(&mut task);

        let mut tasks = self.list();
        let id = task.id.clone();
        let handle = task.reminder_handle().cloned();
        tasks.push(task);
        if let Err(e) = self.store(&tasks) {
            if let Some(handle) = handle {
                self.cancel(&handle);
            }
            return Err(e);
        }

        tracing::info!(task_id = %id, "task created");
        Ok(id)
    }

    fn update(&self, mut task: Task) -> Result<()> {
        task.title = task.title.trim().to_string();
        task.validate()?;

        let mut tasks = self.list();
        let idx = tasks
            .iter()
            .position(|t| t.id == task.id)
            .ok_or_else(|| CoreError::NotFound {
                kind: "task",
                id: task.id.clone(),
            })?;

        let stored = tasks[idx].reminder_handle().cloned();
        if let Some(handle) = &stored {
            self.cancel(handle);
        }
        if let Some(handle) = task.reminder_handle().filter(|h| Some(*h) != stored.as_ref()) {
            self.cancel(handle);
        }
        self.schedule(&mut task);

        tasks[idx] = task;
        self.store(&tasks)
    }

    fn remove(&self, id: &str) -> Result<Task> {
        let mut tasks = self.list();
        let idx = tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::NotFound {
                kind: "task",
                id: id.to_string(),
            })?;

        if let Some(handle) = tasks[idx].reminder_handle() {
            self.cancel(handle);
        }
        let removed = tasks.remove(idx);
        self.store(&tasks)?;

        if let Err(e) = self.archive().push(removed.clone(), Utc::now()) {
            tracing::warn!(task_id = %id, error = %e, "failed to archive removed task");
        }
        tracing::info!(task_id = %id, "task removed");
        Ok(removed)
    }

    fn remove_expired(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let (expired, kept): (Vec<Task>, Vec<Task>) =
            self.list().into_iter().partition(|t| t.is_past(now));
        if expired.is_empty() {
            return Ok(expired);
        }

        for handle in expired.iter().filter_map(Task::reminder_handle) {
            self.cancel(handle);
        }
        self.store(&kept)?;
        tracing::info!(count = expired.len(), "expired tasks removed");
        Ok(expired)
    }
}
