use chrono::{DateTime, Utc};
use clap::Subcommand;
use pomotask_core::{CoreError, NewTask, Task, TaskNotification, TaskRepository, TaskStatus};

use crate::context::Context;
use crate::parse;

#[derive(Subcommand)]
pub enum TaskAction {
    /// List tasks, upcoming first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one task as JSON
    Show {
        /// Task ID
        id: String,
    },
    /// Create a task
    Create {
        /// Task title
        title: String,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Due date (RFC 3339); a reminder fires at that moment
        #[arg(long, value_parser = parse::timestamp)]
        due: Option<DateTime<Utc>>,
        /// Due after a duration from now (e.g. 30m, 2h)
        #[arg(long = "in", value_parser = parse::duration_secs, conflicts_with = "due")]
        due_in: Option<u64>,
    },
    /// Edit a task
    Edit {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New due date (RFC 3339)
        #[arg(long, value_parser = parse::timestamp)]
        due: Option<DateTime<Utc>>,
        /// Due after a duration from now
        #[arg(long = "in", value_parser = parse::duration_secs, conflicts_with = "due")]
        due_in: Option<u64>,
        /// Drop the due date and its reminder
        #[arg(long, conflicts_with_all = ["due", "due_in"])]
        no_due: bool,
    },
    /// Mark a task as done
    Done {
        /// Task ID
        id: String,
        /// Mark it as to-do again instead
        #[arg(long)]
        undo: bool,
    },
    /// Remove a task (moves it to the trash)
    Remove {
        /// Task ID
        id: String,
    },
    /// Remove every task whose due date has passed
    PurgeExpired,
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;
    let repo = ctx.tasks();
    let now = Utc::now();

    match action {
        TaskAction::List { json } => {
            if ctx.config.tasks.purge_expired_on_list {
                repo.remove_expired(now)?;
            }
            let parts = repo.partition_due(now);
            if json {
                println!("{}", serde_json::to_string_pretty(&parts.into_display_order())?);
            } else if parts.upcoming.is_empty() && parts.past.is_empty() {
                println!("No tasks.");
            } else {
                for task in &parts.upcoming {
                    print_summary(task, false);
                }
                for task in &parts.past {
                    print_summary(task, true);
                }
            }
        }
        TaskAction::Show { id } => {
            let task = repo.get(&id).ok_or(CoreError::NotFound { kind: "task", id })?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Create { title, description, due, due_in } => {
            let mut input = NewTask::new(title);
            input.description = description;
            input.due_at = parse::due_date(due, due_in, now);
            let id = repo.create(input)?;
            println!("Task created: {id}");
            if let Some(task) = repo.get(&id) {
                println!("{}", serde_json::to_string_pretty(&task)?);
            }
        }
        TaskAction::Edit { id, title, description, due, due_in, no_due } => {
            let mut task = repo.get(&id).ok_or_else(|| CoreError::NotFound {
                kind: "task",
                id: id.clone(),
            })?;
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(description) = description {
                task.description = Some(description).filter(|d| !d.trim().is_empty());
            }
            if no_due {
                task.notification = None;
            } else if let Some(date) = parse::due_date(due, due_in, now) {
                let handle = task.notification.take().and_then(|n| n.id);
                task.notification = Some(TaskNotification {
                    id: handle,
                    date: Some(date),
                });
            }
            repo.update(task)?;
            println!("Task updated:");
            if let Some(task) = repo.get(&id) {
                println!("{}", serde_json::to_string_pretty(&task)?);
            }
        }
        TaskAction::Done { id, undo } => {
            let status = if undo { TaskStatus::Todo } else { TaskStatus::Done };
            let task = repo.set_status(&id, status)?;
            println!("Task {}: {}", task.status, task.id);
        }
        TaskAction::Remove { id } => {
            let removed = repo.remove(&id)?;
            println!("Task deleted: {}", removed.id);
        }
        TaskAction::PurgeExpired => {
            let removed = repo.remove_expired(now)?;
            println!("Expired tasks removed: {}", removed.len());
        }
    }
    Ok(())
}

fn print_summary(task: &Task, past: bool) {
    let check = match task.status {
        TaskStatus::Done => "[x]",
        TaskStatus::Todo => "[ ]",
    };
    let due = task
        .due_at()
        .map(|d| format!("  due {}", d.format("%Y-%m-%d %H:%M")))
        .unwrap_or_default();
    let late = if past { "  (past)" } else { "" };
    println!("{check} {}  {}{due}{late}", task.id, task.title);
}
