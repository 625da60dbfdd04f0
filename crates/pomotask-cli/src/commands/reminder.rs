use chrono::Utc;
use clap::Subcommand;

use crate::context::Context;

#[derive(Subcommand)]
pub enum ReminderAction {
    /// List every pending reminder, soonest first
    List,
    /// List reminders that are due now
    Due {
        /// Remove them from the outbox once printed
        #[arg(long)]
        ack: bool,
    },
}

pub fn run(action: ReminderAction) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;

    match action {
        ReminderAction::List => {
            let pending = ctx.db.pending_reminders()?;
            println!("{}", serde_json::to_string_pretty(&pending)?);
        }
        ReminderAction::Due { ack } => {
            let due = ctx.db.due_reminders(Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&due)?);
            if ack {
                for reminder in &due {
                    ctx.db.acknowledge(&reminder.handle)?;
                }
                tracing::info!(count = due.len(), "due reminders acknowledged");
            }
        }
    }
    Ok(())
}
