use clap::{Subcommand, ValueEnum};
use pomotask_core::{Archived, Profile, Task};

use crate::context::Context;

#[derive(Clone, Copy, ValueEnum)]
pub enum TrashKind {
    Tasks,
    Profiles,
}

#[derive(Subcommand)]
pub enum TrashAction {
    /// List removed tasks
    Tasks,
    /// List removed profiles
    Profiles,
    /// Permanently delete trashed items
    Purge {
        /// Which trash to empty
        kind: TrashKind,
        /// Only delete the item with this ID
        id: Option<String>,
    },
}

pub fn run(action: TrashAction) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;

    match action {
        TrashAction::Tasks => {
            let items: Vec<Archived<Task>> = ctx.tasks().archive().list();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        TrashAction::Profiles => {
            let items: Vec<Archived<Profile>> = ctx.profiles().archive().list();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        TrashAction::Purge { kind, id } => {
            let matches = |item_id: &str| id.as_deref().map_or(true, |id| id == item_id);
            let purged = match kind {
                TrashKind::Tasks => ctx.tasks().archive().purge(|t: &Task| matches(t.id.as_str()))?,
                TrashKind::Profiles => ctx
                    .profiles()
                    .archive()
                    .purge(|p: &Profile| matches(p.id.as_str()))?,
            };
            println!("Purged: {purged}");
        }
    }
    Ok(())
}
