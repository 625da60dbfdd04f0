use clap::Subcommand;
use pomotask_core::{CoreError, NewProfile, Phase, Profile, ProfileRepository};

use crate::context::Context;
use crate::parse;

#[derive(Subcommand)]
pub enum ProfileAction {
    /// List profiles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one profile as JSON
    Show {
        /// Profile ID
        id: String,
    },
    /// Create a profile
    Create {
        /// Profile name
        name: String,
        /// Phase as NAME=DURATION (e.g. Focus=25m), up to three
        #[arg(long = "phase", value_parser = parse::phase)]
        phases: Vec<(String, u64)>,
        /// Make this the active profile
        #[arg(long)]
        active: bool,
    },
    /// Edit a profile
    Edit {
        /// Profile ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// Replace the phases; a phase keeps its ID when its name is unchanged
        #[arg(long = "phase", value_parser = parse::phase)]
        phases: Vec<(String, u64)>,
        /// Make this the active profile
        #[arg(long)]
        active: bool,
    },
    /// Make a profile the active one
    Activate {
        /// Profile ID
        id: String,
    },
    /// Remove a profile (moves it to the trash)
    Remove {
        /// Profile ID
        id: String,
    },
}

pub fn run(action: ProfileAction) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;
    let repo = ctx.profiles();

    match action {
        ProfileAction::List { json } => {
            let profiles = repo.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&profiles)?);
            } else if profiles.is_empty() {
                println!("No profiles.");
            } else {
                for p in &profiles {
                    print_summary(p);
                }
            }
        }
        ProfileAction::Show { id } => {
            let profile = repo.get(&id).ok_or(CoreError::NotFound { kind: "profile", id })?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        ProfileAction::Create { name, phases, active } => {
            let mut input = NewProfile::new(name).active(active);
            for (phase_name, secs) in phases {
                input = input.phase(phase_name, secs);
            }
            let id = repo.create(input)?;
            if active {
                ctx.reconcile_session();
            }
            println!("Profile created: {id}");
            if let Some(profile) = repo.get(&id) {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            }
        }
        ProfileAction::Edit { id, name, phases, active } => {
            let mut profile = repo.get(&id).ok_or_else(|| CoreError::NotFound {
                kind: "profile",
                id: id.clone(),
            })?;
            if let Some(name) = name {
                profile.name = name;
            }
            if !phases.is_empty() {
                profile.phases = replace_phases(&profile.phases, phases);
            }
            profile.is_active |= active;
            repo.update(profile)?;
            ctx.reconcile_session();
            println!("Profile updated:");
            if let Some(profile) = repo.get(&id) {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            }
        }
        ProfileAction::Activate { id } => {
            repo.set_active(&id)?;
            ctx.reconcile_session();
            println!("Active profile: {id}");
        }
        ProfileAction::Remove { id } => {
            let removed = repo.remove(&id)?;
            ctx.reconcile_session();
            println!("Profile removed: {} ({})", removed.name, removed.id);
        }
    }
    Ok(())
}

fn print_summary(p: &Profile) {
    let marker = if p.is_active { "*" } else { " " };
    let phases: Vec<String> = p
        .phases
        .iter()
        .map(|ph| format!("{} {}", ph.name, pomotask_core::format_countdown(ph.duration_secs)))
        .collect();
    println!("{marker} {}  {}  [{}]", p.id, p.name, phases.join(", "));
}

/// New phase list that reuses the IDs of phases whose name did not change.
fn replace_phases(existing: &[Phase], specs: Vec<(String, u64)>) -> Vec<Phase> {
    specs
        .into_iter()
        .map(|(name, duration_secs)| {
            let kept = existing.iter().find(|p| p.name == name);
            Phase {
                id: kept.map(|p| p.id.clone()).unwrap_or_default(),
                background: kept.and_then(|p| p.background.clone()),
                name,
                duration_secs,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_phases_keeps_ids_by_name() {
        let existing = vec![Phase {
            id: "phase-focus".into(),
            name: "Focus".into(),
            duration_secs: 1500,
            background: Some("red".into()),
        }];
        let phases = replace_phases(
            &existing,
            vec![("Focus".into(), 3000), ("Break".into(), 300)],
        );
        assert_eq!(phases[0].id, "phase-focus");
        assert_eq!(phases[0].duration_secs, 3000);
        assert_eq!(phases[0].background.as_deref(), Some("red"));
        assert!(phases[1].id.is_empty());
    }
}
