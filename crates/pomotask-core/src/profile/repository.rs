//! Profile persistence.
//!
//! Profiles live as one ordered JSON array. Every write rewrites the whole
//! collection, which is also where the single-active-profile rule is
//! enforced: marking one profile active clears the flag on all others first.

use chrono::Utc;

use super::{NewProfile, Phase, Profile};
use crate::error::{CoreError, Result};
use crate::ids::new_id;
use crate::storage::{keys, read_record, write_record, Archive, KvStore};

/// CRUD over profiles plus tracking of the active one.
pub trait ProfileRepository {
    /// All profiles in stored order. Unreadable storage yields an empty list.
    fn list(&self) -> Vec<Profile>;

    fn get(&self, id: &str) -> Option<Profile> {
        self.list().into_iter().find(|p| p.id == id)
    }

    fn get_active(&self) -> Option<Profile> {
        self.list().into_iter().find(|p| p.is_active)
    }

    /// Store a new profile and return its generated id.
    fn create(&self, profile: NewProfile) -> Result<String>;

    /// Replace a stored profile, keeping existing phase ids.
    fn update(&self, profile: Profile) -> Result<()>;

    /// Remove and archive a profile.
    fn remove(&self, id: &str) -> Result<Profile>;

    /// Make `id` the only active profile.
    fn set_active(&self, id: &str) -> Result<()> {
        let mut profile = self.get(id).ok_or_else(|| CoreError::NotFound {
            kind: "profile",
            id: id.to_string(),
        })?;
        profile.is_active = true;
        self.update(profile)
    }
}

/// [`ProfileRepository`] over a [`KvStore`].
pub struct KvProfileRepository<'a> {
    kv: &'a dyn KvStore,
}

impl<'a> KvProfileRepository<'a> {
    pub fn new(kv: &'a dyn KvStore) -> Self {
        Self { kv }
    }

    /// Archive of removed profiles.
    pub fn archive(&self) -> Archive<'a> {
        Archive::new(self.kv, keys::REMOVED_PROFILES)
    }

    fn store(&self, profiles: &[Profile]) -> Result<()> {
        write_record(self.kv, keys::PROFILES, profiles)?;
        Ok(())
    }
}

fn assign_missing_phase_ids(phases: &mut [Phase]) {
    for phase in phases.iter_mut().filter(|p| p.id.is_empty()) {
        phase.id = new_id("phase");
    }
}

fn clear_active_except(profiles: &mut [Profile], keep_id: &str) {
    for p in profiles.iter_mut().filter(|p| p.id != keep_id) {
        p.is_active = false;
    }
}

impl ProfileRepository for KvProfileRepository<'_> {
    fn list(&self) -> Vec<Profile> {
        read_record(self.kv, keys::PROFILES).unwrap_or_default()
    }

    fn create(&self, new: NewProfile) -> Result<String> {
        let mut profile = Profile {
            id: new_id("profile"),
            name: new.name.trim().to_string(),
            phases: new.phases,
            is_active: new.is_active,
        };
        profile.validate()?;
        assign_missing_phase_ids(&mut profile.phases);

        let mut profiles = self.list();
        if profile.is_active {
            clear_active_except(&mut profiles, &profile.id);
        }
        let id = profile.id.clone();
        profiles.push(profile);
        self.store(&profiles)?;

        tracing::info!(profile_id = %id, "profile created");
        Ok(id)
    }

    fn update(&self, mut profile: Profile) -> Result<()> {
        profile.name = profile.name.trim().to_string();
        profile.validate()?;
        assign_missing_phase_ids(&mut profile.phases);

        let mut profiles = self.list();
        let idx = profiles
            .iter()
            .position(|p| p.id == profile.id)
            .ok_or_else(|| CoreError::NotFound {
                kind: "profile",
                id: profile.id.clone(),
            })?;
        if profile.is_active {
            clear_active_except(&mut profiles, &profile.id);
        }
        profiles[idx] = profile;
        self.store(&profiles)
    }

    fn remove(&self, id: &str) -> Result<Profile> {
        let mut profiles = self.list();
        let idx = profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CoreError::NotFound {
                kind: "profile",
                id: id.to_string(),
            })?;
        let removed = profiles.remove(idx);
        self.store(&profiles)?;

        if let Err(e) = self.archive().push(removed.clone(), Utc::now()) {
            tracing::warn!(profile_id = %id, error = %e, "failed to archive removed profile");
        }
        tracing::info!(profile_id = %id, was_active = removed.is_active, "profile removed");
        Ok(removed)
    }
}
