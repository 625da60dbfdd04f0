//! Session reconciliation engine.
//!
//! The engine is a wall-clock-based state machine. It owns the in-memory view
//! of the session, borrows the session store and profile repository, and is
//! driven by triggers that all take the current time explicitly:
//!
//! ```text
//! NoProfile <-> Idle <-> Running -> Expired -> (reset | select_phase) -> Idle
//! ```
//!
//! Nothing here counts down on its own. While running, the remaining time is
//! always derived from the stored `expires_at`, so a host that was suspended
//! for an hour resumes at the correct value. `tick()` is only a redraw signal.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(&store, &profiles);
//! engine.reconcile(Utc::now());
//! engine.toggle(Utc::now());
//! // In a loop:
//! engine.tick(Utc::now()); // Returns Some(Event) when the countdown expires
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::Session;
use super::store::SessionStore;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::profile::{Phase, Profile, ProfileRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No active profile; nothing to count down.
    NoProfile,
    Idle,
    Running,
    /// Countdown reached zero and the timer is stopped.
    Expired,
}

/// One selectable phase in a [`SessionView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChoice {
    pub id: String,
    pub name: String,
    pub duration_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    pub selected: bool,
}

/// Read-only projection of the engine for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub state: SessionState,
    pub profile_id: Option<String>,
    pub profile_name: Option<String>,
    pub phase_id: Option<String>,
    pub phase_name: Option<String>,
    pub remaining_secs: u64,
    pub total_secs: u64,
    /// `MM:SS` rendering of `remaining_secs`.
    pub countdown: String,
    pub phases: Vec<PhaseChoice>,
    /// The countdown has expired and the host should pulse its display.
    pub alerting: bool,
}

/// Render seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_countdown(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Core session engine.
pub struct SessionEngine<'a> {
    sessions: &'a dyn SessionStore,
    profiles: &'a dyn ProfileRepository,
    profile: Option<Profile>,
    session: Option<Session>,
    state: SessionState,
    /// Countdown value as of the last trigger.
    remaining_secs: u64,
}

impl<'a> SessionEngine<'a> {
    /// Create an engine in the `NoProfile` state. Call [`reconcile`] to load.
    ///
    /// [`reconcile`]: SessionEngine::reconcile
    pub fn new(sessions: &'a dyn SessionStore, profiles: &'a dyn ProfileRepository) -> Self {
        Self {
            sessions,
            profiles,
            profile: None,
            session: None,
            state: SessionState::NoProfile,
            remaining_secs: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.session.as_ref().map(|s| &s.phase)
    }

    /// Countdown at `now`, derived from the wall clock while running.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        match (&self.session, self.state) {
            (Some(s), SessionState::Running) => s.remaining_at(now),
            _ => self.remaining_secs,
        }
    }

    pub fn view(&self, now: DateTime<Utc>) -> SessionView {
        let remaining_secs = self.remaining_at(now);
        let selected = self.current_phase().map(|p| p.id.as_str());
        let phases = self
            .profile
            .as_ref()
            .map(|profile| {
                profile
                    .phases
                    .iter()
                    .map(|p| PhaseChoice {
                        id: p.id.clone(),
                        name: p.name.clone(),
                        duration_secs: p.duration_secs,
                        background: p.background.clone(),
                        selected: Some(p.id.as_str()) == selected,
                    })
                    .collect()
            })
            .unwrap_or_default();

        SessionView {
            state: self.state,
            profile_id: self.profile.as_ref().map(|p| p.id.clone()),
            profile_name: self.profile.as_ref().map(|p| p.name.clone()),
            phase_id: self.current_phase().map(|p| p.id.clone()),
            phase_name: self.current_phase().map(|p| p.name.clone()),
            remaining_secs,
            total_secs: self.current_phase().map(|p| p.duration_secs).unwrap_or(0),
            countdown: format_countdown(remaining_secs),
            phases,
            alerting: self.state == SessionState::Expired,
        }
    }

    // ── Triggers ─────────────────────────────────────────────────────

    /// Rebuild the in-memory state from the store and the active profile.
    ///
    /// Called whenever the host gains focus. Adopting a running session does
    /// not touch its reminder, so repeated calls are idempotent.
    pub fn reconcile(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.reconcile_at(now, 0)
    }

    /// Persist the current countdown while running. Called when the host
    /// loses focus.
    pub fn snapshot(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != SessionState::Running {
            return None;
        }
        let session = self.session.clone()?;
        let remaining = session.remaining_at(now);
        if remaining == 0 {
            return self.expire(session, now);
        }
        let saved = self.sessions.save(session.anchored(remaining, true, now));
        self.adopt_in_memory(saved, SessionState::Running, remaining);
        None
    }

    /// Start when stopped, stop when running.
    ///
    /// Starting with nothing left on the countdown does nothing.
    pub fn toggle(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let session = self.session.clone()?;
        let phase_id = session.phase.id.clone();
        match self.state {
            SessionState::Running => {
                let remaining = session.remaining_at(now);
                let stopped = self.commit(session.anchored(remaining, false, now), now);
                tracing::info!(phase = %stopped.phase.name, remaining_secs = remaining, "timer stopped");
                Some(Event::TimerStopped {
                    phase_id,
                    remaining_secs: remaining,
                    at: now,
                })
            }
            SessionState::Idle if self.remaining_secs > 0 => {
                let remaining = self.remaining_secs;
                let started = self.commit(session.anchored(remaining, true, now), now);
                if self.state != SessionState::Running {
                    tracing::warn!("session could not be persisted, timer not started");
                    return None;
                }
                let expires_at = started.expires_at?;
                tracing::info!(phase = %started.phase.name, remaining_secs = remaining, "timer started");
                Some(Event::TimerStarted {
                    phase_id,
                    remaining_secs: remaining,
                    expires_at,
                    at: now,
                })
            }
            _ => None,
        }
    }

    /// Stop and rewind to the full duration of the selected phase.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let session = self.session.clone()?;
        let duration = session.phase.duration_secs;
        let phase_id = session.phase.id.clone();
        self.commit(session.anchored(duration, false, now), now);
        tracing::info!(phase_id = %phase_id, "timer reset");
        Some(Event::TimerReset {
            phase_id,
            remaining_secs: duration,
            at: now,
        })
    }

    /// Switch to another phase of the active profile.
    ///
    /// A running countdown is stopped first. Re-selecting the current phase
    /// keeps its remaining time; any other phase starts at full duration.
    pub fn select_phase(&mut self, phase_id: &str, now: DateTime<Utc>) -> Result<Event> {
        let profile = self.profile.clone().ok_or_else(|| CoreError::NotFound {
            kind: "active profile",
            id: phase_id.to_string(),
        })?;
        let phase = profile
            .phase(phase_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                kind: "phase",
                id: phase_id.to_string(),
            })?;

        if self.state == SessionState::Running {
            if let Some(session) = self.session.clone() {
                let remaining = session.remaining_at(now);
                self.commit(session.anchored(remaining, false, now), now);
            }
        }

        let current = self.session.clone();
        let remaining = match &current {
            Some(s) if s.phase.id == phase.id => s.remaining_secs,
            _ => phase.duration_secs,
        };
        let mut next = Session::seed(profile, phase, now).anchored(remaining, false, now);
        next.reminder_handle = current.and_then(|s| s.reminder_handle);
        self.commit(next, now);

        tracing::info!(phase_id, remaining_secs = remaining, "phase selected");
        Ok(Event::PhaseSelected {
            phase_id: phase_id.to_string(),
            remaining_secs: remaining,
            at: now,
        })
    }

    /// Redraw signal. Re-derives the countdown from the wall clock and
    /// stops the timer once it reaches zero.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != SessionState::Running {
            return None;
        }
        let session = self.session.clone()?;
        let remaining = session.remaining_at(now);
        self.remaining_secs = remaining;
        if remaining == 0 {
            let stopped = self.commit(session.anchored(0, false, now), now);
            tracing::info!(phase = %stopped.phase.name, "countdown finished");
            return Some(Event::TimerExpired {
                profile_id: stopped.profile.id,
                phase_id: stopped.phase.id,
                at: now,
            });
        }
        None
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Persist `session`, then re-run reconciliation against the store.
    fn commit(&mut self, session: Session, now: DateTime<Utc>) -> Session {
        let saved = self.sessions.save(session);
        // Kept in memory so a failed write still has its handle carried over.
        self.session = Some(saved.clone());
        self.reconcile(now);
        saved
    }

    fn reconcile_at(&mut self, now: DateTime<Utc>, depth: u8) -> Option<Event> {
        let Some(profile) = self.profiles.get_active() else {
            let had_session = self.session.is_some() || self.sessions.load().is_some();
            self.sessions.clear();
            self.profile = None;
            self.session = None;
            self.state = SessionState::NoProfile;
            self.remaining_secs = 0;
            return had_session.then_some(Event::SessionCleared { at: now });
        };

        let stored = self.sessions.load();
        if let Some(session) = stored
            .as_ref()
            .filter(|s| s.profile.id == profile.id && profile.phase(&s.phase.id).is_some())
        {
            return self.adopt(session.clone(), profile, now);
        }

        let Some(first) = profile.first_phase().cloned() else {
            self.sessions.clear();
            self.profile = Some(profile);
            self.session = None;
            self.state = SessionState::Idle;
            self.remaining_secs = 0;
            return None;
        };

        let mut seed = Session::seed(profile.clone(), first, now);
        if depth > 0 {
            tracing::warn!("seeded session could not be read back, keeping it in memory only");
            self.profile = Some(profile);
            let remaining = seed.remaining_secs;
            self.adopt_in_memory(seed, SessionState::Idle, remaining);
            return None;
        }

        seed.reminder_handle = stored
            .and_then(|s| s.reminder_handle)
            .or_else(|| self.session.take().and_then(|s| s.reminder_handle));
        let saved = self.sessions.save(seed);
        tracing::info!(profile = %profile.name, phase = %saved.phase.name, "session seeded");
        self.reconcile_at(now, depth + 1);

        Some(Event::SessionSeeded {
            profile_id: profile.id,
            phase_id: saved.phase.id,
            duration_secs: saved.remaining_secs,
            at: now,
        })
    }

    /// Take over a stored session that belongs to the active profile.
    fn adopt(&mut self, mut session: Session, profile: Profile, now: DateTime<Utc>) -> Option<Event> {
        if let Some(phase) = profile.phase(&session.phase.id) {
            session.phase = phase.clone();
        }
        session.profile = profile.clone();
        self.profile = Some(profile);

        if session.is_running {
            let remaining = session.remaining_at(now);
            if remaining == 0 {
                return self.expire(session, now);
            }
            self.adopt_in_memory(session, SessionState::Running, remaining);
            return None;
        }

        let remaining = session.remaining_secs;
        let state = if remaining == 0 {
            SessionState::Expired
        } else {
            SessionState::Idle
        };
        self.adopt_in_memory(session, state, remaining);
        None
    }

    /// Persist a running session that ran out while nobody was watching.
    fn expire(&mut self, session: Session, now: DateTime<Utc>) -> Option<Event> {
        let stopped = self.sessions.save(session.anchored(0, false, now));
        tracing::info!(phase = %stopped.phase.name, "countdown expired while away");
        let event = Event::TimerExpired {
            profile_id: stopped.profile.id.clone(),
            phase_id: stopped.phase.id.clone(),
            at: now,
        };
        self.adopt_in_memory(stopped, SessionState::Expired, 0);
        Some(event)
    }

    fn adopt_in_memory(&mut self, session: Session, state: SessionState, remaining_secs: u64) {
        tracing::debug!(?state, remaining_secs, phase = %session.phase.name, "session adopted");
        self.session = Some(session);
        self.state = state;
        self.remaining_secs = remaining_secs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{KvProfileRepository, NewProfile};
    use crate::reminder::MemoryScheduler;
    use crate::storage::MemoryStore;
    use crate::timer::KvSessionStore;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn secs(n: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(n)
    }

    #[test]
    fn format_countdown_pads_minutes_and_seconds() {
        assert_eq!(format_countdown(0), "00:00");
        assert_eq!(format_countdown(65), "01:05");
        assert_eq!(format_countdown(1500), "25:00");
        assert_eq!(format_countdown(6000), "100:00");
    }

    #[test]
    fn no_active_profile_means_no_session() {
        let kv = MemoryStore::new();
        let sched = MemoryScheduler::new();
        let store = KvSessionStore::new(&kv, &sched);
        let profiles = KvProfileRepository::new(&kv);
        let mut engine = SessionEngine::new(&store, &profiles);

        assert_eq!(engine.reconcile(t0()), None);
        assert_eq!(engine.state(), SessionState::NoProfile);
        assert_eq!(engine.remaining_secs(), 0);
        assert_eq!(engine.toggle(t0()), None);
    }

    #[test]
    fn reconcile_seeds_first_phase_of_active_profile() {
        let kv = MemoryStore::new();
        let sched = MemoryScheduler::new();
        let store = KvSessionStore::new(&kv, &sched);
        let profiles = KvProfileRepository::new(&kv);
        profiles
            .create(NewProfile::new("Work").phase("Focus", 1500).active(true))
            .unwrap();
        let mut engine = SessionEngine::new(&store, &profiles);

        let event = engine.reconcile(t0());
        assert!(matches!(event, Some(Event::SessionSeeded { duration_secs: 1500, .. })));
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.remaining_secs(), 1500);
        assert!(store.load().is_some());
        assert_eq!(sched.scheduled_total(), 0);
    }

    #[test]
    fn profile_without_phases_has_zero_countdown() {
        let kv = MemoryStore::new();
        let sched = MemoryScheduler::new();
        let store = KvSessionStore::new(&kv, &sched);
        let profiles = KvProfileRepository::new(&kv);
        profiles.create(NewProfile::new("Empty").active(true)).unwrap();
        let mut engine = SessionEngine::new(&store, &profiles);

        assert_eq!(engine.reconcile(t0()), None);
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.remaining_secs(), 0);
        assert!(engine.session().is_none());
        assert!(store.load().is_none());
    }

    #[test]
    fn toggle_starts_and_stops_with_reminder() {
        let kv = MemoryStore::new();
        let sched = MemoryScheduler::new();
        let store = KvSessionStore::new(&kv, &sched);
        let profiles = KvProfileRepository::new(&kv);
        profiles
            .create(NewProfile::new("Work").phase("Focus", 1500).active(true))
            .unwrap();
        let mut engine = SessionEngine::new(&store, &profiles);
        engine.reconcile(t0());

        let started = engine.toggle(t0());
        assert!(matches!(started, Some(Event::TimerStarted { remaining_secs: 1500, .. })));
        assert_eq!(engine.state(), SessionState::Running);
        assert_eq!(sched.pending_count(), 1);

        let stopped = engine.toggle(secs(100));
        assert!(matches!(stopped, Some(Event::TimerStopped { remaining_secs: 1400, .. })));
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.remaining_secs(), 1400);
        assert_eq!(sched.pending_count(), 0);
    }

    #[test]
    fn tick_derives_from_wall_clock_and_expires() {
        let kv = MemoryStore::new();
        let sched = MemoryScheduler::new();
        let store = KvSessionStore::new(&kv, &sched);
        let profiles = KvProfileRepository::new(&kv);
        profiles
            .create(NewProfile::new("Work").phase("Focus", 60).active(true))
            .unwrap();
        let mut engine = SessionEngine::new(&store, &profiles);
        engine.reconcile(t0());
        engine.toggle(t0());

        assert_eq!(engine.tick(secs(59)), None);
        assert_eq!(engine.remaining_secs(), 1);
        assert!(matches!(engine.tick(secs(61)), Some(Event::TimerExpired { .. })));
        assert_eq!(engine.state(), SessionState::Expired);
        assert!(engine.view(secs(61)).alerting);
        assert_eq!(sched.pending_count(), 0);
        assert_eq!(engine.toggle(secs(62)), None);
    }

    #[test]
    fn reset_rewinds_expired_session() {
        let kv = MemoryStore::new();
        let sched = MemoryScheduler::new();
        let store = KvSessionStore::new(&kv, &sched);
        let profiles = KvProfileRepository::new(&kv);
        profiles
            .create(NewProfile::new("Work").phase("Focus", 60).active(true))
            .unwrap();
        let mut engine = SessionEngine::new(&store, &profiles);
        engine.reconcile(t0());
        engine.toggle(t0());
        engine.tick(secs(90));

        let event = engine.reset(secs(95));
        assert!(matches!(event, Some(Event::TimerReset { remaining_secs: 60, .. })));
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.remaining_secs(), 60);
    }

    #[test]
    fn snapshot_reanchors_running_session() {
        let kv = MemoryStore::new();
        let sched = MemoryScheduler::new();
        let store = KvSessionStore::new(&kv, &sched);
        let profiles = KvProfileRepository::new(&kv);
        profiles
            .create(NewProfile::new("Work").phase("Focus", 1500).active(true))
            .unwrap();
        let mut engine = SessionEngine::new(&store, &profiles);
        engine.reconcile(t0());
        engine.toggle(t0());

        engine.snapshot(secs(300));
        let stored = store.load().unwrap();
        assert_eq!(stored.remaining_secs, 1200);
        assert_eq!(stored.updated_at, secs(300));
        assert_eq!(stored.expires_at, Some(secs(1500)));
        assert_eq!(sched.pending_count(), 1);
    }

    #[test]
    fn select_unknown_phase_is_not_found() {
        let kv = MemoryStore::new();
        let sched = MemoryScheduler::new();
        let store = KvSessionStore::new(&kv, &sched);
        let profiles = KvProfileRepository::new(&kv);
        profiles
            .create(NewProfile::new("Work").phase("Focus", 1500).active(true))
            .unwrap();
        let mut engine = SessionEngine::new(&store, &profiles);
        engine.reconcile(t0());

        assert!(matches!(
            engine.select_phase("nope", t0()),
            Err(CoreError::NotFound { kind: "phase", .. })
        ));
    }

    #[test]
    fn deactivating_profile_clears_session_and_reminder() {
        let kv = MemoryStore::new();
        let sched = MemoryScheduler::new();
        let store = KvSessionStore::new(&kv, &sched);
        let profiles = KvProfileRepository::new(&kv);
        let id = profiles
            .create(NewProfile::new("Work").phase("Focus", 1500).active(true))
            .unwrap();
        let mut engine = SessionEngine::new(&store, &profiles);
        engine.reconcile(t0());
        engine.toggle(t0());

        profiles.remove(&id).unwrap();
        let event = engine.reconcile(secs(10));
        assert!(matches!(event, Some(Event::SessionCleared { .. })));
        assert_eq!(engine.state(), SessionState::NoProfile);
        assert_eq!(sched.pending_count(), 0);
        assert!(store.load().is_none());
    }

    #[test]
    fn view_lists_phases_with_selection() {
        let kv = MemoryStore::new();
        let sched = MemoryScheduler::new();
        let store = KvSessionStore::new(&kv, &sched);
        let profiles = KvProfileRepository::new(&kv);
        profiles
            .create(
                NewProfile::new("Work")
                    .phase("Focus", 1500)
                    .phase("Break", 300)
                    .active(true),
            )
            .unwrap();
        let mut engine = SessionEngine::new(&store, &profiles);
        engine.reconcile(t0());

        let view = engine.view(t0());
        assert_eq!(view.profile_name.as_deref(), Some("Work"));
        assert_eq!(view.countdown, "25:00");
        assert_eq!(view.phases.len(), 2);
        assert!(view.phases[0].selected);
        assert!(!view.phases[1].selected);
        assert!(!view.alerting);
    }
}
