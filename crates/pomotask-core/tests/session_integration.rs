//! Integration tests for the session engine.
//!
//! Covers the wall-clock contract (remaining time survives the host being
//! away), reminder bookkeeping across triggers, and degraded persistence.

use std::cell::Cell;

use chrono::{DateTime, Duration, TimeZone, Utc};
use pomotask_core::{
    Database, Event, KvProfileRepository, KvSessionStore, KvStore, MemoryScheduler, MemoryStore,
    NewProfile, ProfileRepository, Session, SessionEngine, SessionState, SessionStore,
    StorageError,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

fn work() -> NewProfile {
    NewProfile::new("Work")
        .phase("Focus", 1500)
        .phase("Break", 300)
        .active(true)
}

/// Persist a running session with `remaining` seconds left as of `T0`.
fn store_running(store: &dyn SessionStore, profiles: &dyn ProfileRepository, remaining: u64) -> Session {
    let profile = profiles.get_active().unwrap();
    let phase = profile.phases[0].clone();
    store.save(Session::seed(profile, phase, t0()).anchored(remaining, true, t0()))
}

#[test]
fn reconcile_derives_remaining_from_wall_clock() {
    let kv = MemoryStore::new();
    let sched = MemoryScheduler::new();
    let store = KvSessionStore::new(&kv, &sched);
    let profiles = KvProfileRepository::new(&kv);
    profiles.create(work()).unwrap();
    store_running(&store, &profiles, 100);

    let mut engine = SessionEngine::new(&store, &profiles);
    assert_eq!(engine.reconcile(at(30)), None);
    assert_eq!(engine.state(), SessionState::Running);
    assert!((69..=70).contains(&engine.remaining_secs()));
}

#[test]
fn reconcile_is_idempotent() {
    let kv = MemoryStore::new();
    let sched = MemoryScheduler::new();
    let store = KvSessionStore::new(&kv, &sched);
    let profiles = KvProfileRepository::new(&kv);
    profiles.create(work()).unwrap();
    store_running(&store, &profiles, 100);

    let mut engine = SessionEngine::new(&store, &profiles);
    engine.reconcile(at(10));
    let first = store.load();
    let scheduled = sched.scheduled_total();

    engine.reconcile(at(10));
    engine.reconcile(at(10));
    assert_eq!(store.load(), first);
    assert_eq!(sched.scheduled_total(), scheduled);
    assert_eq!(sched.pending_count(), 1);
}

#[test]
fn reconcile_after_expiry_clamps_and_cancels() {
    let kv = MemoryStore::new();
    let sched = MemoryScheduler::new();
    let store = KvSessionStore::new(&kv, &sched);
    let profiles = KvProfileRepository::new(&kv);
    profiles.create(work()).unwrap();
    let running = store_running(&store, &profiles, 100);
    let handle = running.reminder_handle.unwrap();

    let mut engine = SessionEngine::new(&store, &profiles);
    let event = engine.reconcile(at(150));

    assert!(matches!(event, Some(Event::TimerExpired { .. })));
    assert_eq!(engine.state(), SessionState::Expired);
    assert_eq!(engine.remaining_secs(), 0);
    assert!(sched.cancelled().contains(&handle));
    assert_eq!(sched.pending_count(), 0);

    let stored = store.load().unwrap();
    assert_eq!(stored.remaining_secs, 0);
    assert!(!stored.is_running);
    assert!(stored.reminder_handle.is_none());
}

#[test]
fn focus_break_scenario() {
    let kv = MemoryStore::new();
    let sched = MemoryScheduler::new();
    let store = KvSessionStore::new(&kv, &sched);
    let profiles = KvProfileRepository::new(&kv);
    profiles.create(work()).unwrap();
    let profile = profiles.get_active().unwrap();
    let (focus, brk) = (profile.phases[0].id.clone(), profile.phases[1].id.clone());

    let mut engine = SessionEngine::new(&store, &profiles);
    engine.reconcile(t0());
    assert_eq!(engine.current_phase().map(|p| p.name.as_str()), Some("Focus"));
    assert_eq!(engine.remaining_secs(), 1500);

    engine.toggle(t0());
    let pending = sched.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].1.fires_at, at(1500));
    assert_eq!(pending[0].1.title, "Pomodoro Work");
    assert_eq!(pending[0].1.body, "Focus finished");

    // Switching while running stops first and cancels the Focus reminder.
    let event = engine.select_phase(&brk, at(600)).unwrap();
    assert!(matches!(event, Event::PhaseSelected { remaining_secs: 300, .. }));
    assert_eq!(engine.state(), SessionState::Idle);
    assert_eq!(engine.remaining_secs(), 300);
    assert_eq!(sched.pending_count(), 0);

    // Focus was not the stored phase any more, so it starts over.
    engine.select_phase(&focus, at(610)).unwrap();
    assert_eq!(engine.remaining_secs(), 1500);

    // Re-selecting the current phase keeps its remaining time.
    engine.toggle(at(610));
    engine.toggle(at(710));
    engine.select_phase(&focus, at(720)).unwrap();
    assert_eq!(engine.remaining_secs(), 1400);
    assert_eq!(sched.pending_count(), 0);
}

#[test]
fn removed_phase_reseeds_and_cancels_old_reminder() {
    let kv = MemoryStore::new();
    let sched = MemoryScheduler::new();
    let store = KvSessionStore::new(&kv, &sched);
    let profiles = KvProfileRepository::new(&kv);
    profiles.create(work()).unwrap();

    let mut engine = SessionEngine::new(&store, &profiles);
    engine.reconcile(t0());
    engine.toggle(t0());
    assert_eq!(sched.pending_count(), 1);

    let mut profile = profiles.get_active().unwrap();
    profile.phases.remove(0);
    profiles.update(profile).unwrap();

    let event = engine.reconcile(at(60));
    assert!(matches!(event, Some(Event::SessionSeeded { duration_secs: 300, .. })));
    assert_eq!(engine.state(), SessionState::Idle);
    assert_eq!(engine.current_phase().map(|p| p.name.as_str()), Some("Break"));
    assert_eq!(sched.pending_count(), 0);
}

#[test]
fn switching_active_profile_reseeds() {
    let kv = MemoryStore::new();
    let sched = MemoryScheduler::new();
    let store = KvSessionStore::new(&kv, &sched);
    let profiles = KvProfileRepository::new(&kv);
    profiles.create(work()).unwrap();
    let study = profiles
        .create(NewProfile::new("Study").phase("Read", 900))
        .unwrap();

    let mut engine = SessionEngine::new(&store, &profiles);
    engine.reconcile(t0());
    engine.toggle(t0());

    profiles.set_active(&study).unwrap();
    engine.reconcile(at(5));
    assert_eq!(engine.profile().map(|p| p.name.as_str()), Some("Study"));
    assert_eq!(engine.remaining_secs(), 900);
    assert_eq!(engine.state(), SessionState::Idle);
    assert_eq!(sched.pending_count(), 0);
}

#[test]
fn scheduler_failure_does_not_block_the_timer() {
    let kv = MemoryStore::new();
    let sched = MemoryScheduler::new();
    let store = KvSessionStore::new(&kv, &sched);
    let profiles = KvProfileRepository::new(&kv);
    profiles.create(work()).unwrap();

    let mut engine = SessionEngine::new(&store, &profiles);
    engine.reconcile(t0());
    sched.set_fail_schedule(true);

    assert!(matches!(engine.toggle(t0()), Some(Event::TimerStarted { .. })));
    assert_eq!(engine.state(), SessionState::Running);
    assert!(store.load().unwrap().reminder_handle.is_none());

    sched.set_fail_cancel(true);
    assert!(matches!(engine.toggle(at(10)), Some(Event::TimerStopped { .. })));
    assert_eq!(engine.remaining_secs(), 1490);
}

#[test]
fn unavailable_store_keeps_in_memory_countdown() {
    let kv = MemoryStore::new();
    let sched = MemoryScheduler::new();
    let store = KvSessionStore::new(&kv, &sched);
    let profiles = KvProfileRepository::new(&kv);
    profiles.create(work()).unwrap();

    let mut engine = SessionEngine::new(&store, &profiles);
    engine.reconcile(t0());
    engine.toggle(t0());

    kv.set_failing(true);
    assert_eq!(engine.tick(at(100)), None);
    assert_eq!(engine.remaining_at(at(100)), 1400);

    // Reads fail, so nothing is active while the store is down.
    engine.reconcile(at(200));
    assert_eq!(engine.state(), SessionState::NoProfile);

    kv.set_failing(false);
    engine.reconcile(at(300));
    assert_eq!(engine.state(), SessionState::Running);
    assert_eq!(engine.remaining_secs(), 1200);
}

/// Store whose writes can be switched off while reads keep working.
struct WriteGate<'a> {
    inner: &'a MemoryStore,
    closed: Cell<bool>,
}

impl KvStore for WriteGate<'_> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.closed.get() {
            return Err(StorageError::unavailable(key, "write refused"));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.closed.get() {
            return Err(StorageError::unavailable(key, "write refused"));
        }
        self.inner.remove(key)
    }
}

#[test]
fn failed_start_write_leaves_no_reminder() {
    let kv = MemoryStore::new();
    let sched = MemoryScheduler::new();
    let profiles = KvProfileRepository::new(&kv);
    profiles.create(work()).unwrap();
    let gate = WriteGate {
        inner: &kv,
        closed: Cell::new(false),
    };
    let store = KvSessionStore::new(&gate, &sched);

    let mut engine = SessionEngine::new(&store, &profiles);
    assert!(matches!(engine.reconcile(t0()), Some(Event::SessionSeeded { .. })));

    gate.closed.set(true);
    assert_eq!(engine.toggle(t0()), None);
    assert_eq!(engine.state(), SessionState::Idle);
    assert_eq!(sched.scheduled_total(), 1);
    assert_eq!(sched.pending_count(), 0);
    assert_eq!(store.load().map(|s| s.is_running), Some(false));
}

#[test]
fn seeding_without_storage_adopts_seed_in_memory() {
    struct ReadOnlyProfiles(Vec<pomotask_core::Profile>);

    impl ProfileRepository for ReadOnlyProfiles {
        fn list(&self) -> Vec<pomotask_core::Profile> {
            self.0.clone()
        }
        fn create(&self, _: NewProfile) -> pomotask_core::error::Result<String> {
            unimplemented!()
        }
        fn update(&self, _: pomotask_core::Profile) -> pomotask_core::error::Result<()> {
            unimplemented!()
        }
        fn remove(&self, _: &str) -> pomotask_core::error::Result<pomotask_core::Profile> {
            unimplemented!()
        }
    }

    let source = MemoryStore::new();
    let repo = KvProfileRepository::new(&source);
    repo.create(work()).unwrap();
    let profiles = ReadOnlyProfiles(repo.list());

    let kv = MemoryStore::new();
    kv.set_failing(true);
    let sched = MemoryScheduler::new();
    let store = KvSessionStore::new(&kv, &sched);

    let mut engine = SessionEngine::new(&store, &profiles);
    assert!(matches!(engine.reconcile(t0()), Some(Event::SessionSeeded { .. })));
    assert_eq!(engine.state(), SessionState::Idle);
    assert_eq!(engine.remaining_secs(), 1500);
}

#[test]
fn database_backed_session_resumes_after_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("pomotask.db");

    {
        let db = Database::open_at(&path).unwrap();
        let store = KvSessionStore::new(&db, &db);
        let profiles = KvProfileRepository::new(&db);
        profiles.create(work()).unwrap();
        let mut engine = SessionEngine::new(&store, &profiles);
        engine.reconcile(t0());
        engine.toggle(t0());
        engine.snapshot(at(60));
    }

    let db = Database::open_at(&path).unwrap();
    let pending = db.pending_reminders().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].fires_at, at(1500));

    let store = KvSessionStore::new(&db, &db);
    let profiles = KvProfileRepository::new(&db);
    let mut engine = SessionEngine::new(&store, &profiles);
    engine.reconcile(at(900));
    assert_eq!(engine.state(), SessionState::Running);
    assert_eq!(engine.remaining_secs(), 600);
    assert_eq!(engine.view(at(900)).countdown, "10:00");

    engine.reconcile(at(1600));
    assert_eq!(engine.state(), SessionState::Expired);
    assert!(db.pending_reminders().unwrap().is_empty());
}
