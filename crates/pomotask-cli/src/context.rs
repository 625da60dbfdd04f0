//! Wiring shared by every command: one database, one config.

use chrono::Utc;
use pomotask_core::{
    Config, Database, DisabledScheduler, KvProfileRepository, KvSessionStore, KvTaskRepository,
    ReminderScheduler, SessionEngine,
};

pub struct Context {
    pub db: Database,
    pub config: Config,
    disabled: DisabledScheduler,
}

impl Context {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load_or_default();
        let db = Database::open()?;
        Ok(Self {
            db,
            config,
            disabled: DisabledScheduler,
        })
    }

    /// The reminder outbox, or a no-op when notifications are switched off.
    pub fn reminders(&self) -> &dyn ReminderScheduler {
        if self.config.notifications.enabled {
            &self.db
        } else {
            &self.disabled
        }
    }

    pub fn sessions(&self) -> KvSessionStore<'_> {
        KvSessionStore::new(&self.db, self.reminders())
            .with_template(self.config.reminder_template())
    }

    pub fn profiles(&self) -> KvProfileRepository<'_> {
        KvProfileRepository::new(&self.db)
    }

    pub fn tasks(&self) -> KvTaskRepository<'_> {
        KvTaskRepository::new(&self.db, self.reminders())
    }

    /// Bring the stored session in line with the current profiles.
    pub fn reconcile_session(&self) {
        let sessions = self.sessions();
        let profiles = self.profiles();
        let mut engine = SessionEngine::new(&sessions, &profiles);
        if let Some(event) = engine.reconcile(Utc::now()) {
            tracing::debug!(?event, "session reconciled after profile change");
        }
    }
}
