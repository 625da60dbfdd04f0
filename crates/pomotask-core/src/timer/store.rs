//! Session persistence with the reminder cascade.
//!
//! Every save leaves the stored record and the scheduled reminder agreeing:
//! a running session has exactly one pending reminder at its `expires_at`,
//! a stopped session has none.

use super::session::{Session, SessionRecord};
use crate::reminder::{ReminderHandle, ReminderScheduler, ReminderTemplate};
use crate::storage::{keys, read_record, write_record, KvStore};

pub trait SessionStore {
    /// The persisted session, `None` when missing, unreadable or corrupt.
    fn load(&self) -> Option<Session>;

    /// Persist `session`, rescheduling or cancelling its reminder first.
    ///
    /// Returns the session as persisted, with its new reminder handle. When
    /// the write fails the fresh reminder is cancelled and no handle returned.
    fn save(&self, session: Session) -> Session;

    /// Cancel the stored session's reminder and delete the record.
    fn clear(&self);
}

/// [`SessionStore`] over a [`KvStore`] and a [`ReminderScheduler`].
pub struct KvSessionStore<'a> {
    kv: &'a dyn KvStore,
    reminders: &'a dyn ReminderScheduler,
    template: ReminderTemplate,
}

impl<'a> KvSessionStore<'a> {
    pub fn new(kv: &'a dyn KvStore, reminders: &'a dyn ReminderScheduler) -> Self {
        Self {
            kv,
            reminders,
            template: ReminderTemplate::default(),
        }
    }

    pub fn with_template(mut self, template: ReminderTemplate) -> Self {
        self.template = template;
        self
    }

    fn cancel(&self, handle: &ReminderHandle) {
        if let Err(e) = self.reminders.cancel(handle) {
            tracing::warn!(handle = %handle, error = %e, "failed to cancel session reminder");
        }
    }
}

/// Bring the running flag and expiry into agreement before persisting.
fn normalize(mut session: Session) -> Session {
    if session.is_running && session.remaining_secs == 0 {
        session.is_running = false;
    }
    if !session.is_running {
        session.expires_at = None;
    } else if session.expires_at.is_none() {
        let updated_at = session.updated_at;
        let remaining = session.remaining_secs;
        session = session.anchored(remaining, true, updated_at);
    }
    session
}

impl SessionStore for KvSessionStore<'_> {
    fn load(&self) -> Option<Session> {
        let record: SessionRecord = read_record(self.kv, keys::SESSION)?;
        let session = record.decode();
        if session.is_none() {
            tracing::debug!("stored session is missing required fields, ignoring it");
        }
        session
    }

    fn save(&self, session: Session) -> Session {
        let mut session = normalize(session);

        if let Some(old) = session.reminder_handle.take() {
            self.cancel(&old);
        }
        if let (true, Some(expires_at)) = (session.is_running, session.expires_at) {
            let request = self.template.session_request(
                &session.profile.name,
                &session.phase.name,
                expires_at,
            );
            match self.reminders.schedule(&request) {
                Ok(handle) => session.reminder_handle = Some(handle),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to schedule session reminder, continuing without one");
                }
            }
        }

        if let Err(e) = write_record(self.kv, keys::SESSION, &SessionRecord::from(&session)) {
            tracing::warn!(error = %e, "failed to persist session");
            if let Some(fresh) = session.reminder_handle.take() {
                self.cancel(&fresh);
            }
        }
        tracing::debug!(
            phase = %session.phase.name,
            remaining_secs = session.remaining_secs,
            is_running = session.is_running,
            "session saved"
        );
        session
    }

    fn clear(&self) {
        let stored: Option<SessionRecord> = read_record(self.kv, keys::SESSION);
        if let Some(handle) = stored.and_then(|r| r.reminder_handle) {
            self.cancel(&handle);
        }
        if let Err(e) = self.kv.remove(keys::SESSION) {
            tracing::warn!(error = %e, "failed to remove stored session");
        }
    }
}
