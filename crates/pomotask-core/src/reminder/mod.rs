//! Reminder scheduling.
//!
//! A reminder is a one-shot alert at a wall-clock instant, identified by an
//! opaque [`ReminderHandle`]. It is the only way the user hears about an
//! expired countdown while the host process is suspended or gone, so the
//! session store keeps it in lockstep with the persisted session.

mod memory;

pub use memory::MemoryScheduler;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SchedulingError;

/// Opaque identifier of a scheduled reminder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderHandle(String);

impl ReminderHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReminderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to show and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRequest {
    pub title: String,
    pub body: String,
    /// May lie in the past; the scheduler then fires immediately.
    pub fires_at: DateTime<Utc>,
}

impl ReminderRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>, fires_at: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            fires_at,
        }
    }
}

/// Wording of session-expiry reminders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderTemplate {
    pub title_prefix: String,
    pub body_suffix: String,
}

impl Default for ReminderTemplate {
    fn default() -> Self {
        Self {
            title_prefix: "Pomodoro".into(),
            body_suffix: "finished".into(),
        }
    }
}

impl ReminderTemplate {
    pub fn session_request(
        &self,
        profile_name: &str,
        phase_name: &str,
        fires_at: DateTime<Utc>,
    ) -> ReminderRequest {
        ReminderRequest::new(
            format!("{} {}", self.title_prefix, profile_name),
            format!("{} {}", phase_name, self.body_suffix),
            fires_at,
        )
    }
}

/// Schedule and cancel one-shot reminders.
pub trait ReminderScheduler {
    fn schedule(&self, request: &ReminderRequest) -> Result<ReminderHandle, SchedulingError>;

    /// Cancelling an unknown or already delivered handle succeeds.
    fn cancel(&self, handle: &ReminderHandle) -> Result<(), SchedulingError>;
}

/// Scheduler used when reminders are switched off in the configuration.
///
/// Hands out fresh handles so sessions keep their handle/running pairing,
/// but never delivers anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledScheduler;

impl ReminderScheduler for DisabledScheduler {
    fn schedule(&self, _request: &ReminderRequest) -> Result<ReminderHandle, SchedulingError> {
        Ok(ReminderHandle::new(format!("disabled-{}", Uuid::new_v4().simple())))
    }

    fn cancel(&self, _handle: &ReminderHandle) -> Result<(), SchedulingError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_formats_session_reminder() {
        let now = Utc::now();
        let req = ReminderTemplate::default().session_request("Work", "Focus", now);
        assert_eq!(req.title, "Pomodoro Work");
        assert_eq!(req.body, "Focus finished");
        assert_eq!(req.fires_at, now);
    }

    #[test]
    fn handle_serializes_as_plain_string() {
        let handle = ReminderHandle::new("reminder-1");
        assert_eq!(serde_json::to_string(&handle).unwrap(), "\"reminder-1\"");
    }

    #[test]
    fn disabled_scheduler_hands_out_distinct_handles() {
        let s = DisabledScheduler;
        let req = ReminderRequest::new("t", "b", Utc::now());
        let a = s.schedule(&req).unwrap();
        let b = s.schedule(&req).unwrap();
        assert_ne!(a, b);
        assert!(s.cancel(&a).is_ok());
    }
}
