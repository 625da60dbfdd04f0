//! The resumable Pomodoro session and its stored form.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::{Phase, Profile};
use crate::reminder::ReminderHandle;
use crate::wire;

/// Live/resumable countdown state.
///
/// `remaining_secs` is exact at `updated_at`. While running, `expires_at`
/// anchors the countdown to the wall clock and is the only thing used to
/// derive the current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub profile: Profile,
    pub phase: Phase,
    pub remaining_secs: u64,
    pub is_running: bool,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reminder_handle: Option<ReminderHandle>,
}

impl Session {
    /// Fresh, stopped session at the full duration of `phase`.
    pub fn seed(profile: Profile, phase: Phase, now: DateTime<Utc>) -> Self {
        let remaining_secs = phase.duration_secs;
        Self {
            profile,
            phase,
            remaining_secs,
            is_running: false,
            updated_at: now,
            expires_at: None,
            reminder_handle: None,
        }
    }

    /// Re-anchor at `now` with a new remaining value and running flag.
    ///
    /// A running session gets `expires_at = now + remaining`; a stopped one
    /// has none. The reminder handle is left for the store to reconcile.
    pub fn anchored(mut self, remaining_secs: u64, is_running: bool, now: DateTime<Utc>) -> Self {
        self.remaining_secs = remaining_secs;
        self.is_running = is_running;
        self.updated_at = now;
        self.expires_at = is_running.then(|| now + secs(remaining_secs));
        self
    }

    /// Countdown value at `now`.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        match (self.is_running, self.expires_at) {
            (true, Some(expires_at)) => secs_until(expires_at, now),
            _ => self.remaining_secs,
        }
    }
}

/// Whole seconds from `now` until `expires_at`, floored, never negative.
pub fn secs_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let ms = (expires_at - now).num_milliseconds();
    if ms <= 0 {
        0
    } else {
        (ms / 1000) as u64
    }
}

fn secs(n: u64) -> Duration {
    Duration::seconds(i64::try_from(n).unwrap_or(i64::MAX / 1000))
}

/// Stored shape of a [`Session`].
///
/// Scalars are written natively but read leniently (see [`crate::wire`]).
/// [`SessionRecord::decode`] rejects records missing required fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub phase: Option<Phase>,
    #[serde(default, deserialize_with = "wire::opt_i64")]
    pub remaining_secs: Option<i64>,
    #[serde(default, deserialize_with = "wire::opt_bool_checked")]
    pub is_running: Option<bool>,
    #[serde(default, deserialize_with = "wire::opt_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "wire::opt_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_handle: Option<ReminderHandle>,
}

impl SessionRecord {
    /// Validate and convert into a typed session.
    ///
    /// Returns `None` when profile, phase, remaining or `updated_at` is
    /// missing or unreadable. A negative remaining value is clamped to 0 and
    /// the session treated as stopped.
    pub fn decode(self) -> Option<Session> {
        let profile = self.profile?;
        let phase = self.phase?;
        let remaining = self.remaining_secs?;
        let updated_at = self.updated_at?;

        let remaining_secs = u64::try_from(remaining).unwrap_or(0);
        let is_running = self.is_running.unwrap_or(false) && remaining > 0;
        let expires_at = if is_running {
            Some(
                self.expires_at
                    .unwrap_or_else(|| updated_at + secs(remaining_secs)),
            )
        } else {
            None
        };

        Some(Session {
            profile,
            phase,
            remaining_secs,
            is_running,
            updated_at,
            expires_at,
            reminder_handle: self.reminder_handle,
        })
    }
}

impl From<&Session> for SessionRecord {
    fn from(s: &Session) -> Self {
        Self {
            profile: Some(s.profile.clone()),
            phase: Some(s.phase.clone()),
            remaining_secs: Some(i64::try_from(s.remaining_secs).unwrap_or(i64::MAX)),
            is_running: Some(s.is_running),
            updated_at: Some(s.updated_at),
            expires_at: s.expires_at,
            reminder_handle: s.reminder_handle.clone(),
        }
    }
}
