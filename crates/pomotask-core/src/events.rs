use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every session transition produces an Event.
/// Hosts print or forward them; nothing in the core reads them back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A fresh session was created at the first phase of the active profile.
    SessionSeeded {
        profile_id: String,
        phase_id: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerStarted {
        phase_id: String,
        remaining_secs: u64,
        expires_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    TimerStopped {
        phase_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        phase_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// The countdown reached zero, either while watched or while away.
    TimerExpired {
        profile_id: String,
        phase_id: String,
        at: DateTime<Utc>,
    },
    PhaseSelected {
        phase_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// No profile is active any more; the stored session was dropped.
    SessionCleared {
        at: DateTime<Utc>,
    },
}
