//! # Pomotask Core Library
//!
//! This library provides the core logic for Pomotask, a task reminder list
//! combined with a configurable Pomodoro timer. Every operation is available
//! through the standalone CLI binary, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Session Engine**: A wall-clock-based state machine that survives the
//!   host being suspended or restarted. The caller supplies `now` to every
//!   trigger; remaining time is always derived from the stored expiry.
//! - **Reminders**: One-shot alerts kept in lockstep with the session, so an
//!   expiry is announced even when nothing is running.
//! - **Storage**: A key-value gateway (SQLite-backed in the CLI), JSON records
//!   and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Core session state machine
//! - [`KvSessionStore`]: Session persistence with reminder cascade
//! - [`KvProfileRepository`] / [`KvTaskRepository`]: Profile and task CRUD
//! - [`Database`]: SQLite key-value store and reminder outbox
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod ids;
pub mod profile;
pub mod reminder;
pub mod storage;
pub mod task;
pub mod timer;
pub mod wire;

pub use error::{ConfigError, CoreError, SchedulingError, StorageError, ValidationError};
pub use events::Event;
pub use profile::{KvProfileRepository, NewProfile, Phase, Profile, ProfileRepository, MAX_PHASES};
pub use reminder::{
    DisabledScheduler, MemoryScheduler, ReminderHandle, ReminderRequest, ReminderScheduler,
    ReminderTemplate,
};
pub use storage::{Archive, Archived, Config, Database, KvStore, MemoryStore, PendingReminder};
pub use task::{DuePartition, KvTaskRepository, NewTask, Task, TaskNotification, TaskRepository, TaskStatus};
pub use timer::{
    format_countdown, KvSessionStore, Session, SessionEngine, SessionState, SessionStore,
    SessionView,
};
