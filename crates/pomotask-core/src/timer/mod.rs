mod engine;
mod session;
mod store;

pub use engine::{format_countdown, PhaseChoice, SessionEngine, SessionState, SessionView};
pub use session::{secs_until, Session, SessionRecord};
pub use store::{KvSessionStore, SessionStore};
