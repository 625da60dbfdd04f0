//! Identifier generation.

use uuid::Uuid;

/// Fresh opaque id of the form `<prefix>-<uuid>`.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}
