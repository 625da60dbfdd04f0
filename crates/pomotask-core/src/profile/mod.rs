//! Pomodoro profiles.
//!
//! A profile is a named set of up to [`MAX_PHASES`] timed phases, e.g.
//! "Work" with "Focus" (25 min) and "Break" (5 min). At most one profile is
//! active at a time; the session engine always runs against the active one.

mod repository;

pub use repository::{KvProfileRepository, ProfileRepository};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::new_id;
use crate::wire;

/// Maximum number of phases a profile may hold.
pub const MAX_PHASES: usize = 3;

/// One named duration option within a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Empty means "not yet assigned"; the repository fills it in.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "wire::u64_required")]
    pub duration_secs: u64,
    /// Display colour tag, opaque to the core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl Phase {
    /// New phase with a freshly generated id.
    pub fn new(name: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            id: new_id("phase"),
            name: name.into(),
            duration_secs,
            background: None,
        }
    }
}

/// A named, user-defined set of phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default, alias = "main", deserialize_with = "wire::bool_or_false")]
    pub is_active: bool,
}

impl Profile {
    pub fn phase(&self, phase_id: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == phase_id)
    }

    pub fn first_phase(&self) -> Option<&Phase> {
        self.phases.first()
    }

    /// Check name, phase count and durations.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_parts(&self.name, &self.phases)
    }
}

/// Input for creating a profile. Phases without an id get a fresh one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProfile {
    pub name: String,
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub is_active: bool,
}

impl NewProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn phase(mut self, name: impl Into<String>, duration_secs: u64) -> Self {
        self.phases.push(Phase::new(name, duration_secs));
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }
}

fn validate_parts(name: &str, phases: &[Phase]) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyField("name"));
    }
    if phases.len() > MAX_PHASES {
        return Err(ValidationError::TooManyPhases {
            max: MAX_PHASES,
            got: phases.len(),
        });
    }
    if let Some(p) = phases.iter().find(|p| p.duration_secs == 0) {
        return Err(ValidationError::ZeroDuration {
            name: p.name.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(phases: Vec<Phase>) -> Profile {
        Profile {
            id: "profile-1".into(),
            name: "Work".into(),
            phases,
            is_active: false,
        }
    }

    #[test]
    fn validate_rejects_blank_name() {
        let mut p = profile(vec![]);
        p.name = "   ".into();
        assert!(matches!(p.validate(), Err(ValidationError::EmptyField("name"))));
    }

    #[test]
    fn validate_rejects_fourth_phase() {
        let p = profile(vec![
            Phase::new("a", 1),
            Phase::new("b", 1),
            Phase::new("c", 1),
            Phase::new("d", 1),
        ]);
        assert!(matches!(
            p.validate(),
            Err(ValidationError::TooManyPhases { max: 3, got: 4 })
        ));
    }

    #[test]
    fn validate_rejects_zero_duration() {
        let p = profile(vec![Phase::new("Focus", 0)]);
        assert!(matches!(p.validate(), Err(ValidationError::ZeroDuration { .. })));
    }

    #[test]
    fn decodes_string_encoded_duration_and_legacy_flag() {
        let p: Profile = serde_json::from_str(
            r#"{"id":"p","name":"Work","main":true,
                "phases":[{"id":"t","name":"Focus","duration_secs":"1500"}]}"#,
        )
        .unwrap();
        assert!(p.is_active);
        assert_eq!(p.phases[0].duration_secs, 1500);
        assert_eq!(p.phase("t").map(|t| t.name.as_str()), Some("Focus"));
    }
}
