use crate::CoreError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SiteState {
    Absent,
    Running,
    Stopped,
}

impl std::fmt::Display for SiteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteState::Absent => write!(f, "absent"),
            SiteState::Running => write!(f, "running"),
            SiteState::Stopped => write!(f, "stopped"),
        }
    }
}

pub fn validate_transition(from: SiteState, to: SiteState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (
            SiteState::Absent | SiteState::Running | SiteState::Stopped,
            SiteState::Running
        ) | (
            SiteState::Running | SiteState::Stopped,
            SiteState::Stopped | SiteState::Absent
        )
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
