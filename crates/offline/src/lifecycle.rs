//! Worker lifecycle states.
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//!              |                          |             |
//!              +-------> Redundant <------+-------------+
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Lifecycle phase of the offline worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Created, nothing cached yet.
    #[default]
    Parsed,
    /// Populating the shell bucket.
    Installing,
    /// Shell cached, waiting to activate.
    Installed,
    /// Deleting stale buckets.
    Activating,
    /// Intercepting fetches.
    Activated,
    /// Install failed or replaced. Never intercepts.
    Redundant,
}

impl WorkerState {
    /// Whether moving from `self` to `to` is a legal lifecycle step.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Parsed, Self::Installing)
                | (Self::Installing, Self::Installed | Self::Redundant)
                | (Self::Installed, Self::Activating)
                | (Self::Activating, Self::Activated | Self::Redundant)
                | (Self::Activated, Self::Redundant)
        )
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An illegal lifecycle step was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid worker state transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: WorkerState,
    pub to: WorkerState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle_is_valid() {
        let path = [
            WorkerState::Parsed,
            WorkerState::Installing,
            WorkerState::Installed,
            WorkerState::Activating,
            WorkerState::Activated,
        ];
        for pair in path.windows(2) {
            if let [from, to] = pair {
                assert!(from.can_transition(*to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_install_failure_goes_redundant() {
        assert!(WorkerState::Installing.can_transition(WorkerState::Redundant));
    }

    #[test]
    fn test_cannot_skip_install() {
        assert!(!WorkerState::Parsed.can_transition(WorkerState::Activated));
        assert!(!WorkerState::Parsed.can_transition(WorkerState::Activating));
        assert!(!WorkerState::Installing.can_transition(WorkerState::Activating));
    }

    #[test]
    fn test_redundant_is_terminal() {
        for to in [
            WorkerState::Parsed,
            WorkerState::Installing,
            WorkerState::Installed,
            WorkerState::Activating,
            WorkerState::Activated,
        ] {
            assert!(!WorkerState::Redundant.can_transition(to));
        }
    }
}
