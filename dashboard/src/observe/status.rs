//! Build status classification
//!
//! The backend reports build status as free-form text. Everything that makes a
//! scheduling or display decision goes through [`classify`] instead of
//! comparing raw strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical build lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Registered, never built
    New,

    /// Queued or building
    InProgress,

    /// Finished successfully
    Succeeded,

    /// Finished with an error
    Failed,

    /// Status text not recognized
    Unknown,
}

impl LifecycleState {
    /// Whether the build can no longer change.
    ///
    /// `Unknown` is not terminal: a status the classifier does not know yet may
    /// still be moving.
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Succeeded | LifecycleState::Failed)
    }

    /// Short label for badges
    pub fn label(self) -> &'static str {
        match self {
            LifecycleState::New => "New",
            LifecycleState::InProgress => "Building",
            LifecycleState::Succeeded => "Success",
            LifecycleState::Failed => "Failed",
            LifecycleState::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::New => "NEW",
            LifecycleState::InProgress => "IN_PROGRESS",
            LifecycleState::Succeeded => "SUCCEEDED",
            LifecycleState::Failed => "FAILED",
            LifecycleState::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Map a raw backend status to its lifecycle state. Never fails.
pub fn classify(raw: &str) -> LifecycleState {
    match raw.trim().to_lowercase().as_str() {
        "new" => LifecycleState::New,
        "pending" | "running" | "building" | "building..." | "in_progress" => {
            LifecycleState::InProgress
        }
        "succeeded" | "success" => LifecycleState::Succeeded,
        "failed" => LifecycleState::Failed,
        _ => LifecycleState::Unknown,
    }
}

/// Free-function form of [`LifecycleState::is_terminal`]
pub fn is_terminal(state: LifecycleState) -> bool {
    state.is_terminal()
}
