//! Log snapshots

use serde::{Deserialize, Serialize};

/// Shown before the first fetch resolves
pub const LOADING_PLACEHOLDER: &str = "Loading logs...";

/// Shown when the build has no log resource (yet)
pub const NOT_FOUND_PLACEHOLDER: &str = "Logs are not available for this build yet.";

/// Shown when the log resource exists but is empty
pub const EMPTY_PLACEHOLDER: &str = "No logs available";

/// Failure indicator for transient fetch errors
pub const RETRY_MESSAGE: &str = "Failed to load logs. Retrying...";

/// Outcome of the fetch a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    Ok,
    NotFound,
    Error,
}

/// Latest known log content of an observed build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSnapshot {
    /// Last successfully fetched log text
    pub text: String,

    /// None until the first fetch resolves
    pub outcome: Option<FetchOutcome>,

    /// Sequence number of the fetch this snapshot came from, 0 before any
    pub sequence: u64,

    /// Non-blocking indicator to overlay on the text
    pub message: Option<String>,
}

impl LogSnapshot {
    /// Whether any fetch has been applied
    pub fn is_loaded(&self) -> bool {
        self.outcome.is_some()
    }

    /// Text for a log pane
    pub fn render(&self) -> String {
        match self.outcome {
            None => LOADING_PLACEHOLDER.to_string(),
            Some(FetchOutcome::Ok) if self.text.is_empty() => EMPTY_PLACEHOLDER.to_string(),
            Some(FetchOutcome::Ok) => self.text.clone(),
            Some(FetchOutcome::NotFound) if self.text.is_empty() => {
                NOT_FOUND_PLACEHOLDER.to_string()
            }
            Some(FetchOutcome::NotFound) => format!("{}\n[{}]", self.text, NOT_FOUND_PLACEHOLDER),
            Some(FetchOutcome::Error) => {
                let message = self.message.as_deref().unwrap_or(RETRY_MESSAGE);
                if self.text.is_empty() {
                    message.to_string()
                } else {
                    format!("{}\n[{}]", self.text, message)
                }
            }
        }
    }
}
