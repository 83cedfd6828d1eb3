use thiserror::Error;

/// Engine-level failure taxonomy.
///
/// Backend exceptions are caught at the driver boundary and converted into
/// one of these before they reach a workflow step. A step action returning
/// `Err(EngineError)` is ordinary control flow: the orchestrator turns it
/// into a step outcome, never a panic. Stale references are consumed inside
/// the action executor and never surface here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No locator strategy produced an interactable candidate. Recoverable;
    /// the caller decides whether a fallback tactic applies.
    #[error("no interactable element found for {description}")]
    NotFound { description: String },

    /// An interaction exhausted every tier/tactic.
    #[error("{action} failed for {description}: {detail}")]
    ActionFailed {
        action: &'static str,
        description: String,
        detail: String,
    },
}

impl EngineError {
    pub fn not_found(description: impl Into<String>) -> Self {
        EngineError::NotFound {
            description: description.into(),
        }
    }

    pub fn action_failed(
        action: &'static str,
        description: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        EngineError::ActionFailed {
            action,
            description: description.into(),
            detail: detail.into(),
        }
    }
}
