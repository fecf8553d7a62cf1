//! UI-agnostic conversation state types
//!
//! These are shared by every front end and by the upload transport, which
//! sends them to the server as the `history` field.

use serde::{Deserialize, Serialize};

use crate::error::SubmitError;

/// One entry in the conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Label shown in front of the turn when rendered
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You:",
            Role::Assistant => "AI:",
        }
    }
}

/// Transient state of the submission pipeline. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionState {
    pub(crate) in_flight: bool,
    pub(crate) last_error: Option<SubmitError>,
}

impl SubmissionState {
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn last_error(&self) -> Option<&SubmitError> {
        self.last_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_serializes_lowercase_role() {
        let json = serde_json::to_string(&Turn::user("Hello")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"Hello"}"#);

        let json = serde_json::to_string(&Turn::assistant("Hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"Hi"}"#);
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::User.label(), "You:");
        assert_eq!(Role::Assistant.label(), "AI:");
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_submission_state_starts_clean() {
        let state = SubmissionState::default();
        assert!(!state.in_flight());
        assert!(state.last_error().is_none());
    }
}
