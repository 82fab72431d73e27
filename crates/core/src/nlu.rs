use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ApplicationError;

/// Upper bound the NLU service places on session identifiers.
pub const MAX_SESSION_ID_LEN: usize = 36;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Derives the remote session key from a caller's user id. The id is used
    /// verbatim and must stay a single URL path segment, so only
    /// `[A-Za-z0-9_.@-]` is accepted and the dot segments `.`/`..` are not.
    pub fn from_user_id(user_id: &str) -> Result<Self, ApplicationError> {
        if user_id.trim().is_empty() {
            return Err(ApplicationError::InvalidInput("user id must not be empty".to_string()));
        }

        if user_id.chars().count() > MAX_SESSION_ID_LEN {
            return Err(ApplicationError::InvalidInput(format!(
                "user id must be at most {MAX_SESSION_ID_LEN} characters"
            )));
        }

        let allowed = |ch: char| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | '@');
        if !user_id.chars().all(allowed) || matches!(user_id, "." | "..") {
            return Err(ApplicationError::InvalidInput(
                "user id may only contain ASCII letters, digits and any of `_-.@`".to_string(),
            ));
        }

        Ok(Self(user_id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `projects/{project}/agent/sessions/{session}`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionPath(String);

impl SessionPath {
    pub fn new(project_id: &str, session_id: &SessionId) -> Self {
        Self(format!("projects/{project_id}/agent/sessions/{}", session_id.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One utterance to classify. Built per request and dropped once the remote
/// call returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub language_code: String,
    pub session_id: SessionId,
    pub time_zone: String,
}

/// What the NLU service detected for one query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    pub intent_name: Option<String>,
    pub confidence: f64,
    pub parameters: Map<String, Value>,
}

/// Flattened shape returned to the caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NluResponse {
    pub intent: String,
    pub confidence: f32,
    pub entities: HashMap<String, String>,
}
