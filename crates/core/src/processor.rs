//! Request processing: one inbound message in, one flattened detection out.
//!
//! [`MessageProcessor`] holds only read-only settings and a shared handle to
//! an [`IntentDetector`], so a single instance is cloned into every request
//! handler without locking.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::config::NluConfig;
use crate::entities::flatten_value;
use crate::errors::{ApplicationError, NluError};
use crate::nlu::{DetectionResult, NluResponse, Query, SessionId, SessionPath};

/// The remote detect-intent call.
#[async_trait]
pub trait IntentDetector: Send + Sync {
    async fn detect_intent(
        &self,
        session: &SessionPath,
        query: &Query,
    ) -> Result<DetectionResult, NluError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessorSettings {
    pub project_id: String,
    pub language_code: String,
    pub time_zone: String,
    pub deadline: Duration,
}

impl ProcessorSettings {
    /// `project_id` is passed separately because it may come from the
    /// credentials file rather than from `config`.
    pub fn from_config(config: &NluConfig, project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            language_code: config.language_code.clone(),
            time_zone: config.time_zone.clone(),
            deadline: config.timeout(),
        }
    }
}

#[derive(Clone)]
pub struct MessageProcessor {
    settings: Arc<ProcessorSettings>,
    detector: Arc<dyn IntentDetector>,
}

impl MessageProcessor {
    pub fn new(settings: ProcessorSettings, detector: Arc<dyn IntentDetector>) -> Self {
        Self { settings: Arc::new(settings), detector }
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    pub async fn process_message(
        &self,
        raw_message: &str,
        user_id: &str,
    ) -> Result<NluResponse, ApplicationError> {
        if raw_message.trim().is_empty() {
            return Err(ApplicationError::InvalidInput("message must not be empty".to_string()));
        }

        let session_id = SessionId::from_user_id(user_id)?;
        let session = SessionPath::new(&self.settings.project_id, &session_id);
        let query = Query {
            text: raw_message.to_string(),
            language_code: self.settings.language_code.clone(),
            session_id,
            time_zone: self.settings.time_zone.clone(),
        };

        let deadline = self.settings.deadline;
        let detection =
            match tokio::time::timeout(deadline, self.detector.detect_intent(&session, &query))
                .await
            {
                Ok(Ok(detection)) => detection,
                Ok(Err(error)) => {
                    warn!(
                        event_name = "nlu.detect_intent.failed",
                        session = %session,
                        error = %error,
                        "detect-intent call failed"
                    );
                    return Err(error.into());
                }
                Err(_elapsed) => {
                    warn!(
                        event_name = "nlu.detect_intent.timeout",
                        session = %session,
                        deadline_ms = deadline.as_millis() as u64,
                        "detect-intent call exceeded deadline"
                    );
                    return Err(NluError::Timeout(deadline).into());
                }
            };

        let response = assemble_response(detection);
        debug!(
            event_name = "nlu.detect_intent.completed",
            session = %session,
            intent = %response.intent,
            confidence = response.confidence,
            entity_count = response.entities.len(),
            "message processed"
        );

        Ok(response)
    }
}

/// Without a detected intent the response carries an empty name and zero
/// confidence, whatever score the service reported.
pub fn assemble_response(detection: DetectionResult) -> NluResponse {
    let (intent, confidence) = match detection.intent_name {
        Some(name) => (name, detection.confidence as f32),
        None => (String::new(), 0.0),
    };

    let mut entities = HashMap::with_capacity(detection.parameters.len());
    for (name, value) in &detection.parameters {
        let flattened = flatten_value(value);
        trace!(parameter = %name, raw = %value, flattened = %flattened, "extracted parameter");
        entities.insert(name.clone(), flattened);
    }

    NluResponse { intent, confidence, entities }
}
