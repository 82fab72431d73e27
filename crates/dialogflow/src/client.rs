use std::time::Duration;

use async_trait::async_trait;
use chatbot_core::config::NluConfig;
use chatbot_core::{DetectionResult, IntentDetector, NluError, Query, SessionPath};
use reqwest::Client;
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{debug, info};

use crate::credentials::{Credentials, CredentialsError};
use crate::token::TokenSource;
use crate::wire::{DetectIntentRequest, DetectIntentResponse, ErrorEnvelope};

#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error("nlu.project_id is not configured and the credentials file has no `project_id`")]
    MissingProjectId,
    #[error("service-account private key is not a valid RSA PEM: {0}")]
    SigningKey(#[source] jsonwebtoken::errors::Error),
    #[error("http client could not be built: {0}")]
    Http(#[source] reqwest::Error),
}

#[derive(Clone, Debug)]
pub struct DialogflowClient {
    http: Client,
    endpoint: String,
    project_id: String,
    tokens: TokenSource,
    timeout: Duration,
}

impl DialogflowClient {
    /// Loads credentials and builds the HTTP client. A configured
    /// `project_id` wins over the one in the credentials file.
    pub fn from_config(config: &NluConfig) -> Result<Self, ClientBuildError> {
        let credentials = Credentials::load(&config.credentials_path)?;
        let configured = config.project_id.trim();
        let project_id = if configured.is_empty() {
            credentials.project_id.clone().ok_or(ClientBuildError::MissingProjectId)?
        } else {
            configured.to_string()
        };

        let tokens = TokenSource::from_credentials(credentials.source)
            .map_err(ClientBuildError::SigningKey)?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(ClientBuildError::Http)?;

        info!(
            event_name = "nlu.client.initialized",
            correlation_id = "bootstrap",
            project_id = %project_id,
            endpoint = %config.endpoint,
            "nlu client initialized"
        );

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id,
            tokens,
            timeout: config.timeout(),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn detect_intent_url(&self, session: &SessionPath) -> String {
        format!("{}/v2/{}:detectIntent", self.endpoint, session)
    }

    fn transport_error(&self, error: reqwest::Error) -> NluError {
        if error.is_timeout() {
            NluError::Timeout(self.timeout)
        } else if error.is_builder() {
            NluError::InvalidRequest(error.to_string())
        } else {
            NluError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl IntentDetector for DialogflowClient {
    async fn detect_intent(
        &self,
        session: &SessionPath,
        query: &Query,
    ) -> Result<DetectionResult, NluError> {
        let url = self.detect_intent_url(session);
        let body = DetectIntentRequest::from(query);
        let token = self.tokens.bearer(&self.http).await?;

        debug!(
            event_name = "nlu.detect_intent.request",
            session = %session,
            "calling detectIntent"
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| self.transport_error(error))?;

        let status = response.status();
        if !status.is_success() {
            let raw = match response.text().await {
                Ok(raw) => raw,
                Err(error) => error.to_string(),
            };
            let message = serde_json::from_str::<ErrorEnvelope>(&raw)
                .ok()
                .map(|envelope| envelope.error.message)
                .filter(|message| !message.is_empty())
                .unwrap_or(raw);
            return Err(NluError::Status { status: status.as_u16(), message });
        }

        let payload: DetectIntentResponse = response.json().await.map_err(|error| {
            if error.is_timeout() {
                NluError::Timeout(self.timeout)
            } else {
                NluError::Decode(error.to_string())
            }
        })?;

        Ok(payload.into_detection())
    }
}
