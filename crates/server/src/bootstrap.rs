use std::sync::Arc;

use chatbot_core::config::{AppConfig, ConfigError};
use chatbot_core::{MessageProcessor, ProcessorSettings};
use chatbot_dialogflow::{ClientBuildError, DialogflowClient};
use thiserror::Error;
use tracing::info;

use crate::health::HealthState;

pub struct Application {
    pub config: AppConfig,
    pub processor: MessageProcessor,
    pub health: HealthState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("nlu client initialization failed: {0}")]
    NluClient(#[from] ClientBuildError),
}

/// Builds the remote client and the shared processor. Any failure here stops
/// startup; once this returns, no request can take the process down.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let client = DialogflowClient::from_config(&config.nlu)?;
    let settings = ProcessorSettings::from_config(&config.nlu, client.project_id());
    let health =
        HealthState::new(client.project_id(), client.endpoint(), &config.nlu.language_code);

    info!(
        event_name = "system.bootstrap.nlu_ready",
        correlation_id = "bootstrap",
        project_id = %settings.project_id,
        language_code = %settings.language_code,
        time_zone = %settings.time_zone,
        "nlu processor ready"
    );

    let processor = MessageProcessor::new(settings, Arc::new(client));
    Ok(Application { config, processor, health })
}
