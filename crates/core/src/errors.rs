use std::time::Duration;

use thiserror::Error;

/// Failure of a single detect-intent call. Always local to one request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NluError {
    #[error("nlu transport failure: {0}")]
    Transport(String),
    #[error("nlu call exceeded deadline of {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("nlu service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("nlu response could not be decoded: {0}")]
    Decode(String),
    #[error("nlu request could not be built: {0}")]
    InvalidRequest(String),
    #[error("nlu access token could not be obtained: {0}")]
    Auth(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Nlu(#[from] NluError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("bad gateway: {message}")]
    BadGateway { message: String, correlation_id: String },
    #[error("gateway timeout: {message}")]
    GatewayTimeout { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::BadGateway { .. } => {
                "The language understanding service is unavailable. Please retry shortly."
            }
            Self::GatewayTimeout { .. } => {
                "The language understanding service did not respond in time."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::BadGateway { correlation_id, .. }
            | Self::GatewayTimeout { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::BadGateway { correlation_id: id, .. }
            | InterfaceError::GatewayTimeout { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::InvalidInput(message) => Self::BadRequest { message, correlation_id },
            ApplicationError::Nlu(error @ NluError::Timeout(_)) => {
                Self::GatewayTimeout { message: error.to_string(), correlation_id }
            }
            ApplicationError::Nlu(error @ NluError::InvalidRequest(_)) => {
                Self::Internal { message: error.to_string(), correlation_id }
            }
            ApplicationError::Nlu(
                error @ (NluError::Transport(_)
                | NluError::Status { .. }
                | NluError::Decode(_)
                | NluError::Auth(_)),
            ) => Self::BadGateway { message: error.to_string(), correlation_id },
        }
    }
}
