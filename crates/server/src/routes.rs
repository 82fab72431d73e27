//! Inbound message endpoint.
//!
//! - `POST /` with `{"Message": "..."}` returns
//!   `{"intent": "...", "confidence": 0.0, "entities": {...}}`
//! - any other method or path answers `200` with an empty body
//!
//! The caller may name its user with the `x-chatbot-user-id` header; the
//! configured default user is used only when the header is absent.
//!
//! The `Message` key is matched like a case-insensitive struct field: an
//! exact `Message` wins, otherwise the first key equal to it ignoring ASCII
//! case is used.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chatbot_core::{ApplicationError, InterfaceError, MessageProcessor, NluResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, warn, Instrument};
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-chatbot-user-id";

#[derive(Clone)]
pub struct DetectState {
    processor: MessageProcessor,
    default_user_id: Arc<str>,
}

const MESSAGE_FIELD: &str = "Message";

#[derive(Debug)]
pub struct InboundMessage {
    pub message: String,
}

impl InboundMessage {
    /// A missing or `null` field decodes as an empty message, which the
    /// processor rejects.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let fields: Map<String, Value> = serde_json::from_slice(body)?;
        let field = fields.get(MESSAGE_FIELD).or_else(|| {
            fields
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(MESSAGE_FIELD))
                .map(|(_, value)| value)
        });

        let message = match field {
            None | Some(Value::Null) => String::new(),
            Some(value) => String::deserialize(value)?,
        };
        Ok(Self { message })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub correlation_id: String,
}

pub struct ApiError(pub InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            InterfaceError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.user_message(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(processor: MessageProcessor, default_user_id: impl Into<Arc<str>>) -> Router {
    let state = DetectState { processor, default_user_id: default_user_id.into() };

    Router::new()
        .route("/", post(detect_intent).fallback(ignore))
        .fallback(ignore)
        .with_state(state)
}

pub async fn detect_intent(
    State(state): State<DetectState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<NluResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();

    let inbound = InboundMessage::from_slice(&body).map_err(|error| {
        warn!(
            event_name = "http.inbound.malformed_body",
            correlation_id = %correlation_id,
            error = %error,
            "inbound body is not a valid message"
        );
        ApiError(
            ApplicationError::InvalidInput(format!("malformed request body: {error}"))
                .into_interface(correlation_id.as_str()),
        )
    })?;

    let user_id = match headers.get(USER_ID_HEADER) {
        None => state.default_user_id.to_string(),
        Some(value) => value.to_str().map(str::to_string).map_err(|_| {
            warn!(
                event_name = "http.inbound.unreadable_user_id",
                correlation_id = %correlation_id,
                "user id header is not visible ASCII"
            );
            ApiError(
                ApplicationError::InvalidInput(format!(
                    "`{USER_ID_HEADER}` header must be visible ASCII"
                ))
                .into_interface(correlation_id.as_str()),
            )
        })?,
    };

    let span = tracing::info_span!("inbound_message", correlation_id = %correlation_id);
    let result =
        state.processor.process_message(&inbound.message, &user_id).instrument(span).await;

    match result {
        Ok(response) => Ok(Json(response)),
        Err(application_error) => {
            let interface = application_error.into_interface(correlation_id.as_str());
            match &interface {
                InterfaceError::BadRequest { message, .. } => warn!(
                    event_name = "http.inbound.rejected",
                    correlation_id = %correlation_id,
                    reason = %message,
                    "inbound message rejected"
                ),
                other => error!(
                    event_name = "http.inbound.failed",
                    correlation_id = %correlation_id,
                    error = %other,
                    "inbound message could not be processed"
                ),
            }
            Err(ApiError(interface))
        }
    }
}

async fn ignore() -> StatusCode {
    StatusCode::OK
}
