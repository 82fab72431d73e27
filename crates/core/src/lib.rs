//! Core of the chatbot NLU bridge.
//!
//! Inbound text is sent to a remote natural-language-understanding agent
//! through an [`IntentDetector`]; the structured detection that comes back is
//! flattened into an [`NluResponse`] of intent, confidence and string
//! entities. This crate holds that flow plus configuration and the error
//! taxonomy. Transport lives in `chatbot-dialogflow`, HTTP in
//! `chatbot-server`.

pub mod config;
pub mod entities;
pub mod errors;
pub mod nlu;
pub mod processor;

pub use entities::flatten_value;
pub use errors::{ApplicationError, InterfaceError, NluError};
pub use nlu::{DetectionResult, NluResponse, Query, SessionId, SessionPath};
pub use processor::{IntentDetector, MessageProcessor, ProcessorSettings};
