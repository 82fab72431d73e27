//! REST transport for the remote NLU agent.
//!
//! [`DialogflowClient`] implements [`chatbot_core::IntentDetector`] over the
//! service's JSON mapping of the `detectIntent` RPC. It is constructed once
//! at startup from the `[nlu]` config section and the credentials file,
//! which holds either a service-account key or a ready bearer token.

pub mod client;
pub mod credentials;
pub mod token;
pub mod wire;

pub use client::{ClientBuildError, DialogflowClient};
pub use credentials::{CredentialSource, Credentials, CredentialsError, ServiceAccountKey};
pub use token::TokenSource;
