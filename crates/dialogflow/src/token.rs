//! Bearer tokens for the detect-intent call.
//!
//! A static `access_token` is sent as-is. A service-account key is exchanged
//! at its `token_uri` using the OAuth 2.0 JWT-bearer grant (RFC 7523); the
//! resulting token is cached and replaced shortly before it expires.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chatbot_core::NluError;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::credentials::{CredentialSource, ServiceAccountKey};

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub enum TokenSource {
    Static(SecretString),
    ServiceAccount(Arc<ServiceAccountTokens>),
}

pub struct ServiceAccountTokens {
    client_email: String,
    token_uri: String,
    key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    token: SecretString,
    refresh_at: Instant,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

impl TokenSource {
    /// Fails when a service-account private key is not a valid RSA PEM.
    pub fn from_credentials(source: CredentialSource) -> Result<Self, jsonwebtoken::errors::Error> {
        match source {
            CredentialSource::AccessToken(token) => Ok(Self::Static(token)),
            CredentialSource::ServiceAccount(key) => {
                Ok(Self::ServiceAccount(Arc::new(ServiceAccountTokens::new(key)?)))
            }
        }
    }

    pub async fn bearer(&self, http: &Client) -> Result<SecretString, NluError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ServiceAccount(tokens) => tokens.bearer(http).await,
        }
    }
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Static([REDACTED])"),
            Self::ServiceAccount(tokens) => f
                .debug_struct("ServiceAccount")
                .field("client_email", &tokens.client_email)
                .field("token_uri", &tokens.token_uri)
                .finish_non_exhaustive(),
        }
    }
}

impl ServiceAccountTokens {
    fn new(key: ServiceAccountKey) -> Result<Self, jsonwebtoken::errors::Error> {
        let encoding = EncodingKey::from_rsa_pem(key.private_key.expose_secret().as_bytes())?;
        Ok(Self {
            client_email: key.client_email,
            token_uri: key.token_uri,
            key: encoding,
            cached: Mutex::new(None),
        })
    }

    /// Concurrent callers wait on the lock so only one exchange is in flight.
    async fn bearer(&self, http: &Client) -> Result<SecretString, NluError> {
        let mut cached = self.cached.lock().await;
        if let Some(current) = cached.as_ref() {
            if Instant::now() < current.refresh_at {
                return Ok(current.token.clone());
            }
        }

        let fresh = self.exchange(http).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    fn assertion(&self) -> Result<String, NluError> {
        let issued_at = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|error| NluError::Auth(format!("assertion could not be signed: {error}")))
    }

    async fn exchange(&self, http: &Client) -> Result<CachedToken, NluError> {
        let assertion = self.assertion()?;
        let response = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|error| NluError::Auth(format!("token endpoint unreachable: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.text().await {
                Ok(body) => body,
                Err(error) => error.to_string(),
            };
            return Err(NluError::Auth(format!("token endpoint returned {status}: {detail}")));
        }

        let payload: TokenResponse = response.json().await.map_err(|error| {
            NluError::Auth(format!("token response could not be decoded: {error}"))
        })?;

        info!(
            event_name = "nlu.token.refreshed",
            correlation_id = "token",
            client_email = %self.client_email,
            expires_in_secs = payload.expires_in,
            "access token refreshed"
        );

        let lifetime = Duration::from_secs(payload.expires_in);
        Ok(CachedToken {
            token: payload.access_token.into(),
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        })
    }
}
