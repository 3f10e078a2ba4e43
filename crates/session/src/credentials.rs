//! Credential service boundary: authentication and privilege lookup.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use assist_auth::{Access, Credentials, ServiceOutcome, ServiceResponse, User};

use crate::config::SessionConfig;

/// Exceptional failures of a credential service call.
///
/// Server-reported rejections are not errors; they come back as
/// [`ServiceOutcome::Failure`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The token is no longer accepted (HTTP 401).
    #[error("unauthorized: session token expired or revoked")]
    Unauthorized,

    #[error("credential service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    Decode(String),
}

impl ServiceError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ServiceError::Unauthorized)
    }

    /// HTTP-status-like code, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::Unauthorized => Some(401),
            ServiceError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(StatusCode::UNAUTHORIZED) {
            return ServiceError::Unauthorized;
        }
        if err.is_decode() {
            return ServiceError::Decode(err.to_string());
        }
        ServiceError::Network(err.to_string())
    }
}

/// The two network operations the session engine depends on.
#[async_trait]
pub trait CredentialService: Send + Sync {
    /// Exchange credentials for a user record (with its bearer token).
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<ServiceOutcome<User>, ServiceError>;

    /// Resolve the privileges of `user`. `Success(None)` means the service
    /// answered without a payload.
    async fn fetch_privileges(
        &self,
        user: &User,
    ) -> Result<ServiceOutcome<Option<Access>>, ServiceError>;
}

/// Credential service over the portal's JSON API.
#[derive(Debug, Clone)]
pub struct HttpCredentialService {
    http: reqwest::Client,
    login_url: String,
    privileges_url: String,
}

impl HttpCredentialService {
    pub fn new(http: reqwest::Client, config: &SessionConfig) -> Self {
        let base = config.api_url.trim_end_matches('/');
        Self {
            http,
            login_url: format!("{base}{}", config.login_path),
            privileges_url: format!("{base}{}", config.privileges_path),
        }
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn privileges_url(&self) -> &str {
        &self.privileges_url
    }
}

#[async_trait]
impl CredentialService for HttpCredentialService {
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<ServiceOutcome<User>, ServiceError> {
        let resp = self.http.post(&self.login_url).json(credentials).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        // Rejected logins usually still carry the envelope with a message.
        let envelope = match decode_envelope::<User>(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ServiceError::Http {
                    status: status.as_u16(),
                    body,
                });
            }
            Err(err) => return Err(err),
        };

        Ok(match envelope.into_outcome() {
            ServiceOutcome::Success(Some(user)) => ServiceOutcome::Success(user),
            ServiceOutcome::Success(None) => {
                tracing::warn!("login succeeded without a user payload");
                ServiceOutcome::Failure { message: None }
            }
            ServiceOutcome::Failure { message } => ServiceOutcome::Failure { message },
        })
    }

    async fn fetch_privileges(
        &self,
        user: &User,
    ) -> Result<ServiceOutcome<Option<Access>>, ServiceError> {
        let resp = self
            .http
            .get(&self.privileges_url)
            .bearer_auth(&user.token)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ServiceError::Unauthorized);
        }
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(decode_envelope::<Access>(&body)?.into_outcome())
    }
}

fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<ServiceResponse<T>, ServiceError> {
    serde_json::from_str(body).map_err(|e| ServiceError::Decode(e.to_string()))
}
