//! Authorized HTTP clients handed out to the rest of the application.
//!
//! The current bearer token lives in one [`ClientFactory`]; only the session
//! engine writes it. Everything else asks the factory for an
//! [`AuthorizedClient`], which carries the token (and the session epoch it
//! belongs to) for the requests it builds.

use std::sync::{Arc, RwLock, Weak};

use reqwest::{Method, RequestBuilder, Response, StatusCode};

use assist_core::SessionEpoch;

use crate::config::SessionConfig;

/// Receives 401 signals observed by authorized clients.
pub trait SessionExpiryHook: Send + Sync {
    fn session_expired(self: Arc<Self>, epoch: SessionEpoch);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bearer {
    token: String,
    epoch: SessionEpoch,
}

#[derive(Clone)]
pub struct ClientFactory {
    http: reqwest::Client,
    base_url: Arc<str>,
    bearer: Arc<RwLock<Option<Bearer>>>,
    hook: Arc<RwLock<Option<Weak<dyn SessionExpiryHook>>>>,
}

impl ClientFactory {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            bearer: Arc::new(RwLock::new(None)),
            hook: Arc::new(RwLock::new(None)),
        }
    }

    /// Build the underlying reqwest client from the configured timeout.
    pub fn from_config(config: &SessionConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::new(http, config.api_url.clone()))
    }

    /// Shared reqwest client (no authorization attached).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.bearer.read().map(|b| b.is_some()).unwrap_or(false)
    }

    /// Snapshot of the current authorization state.
    pub fn client(&self) -> AuthorizedClient {
        let bearer = self.bearer.read().ok().and_then(|b| b.clone());
        let hook = self.hook.read().ok().and_then(|h| h.clone());
        AuthorizedClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            bearer,
            hook,
        }
    }

    pub(crate) fn set_token(&self, token: &str, epoch: SessionEpoch) {
        if let Ok(mut bearer) = self.bearer.write() {
            *bearer = Some(Bearer {
                token: token.to_string(),
                epoch,
            });
        }
    }

    pub(crate) fn clear_token(&self) {
        if let Ok(mut bearer) = self.bearer.write() {
            *bearer = None;
        }
    }

    pub(crate) fn set_expiry_hook(&self, hook: Weak<dyn SessionExpiryHook>) {
        if let Ok(mut slot) = self.hook.write() {
            *slot = Some(hook);
        }
    }
}

impl core::fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("base_url", &self.base_url)
            .field("has_token", &self.has_token())
            .finish_non_exhaustive()
    }
}

/// HTTP client bound to one session's token.
#[derive(Clone)]
pub struct AuthorizedClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    bearer: Option<Bearer>,
    hook: Option<Weak<dyn SessionExpiryHook>>,
}

impl AuthorizedClient {
    pub fn token(&self) -> Option<&str> {
        self.bearer.as_ref().map(|b| b.token.as_str())
    }

    pub fn epoch(&self) -> Option<SessionEpoch> {
        self.bearer.as_ref().map(|b| b.epoch)
    }

    /// Request against `path` (relative to the base URL) with the bearer set.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let req = self.http.request(method, url);
        match &self.bearer {
            Some(bearer) => req.bearer_auth(&bearer.token),
            None => req,
        }
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    /// Send a request built by this client and report a 401 to the session.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, reqwest::Error> {
        let resp = request.send().await?;
        self.observe_status(resp.status());
        Ok(resp)
    }

    /// Feed a response status observed elsewhere into expiry detection.
    pub fn observe_status(&self, status: StatusCode) {
        if status != StatusCode::UNAUTHORIZED {
            return;
        }
        let Some(bearer) = &self.bearer else {
            return;
        };
        match self.hook.as_ref().and_then(Weak::upgrade) {
            Some(hook) => hook.session_expired(bearer.epoch),
            None => tracing::debug!("401 observed after the session engine was dropped"),
        }
    }
}

impl core::fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("base_url", &self.base_url)
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}
