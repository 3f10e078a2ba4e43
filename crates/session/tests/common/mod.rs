#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use assist_auth::{Access, Credentials, ServiceOutcome, User};
use assist_notify::{
    InMemoryNotificationChannel, Notification, NotificationChannel, Notifier, Subscription,
};
use assist_session::{
    ClientFactory, CredentialService, Navigator, ServiceError, SessionConfig, SessionEngine,
    SessionParts,
};
use assist_store::{InMemoryStore, KeyValueStore};

pub type AuthResult = Result<ServiceOutcome<User>, ServiceError>;
pub type PrivilegeResult = Result<ServiceOutcome<Option<Access>>, ServiceError>;

/// A scripted response: either immediate or released later by the test.
pub enum Step<T> {
    Ready(T),
    Gated(oneshot::Receiver<T>),
}

impl<T> Step<T> {
    async fn resolve(self) -> T {
        match self {
            Step::Ready(value) => value,
            Step::Gated(rx) => rx.await.expect("gate dropped without a response"),
        }
    }
}

/// Credential service stub scripted per call.
///
/// Login responses are consumed in order; privilege responses are keyed by
/// the user's token.
#[derive(Default)]
pub struct StubService {
    logins: Mutex<VecDeque<Step<AuthResult>>>,
    privileges: Mutex<HashMap<String, VecDeque<Step<PrivilegeResult>>>>,
    privilege_calls: Mutex<Vec<String>>,
    login_calls: Mutex<usize>,
}

impl StubService {
    pub fn on_login(&self, result: AuthResult) {
        self.logins.lock().unwrap().push_back(Step::Ready(result));
    }

    pub fn on_login_gated(&self) -> oneshot::Sender<AuthResult> {
        let (tx, rx) = oneshot::channel();
        self.logins.lock().unwrap().push_back(Step::Gated(rx));
        tx
    }

    pub fn on_privileges(&self, token: &str, result: PrivilegeResult) {
        self.privileges
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_default()
            .push_back(Step::Ready(result));
    }

    pub fn on_privileges_gated(&self, token: &str) -> oneshot::Sender<PrivilegeResult> {
        let (tx, rx) = oneshot::channel();
        self.privileges
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_default()
            .push_back(Step::Gated(rx));
        tx
    }

    pub fn privilege_calls(&self) -> Vec<String> {
        self.privilege_calls.lock().unwrap().clone()
    }

    pub fn login_calls(&self) -> usize {
        *self.login_calls.lock().unwrap()
    }
}

#[async_trait]
impl CredentialService for StubService {
    async fn authenticate(&self, _credentials: &Credentials) -> AuthResult {
        *self.login_calls.lock().unwrap() += 1;
        let step = self
            .logins
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected authenticate call");
        step.resolve().await
    }

    async fn fetch_privileges(&self, user: &User) -> PrivilegeResult {
        self.privilege_calls.lock().unwrap().push(user.token.clone());
        let step = self
            .privileges
            .lock()
            .unwrap()
            .get_mut(&user.token)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| panic!("unexpected privilege fetch for {}", user.token));
        step.resolve().await
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visits.lock().unwrap().push(path.to_string());
    }
}

pub struct Harness {
    pub engine: SessionEngine,
    pub service: Arc<StubService>,
    pub store: Arc<InMemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub toasts: Subscription,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryStore::new()))
    }

    pub fn with_store(config: SessionConfig, store: Arc<InMemoryStore>) -> Self {
        let service = Arc::new(StubService::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let channel = Arc::new(InMemoryNotificationChannel::new());
        let toasts = channel.subscribe();
        let clients = ClientFactory::new(reqwest::Client::new(), config.api_url.clone());

        let engine = SessionEngine::new(
            config,
            SessionParts {
                service: service.clone(),
                store: store.clone(),
                notifier: Notifier::new(channel),
                navigator: navigator.clone(),
                clients,
            },
        );

        Self {
            engine,
            service,
            store,
            navigator,
            toasts,
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.toasts.drain()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifications().into_iter().map(|n| n.message).collect()
    }

    pub fn persisted_user(&self) -> Option<User> {
        self.store
            .get(assist_session::DEFAULT_STORAGE_KEY)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    pub fn persist(&self, user: &User) {
        self.store
            .set(
                assist_session::DEFAULT_STORAGE_KEY,
                &serde_json::to_string(user).unwrap(),
                &Default::default(),
            )
            .unwrap();
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig {
        api_url: "http://portal.test".to_string(),
        expiry_logout_delay: EXPIRY_DELAY,
        ..SessionConfig::default()
    }
}

pub const EXPIRY_DELAY: Duration = Duration::from_millis(2000);

pub fn user(token: &str, name: &str) -> User {
    User::new(token, name).with_email(format!("{}@x.com", name.to_lowercase()))
}

pub fn access(web: &[&'static str], role: &[&str]) -> Access {
    Access::new(
        web.iter().map(|c| (*c).into()).collect(),
        vec![],
        role.iter().map(|r| r.to_string()).collect(),
    )
}

pub fn login_ok(user: User) -> AuthResult {
    Ok(ServiceOutcome::Success(user))
}

pub fn privileges_ok(access: Access) -> PrivilegeResult {
    Ok(ServiceOutcome::Success(Some(access)))
}

pub fn credentials() -> Credentials {
    Credentials::email_password("a@x.com", "p")
}

/// Let spawned tasks run until `cond` holds.
pub async fn until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
