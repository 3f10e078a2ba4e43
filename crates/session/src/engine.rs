//! The session engine: authentication/authorization state machine.
//!
//! Three event sources drive user changes: boot ([`SessionEngine::initialize`]),
//! a successful [`SessionEngine::login`], and an externally changed store
//! ([`SessionEngine::sync_from_store`]). All of them go through the same
//! transition functions in [`crate::state`]; async results are applied only
//! while their [`SessionEpoch`] is still current.
//!
//! Nothing here returns an error to the caller: failures end up as a
//! notification and/or a state transition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use assist_auth::{Access, Credentials, Role, ServiceOutcome, User};
use assist_core::SessionEpoch;
use assist_notify::Notifier;
use assist_store::{CellError, KeyValueStore, ScopedCell};

use crate::client::{AuthorizedClient, ClientFactory, SessionExpiryHook};
use crate::config::SessionConfig;
use crate::credentials::{CredentialService, ServiceError};
use crate::navigation::Navigator;
use crate::state::{SessionPhase, SessionSnapshot, SessionState, Transition};

/// User-facing notification texts.
pub mod messages {
    pub const LOGIN_SUCCESS: &str = "Login successful";
    pub const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
    pub const GENERIC_ERROR: &str = "Something went wrong. Please try again later.";
    pub const SESSION_EXPIRED: &str = "Session Expired. Please login again.";
    pub const PRIVILEGES_FAILED: &str = "Unable to load your permissions.";
}

/// Collaborators the engine coordinates.
pub struct SessionParts {
    pub service: Arc<dyn CredentialService>,
    pub store: Arc<dyn KeyValueStore>,
    pub notifier: Notifier,
    pub navigator: Arc<dyn Navigator>,
    pub clients: ClientFactory,
}

/// Cheap-to-clone handle to one session engine.
#[derive(Clone)]
pub struct SessionEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: SessionConfig,
    service: Arc<dyn CredentialService>,
    cell: ScopedCell<User>,
    notifier: Notifier,
    navigator: Arc<dyn Navigator>,
    clients: ClientFactory,
    state: Mutex<SessionState>,
    snapshots: watch::Sender<SessionSnapshot>,
    pending_logout: Mutex<Option<JoinHandle<()>>>,
    initialized: AtomicBool,
}

impl SessionEngine {
    pub fn new(config: SessionConfig, parts: SessionParts) -> Self {
        let state = SessionState::default();
        let (snapshots, _) = watch::channel(state.snapshot());
        let cell = ScopedCell::json(parts.store, config.storage_key.clone(), config.cookie.clone());

        let inner = Arc::new(EngineInner {
            config,
            service: parts.service,
            cell,
            notifier: parts.notifier,
            navigator: parts.navigator,
            clients: parts.clients,
            state: Mutex::new(state),
            snapshots,
            pending_logout: Mutex::new(None),
            initialized: AtomicBool::new(false),
        });

        let weak: Weak<EngineInner> = Arc::downgrade(&inner);
        let hook: Weak<dyn SessionExpiryHook> = weak;
        inner.clients.set_expiry_hook(hook);

        Self { inner }
    }

    /// Restore the persisted user, if any, and resolve its privileges.
    ///
    /// Runs once per engine; later calls are no-ops.
    pub async fn initialize(&self) {
        let inner = &self.inner;
        if inner.initialized.swap(true, Ordering::SeqCst) {
            tracing::debug!("session engine already initialized");
            return;
        }

        match inner.load_persisted_user() {
            Some(user) => {
                tracing::info!(user = %user.display_name(), "restoring persisted session");
                let transition = inner.update(|s| s.adopt_user(Some(user)));
                inner.run(transition).await;
            }
            None => tracing::info!("no persisted session"),
        }
    }

    /// Authenticate and, on success, resolve privileges before returning.
    ///
    /// Never fails: the outcome is visible through the session state and the
    /// notification channel. When logins overlap, the latest one wins.
    pub async fn login(&self, credentials: Credentials) {
        let inner = &self.inner;
        let ticket = inner.update(|s| s.begin_login());
        tracing::info!(email = ?credentials.email(), "login attempt");

        let outcome = inner.service.authenticate(&credentials).await;
        inner.finish_login(ticket, outcome).await;

        inner.update(|s| s.end_login(ticket));
    }

    /// Drop the session: clear the persisted user, privileges and token, then
    /// navigate to the entry point. Idempotent.
    pub fn logout(&self) {
        self.inner.update(|s| s.clear());
        self.inner.apply_logout();
        tracing::info!("logged out");
    }

    /// Re-fetch privileges for the current user (e.g. out of `Degraded`).
    pub async fn refresh_privileges(&self) {
        let transition = self.inner.update(|s| s.refresh());
        if transition == Transition::Unchanged {
            tracing::debug!("privilege refresh skipped");
        }
        self.inner.run(transition).await;
    }

    /// Pick up a user written or removed by someone else (another window or
    /// process sharing the store). Best-effort.
    pub async fn sync_from_store(&self) {
        let inner = &self.inner;
        let stored = inner.load_persisted_user();
        let transition = inner.update(|s| s.adopt_user(stored));
        match transition {
            Transition::Reset => {
                tracing::info!("persisted session removed externally");
                inner.apply_logout();
            }
            other => inner.run(other).await,
        }
    }

    /// Report a 401 seen on a call made with the token of `epoch`.
    pub fn handle_unauthorized(&self, epoch: SessionEpoch) {
        self.inner.expire_session(epoch);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.snapshots.borrow().user.clone()
    }

    pub fn access(&self) -> Access {
        self.inner.snapshots.borrow().access.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.inner.snapshots.borrow().role
    }

    pub fn loading(&self) -> bool {
        self.inner.snapshots.borrow().loading
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.snapshots.borrow().phase
    }

    /// HTTP client carrying the current token.
    pub fn client(&self) -> AuthorizedClient {
        self.inner.clients.client()
    }

    pub fn clients(&self) -> &ClientFactory {
        &self.inner.clients
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }
}

impl core::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("phase", &self.phase())
            .field("clients", &self.inner.clients)
            .finish_non_exhaustive()
    }
}

impl EngineInner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        // State transitions never panic midway; a poisoned lock still holds
        // a consistent state.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mutate the state and publish the resulting snapshot.
    fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.lock_state();
        let result = f(&mut state);
        self.snapshots.send_replace(state.snapshot());
        result
    }

    fn load_persisted_user(&self) -> Option<User> {
        match self.cell.load() {
            Ok(user) => user,
            Err(CellError::Codec(err)) => {
                tracing::warn!(%err, key = self.cell.key(), "discarding unreadable persisted user");
                if let Err(err) = self.cell.clear() {
                    tracing::warn!(%err, "failed to remove unreadable persisted user");
                }
                None
            }
            Err(err) => {
                tracing::warn!(%err, "failed to read persisted user");
                None
            }
        }
    }

    /// Carry out the work a transition asks for.
    async fn run(self: &Arc<Self>, transition: Transition) {
        match transition {
            Transition::Resolve { user, epoch } => {
                self.clients.set_token(&user.token, epoch);
                self.resolve_privileges(user, epoch).await;
            }
            Transition::Reset => {
                self.clients.clear_token();
                self.cancel_pending_logout();
            }
            Transition::Unchanged => {}
        }
    }

    async fn finish_login(
        self: &Arc<Self>,
        ticket: u64,
        outcome: Result<ServiceOutcome<User>, ServiceError>,
    ) {
        match outcome {
            Ok(ServiceOutcome::Success(user)) => {
                let transition = self.update(|s| {
                    s.is_current_login(ticket).then(|| s.replace_user(user.clone()))
                });
                let Some(transition) = transition else {
                    tracing::debug!("discarding superseded login result");
                    return;
                };

                if let Err(err) = self.cell.save(&user) {
                    tracing::warn!(%err, "failed to persist user; session will not survive a restart");
                }
                self.cancel_pending_logout();
                self.run(transition).await;

                // Skip the success toast when the session died during resolution
                // (it already produced its own notification) or was superseded.
                let report = {
                    let state = self.lock_state();
                    state.is_current_login(ticket) && state.phase != SessionPhase::PendingLogout
                };
                if report {
                    tracing::info!(user = %user.display_name(), "login succeeded");
                    self.notifier.success(messages::LOGIN_SUCCESS);
                }
            }
            Ok(ServiceOutcome::Failure { message }) => {
                if !self.lock_state().is_current_login(ticket) {
                    return;
                }
                tracing::info!(?message, "login rejected");
                self.notifier
                    .error(message.unwrap_or_else(|| messages::LOGIN_FAILED.to_string()));
            }
            Err(err) => {
                if !self.lock_state().is_current_login(ticket) {
                    return;
                }
                tracing::warn!(%err, "login failed");
                self.notifier.error(messages::GENERIC_ERROR);
            }
        }
    }

    async fn resolve_privileges(self: &Arc<Self>, user: User, epoch: SessionEpoch) {
        self.update(|s| s.begin_fetch(epoch));
        let outcome = self.fetch_with_retry(&user, epoch).await;

        match outcome {
            Ok(ServiceOutcome::Success(payload)) => {
                let applied = self.update(|s| {
                    s.end_fetch(epoch);
                    s.apply_privileges(epoch, payload.unwrap_or_default())
                });
                if applied {
                    tracing::info!(role = ?self.lock_state().role, %epoch, "privileges resolved");
                } else {
                    tracing::debug!(%epoch, "discarding stale privileges");
                }
            }
            Ok(ServiceOutcome::Failure { message }) => {
                let applied = self.update(|s| {
                    s.end_fetch(epoch);
                    s.degrade(epoch)
                });
                if applied {
                    tracing::warn!(?message, %epoch, "privilege lookup rejected");
                    self.notifier
                        .error(message.unwrap_or_else(|| messages::PRIVILEGES_FAILED.to_string()));
                }
            }
            Err(err) if err.is_unauthorized() => {
                self.update(|s| s.end_fetch(epoch));
                self.expire_session(epoch);
            }
            Err(err) => {
                let applied = self.update(|s| {
                    s.end_fetch(epoch);
                    s.degrade(epoch)
                });
                if applied {
                    tracing::warn!(%err, %epoch, "privilege lookup failed");
                    self.notifier.error(messages::GENERIC_ERROR);
                }
            }
        }
    }

    async fn fetch_with_retry(
        &self,
        user: &User,
        epoch: SessionEpoch,
    ) -> Result<ServiceOutcome<Option<Access>>, ServiceError> {
        let policy = &self.config.privilege_retry;
        let mut attempt = 1;
        loop {
            let outcome = self.service.fetch_privileges(user).await;
            let retryable = match &outcome {
                Ok(ServiceOutcome::Success(_)) => false,
                Err(err) if err.is_unauthorized() => false,
                _ => true,
            };
            if !retryable || attempt >= policy.max_attempts || !self.lock_state().is_current(epoch) {
                return outcome;
            }

            tracing::warn!(attempt, max = policy.max_attempts, "privilege lookup failed, retrying");
            tokio::time::sleep(policy.backoff).await;
            attempt += 1;
        }
    }

    /// Token of `epoch` rejected: notify now, log out after the delay.
    fn expire_session(self: &Arc<Self>, epoch: SessionEpoch) {
        if !self.update(|s| s.mark_expired(epoch)) {
            tracing::debug!(%epoch, "ignoring expiry for a stale or already expiring session");
            return;
        }
        tracing::info!(%epoch, "session expired");
        self.notifier.error(messages::SESSION_EXPIRED);
        self.schedule_logout(epoch);
    }

    fn schedule_logout(self: &Arc<Self>, epoch: SessionEpoch) {
        let delay = self.config.expiry_logout_delay;
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("no async runtime for the deferred logout; logging out now");
                self.forced_logout(epoch);
                return;
            }
        };

        let weak = Arc::downgrade(self);
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.forced_logout(epoch);
            }
        });

        let mut slot = self.pending_logout.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn forced_logout(&self, epoch: SessionEpoch) {
        match self.update(|s| s.expire(epoch)) {
            Some(_) => {
                tracing::info!(%epoch, "forced logout after session expiry");
                // The timer task is the caller; just forget its handle.
                self.pending_logout
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .take();
                self.logout_effects();
            }
            None => tracing::debug!(%epoch, "deferred logout superseded"),
        }
    }

    fn apply_logout(&self) {
        self.cancel_pending_logout();
        self.logout_effects();
    }

    fn logout_effects(&self) {
        if let Err(err) = self.cell.clear() {
            tracing::warn!(%err, "failed to remove persisted user");
        }
        self.clients.clear_token();
        self.navigator.navigate(&self.config.entry_path);
    }

    fn cancel_pending_logout(&self) {
        let pending = self
            .pending_logout
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(handle) = pending {
            handle.abort();
            tracing::debug!("cancelled pending forced logout");
        }
    }
}

impl SessionExpiryHook for EngineInner {
    fn session_expired(self: Arc<Self>, epoch: SessionEpoch) {
        self.expire_session(epoch);
    }
}
