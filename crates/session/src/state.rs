//! Session state and its transition functions.
//!
//! Everything here is synchronous and side-effect free. The engine calls
//! these transitions under its state lock and performs the returned work
//! (privilege fetch, token propagation) afterwards.

use serde::Serialize;

use assist_auth::{Access, Role, User};
use assist_core::SessionEpoch;

/// Where the session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No user.
    LoggedOut,
    /// User set, privileges being resolved.
    Fetching,
    /// User set, privileges resolved.
    Ready,
    /// User set, privilege resolution failed; no permissions.
    Degraded,
    /// Token rejected; a forced logout is scheduled.
    PendingLogout,
}

/// Consistent, read-only view of the session for consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub access: Access,
    pub role: Option<Role>,
    pub loading: bool,
    pub phase: SessionPhase,
    pub epoch: SessionEpoch,
}

impl SessionSnapshot {
    /// UI label of the role; empty until privileges are resolved.
    pub fn role_label(&self) -> &'static str {
        self.role.map(|r| r.label()).unwrap_or("")
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Work the engine must do after a transition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Transition {
    /// Propagate the token and resolve privileges for `user` at `epoch`.
    Resolve { user: User, epoch: SessionEpoch },
    /// The user went away: clear the token, cancel pending work.
    Reset,
    Unchanged,
}

#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) user: Option<User>,
    pub(crate) access: Access,
    pub(crate) role: Option<Role>,
    pub(crate) privileges_fetched: bool,
    pub(crate) phase: SessionPhase,
    pub(crate) epoch: SessionEpoch,
    login_ticket: u64,
    // The current login ticket's authentication is outstanding.
    login_active: bool,
    // Epoch of the privilege fetch in flight, if any.
    fetching: Option<SessionEpoch>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            access: Access::default(),
            role: None,
            privileges_fetched: false,
            phase: SessionPhase::LoggedOut,
            epoch: SessionEpoch::INITIAL,
            login_ticket: 0,
            login_active: false,
            fetching: None,
        }
    }
}

impl SessionState {
    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.user.clone(),
            access: self.access.clone(),
            role: self.role,
            loading: self.loading(),
            phase: self.phase,
            epoch: self.epoch,
        }
    }

    /// Only work that can still change the session counts: the current
    /// login and a privilege fetch for the current epoch.
    pub(crate) fn loading(&self) -> bool {
        self.login_active || self.fetching == Some(self.epoch)
    }

    /// Start a login attempt; later attempts (and logouts) supersede it.
    pub(crate) fn begin_login(&mut self) -> u64 {
        self.login_ticket += 1;
        self.login_active = true;
        self.login_ticket
    }

    pub(crate) fn end_login(&mut self, ticket: u64) {
        if self.is_current_login(ticket) {
            self.login_active = false;
        }
    }

    pub(crate) fn begin_fetch(&mut self, epoch: SessionEpoch) {
        self.fetching = Some(epoch);
    }

    pub(crate) fn end_fetch(&mut self, epoch: SessionEpoch) {
        if self.fetching == Some(epoch) {
            self.fetching = None;
        }
    }

    pub(crate) fn is_current_login(&self, ticket: u64) -> bool {
        self.login_ticket == ticket
    }

    pub(crate) fn is_current(&self, epoch: SessionEpoch) -> bool {
        self.epoch == epoch && self.user.is_some()
    }

    fn reset_privileges(&mut self) {
        self.access = Access::default();
        self.role = None;
        self.privileges_fetched = false;
    }

    fn start_fetch(&mut self) -> Transition {
        self.phase = SessionPhase::Fetching;
        match &self.user {
            Some(user) => Transition::Resolve {
                user: user.clone(),
                epoch: self.epoch,
            },
            None => Transition::Unchanged,
        }
    }

    /// A user observed from outside (boot, store sync). Only an actual change
    /// starts a new user lifetime.
    pub(crate) fn adopt_user(&mut self, user: Option<User>) -> Transition {
        match user {
            None if self.user.is_none() => Transition::Unchanged,
            None => self.clear(),
            Some(user) if self.user.as_ref() == Some(&user) => Transition::Unchanged,
            Some(user) => self.replace_user(user),
        }
    }

    /// Credential replacement: always a new user lifetime.
    pub(crate) fn replace_user(&mut self, user: User) -> Transition {
        self.epoch = self.epoch.next();
        self.user = Some(user);
        self.reset_privileges();
        self.start_fetch()
    }

    /// Drop the user. Always lands in `LoggedOut` and supersedes every
    /// in-flight login and privilege fetch.
    pub(crate) fn clear(&mut self) -> Transition {
        self.epoch = self.epoch.next();
        self.login_ticket += 1;
        self.login_active = false;
        self.fetching = None;
        self.user = None;
        self.reset_privileges();
        self.phase = SessionPhase::LoggedOut;
        Transition::Reset
    }

    /// Explicit re-fetch for the current user.
    pub(crate) fn refresh(&mut self) -> Transition {
        match self.phase {
            SessionPhase::Ready | SessionPhase::Degraded => self.start_fetch(),
            SessionPhase::LoggedOut | SessionPhase::Fetching | SessionPhase::PendingLogout => {
                Transition::Unchanged
            }
        }
    }

    /// Apply a privilege payload resolved at `epoch`. Returns `false` (and
    /// changes nothing) when the result is stale.
    pub(crate) fn apply_privileges(&mut self, epoch: SessionEpoch, access: Access) -> bool {
        if !self.is_current(epoch) || self.phase == SessionPhase::PendingLogout {
            return false;
        }
        self.role = Some(access.derived_role());
        self.access = access;
        self.privileges_fetched = true;
        self.phase = SessionPhase::Ready;
        true
    }

    /// Privilege resolution at `epoch` failed for a reason other than expiry.
    pub(crate) fn degrade(&mut self, epoch: SessionEpoch) -> bool {
        if !self.is_current(epoch) || self.phase == SessionPhase::PendingLogout {
            return false;
        }
        self.reset_privileges();
        self.phase = SessionPhase::Degraded;
        true
    }

    /// The token of `epoch` was rejected. Returns `false` when stale or when
    /// a logout is already pending.
    pub(crate) fn mark_expired(&mut self, epoch: SessionEpoch) -> bool {
        if !self.is_current(epoch) || self.phase == SessionPhase::PendingLogout {
            return false;
        }
        self.reset_privileges();
        self.phase = SessionPhase::PendingLogout;
        true
    }

    /// Forced logout for `epoch`, only if it is still the pending one.
    pub(crate) fn expire(&mut self, epoch: SessionEpoch) -> Option<Transition> {
        if self.is_current(epoch) && self.phase == SessionPhase::PendingLogout {
            Some(self.clear())
        } else {
            None
        }
    }
}
