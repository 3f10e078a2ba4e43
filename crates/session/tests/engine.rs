mod common;

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;

use assist_auth::{Role, ServiceOutcome, ServiceResponse, User};
use assist_notify::Severity;
use assist_session::{PrivilegeRetryPolicy, ServiceError, SessionConfig, SessionPhase, messages};
use assist_store::KeyValueStore;

use common::*;

#[tokio::test]
async fn login_resolves_role_and_capabilities() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", privileges_ok(access(&["x"], &["2"])));

    h.engine.login(credentials()).await;

    let snap = h.engine.snapshot();
    assert_eq!(snap.user.as_ref().map(|u| u.token.as_str()), Some("t1"));
    assert_eq!(snap.role, Some(Role::Admin));
    assert_eq!(snap.role_label(), "Admin");
    assert!(snap.access.can_web("x"));
    assert!(!snap.loading);
    assert_eq!(snap.phase, SessionPhase::Ready);

    let toasts = h.notifications();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].message, messages::LOGIN_SUCCESS);
    assert_eq!(toasts[0].severity, Severity::Success);

    assert_eq!(h.persisted_user().map(|u| u.token), Some("t1".to_string()));
    assert_eq!(h.engine.client().token(), Some("t1"));
}

#[tokio::test]
async fn oversized_cookie_lifetime_still_persists_login() {
    let mut config = test_config();
    config.cookie.expires_days = Some(1_000_000_000_000);
    let h = Harness::with_config(config);
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", privileges_ok(access(&["x"], &["2"])));

    h.engine.login(credentials()).await;

    assert_eq!(h.engine.phase(), SessionPhase::Ready);
    assert!(!h.engine.loading());
    assert_eq!(h.persisted_user().map(|u| u.token), Some("t1".to_string()));
    let entry = h.store.entry(assist_session::DEFAULT_STORAGE_KEY).unwrap();
    assert_eq!(entry.expires_at, None);
}

#[tokio::test]
async fn authorized_client_carries_token_only_while_logged_in() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", privileges_ok(access(&[], &[])));

    let request = h.engine.client().get("/reports").build().unwrap();
    assert!(request.headers().get(AUTHORIZATION).is_none());

    h.engine.login(credentials()).await;
    let request = h.engine.client().get("/reports").build().unwrap();
    assert_eq!(request.url().as_str(), "http://portal.test/reports");
    assert_eq!(request.headers().get(AUTHORIZATION).unwrap(), "Bearer t1");

    h.engine.logout();
    let request = h.engine.client().get("/reports").build().unwrap();
    assert!(request.headers().get(AUTHORIZATION).is_none());
    assert!(!h.engine.clients().has_token());
}

#[tokio::test(start_paused = true)]
async fn expired_token_notifies_then_logs_out_after_delay() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", Err(ServiceError::Unauthorized));

    h.engine.login(credentials()).await;

    // Notified immediately; the user survives until the delay elapses.
    assert_eq!(h.messages(), vec![messages::SESSION_EXPIRED.to_string()]);
    let snap = h.engine.snapshot();
    assert_eq!(snap.phase, SessionPhase::PendingLogout);
    assert!(snap.user.is_some());
    assert_eq!(snap.role, None);
    assert!(!snap.loading);

    tokio::time::sleep(EXPIRY_DELAY - Duration::from_millis(100)).await;
    assert!(h.engine.user().is_some());

    tokio::time::sleep(Duration::from_millis(200)).await;
    until(|| h.engine.user().is_none()).await;
    assert_eq!(h.engine.phase(), SessionPhase::LoggedOut);
    assert!(h.persisted_user().is_none());
    assert_eq!(h.navigator.visits(), vec!["/".to_string()]);
    assert!(h.engine.client().token().is_none());
    assert!(h.notifications().is_empty());
}

#[tokio::test]
async fn rejected_login_keeps_user_and_shows_server_message() {
    let h = Harness::new();
    let outcome = match ServiceResponse::<User>::error("Invalid password").into_outcome() {
        ServiceOutcome::Failure { message } => ServiceOutcome::Failure { message },
        ServiceOutcome::Success(_) => panic!("error envelope decoded as success"),
    };
    h.service.on_login(Ok(outcome));

    h.engine.login(credentials()).await;

    assert!(h.engine.user().is_none());
    assert!(!h.engine.loading());
    assert_eq!(h.messages(), vec!["Invalid password".to_string()]);
    assert!(h.persisted_user().is_none());
}

#[tokio::test]
async fn rejected_login_without_message_uses_fallback() {
    let h = Harness::new();
    h.service.on_login(Ok(ServiceOutcome::Failure { message: None }));

    h.engine.login(credentials()).await;

    assert_eq!(h.messages(), vec![messages::LOGIN_FAILED.to_string()]);
}

#[tokio::test]
async fn transport_failure_on_login_shows_generic_message() {
    let h = Harness::new();
    h.service
        .on_login(Err(ServiceError::Network("connection refused".to_string())));

    h.engine.login(credentials()).await;

    assert!(h.engine.user().is_none());
    assert!(!h.engine.loading());
    let toasts = h.notifications();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].message, messages::GENERIC_ERROR);
    assert_eq!(toasts[0].severity, Severity::Error);
}

#[tokio::test]
async fn rejected_login_does_not_disturb_existing_session() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", privileges_ok(access(&["x"], &["1"])));
    h.engine.login(credentials()).await;
    h.notifications();

    h.service.on_login(Ok(ServiceOutcome::failure("Invalid password")));
    h.engine.login(credentials()).await;

    assert_eq!(h.engine.user().map(|u| u.token), Some("t1".to_string()));
    assert_eq!(h.engine.role(), Some(Role::SuperAdmin));
    assert_eq!(h.engine.phase(), SessionPhase::Ready);
}

#[tokio::test]
async fn logout_is_idempotent() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", privileges_ok(access(&["x"], &["2"])));
    h.engine.login(credentials()).await;

    h.engine.logout();
    let first = h.engine.snapshot();
    h.engine.logout();
    let second = h.engine.snapshot();

    for snap in [&first, &second] {
        assert!(snap.user.is_none());
        assert!(snap.access.is_empty());
        assert_eq!(snap.role, None);
        assert_eq!(snap.phase, SessionPhase::LoggedOut);
    }
    assert!(h.persisted_user().is_none());
    assert_eq!(h.navigator.visits(), vec!["/".to_string(), "/".to_string()]);
}

#[tokio::test]
async fn stale_privileges_never_overwrite_newer_user() {
    let h = Harness::new();
    h.persist(&user("tA", "Ann"));
    let release_a = h.service.on_privileges_gated("tA");

    let engine = h.engine.clone();
    let boot = tokio::spawn(async move { engine.initialize().await });
    until(|| h.service.privilege_calls() == vec!["tA".to_string()]).await;
    assert!(h.engine.loading());

    h.service.on_login(login_ok(user("tB", "Bob")));
    h.service.on_privileges("tB", privileges_ok(access(&["b"], &["2"])));
    h.engine.login(credentials()).await;
    assert_eq!(h.engine.role(), Some(Role::Admin));
    // A's fetch is still outstanding but can no longer change anything.
    assert!(!h.engine.loading());

    release_a
        .send(privileges_ok(access(&["a"], &["1"])))
        .unwrap();
    boot.await.unwrap();

    let snap = h.engine.snapshot();
    assert_eq!(snap.user.map(|u| u.token), Some("tB".to_string()));
    assert_eq!(snap.role, Some(Role::Admin));
    assert!(snap.access.can_web("b"));
    assert!(!snap.access.can_web("a"));
    assert!(!snap.loading);
}

#[tokio::test]
async fn initialize_restores_persisted_user_once() {
    let h = Harness::new();
    h.persist(&user("t1", "Ann"));
    h.service.on_privileges("t1", privileges_ok(access(&[], &[])));

    h.engine.initialize().await;
    h.engine.initialize().await;

    assert_eq!(h.service.privilege_calls().len(), 1);
    assert_eq!(h.engine.role(), Some(Role::User));
    assert_eq!(h.engine.client().token(), Some("t1"));
    assert!(h.notifications().is_empty());
}

#[tokio::test]
async fn initialize_without_persisted_user_stays_logged_out() {
    let h = Harness::new();

    h.engine.initialize().await;

    assert_eq!(h.engine.phase(), SessionPhase::LoggedOut);
    assert!(h.service.privilege_calls().is_empty());
    assert!(h.navigator.visits().is_empty());
}

#[tokio::test]
async fn unreadable_persisted_user_is_discarded_at_boot() {
    let h = Harness::new();
    h.store
        .set(assist_session::DEFAULT_STORAGE_KEY, "{not json", &Default::default())
        .unwrap();

    h.engine.initialize().await;

    assert!(h.engine.user().is_none());
    assert!(
        h.store
            .get(assist_session::DEFAULT_STORAGE_KEY)
            .unwrap()
            .is_none()
    );
    assert!(h.service.privilege_calls().is_empty());
}

#[tokio::test]
async fn failed_privileges_degrade_until_refreshed() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", Ok(ServiceOutcome::failure("No profile")));

    h.engine.login(credentials()).await;

    let snap = h.engine.snapshot();
    assert_eq!(snap.phase, SessionPhase::Degraded);
    assert!(snap.user.is_some());
    assert!(snap.access.is_empty());
    assert_eq!(snap.role, None);
    assert_eq!(
        h.messages(),
        vec!["No profile".to_string(), messages::LOGIN_SUCCESS.to_string()]
    );

    h.service.on_privileges("t1", privileges_ok(access(&["x"], &["2"])));
    h.engine.refresh_privileges().await;

    assert_eq!(h.engine.phase(), SessionPhase::Ready);
    assert_eq!(h.engine.role(), Some(Role::Admin));
    assert!(h.notifications().is_empty());
}

#[tokio::test]
async fn privilege_transport_failure_uses_generic_message() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges(
        "t1",
        Err(ServiceError::Http {
            status: 500,
            body: "boom".to_string(),
        }),
    );

    h.engine.login(credentials()).await;

    assert_eq!(h.engine.phase(), SessionPhase::Degraded);
    assert_eq!(h.messages()[0], messages::GENERIC_ERROR);
}

#[tokio::test]
async fn missing_privilege_payload_means_plain_user() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", Ok(ServiceOutcome::Success(None)));

    h.engine.login(credentials()).await;

    assert_eq!(h.engine.phase(), SessionPhase::Ready);
    assert_eq!(h.engine.role(), Some(Role::User));
    assert!(h.engine.access().is_empty());
}

#[tokio::test]
async fn refresh_is_ignored_when_logged_out() {
    let h = Harness::new();

    h.engine.refresh_privileges().await;

    assert!(h.service.privilege_calls().is_empty());
    assert_eq!(h.engine.phase(), SessionPhase::LoggedOut);
}

#[tokio::test(start_paused = true)]
async fn retry_policy_recovers_from_transient_failures() {
    let config = SessionConfig {
        privilege_retry: PrivilegeRetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        },
        ..test_config()
    };
    let h = Harness::with_config(config);
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service
        .on_privileges("t1", Err(ServiceError::Network("reset".to_string())));
    h.service.on_privileges("t1", Ok(ServiceOutcome::failure("busy")));
    h.service.on_privileges("t1", privileges_ok(access(&["x"], &["2"])));

    h.engine.login(credentials()).await;

    assert_eq!(h.service.privilege_calls().len(), 3);
    assert_eq!(h.engine.role(), Some(Role::Admin));
    assert_eq!(h.messages(), vec![messages::LOGIN_SUCCESS.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn retry_policy_does_not_retry_expired_tokens() {
    let config = SessionConfig {
        privilege_retry: PrivilegeRetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        },
        ..test_config()
    };
    let h = Harness::with_config(config);
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", Err(ServiceError::Unauthorized));

    h.engine.login(credentials()).await;

    assert_eq!(h.service.privilege_calls().len(), 1);
    assert_eq!(h.engine.phase(), SessionPhase::PendingLogout);
}

#[tokio::test]
async fn default_policy_does_not_retry() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service
        .on_privileges("t1", Err(ServiceError::Network("reset".to_string())));

    h.engine.login(credentials()).await;

    assert_eq!(h.service.privilege_calls().len(), 1);
    assert_eq!(h.engine.phase(), SessionPhase::Degraded);
}

#[tokio::test(start_paused = true)]
async fn new_login_cancels_pending_forced_logout() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", Err(ServiceError::Unauthorized));
    h.engine.login(credentials()).await;
    assert_eq!(h.engine.phase(), SessionPhase::PendingLogout);

    h.service.on_login(login_ok(user("t2", "Ann")));
    h.service.on_privileges("t2", privileges_ok(access(&["x"], &["2"])));
    h.engine.login(credentials()).await;

    tokio::time::sleep(EXPIRY_DELAY * 2).await;

    assert_eq!(h.engine.user().map(|u| u.token), Some("t2".to_string()));
    assert_eq!(h.engine.phase(), SessionPhase::Ready);
    assert!(h.navigator.visits().is_empty());
    assert_eq!(h.persisted_user().map(|u| u.token), Some("t2".to_string()));
}

#[tokio::test]
async fn logout_during_privilege_fetch_discards_result() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    let release = h.service.on_privileges_gated("t1");

    let engine = h.engine.clone();
    let login = tokio::spawn(async move { engine.login(credentials()).await });
    until(|| !h.service.privilege_calls().is_empty()).await;

    h.engine.logout();
    release
        .send(privileges_ok(access(&["x"], &["1"])))
        .unwrap();
    login.await.unwrap();

    let snap = h.engine.snapshot();
    assert!(snap.user.is_none());
    assert_eq!(snap.role, None);
    assert_eq!(snap.phase, SessionPhase::LoggedOut);
    assert!(!snap.loading);
    assert!(h.persisted_user().is_none());
    assert!(h.notifications().is_empty());
}

#[tokio::test]
async fn latest_concurrent_login_wins() {
    let h = Harness::new();
    let release_first = h.service.on_login_gated();

    let engine = h.engine.clone();
    let first = tokio::spawn(async move { engine.login(credentials()).await });
    until(|| h.service.login_calls() == 1).await;
    assert!(h.engine.loading());

    h.service.on_login(login_ok(user("tB", "Bob")));
    h.service.on_privileges("tB", privileges_ok(access(&["b"], &["2"])));
    h.engine.login(credentials()).await;
    assert!(!h.engine.loading());

    release_first.send(login_ok(user("tA", "Ann"))).unwrap();
    first.await.unwrap();

    assert_eq!(h.engine.user().map(|u| u.token), Some("tB".to_string()));
    assert_eq!(h.persisted_user().map(|u| u.token), Some("tB".to_string()));
    assert_eq!(h.service.privilege_calls(), vec!["tB".to_string()]);
    assert_eq!(h.messages(), vec![messages::LOGIN_SUCCESS.to_string()]);
    assert!(!h.engine.loading());
}

#[tokio::test]
async fn superseded_login_failure_is_silent() {
    let h = Harness::new();
    let release_first = h.service.on_login_gated();

    let engine = h.engine.clone();
    let first = tokio::spawn(async move { engine.login(credentials()).await });
    until(|| h.service.login_calls() == 1).await;

    h.service.on_login(login_ok(user("tB", "Bob")));
    h.service.on_privileges("tB", privileges_ok(access(&[], &[])));
    h.engine.login(credentials()).await;

    release_first
        .send(Err(ServiceError::Network("timeout".to_string())))
        .unwrap();
    first.await.unwrap();

    assert_eq!(h.messages(), vec![messages::LOGIN_SUCCESS.to_string()]);
    assert_eq!(h.engine.user().map(|u| u.token), Some("tB".to_string()));
}

#[tokio::test(start_paused = true)]
async fn unauthorized_response_on_current_client_expires_session() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", privileges_ok(access(&["x"], &["2"])));
    h.engine.login(credentials()).await;
    h.notifications();

    let client = h.engine.client();
    client.observe_status(StatusCode::OK);
    assert_eq!(h.engine.phase(), SessionPhase::Ready);

    client.observe_status(StatusCode::UNAUTHORIZED);
    client.observe_status(StatusCode::UNAUTHORIZED);

    // One notification, one scheduled logout.
    assert_eq!(h.messages(), vec![messages::SESSION_EXPIRED.to_string()]);
    assert_eq!(h.engine.phase(), SessionPhase::PendingLogout);

    tokio::time::sleep(EXPIRY_DELAY + Duration::from_millis(10)).await;
    until(|| h.engine.user().is_none()).await;
    assert_eq!(h.navigator.visits(), vec!["/".to_string()]);
}

#[tokio::test]
async fn unauthorized_response_from_stale_client_is_ignored() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", privileges_ok(access(&[], &[])));
    h.engine.login(credentials()).await;
    let stale = h.engine.client();

    h.service.on_login(login_ok(user("t2", "Ann")));
    h.service.on_privileges("t2", privileges_ok(access(&[], &[])));
    h.engine.login(credentials()).await;
    h.notifications();

    stale.observe_status(StatusCode::UNAUTHORIZED);

    assert_eq!(h.engine.phase(), SessionPhase::Ready);
    assert!(h.notifications().is_empty());

    let anonymous = {
        h.engine.logout();
        h.engine.client()
    };
    anonymous.observe_status(StatusCode::UNAUTHORIZED);
    assert!(h.notifications().is_empty());
}

#[tokio::test]
async fn handle_unauthorized_for_old_epoch_is_ignored() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", privileges_ok(access(&[], &[])));
    h.engine.login(credentials()).await;
    let epoch = h.engine.snapshot().epoch;
    h.engine.logout();

    h.engine.handle_unauthorized(epoch);

    assert_eq!(h.engine.phase(), SessionPhase::LoggedOut);
    assert!(!h.messages().contains(&messages::SESSION_EXPIRED.to_string()));
}

#[tokio::test]
async fn watchers_observe_state_changes() {
    let h = Harness::new();
    let mut rx = h.engine.watch();
    assert_eq!(rx.borrow_and_update().phase, SessionPhase::LoggedOut);

    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", privileges_ok(access(&["x"], &["2"])));
    h.engine.login(credentials()).await;

    assert!(rx.has_changed().unwrap());
    let snap = rx.borrow_and_update().clone();
    assert_eq!(snap.phase, SessionPhase::Ready);
    assert_eq!(snap.role, Some(Role::Admin));
    assert_eq!(snap, h.engine.snapshot());
}

#[tokio::test]
async fn external_removal_logs_out() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", privileges_ok(access(&["x"], &["2"])));
    h.engine.login(credentials()).await;

    h.store.remove(assist_session::DEFAULT_STORAGE_KEY).unwrap();
    h.engine.sync_from_store().await;

    assert!(h.engine.user().is_none());
    assert_eq!(h.engine.role(), None);
    assert!(h.engine.client().token().is_none());
    assert_eq!(h.navigator.visits(), vec!["/".to_string()]);
}

#[tokio::test]
async fn external_user_change_resolves_new_privileges() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", privileges_ok(access(&["x"], &["2"])));
    h.engine.login(credentials()).await;

    h.persist(&user("t9", "Zed"));
    h.service.on_privileges("t9", privileges_ok(access(&[], &["1"])));
    h.engine.sync_from_store().await;

    assert_eq!(h.engine.user().map(|u| u.token), Some("t9".to_string()));
    assert_eq!(h.engine.role(), Some(Role::SuperAdmin));
    assert_eq!(h.engine.client().token(), Some("t9"));
}

#[tokio::test]
async fn unchanged_store_does_not_refetch() {
    let h = Harness::new();
    h.service.on_login(login_ok(user("t1", "Ann")));
    h.service.on_privileges("t1", privileges_ok(access(&["x"], &["2"])));
    h.engine.login(credentials()).await;

    h.engine.sync_from_store().await;

    assert_eq!(h.service.privilege_calls().len(), 1);
    assert_eq!(h.engine.phase(), SessionPhase::Ready);
}
