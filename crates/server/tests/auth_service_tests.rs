mod common;

use common::{FlakyStore, exec, identity, sqlite_auth};
use music_identity::account::{AuthProvider, NewOAuthAccount, Role};
use music_identity::auth::{AuthService, BestEffort};
use music_identity::error::AuthError;
use music_identity::oauth::OAuthProvider;
use music_identity::store::{AccountStore, DatabaseAccountStore};
use std::sync::Arc;

#[tokio::test]
async fn test_register_then_login() {
    let (_db, auth) = sqlite_auth().await;

    let registered = auth.register("a@x.com", "secret1").await.unwrap();
    assert_eq!(registered.account.role, Role::User);
    assert_eq!(registered.account.provider, Some(AuthProvider::Local));
    assert!(registered.last_login.is_none());

    let session = auth.login("a@x.com", "secret1").await.unwrap();
    assert_eq!(session.account.id, registered.account.id);
    assert_eq!(session.last_login, Some(BestEffort::Applied));
    assert!(session.account.last_login_at.is_some());

    let claims = auth.validate_token(&session.token).unwrap();
    assert_eq!(claims.account_id, registered.account.id);
    assert_eq!(claims.role, Role::User);
    assert_eq!(claims.email, "a@x.com");
}

#[tokio::test]
async fn test_password_is_hashed_before_storage() {
    let (_db, auth) = sqlite_auth().await;

    let session = auth.register("hash@x.com", "secret1").await.unwrap();
    let stored = auth.store().get_by_id(session.account.id).await.unwrap();
    let hash = stored.password_hash.unwrap();
    assert_ne!(hash, "secret1");
    assert!(hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (_db, auth) = sqlite_auth().await;
    auth.register("a@x.com", "secret1").await.unwrap();
    auth.store()
        .create_oauth_account(NewOAuthAccount {
            email: "oauth@x.com".into(),
            name: None,
            provider: AuthProvider::Google,
            external_id: "g-1".into(),
        })
        .await
        .unwrap();

    let wrong_password = auth.login("a@x.com", "secret2").await.unwrap_err();
    let unknown_email = auth.login("nobody@x.com", "secret1").await.unwrap_err();
    let provider_only = auth.login("oauth@x.com", "secret1").await.unwrap_err();

    for err in [&wrong_password, &unknown_email, &provider_only] {
        assert!(matches!(err, AuthError::InvalidCredentials), "{err:?}");
    }
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert_eq!(unknown_email.to_string(), provider_only.to_string());
}

#[tokio::test]
async fn test_duplicate_registration() {
    let (_db, auth) = sqlite_auth().await;
    auth.register("Dup@X.com", "secret1").await.unwrap();

    let err = auth.register("  dup@x.com ", "another1").await.unwrap_err();
    assert!(matches!(err, AuthError::DuplicateEmail));
    assert_eq!(err.to_string(), "email already exists");
}

#[tokio::test]
async fn test_registration_race_loser_gets_duplicate_email() {
    let (db, _setup) = sqlite_auth().await;
    // both registrations pass the lookup, so the second insert hits the constraint
    let mut store = FlakyStore::wrap(Arc::new(DatabaseAccountStore::new(db)));
    store.hide_emails = true;
    let auth = AuthService::new(Arc::new(store), common::codec());

    auth.register("race@x.com", "secret1").await.unwrap();
    let err = auth.register("race@x.com", "secret2").await.unwrap_err();
    assert!(matches!(err, AuthError::DuplicateEmail), "{err:?}");
}

#[tokio::test]
async fn test_promotion_conflicts_are_reported_by_key() {
    let (_db, auth) = sqlite_auth().await;
    auth.store()
        .create_oauth_account(NewOAuthAccount {
            email: "owner@x.com".into(),
            name: None,
            provider: AuthProvider::Google,
            external_id: "g-owned".into(),
        })
        .await
        .unwrap();
    let guest = auth.guest_login().await.unwrap();

    let err = auth
        .promote_guest_to_user(
            guest.account.id,
            &identity(OAuthProvider::Google, "fresh@x.com", "g-owned"),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            AuthError::ExternalIdentityTaken {
                provider: AuthProvider::Google
            }
        ),
        "{err:?}"
    );

    let err = auth
        .promote_guest_to_user(
            guest.account.id,
            &identity(OAuthProvider::Yandex, "owner@x.com", "ya-new"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DuplicateEmail), "{err:?}");

    let still_guest = auth.store().get_by_id(guest.account.id).await.unwrap();
    assert_eq!(still_guest.role, Role::Guest);
    assert_eq!(still_guest.external_id, None);
}

#[tokio::test]
async fn test_registration_input_validation() {
    let (_db, auth) = sqlite_auth().await;

    assert!(matches!(
        auth.register("a@x.com", "12345").await,
        Err(AuthError::InvalidInput(_))
    ));
    assert!(matches!(
        auth.register("", "secret1").await,
        Err(AuthError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_login_normalizes_email() {
    let (_db, auth) = sqlite_auth().await;
    auth.register("case@x.com", "secret1").await.unwrap();

    assert!(auth.login("  CASE@X.COM", "secret1").await.is_ok());
}

#[tokio::test]
async fn test_guest_logins_get_distinct_ids() {
    let (_db, auth) = sqlite_auth().await;

    let first = auth.guest_login().await.unwrap();
    let second = auth.guest_login().await.unwrap();
    assert_ne!(first.account.id, second.account.id);

    for session in [&first, &second] {
        assert_eq!(session.account.role, Role::Guest);
        assert_eq!(session.account.email, None);
        let claims = auth.validate_token(&session.token).unwrap();
        assert_eq!(claims.account_id, session.account.id);
        assert_eq!(claims.role, Role::Guest);
        assert_eq!(claims.email, "");
    }
}

#[tokio::test]
async fn test_promote_guest_keeps_id() {
    let (_db, auth) = sqlite_auth().await;
    let guest = auth.guest_login().await.unwrap();

    let promoted = auth
        .promote_guest_to_user(
            guest.account.id,
            &identity(OAuthProvider::Google, "g@x.com", "google-77"),
        )
        .await
        .unwrap();

    assert_eq!(promoted.account.id, guest.account.id);
    assert_eq!(promoted.account.role, Role::User);
    assert_eq!(promoted.account.email.as_deref(), Some("g@x.com"));
    assert_eq!(promoted.account.provider, Some(AuthProvider::Google));
    assert_eq!(promoted.account.external_id.as_deref(), Some("google-77"));
    assert_eq!(
        promoted.account.avatar_url.as_deref(),
        Some("https://cdn.example.com/avatar.png")
    );
    assert_ne!(promoted.token, guest.token);

    let claims = auth.validate_token(&promoted.token).unwrap();
    assert_eq!(claims.account_id, guest.account.id);
    assert_eq!(claims.role, Role::User);
}

#[tokio::test]
async fn test_promote_unknown_guest() {
    let (_db, auth) = sqlite_auth().await;

    let err = auth
        .promote_guest_to_user(999, &identity(OAuthProvider::Google, "g@x.com", "g-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::GuestNotFound(999)));
}

#[tokio::test]
async fn test_promote_refuses_non_guest() {
    let (_db, auth) = sqlite_auth().await;
    let local = auth.register("local@x.com", "secret1").await.unwrap();

    let err = auth
        .promote_guest_to_user(
            local.account.id,
            &identity(OAuthProvider::Yandex, "other@x.com", "ya-1"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::GuestNotFound(_)));

    let unchanged = auth.store().get_by_id(local.account.id).await.unwrap();
    assert_eq!(unchanged.email.as_deref(), Some("local@x.com"));
}

#[tokio::test]
async fn test_last_login_failure_does_not_fail_login() {
    let (db, setup) = sqlite_auth().await;
    setup.register("soft@x.com", "secret1").await.unwrap();

    let mut flaky = FlakyStore::wrap(Arc::new(DatabaseAccountStore::new(db)));
    flaky.fail_last_login = true;
    let auth = AuthService::new(Arc::new(flaky), common::codec());

    let session = auth.login("soft@x.com", "secret1").await.unwrap();
    assert!(matches!(session.last_login, Some(BestEffort::Failed(_))));
    assert!(session.account.last_login_at.is_none());
    assert!(auth.validate_token(&session.token).is_ok());

    let guest = auth.guest_login().await.unwrap();
    assert!(matches!(guest.last_login, Some(BestEffort::Failed(_))));
}

#[tokio::test]
async fn test_login_includes_last_played_track() {
    let (db, auth) = sqlite_auth().await;
    let registered = auth.register("player@x.com", "secret1").await.unwrap();
    exec(
        &db,
        format!(
            "UPDATE account SET last_track_id = 'trk-1', last_position = 12.5 WHERE id = {}",
            registered.account.id
        ),
    )
    .await;

    let session = auth.login("player@x.com", "secret1").await.unwrap();
    let track = session.last_track.unwrap();
    assert_eq!(track.track_id, "trk-1");
    assert_eq!(track.position_secs, 12.5);
}

#[tokio::test]
async fn test_last_track_failure_is_ignored() {
    let (db, setup) = sqlite_auth().await;
    setup.register("notrack@x.com", "secret1").await.unwrap();

    let mut flaky = FlakyStore::wrap(Arc::new(DatabaseAccountStore::new(db)));
    flaky.fail_last_track = true;
    let auth = AuthService::new(Arc::new(flaky), common::codec());

    let session = auth.login("notrack@x.com", "secret1").await.unwrap();
    assert!(session.last_track.is_none());
}

#[tokio::test]
async fn test_validate_token_rejects_garbage() {
    let (_db, auth) = sqlite_auth().await;

    assert!(matches!(
        auth.validate_token("not-a-token"),
        Err(AuthError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_current_account_reads_fresh_role() {
    let (db, auth) = sqlite_auth().await;
    let session = auth.register("role@x.com", "secret1").await.unwrap();

    exec(
        &db,
        format!("UPDATE account SET role = 'admin' WHERE id = {}", session.account.id),
    )
    .await;
    let account = auth.current_account(session.account.id).await.unwrap();
    assert_eq!(account.role, Role::Admin);

    assert!(matches!(
        auth.current_account(12345).await,
        Err(AuthError::AccountNotFound(12345))
    ));
}
