mod common;

use std::sync::Arc;

use anyhow::Result;

use booking_gate::identity::{Credentials, Role};
use booking_gate::session::{
    guard, AuthSession, CredentialStore, FileCredentialStore, GuardOutcome, Requirement,
};
use booking_gate::validator::HttpIdentityClient;

use common::spawn_backend;

fn session(backend_url: &str, store: Arc<FileCredentialStore>) -> Result<AuthSession> {
    let client = Arc::new(HttpIdentityClient::new(backend_url, None)?);
    Ok(AuthSession::new(store, client.clone(), client, "/login"))
}

#[tokio::test]
async fn sign_in_then_status_uses_backend_identity() -> Result<()> {
    let backend = spawn_backend().await?;
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileCredentialStore::in_dir(dir.path()));
    let session = session(&backend.base_url, store.clone())?;

    let state = session.sign_in(Credentials::new("org-token", Some("refresh-1".into()))).await;
    assert!(state.authenticated);
    assert!(!state.degraded);
    assert_eq!(state.role(), Some(Role::Organization));

    let stored = store.load().await?;
    assert_eq!(stored.identity.map(|i| i.role), Some(Role::Organization));

    assert_eq!(guard(&state, Requirement::Role(Role::Organization)), GuardOutcome::Render);
    assert_eq!(guard(&state, Requirement::Admin), GuardOutcome::AccessDenied);
    Ok(())
}

#[tokio::test]
async fn unreachable_backend_keeps_cached_identity() -> Result<()> {
    let backend = spawn_backend().await?;
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileCredentialStore::in_dir(dir.path()));

    // Populate the cache while the backend is reachable.
    session(&backend.base_url, store.clone())?
        .sign_in(Credentials::new("user-token", None))
        .await;

    let dead_port = portpicker::pick_unused_port().expect("free port");
    let offline = session(&format!("http://127.0.0.1:{}/api", dead_port), store.clone())?;

    let state = offline.mount().await;
    assert!(state.authenticated);
    assert!(state.degraded);
    assert_eq!(state.role(), Some(Role::User));
    Ok(())
}

#[tokio::test]
async fn backend_503_keeps_cached_identity_and_credentials() -> Result<()> {
    let backend = spawn_backend().await?;
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileCredentialStore::in_dir(dir.path()));
    let session = session(&backend.base_url, store.clone())?;

    session.sign_in(Credentials::new("org-token", None)).await;
    // Identity endpoint answers 503 for this token.
    store.save_credentials(&Credentials::new("down-token", None)).await?;

    let state = session.mount().await;
    assert!(state.authenticated);
    assert!(state.degraded);
    assert_eq!(state.role(), Some(Role::Organization));
    assert_eq!(store.load().await?.credentials.access_token(), Some("down-token"));
    Ok(())
}

#[tokio::test]
async fn rejected_token_signs_out_locally() -> Result<()> {
    let backend = spawn_backend().await?;
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileCredentialStore::in_dir(dir.path()));
    let session = session(&backend.base_url, store.clone())?;

    let state = session.sign_in(Credentials::new("refused-token", None)).await;
    assert!(!state.authenticated);
    assert_eq!(store.load().await?.credentials.access_token(), None);
    assert_eq!(guard(&state, Requirement::Authenticated), GuardOutcome::RedirectToLogin);
    Ok(())
}

#[tokio::test]
async fn logout_revokes_and_clears() -> Result<()> {
    let backend = spawn_backend().await?;
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileCredentialStore::in_dir(dir.path()));
    let session = session(&backend.base_url, store.clone())?;

    session.sign_in(Credentials::new("user-token", Some("refresh-9".into()))).await;
    let next = session.logout().await;

    assert_eq!(next, "/login");
    assert_eq!(backend.stats.logout_calls(), 1);
    assert!(!store.path().exists());
    assert!(!session.mount().await.authenticated);
    Ok(())
}

#[tokio::test]
async fn logout_succeeds_when_backend_is_down() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileCredentialStore::in_dir(dir.path()));
    store.save_credentials(&Credentials::new("user-token", Some("refresh-9".into()))).await?;

    let dead_port = portpicker::pick_unused_port().expect("free port");
    let session = session(&format!("http://127.0.0.1:{}/api", dead_port), store.clone())?;

    assert_eq!(session.logout().await, "/login");
    assert_eq!(store.load().await?.credentials, Credentials::default());
    Ok(())
}
