// session/mod.rs - Client-side auth session
//
// Convenience layer for dashboard clients. It is not the security boundary:
// the request gate re-validates on every navigation, so this layer may keep
// showing a cached identity while the identity service is unreachable.

pub mod guard;
pub mod store;

use std::sync::Arc;

use crate::identity::{Credentials, Identity, Role};
use crate::validator::{SessionRevoker, TokenValidator};

pub use guard::{guard, GuardOutcome, Requirement};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, StoredSession};

/// What a mounted page knows about the current user.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub identity: Option<Identity>,
    pub authenticated: bool,
    /// Identity came from the local cache because validation could not reach the backend.
    pub degraded: bool,
}

impl AuthState {
    pub fn anonymous() -> Self {
        Self { identity: None, authenticated: false, degraded: false }
    }

    pub fn validated(identity: Identity) -> Self {
        Self { identity: Some(identity), authenticated: true, degraded: false }
    }

    pub fn cached(identity: Identity) -> Self {
        Self { identity: Some(identity), authenticated: true, degraded: true }
    }

    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|identity| identity.role)
    }
}

pub struct AuthSession {
    store: Arc<dyn CredentialStore>,
    validator: Arc<dyn TokenValidator>,
    revoker: Arc<dyn SessionRevoker>,
    login_path: String,
}

impl AuthSession {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        validator: Arc<dyn TokenValidator>,
        revoker: Arc<dyn SessionRevoker>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            validator,
            revoker,
            login_path: login_path.into(),
        }
    }

    async fn stored(&self) -> StoredSession {
        self.store.load().await.unwrap_or_else(|e| {
            tracing::warn!("Could not read stored session: {}", e);
            StoredSession::default()
        })
    }

    /// Resolve the auth state for a freshly mounted page.
    pub async fn mount(&self) -> AuthState {
        let stored = self.stored().await;

        let Some(token) = stored.credentials.access_token() else {
            return AuthState::anonymous();
        };

        match self.validator.validate(token).await {
            Ok(identity) => {
                if let Err(e) = self.store.save_identity(&identity).await {
                    tracing::warn!("Could not cache refreshed identity: {}", e);
                }
                AuthState::validated(identity)
            }
            Err(e) if e.is_outage() => match stored.identity {
                Some(identity) => {
                    tracing::warn!("Identity service unreachable, using cached identity: {}", e);
                    AuthState::cached(identity)
                }
                None => AuthState::anonymous(),
            },
            Err(e) => {
                tracing::debug!("Stored token rejected: {}", e);
                if let Err(e) = self.store.clear().await {
                    tracing::warn!("Could not clear rejected credentials: {}", e);
                }
                AuthState::anonymous()
            }
        }
    }

    /// Store new credentials (e.g. after a login form) and mount with them.
    pub async fn sign_in(&self, credentials: Credentials) -> AuthState {
        if let Err(e) = self.store.save_credentials(&credentials).await {
            tracing::warn!("Could not store credentials: {}", e);
        }
        self.mount().await
    }

    /// Revoke the refresh token if possible, then drop all local state.
    /// Returns the path to navigate to.
    pub async fn logout(&self) -> String {
        let stored = self.stored().await;

        if let Some(refresh_token) = stored.credentials.refresh_token.as_deref() {
            if let Err(e) = self.revoker.revoke(refresh_token).await {
                tracing::debug!("Ignoring logout revocation failure: {}", e);
            }
        }

        if let Err(e) = self.store.clear().await {
            tracing::warn!("Could not clear stored credentials: {}", e);
        }

        self.login_path.clone()
    }
}
