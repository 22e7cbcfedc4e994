// validator/mod.rs - Token validation against the identity endpoint
//
// Every call is a live round-trip. Callers that gate access treat every
// error variant as "invalid"; only the client session layer looks at
// outages to tolerate flaky connectivity.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::Identity;

pub use http::HttpIdentityClient;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 4xx status or a `success: false` envelope.
    #[error("Token rejected by identity endpoint (status {0})")]
    Rejected(u16),

    /// 5xx status from the identity endpoint.
    #[error("Identity endpoint failed with status {0}")]
    Unavailable(u16),

    #[error("Malformed identity response: {0}")]
    Malformed(String),

    /// Network failure or timeout before a response was read.
    #[error("Identity endpoint unreachable: {0}")]
    Transport(String),
}

impl ValidationError {
    /// Backend outage rather than a verdict on the token.
    pub fn is_outage(&self) -> bool {
        matches!(self, ValidationError::Transport(_) | ValidationError::Unavailable(_))
    }
}

/// Confirms a bearer token is live and returns the canonical identity.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<Identity, ValidationError>;
}

/// Invalidates a refresh token server-side.
#[async_trait]
pub trait SessionRevoker: Send + Sync {
    async fn revoke(&self, refresh_token: &str) -> Result<(), ValidationError>;
}
