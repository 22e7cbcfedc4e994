use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, PRAGMA};
use serde_json::json;
use url::Url;

use super::{SessionRevoker, TokenValidator, ValidationError};
use crate::config::GateConfig;
use crate::identity::{parse_identity_envelope, EnvelopeOutcome, Identity};

const IDENTITY_PATH: &str = "user/me";
const LOGOUT_PATH: &str = "auth/logout";

/// reqwest-backed client for the backend's identity and session endpoints.
#[derive(Debug, Clone)]
pub struct HttpIdentityClient {
    client: reqwest::Client,
    identity_url: Url,
    logout_url: Url,
}

impl HttpIdentityClient {
    pub fn new(backend_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let base = normalize_base(backend_url)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            identity_url: base.join(IDENTITY_PATH)?,
            logout_url: base.join(LOGOUT_PATH)?,
        })
    }

    pub fn from_config(config: &GateConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.backend_url,
            config.validation_timeout_ms.map(Duration::from_millis),
        )
    }

    pub fn identity_url(&self) -> &Url {
        &self.identity_url
    }
}

/// `Url::join` drops the last segment unless the base ends in `/`.
fn normalize_base(backend_url: &str) -> Result<Url, url::ParseError> {
    let trimmed = backend_url.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{}/", trimmed))
    }
}

#[async_trait]
impl TokenValidator for HttpIdentityClient {
    async fn validate(&self, token: &str) -> Result<Identity, ValidationError> {
        let response = self
            .client
            .get(self.identity_url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Identity request to {} failed: {}", self.identity_url, e);
                ValidationError::Transport(e.to_string())
            })?;

        let status = response.status();
        if status.is_server_error() {
            tracing::warn!("Identity endpoint failed with status {}", status);
            return Err(ValidationError::Unavailable(status.as_u16()));
        }
        if !status.is_success() {
            tracing::warn!("Identity endpoint rejected token with status {}", status);
            return Err(ValidationError::Rejected(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ValidationError::Transport(e.to_string()))?;

        match parse_identity_envelope(&body) {
            Ok(EnvelopeOutcome::Valid(identity)) => Ok(identity),
            Ok(EnvelopeOutcome::Refused) => {
                tracing::warn!("Identity endpoint answered {} with success=false", status);
                Err(ValidationError::Rejected(status.as_u16()))
            }
            Err(e) => {
                tracing::warn!("Identity endpoint returned a malformed payload: {}", e);
                Err(ValidationError::Malformed(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl SessionRevoker for HttpIdentityClient {
    async fn revoke(&self, refresh_token: &str) -> Result<(), ValidationError> {
        let response = self
            .client
            .post(self.logout_url.clone())
            .header(CACHE_CONTROL, "no-store")
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| ValidationError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ValidationError::Rejected(response.status().as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_url_keeps_base_path() {
        let client = HttpIdentityClient::new("http://localhost:5000/api", None).unwrap();
        assert_eq!(client.identity_url().as_str(), "http://localhost:5000/api/user/me");

        let client = HttpIdentityClient::new("http://localhost:5000/", None).unwrap();
        assert_eq!(client.identity_url().as_str(), "http://localhost:5000/user/me");
    }

    #[test]
    fn invalid_backend_url_is_an_error() {
        assert!(HttpIdentityClient::new("not a url", None).is_err());
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let port = portpicker::pick_unused_port().expect("free port");
        let client = HttpIdentityClient::new(&format!("http://127.0.0.1:{}", port), None).unwrap();

        let err = client.validate("token").await.unwrap_err();
        assert!(err.is_outage(), "unexpected error: {err:?}");
        assert!(matches!(err, ValidationError::Transport(_)));
    }
}
