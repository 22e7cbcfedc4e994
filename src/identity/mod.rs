use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Dashboard role carried by every identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Organization,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Organization => "ORGANIZATION",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ORGANIZATION" | "ORG" => Ok(Role::Organization),
            other => Err(IdentityError::UnknownRole(other.to_string())),
        }
    }
}

/// Canonical user record as returned by the identity endpoint.
///
/// The same shape is cached in the `user` cookie and in client credential
/// stores, so it serializes back to the backend's camelCase field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_organization: Option<Value>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.is_admin.unwrap_or(false)
    }

    /// Parse an identity from a JSON string, such as a decoded `user` cookie.
    pub fn from_json(raw: &str) -> Result<Self, IdentityError> {
        let identity: Identity = serde_json::from_str(raw)?;
        identity.validate()
    }

    pub fn to_json(&self) -> Result<String, IdentityError> {
        Ok(serde_json::to_string(self)?)
    }

    fn validate(self) -> Result<Self, IdentityError> {
        if self.id.trim().is_empty() {
            return Err(IdentityError::Malformed("identity is missing an id".to_string()));
        }
        Ok(self)
    }
}

/// Opaque bearer credentials. Never decoded or inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token,
        }
    }

    /// Access token if present and non-blank.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct IdentityEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<IdentityData>,
}

#[derive(Debug, Deserialize)]
struct IdentityData {
    user: Identity,
}

/// Outcome of decoding a `/user/me` response body.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeOutcome {
    Valid(Identity),
    /// The backend answered with `success: false`.
    Refused,
}

/// Decode the `{ success, data: { user } }` envelope returned by the identity endpoint.
pub fn parse_identity_envelope(body: &[u8]) -> Result<EnvelopeOutcome, IdentityError> {
    let envelope: IdentityEnvelope = serde_json::from_slice(body)?;

    if !envelope.success {
        return Ok(EnvelopeOutcome::Refused);
    }

    let data = envelope
        .data
        .ok_or_else(|| IdentityError::Malformed("success envelope without data".to_string()))?;

    Ok(EnvelopeOutcome::Valid(data.user.validate()?))
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Malformed identity: {0}")]
    Malformed(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Identity JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
