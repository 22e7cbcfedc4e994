use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

use crate::config::GateConfig;
use crate::identity::Identity;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
pub const USER_COOKIE: &str = "user";

pub const CREDENTIAL_COOKIES: [&str; 3] = [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, USER_COOKIE];

/// Read a single cookie value across all `Cookie` headers.
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .find_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}

/// Credential state carried by a request's cookies.
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Best-effort cached identity; `None` if absent or unparseable.
    pub cached_identity: Option<Identity>,
}

impl RequestCredentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let access_token = parse_cookie(headers, ACCESS_TOKEN_COOKIE)
            .filter(|t| !t.is_empty())
            .or_else(|| bearer_token(headers));

        Self {
            access_token,
            refresh_token: parse_cookie(headers, REFRESH_TOKEN_COOKIE).filter(|t| !t.is_empty()),
            cached_identity: parse_cookie(headers, USER_COOKIE).and_then(|raw| decode_identity(&raw)),
        }
    }
}

/// Fallback for API callers that send the token as a header instead of a cookie.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn decode_identity(raw: &str) -> Option<Identity> {
    let decoded = match urlencoding::decode(raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::debug!("Ignoring undecodable user cookie: {}", e);
            return None;
        }
    };

    match Identity::from_json(&decoded) {
        Ok(identity) => Some(identity),
        Err(e) => {
            tracing::debug!("Ignoring unparseable user cookie: {}", e);
            None
        }
    }
}

pub fn encode_identity(identity: &Identity) -> Result<String, crate::identity::IdentityError> {
    Ok(urlencoding::encode(&identity.to_json()?).into_owned())
}

/// Attributes shared by every credential cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub max_age_secs: u64,
    pub secure: bool,
}

impl CookiePolicy {
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            max_age_secs: config.cookie_max_age_secs,
            secure: config.secure_cookies,
        }
    }

    pub fn set(&self, name: &str, value: &str) -> Option<HeaderValue> {
        self.build(name, value, self.max_age_secs)
    }

    pub fn clear(&self, name: &str) -> Option<HeaderValue> {
        self.build(name, "", 0)
    }

    pub fn identity(&self, identity: &Identity) -> Option<HeaderValue> {
        match encode_identity(identity) {
            Ok(encoded) => self.set(USER_COOKIE, &encoded),
            Err(e) => {
                tracing::error!("Failed to encode identity cookie: {}", e);
                None
            }
        }
    }

    fn build(&self, name: &str, value: &str, max_age: u64) -> Option<HeaderValue> {
        let mut cookie = format!("{}={}; Path=/; Max-Age={}; SameSite=Strict", name, value, max_age);
        if self.secure {
            cookie.push_str("; Secure");
        }

        HeaderValue::from_str(&cookie)
            .map_err(|e| tracing::warn!("Refusing to emit cookie '{}': {}", name, e))
            .ok()
    }
}
