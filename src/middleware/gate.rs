use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::Instrument;
use uuid::Uuid;

use super::cookies::{CookiePolicy, RequestCredentials, CREDENTIAL_COOKIES};
use crate::identity::Identity;
use crate::routes::{normalize_path, redirect_target, Access, RouteTable};
use crate::validator::TokenValidator;

/// Result of running the gate for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Serve the request. `identity` is set when it was freshly validated,
    /// in which case the `user` cookie is rewritten.
    Allow { identity: Option<Identity> },
    Redirect {
        location: String,
        identity: Option<Identity>,
        clear_credentials: bool,
    },
}

impl GateDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, GateDecision::Allow { .. })
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            GateDecision::Redirect { location, .. } => Some(location),
            GateDecision::Allow { .. } => None,
        }
    }
}

/// Per-request authorization decision point.
///
/// Holds only immutable collaborators, so one instance is shared across
/// all concurrent requests.
pub struct Gate {
    routes: Arc<RouteTable>,
    validator: Arc<dyn TokenValidator>,
    cookies: CookiePolicy,
    login_path: String,
}

impl Gate {
    pub fn new(
        routes: Arc<RouteTable>,
        validator: Arc<dyn TokenValidator>,
        cookies: CookiePolicy,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            routes,
            validator,
            cookies,
            login_path: login_path.into(),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide one request. `raw_path` is classified in canonical form.
    pub async fn evaluate(&self, raw_path: &str, credentials: &RequestCredentials) -> GateDecision {
        let path = normalize_path(raw_path);
        let path = path.as_str();
        if path != raw_path {
            tracing::debug!("Classifying '{}' as '{}'", raw_path, path);
        }

        let token = credentials.access_token.as_deref();

        if self.routes.is_auth_redirect(path) {
            if let (Some(_), Some(cached)) = (token, credentials.cached_identity.as_ref()) {
                let location = redirect_target(Some(cached.role));
                tracing::debug!("Signed-in caller on auth page, redirecting to {}", location);
                return GateDecision::Redirect {
                    location: location.to_string(),
                    identity: None,
                    clear_credentials: false,
                };
            }
        }

        if self.routes.is_public(path) {
            return GateDecision::Allow { identity: None };
        }

        let Some(token) = token else {
            tracing::debug!("No access token, redirecting to login");
            return self.login_redirect(path);
        };

        let identity = match self.validator.validate(token).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!("Token validation failed: {}", e);
                return self.login_redirect(path);
            }
        };

        match self.routes.classify(path, Some(identity.role), true) {
            Access::Allow => {
                tracing::debug!("Allowed {} ({})", identity.email, identity.role);
                GateDecision::Allow { identity: Some(identity) }
            }
            Access::Deny => {
                let location = redirect_target(Some(identity.role));
                tracing::debug!("Role {} may not reach path, redirecting to {}", identity.role, location);
                GateDecision::Redirect {
                    location: location.to_string(),
                    identity: Some(identity),
                    clear_credentials: false,
                }
            }
        }
    }

    fn login_redirect(&self, path: &str) -> GateDecision {
        GateDecision::Redirect {
            location: format!("{}?redirect={}", self.login_path, urlencoding::encode(path)),
            identity: None,
            clear_credentials: true,
        }
    }

    fn append_identity_cookie(&self, headers: &mut HeaderMap, identity: &Identity) {
        if let Some(value) = self.cookies.identity(identity) {
            headers.append(SET_COOKIE, value);
        }
    }

    /// Build the redirect response for a non-allow decision.
    pub fn redirect_response(&self, decision: &GateDecision) -> Response {
        let GateDecision::Redirect { location, identity, clear_credentials } = decision else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };

        let mut headers = HeaderMap::new();
        let location = HeaderValue::from_str(location).unwrap_or_else(|e| {
            tracing::error!("Invalid redirect location '{}': {}", location, e);
            HeaderValue::from_static("/")
        });
        headers.insert(LOCATION, location);

        if *clear_credentials {
            for name in CREDENTIAL_COOKIES {
                if let Some(value) = self.cookies.clear(name) {
                    headers.append(SET_COOKIE, value);
                }
            }
        }
        if let Some(identity) = identity {
            self.append_identity_cookie(&mut headers, identity);
        }

        (StatusCode::TEMPORARY_REDIRECT, headers).into_response()
    }
}

/// axum middleware running the gate in front of every route.
pub async fn gate_middleware(State(gate): State<Arc<Gate>>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let credentials = RequestCredentials::from_headers(request.headers());
    let span = tracing::debug_span!("gate", request_id = %Uuid::new_v4(), path = %path);

    let decision = gate.evaluate(&path, &credentials).instrument(span).await;

    match decision {
        GateDecision::Allow { identity } => {
            if let Some(identity) = &identity {
                request.extensions_mut().insert(identity.clone());
            }

            let mut response = next.run(request).await;

            if let Some(identity) = &identity {
                gate.append_identity_cookie(response.headers_mut(), identity);
            }
            response
        }
        redirect => gate.redirect_response(&redirect),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;
    use crate::validator::ValidationError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeValidator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenValidator for FakeValidator {
        async fn validate(&self, token: &str) -> Result<Identity, ValidationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match token {
                "org-token" => Ok(identity(Role::Organization)),
                "user-token" => Ok(identity(Role::User)),
                "down-token" => Err(ValidationError::Transport("connection refused".into())),
                "garbled-token" => Err(ValidationError::Malformed("bad json".into())),
                "failing-token" => Err(ValidationError::Unavailable(503)),
                _ => Err(ValidationError::Rejected(401)),
            }
        }
    }

    fn identity(role: Role) -> Identity {
        Identity {
            id: "id_1".into(),
            email: "someone@example.com".into(),
            name: "Someone".into(),
            role,
            email_verified: true,
            is_admin: None,
            organization_id: None,
            admin_organization: None,
        }
    }

    fn gate() -> (Gate, Arc<FakeValidator>) {
        let validator = Arc::new(FakeValidator { calls: AtomicUsize::new(0) });
        let gate = Gate::new(
            Arc::new(RouteTable::default()),
            validator.clone(),
            CookiePolicy { max_age_secs: 2_592_000, secure: false },
            "/login",
        );
        (gate, validator)
    }

    fn creds(token: Option<&str>, cached: Option<Identity>) -> RequestCredentials {
        RequestCredentials {
            access_token: token.map(String::from),
            refresh_token: None,
            cached_identity: cached,
        }
    }

    #[tokio::test]
    async fn auth_page_with_cached_identity_skips_validation() {
        let (gate, validator) = gate();
        let decision = gate.evaluate("/login", &creds(Some("stale"), Some(identity(Role::User)))).await;

        assert_eq!(decision.location(), Some("/dashboard/user"));
        assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn auth_page_without_cached_identity_is_public() {
        let (gate, validator) = gate();
        let decision = gate.evaluate("/login", &creds(Some("user-token"), None)).await;

        assert_eq!(decision, GateDecision::Allow { identity: None });
        assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn public_path_never_validates() {
        let (gate, validator) = gate();
        let decision = gate.evaluate("/book/acme", &creds(Some("bad"), None)).await;

        assert!(decision.is_allow());
        assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_token_redirects_to_login_with_origin() {
        let (gate, _) = gate();
        let decision = gate.evaluate("/dashboard/org", &creds(None, Some(identity(Role::Organization)))).await;

        assert_eq!(
            decision,
            GateDecision::Redirect {
                location: "/login?redirect=%2Fdashboard%2Forg".into(),
                identity: None,
                clear_credentials: true,
            }
        );
    }

    #[tokio::test]
    async fn validated_role_reaches_its_dashboard() {
        let (gate, validator) = gate();
        let decision = gate.evaluate("/dashboard/org/users", &creds(Some("org-token"), None)).await;

        assert_eq!(decision, GateDecision::Allow { identity: Some(identity(Role::Organization)) });
        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wrong_role_is_sent_to_own_dashboard() {
        let (gate, _) = gate();
        // Cached identity claims ORGANIZATION; the backend says USER.
        let decision = gate
            .evaluate("/dashboard/org/users", &creds(Some("user-token"), Some(identity(Role::Organization))))
            .await;

        assert_eq!(decision.location(), Some("/dashboard/user"));
    }

    #[tokio::test]
    async fn alternate_spellings_of_org_path_are_denied() {
        let (gate, _) = gate();
        for path in [
            "/dashboard/org/users",
            "/dashboard/%6Frg/users",
            "//dashboard/org/users",
            "/dashboard/user/../org/users",
        ] {
            let decision = gate.evaluate(path, &creds(Some("user-token"), None)).await;
            assert_eq!(decision.location(), Some("/dashboard/user"), "{path}");
        }
    }

    #[tokio::test]
    async fn login_redirect_carries_canonical_path() {
        let (gate, _) = gate();
        let decision = gate.evaluate("//dashboard/./org", &creds(None, None)).await;

        assert_eq!(decision.location(), Some("/login?redirect=%2Fdashboard%2Forg"));
    }

    #[tokio::test]
    async fn any_validation_failure_clears_credentials() {
        let (gate, _) = gate();
        for token in ["expired", "down-token", "garbled-token", "failing-token"] {
            let decision = gate
                .evaluate("/dashboard/org", &creds(Some(token), Some(identity(Role::Organization))))
                .await;
            assert_eq!(
                decision,
                GateDecision::Redirect {
                    location: "/login?redirect=%2Fdashboard%2Forg".into(),
                    identity: None,
                    clear_credentials: true,
                },
                "token {token}"
            );
        }
    }

    #[tokio::test]
    async fn repeated_evaluation_is_stable() {
        let (gate, validator) = gate();
        let request = creds(Some("user-token"), None);

        let first = gate.evaluate("/dashboard/user/bookings", &request).await;
        let second = gate.evaluate("/dashboard/user/bookings", &request).await;

        assert!(first.is_allow());
        assert_eq!(first, second);
        assert_eq!(validator.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn redirect_response_sets_location_and_clears_cookies() {
        let (gate, _) = gate();
        let response = gate.redirect_response(&GateDecision::Redirect {
            location: "/login?redirect=%2Fprofile".into(),
            identity: None,
            clear_credentials: true,
        });

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login?redirect=%2Fprofile");

        let cookies: Vec<_> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 3);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    }
}
