// routes/mod.rs - Route classifier
//
// Static table mapping path patterns to visibility classes. Built once at
// startup (defaults or a YAML file) and shared immutably by the gate.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GateConfig;
use crate::identity::Role;

/// Suffix marking a pattern as "anything under this base".
pub const WILDCARD: char = '*';

pub const DASHBOARD_PATH: &str = "/dashboard";
pub const ORG_DASHBOARD_PATH: &str = "/dashboard/org";
pub const USER_DASHBOARD_PATH: &str = "/dashboard/user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

/// Visibility class of a route descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Authenticated,
    Restricted(Role),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub pattern: String,
    pub visibility: Visibility,
}

/// A set of path patterns. Any match is sufficient; there is no precedence within a set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    patterns: Vec<String>,
}

impl PatternSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| matches(path, pattern))
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Test a single pattern against a request path.
///
/// Matches on exact equality, on `pattern/` prefix, or on the base of a
/// trailing-`*` pattern. A pattern whose base is empty or `/` only ever
/// matches `/` itself.
pub fn matches(path: &str, pattern: &str) -> bool {
    if path == pattern {
        return true;
    }

    let (base, wildcard) = match pattern.strip_suffix(WILDCARD) {
        Some(base) => (base, true),
        None => (pattern, false),
    };
    let trimmed = base.trim_end_matches('/');

    if trimmed.is_empty() {
        return path == "/";
    }

    if wildcard && path.starts_with(base) {
        return true;
    }

    path.strip_prefix(trimmed)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

/// Immutable route table consulted by the gate and the client guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    public: PatternSet,
    auth_redirect: PatternSet,
    authenticated: PatternSet,
    restricted: Vec<(Role, PatternSet)>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            public: PatternSet::new([
                "/",
                "/login",
                "/register",
                "/forgot-password",
                "/reset-password",
                "/verify-email",
                "/about",
                "/pricing",
                "/book/*",
                "/health",
                "/assets/*",
                "/favicon.ico",
            ]),
            auth_redirect: PatternSet::new(["/login", "/register"]),
            authenticated: PatternSet::new([DASHBOARD_PATH, "/profile", "/settings", "/api/session"]),
            restricted: vec![
                (Role::Organization, PatternSet::new([ORG_DASHBOARD_PATH])),
                (Role::User, PatternSet::new([USER_DASHBOARD_PATH])),
            ],
        }
    }
}

impl RouteTable {
    pub fn new(
        public: PatternSet,
        auth_redirect: PatternSet,
        authenticated: PatternSet,
        restricted: Vec<(Role, PatternSet)>,
    ) -> Self {
        Self { public, auth_redirect, authenticated, restricted }
    }

    /// Load a table from a YAML document of the shape
    /// `{ public: [..], auth_redirect: [..], authenticated: [..], restricted: { ROLE: [..] } }`.
    pub fn from_yaml(raw: &str) -> Result<Self, RouteTableError> {
        let file: RouteTableFile = serde_yaml::from_str(raw)?;
        file.try_into()
    }

    /// Table named by `GATE_ROUTES_FILE`, or the built-in defaults.
    pub fn from_config(config: &GateConfig) -> Result<Self, RouteTableError> {
        match &config.routes_file {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RouteTableError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RouteTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.matches(path)
    }

    /// Login/register pages that bounce an already-signed-in caller to their dashboard.
    pub fn is_auth_redirect(&self, path: &str) -> bool {
        self.auth_redirect.matches(path)
    }

    pub fn is_authenticated(&self, path: &str) -> bool {
        self.authenticated.matches(path)
    }

    /// Role required by a path, if it falls in a role-restricted set.
    pub fn required_role(&self, path: &str) -> Option<Role> {
        self.restricted
            .iter()
            .find(|(_, set)| set.matches(path))
            .map(|(role, _)| *role)
    }

    pub fn visibility(&self, path: &str) -> Option<Visibility> {
        if self.is_public(path) {
            Some(Visibility::Public)
        } else if let Some(role) = self.required_role(path) {
            Some(Visibility::Restricted(role))
        } else if self.is_authenticated(path) {
            Some(Visibility::Authenticated)
        } else {
            None
        }
    }

    /// Decide whether a caller may reach `path`.
    ///
    /// Public wins over everything, then authentication, then role. Paths
    /// listed nowhere are allowed for any authenticated caller.
    pub fn classify(&self, path: &str, role: Option<Role>, is_authenticated: bool) -> Access {
        if self.is_public(path) {
            return Access::Allow;
        }

        if !is_authenticated {
            return Access::Deny;
        }

        if let Some(required) = self.required_role(path) {
            return if role == Some(required) { Access::Allow } else { Access::Deny };
        }

        if self.is_authenticated(path) {
            return Access::Allow;
        }

        tracing::debug!("Unlisted path '{}' allowed for authenticated caller", path);
        Access::Allow
    }

    /// Flattened view of the table, used by the CLI listing.
    pub fn descriptors(&self) -> Vec<RouteDescriptor> {
        let mut out = Vec::new();
        let mut push = |set: &PatternSet, visibility: Visibility| {
            for pattern in set.patterns() {
                out.push(RouteDescriptor { pattern: pattern.clone(), visibility });
            }
        };

        push(&self.public, Visibility::Public);
        push(&self.authenticated, Visibility::Authenticated);
        for (role, set) in &self.restricted {
            push(set, Visibility::Restricted(*role));
        }
        out
    }

    pub fn auth_redirect_patterns(&self) -> &[String] {
        self.auth_redirect.patterns()
    }
}

/// Dashboard a caller with the given role lands on.
pub fn redirect_target(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Organization) => ORG_DASHBOARD_PATH,
        Some(Role::User) => USER_DASHBOARD_PATH,
        None => DASHBOARD_PATH,
    }
}

/// Canonical form of a request path for classification.
///
/// Percent-escapes are decoded, empty and `.` segments dropped and `..`
/// resolved, so every spelling of a path classifies the same way. `..`
/// never climbs above the root.
pub fn normalize_path(raw: &str) -> String {
    let decoded = urlencoding::decode_binary(raw.as_bytes());
    let decoded = String::from_utf8_lossy(&decoded);

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    format!("/{}", segments.join("/"))
}

#[derive(Debug, Deserialize, Serialize)]
struct RouteTableFile {
    #[serde(default)]
    public: Vec<String>,
    #[serde(default)]
    auth_redirect: Vec<String>,
    #[serde(default)]
    authenticated: Vec<String>,
    #[serde(default)]
    restricted: HashMap<String, Vec<String>>,
}

impl TryFrom<RouteTableFile> for RouteTable {
    type Error = RouteTableError;

    fn try_from(file: RouteTableFile) -> Result<Self, Self::Error> {
        let all = file
            .public
            .iter()
            .chain(&file.auth_redirect)
            .chain(&file.authenticated)
            .chain(file.restricted.values().flatten());
        for pattern in all {
            if pattern.trim().is_empty() || !pattern.starts_with('/') {
                return Err(RouteTableError::InvalidPattern(pattern.clone()));
            }
        }

        let mut restricted = Vec::with_capacity(file.restricted.len());
        for (role, patterns) in file.restricted {
            let role = role
                .parse::<Role>()
                .map_err(|_| RouteTableError::UnknownRole(role.clone()))?;
            restricted.push((role, PatternSet::new(patterns)));
        }
        // HashMap order is arbitrary; keep listings stable
        restricted.sort_by_key(|(role, _)| role.as_str());

        Ok(RouteTable::new(
            PatternSet::new(file.public),
            PatternSet::new(file.auth_redirect),
            PatternSet::new(file.authenticated),
            restricted,
        ))
    }
}

#[derive(Error, Debug)]
pub enum RouteTableError {
    #[error("Invalid route pattern: '{0}'")]
    InvalidPattern(String),

    #[error("Unknown role in route table: {0}")]
    UnknownRole(String),

    #[error("Failed to read route table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Route table YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
