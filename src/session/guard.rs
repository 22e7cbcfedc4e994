use crate::identity::Role;
use crate::routes::{RouteTable, Visibility};

use super::AuthState;

/// What a dashboard layout needs before rendering its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    None,
    Authenticated,
    Role(Role),
    Admin,
}

impl Requirement {
    /// Requirement implied by the route table for a page path.
    pub fn for_path(routes: &RouteTable, path: &str) -> Self {
        match routes.visibility(path) {
            Some(Visibility::Public) => Requirement::None,
            Some(Visibility::Restricted(role)) => Requirement::Role(role),
            Some(Visibility::Authenticated) | None => Requirement::Authenticated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Render,
    /// Signed in, but the cached identity lacks the role or admin flag.
    AccessDenied,
    RedirectToLogin,
}

/// Client-rendered guard run after the gate already let the navigation through.
pub fn guard(state: &AuthState, requirement: Requirement) -> GuardOutcome {
    if requirement == Requirement::None {
        return GuardOutcome::Render;
    }

    let Some(identity) = state.identity.as_ref().filter(|_| state.authenticated) else {
        return GuardOutcome::RedirectToLogin;
    };

    let permitted = match requirement {
        Requirement::None | Requirement::Authenticated => true,
        Requirement::Role(role) => identity.role == role,
        Requirement::Admin => identity.is_admin(),
    };

    if permitted {
        GuardOutcome::Render
    } else {
        GuardOutcome::AccessDenied
    }
}
