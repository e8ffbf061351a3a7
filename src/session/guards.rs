//! Route guards. These are UX-only: real access control must live on the API.

use super::{navigation::NavigationEffect, state::SessionSnapshot};
use serde::Serialize;

pub const FORBIDDEN_MESSAGE: &str = "You need admin privileges to access this page.";

/// What a protected route asks of the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Requirement {
    #[default]
    Authenticated,
    Admin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardDecision {
    /// Session still resolving; show a loading indicator.
    Pending,
    Allow,
    /// Nobody signed in; show the login page.
    Login,
    /// Signed in without the required role.
    Forbidden,
}

impl GuardDecision {
    #[must_use]
    pub fn evaluate(snapshot: &SessionSnapshot, requirement: Requirement) -> Self {
        if snapshot.is_loading() {
            return Self::Pending;
        }
        if !snapshot.is_authenticated() {
            return Self::Login;
        }
        if requirement == Requirement::Admin && !snapshot.is_admin() {
            return Self::Forbidden;
        }
        Self::Allow
    }

    /// Navigation the shell should perform for this decision, if any.
    #[must_use]
    pub fn effect(self, login_route: &str) -> Option<NavigationEffect> {
        match self {
            Self::Login => Some(NavigationEffect::replace_with(login_route)),
            Self::Pending | Self::Allow | Self::Forbidden => None,
        }
    }

    #[must_use]
    pub const fn message(self) -> Option<&'static str> {
        match self {
            Self::Forbidden => Some(FORBIDDEN_MESSAGE),
            Self::Pending | Self::Allow | Self::Login => None,
        }
    }
}
