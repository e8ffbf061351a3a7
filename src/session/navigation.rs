//! Navigation as data. The session code never touches `window.location`; it
//! emits [`NavigationEffect`] values to a [`Navigator`] supplied by the shell.

use serde::Serialize;
use std::{
    fmt,
    sync::{Mutex, PoisonError},
};
use tracing::info;

/// Route that receives a failed identity-provider redirect.
pub const AUTH_FAILURE_ROUTE: &str = "/auth/failure";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationEffect {
    /// Full page load of `location` (absolute URL or in-app path).
    Redirect { location: String },
    /// In-app navigation; `replace` drops the current history entry.
    Navigate { path: String, replace: bool },
    /// Rewrites the visible URL without navigating.
    ReplaceUrl { url: String },
}

impl NavigationEffect {
    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
        }
    }

    #[must_use]
    pub fn replace_with(path: impl Into<String>) -> Self {
        Self::Navigate {
            path: path.into(),
            replace: true,
        }
    }

    /// Destination of the effect, whatever its kind.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Redirect { location } => location,
            Self::Navigate { path, .. } => path,
            Self::ReplaceUrl { url } => url,
        }
    }
}

impl fmt::Display for NavigationEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redirect { location } => write!(f, "redirect {location}"),
            Self::Navigate {
                path,
                replace: true,
            } => write!(f, "navigate {path} (replace)"),
            Self::Navigate { path, .. } => write!(f, "navigate {path}"),
            Self::ReplaceUrl { url } => write!(f, "replace url {url}"),
        }
    }
}

/// Performs (or records) navigation on behalf of the session code.
pub trait Navigator: Send + Sync + fmt::Debug {
    fn navigate(&self, effect: NavigationEffect);
}

/// Navigator that records every effect in order.
#[derive(Debug, Default)]
pub struct NavigationLog {
    effects: Mutex<Vec<NavigationEffect>>,
}

impl NavigationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Effects emitted so far, oldest first.
    #[must_use]
    pub fn effects(&self) -> Vec<NavigationEffect> {
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<NavigationEffect> {
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Removes and returns every recorded effect.
    pub fn drain(&self) -> Vec<NavigationEffect> {
        std::mem::take(&mut *self.effects.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Navigator for NavigationLog {
    fn navigate(&self, effect: NavigationEffect) {
        info!(effect = %effect, "navigation");
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(effect);
    }
}
