//! Session state for the client. A single [`SessionState`] cell holds the
//! current [`SessionSnapshot`]; consumers read it or subscribe to changes, and
//! only the manager and the gateway's invalidation path write to it. Only
//! non-sensitive user metadata is kept here; credentials live in the token store.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    #[serde(other)]
    Member,
}

/// Authenticated user as reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, alias = "displayName")]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, alias = "pictureUrl", skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    Loading,
    Authenticated,
    Anonymous,
}

/// Read-only view of the session at a point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    phase: Phase,
    user: Option<User>,
}

impl SessionSnapshot {
    /// Snapshot at application start: loading, nobody logged in.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            phase: Phase::Uninitialized,
            user: None,
        }
    }

    /// Loading snapshot that keeps whatever user was cached.
    #[must_use]
    pub const fn loading(user: Option<User>) -> Self {
        Self {
            phase: Phase::Loading,
            user,
        }
    }

    /// Settled snapshot; the phase follows from the presence of a user.
    #[must_use]
    pub fn resolved(user: Option<User>) -> Self {
        let phase = if user.is_some() {
            Phase::Authenticated
        } else {
            Phase::Anonymous
        };
        Self { phase, user }
    }

    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            phase: Phase::Anonymous,
            user: None,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Uninitialized | Phase::Loading)
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

/// Shared session cell. Cloning yields another handle to the same cell.
#[derive(Clone, Debug)]
pub struct SessionState {
    tx: Arc<watch::Sender<SessionSnapshot>>,
    #[cfg(test)]
    history: Arc<std::sync::Mutex<Vec<Phase>>>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::initial());
        Self {
            tx: Arc::new(tx),
            #[cfg(test)]
            history: Arc::default(),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    /// Publishes a loading snapshot, keeping the cached user.
    pub(crate) fn begin_loading(&self) {
        let user = self.tx.borrow().user.clone();
        self.publish(SessionSnapshot::loading(user));
    }

    /// Publishes a settled snapshot. A cell that never left `Uninitialized`
    /// passes through `Loading` first so no phase is skipped.
    pub(crate) fn resolve(&self, user: Option<User>) {
        if self.tx.borrow().phase == Phase::Uninitialized {
            self.publish(SessionSnapshot::loading(None));
        }
        self.publish(SessionSnapshot::resolved(user));
    }

    fn publish(&self, next: SessionSnapshot) {
        #[cfg(test)]
        if let Ok(mut history) = self.history.lock() {
            history.push(next.phase);
        }
        let previous = self.tx.send_replace(next);
        let current = self.tx.borrow();
        debug!(
            from = ?previous.phase,
            to = ?current.phase,
            user_id = current.user.as_ref().map(|user| user.id.as_str()),
            "session state updated"
        );
    }
}

#[cfg(test)]
impl SessionState {
    /// Every phase published so far, in order.
    pub(crate) fn published_phases(&self) -> Vec<Phase> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
