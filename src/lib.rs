//! # authsession (client-side session manager)
//!
//! `authsession` owns everything a client needs to talk to an authenticated API:
//! it keeps the bearer credential, knows who is logged in, and wraps every API
//! call so a stale credential is recovered once before the user is sent back to
//! the login screen.
//!
//! ## Session lifecycle
//!
//! 1. **Bootstrap:** the manager publishes a loading snapshot and asks the backend
//!    `GET /auth/status` whether the stored credential (or cookie) is still valid.
//! 2. **Login:** the client is redirected to `{api}/auth/google`; the identity
//!    provider returns to `/auth/success?token=...` or `/auth/failure?error=...`.
//! 3. **Callback:** the token is persisted, stripped from the visible URL and the
//!    session is refreshed before landing on the dashboard.
//! 4. **Requests:** the gateway attaches `Authorization: Bearer`, and on a `401`
//!    runs one status probe and one retry before declaring the session expired.
//! 5. **Logout:** the backend is notified best-effort; local state is always cleared.
//!
//! Navigation is never performed in place. Every redirect is a
//! [`session::NavigationEffect`] handed to an injected [`session::Navigator`],
//! so the same code drives a browser shell, the bundled CLI, or a test.

pub mod cli;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
