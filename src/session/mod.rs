//! Session subsystem: credential storage, the shared session cell, the manager
//! that keeps it current, the authenticated request gateway and the OAuth
//! callback handler. This module touches security boundaries and must avoid
//! logging secrets or token material.
//!
//! Flow Overview: the callback handler writes the token and asks the manager to
//! refresh; the manager resolves the snapshot from `GET /auth/status`; consumers
//! read the snapshot and call the API through the gateway, which may probe the
//! status endpoint, retry once, or invalidate the session.

pub mod api;
pub mod callback;
mod context;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod guards;
pub mod manager;
pub mod navigation;
pub mod state;
pub mod token;
pub mod types;

pub use callback::{CallbackHandler, CallbackOutcome, FailureNotice};
pub use config::{Environment, RuntimeConfig, SessionConfig};
pub use errors::SessionError;
pub use gateway::{Gateway, RecoveryStep, RequestOptions, UnauthorizedRecovery};
pub use guards::{GuardDecision, Requirement};
pub use manager::SessionManager;
pub use navigation::{NavigationEffect, NavigationLog, Navigator};
pub use state::{Phase, Role, SessionSnapshot, SessionState, User};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
