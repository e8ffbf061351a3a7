//! Request and response payloads for the backend auth endpoints. Status
//! responses may carry a refreshed bearer token, so they must never be logged.

use super::state::User;
use serde::{Deserialize, Serialize};

pub const STATUS_PATH: &str = "/auth/status";
pub const LOGIN_PATH: &str = "/auth/google";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const PROFILE_PATH: &str = "/auth/me";

/// Body of `GET /auth/status`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<User>,
    /// Replacement bearer token, sent by backends that rotate credentials.
    #[serde(default)]
    pub token: Option<String>,
}

impl StatusResponse {
    /// The reported user, only when the backend also says the session is valid.
    #[must_use]
    pub fn into_user(self) -> Option<User> {
        if self.authenticated {
            self.user
        } else {
            None
        }
    }
}

/// Body of `GET /auth/me` and `PUT /auth/me`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: User,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}

/// Best-effort error payload returned by the backend.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
