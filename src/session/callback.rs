//! Landing handlers for the identity-provider redirect. A successful redirect
//! may carry the bearer token as a `token` query parameter (hybrid backends) or
//! rely on a session cookie alone; either way the handler waits for the
//! backend to settle, re-checks the session and routes the user onward.

use super::{
    manager::SessionManager,
    navigation::{NavigationEffect, AUTH_FAILURE_ROUTE},
    state::User,
};
use secrecy::SecretString;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use url::Url;

const TOKEN_PARAM: &str = "token";
const ERROR_PARAM: &str = "error";
/// Base used to parse callback paths that arrive without scheme and host.
const RELATIVE_BASE: &str = "http://callback.invalid";

pub const CANCELLED_MESSAGE: &str = "Authentication was cancelled. Please try again.";
pub const INVALID_REQUEST_MESSAGE: &str = "Invalid authentication request. Please try again.";
pub const GENERIC_MESSAGE: &str = "Authentication failed. Please try again.";

/// User-facing explanation of a failed sign-in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailureNotice {
    /// Raw `error` query value, when the provider sent one.
    pub code: Option<String>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallbackOutcome {
    Authenticated { user: User },
    Unauthenticated,
    Failed { notice: FailureNotice },
}

#[derive(Clone, Debug)]
pub struct CallbackHandler {
    manager: SessionManager,
}

impl CallbackHandler {
    #[must_use]
    pub const fn new(manager: SessionManager) -> Self {
        Self { manager }
    }

    /// Dispatches a raw redirect URL to the success or failure handler.
    pub async fn handle(&self, raw_url: &str) -> CallbackOutcome {
        let is_failure = CallbackUrl::parse(raw_url)
            .is_some_and(|url| url.url.path().trim_end_matches('/') == AUTH_FAILURE_ROUTE);

        if is_failure {
            let notice = self.handle_failure(raw_url).await;
            CallbackOutcome::Failed { notice }
        } else {
            self.handle_success(raw_url).await
        }
    }

    /// Completes a successful sign-in and navigates to the landing route, or to
    /// the login route when the backend does not confirm the session.
    #[instrument(skip_all)]
    pub async fn handle_success(&self, raw_url: &str) -> CallbackOutcome {
        let mut stored = false;

        if let Some(mut url) = CallbackUrl::parse(raw_url) {
            if let Some(token) = url.take_token() {
                match self.manager.tokens().store(SecretString::from(token)) {
                    Ok(()) => {
                        stored = true;
                        info!("stored credential from callback");
                    }
                    Err(err) => error!(error = %err, "failed to store callback credential"),
                }
                self.emit(NavigationEffect::ReplaceUrl { url: url.render() });
            }
        }

        tokio::time::sleep(self.manager.config().settle_delay).await;

        let snapshot = self.manager.refresh().await;
        if let Some(user) = snapshot.user() {
            info!(user_id = %user.id, "sign-in confirmed");
            self.emit(NavigationEffect::replace_with(
                self.manager.config().landing_route.clone(),
            ));
            return CallbackOutcome::Authenticated { user: user.clone() };
        }

        warn!("backend did not confirm the session after callback");
        if stored {
            if let Err(err) = self.manager.tokens().clear() {
                error!(error = %err, "failed to clear callback credential");
            }
        }
        self.emit(NavigationEffect::replace_with(
            self.manager.config().login_route.clone(),
        ));
        CallbackOutcome::Unauthenticated
    }

    /// Shows the failure notice for the display delay, then returns to login.
    #[instrument(skip_all)]
    pub async fn handle_failure(&self, raw_url: &str) -> FailureNotice {
        let notice = Self::failure_notice(raw_url);
        warn!(code = ?notice.code, "sign-in failed");

        tokio::time::sleep(self.manager.config().failure_display_delay).await;
        self.emit(NavigationEffect::replace_with(
            self.manager.config().login_route.clone(),
        ));
        notice
    }

    /// Maps the provider's `error` parameter to a user-facing message.
    #[must_use]
    pub fn failure_notice(raw_url: &str) -> FailureNotice {
        let code = CallbackUrl::parse(raw_url).and_then(|url| url.param(ERROR_PARAM));
        let message = match code.as_deref() {
            Some("access_denied") => CANCELLED_MESSAGE,
            Some("invalid_request") => INVALID_REQUEST_MESSAGE,
            _ => GENERIC_MESSAGE,
        };

        FailureNotice {
            code,
            message: message.to_string(),
        }
    }

    fn emit(&self, effect: NavigationEffect) {
        self.manager.navigator().navigate(effect);
    }
}

/// Callback URL that remembers whether it arrived as a bare path.
struct CallbackUrl {
    url: Url,
    relative: bool,
}

impl CallbackUrl {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(url) = Url::parse(raw) {
            return Some(Self {
                url,
                relative: false,
            });
        }

        Url::parse(RELATIVE_BASE)
            .and_then(|base| base.join(raw))
            .ok()
            .map(|url| Self {
                url,
                relative: true,
            })
    }

    fn param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Removes the token parameter, keeping every other parameter in order.
    fn take_token(&mut self) -> Option<String> {
        let token = self.param(TOKEN_PARAM)?;

        let kept: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(key, _)| key != TOKEN_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        if kept.is_empty() {
            self.url.set_query(None);
        } else {
            self.url.query_pairs_mut().clear().extend_pairs(kept.iter());
        }

        Some(token)
    }

    fn render(&self) -> String {
        if !self.relative {
            return self.url.to_string();
        }

        let mut rendered = self.url.path().to_string();
        if let Some(query) = self.url.query() {
            rendered.push('?');
            rendered.push_str(query);
        }
        if let Some(fragment) = self.url.fragment() {
            rendered.push('#');
            rendered.push_str(fragment);
        }
        rendered
    }
}
