//! Authenticated request gateway. Every API call goes through [`Gateway`], which
//! attaches the bearer credential and hides a stale credential from callers:
//! a `401` triggers one status probe and at most one retry before the session
//! is declared expired.
//!
//! The recovery protocol is the [`UnauthorizedRecovery`] state machine:
//!
//! ```text
//! Probe --authenticated--> Retry --success--> (response returned)
//!   |                        |
//!   +--anything else-----> Escalate <--failure--+
//! ```
//!
//! Escalation clears the credential, publishes the anonymous snapshot and then
//! either raises `SessionError::SessionExpired` (development) or emits a
//! redirect to the login route and returns `SessionError::Redirected`
//! (production).

use super::{
    api::{self, ApiRequest},
    config::Environment,
    context::SessionContext,
    errors::SessionError,
    navigation::NavigationEffect,
    types::StatusResponse,
};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Method, body and extra headers for a gateway call.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn post(body: Value) -> Self {
        Self::with_body(Method::POST, body)
    }

    #[must_use]
    pub fn put(body: Value) -> Self {
        Self::with_body(Method::PUT, body)
    }

    #[must_use]
    pub fn delete() -> Self {
        Self {
            method: Method::DELETE,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_body(method: Method, body: Value) -> Self {
        Self {
            method,
            body: Some(body),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryStep {
    /// Ask `/auth/status` whether the session is still alive.
    Probe,
    /// Re-send the original request once.
    Retry,
    /// Give up: invalidate the session and surface the expiry.
    Escalate,
}

/// Recovery protocol for a single logical call that received a `401`. Steps
/// only move forward, so a call probes at most once and retries at most once.
#[derive(Debug)]
pub struct UnauthorizedRecovery {
    step: RecoveryStep,
    probes: u8,
    retries: u8,
}

impl UnauthorizedRecovery {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            step: RecoveryStep::Probe,
            probes: 0,
            retries: 0,
        }
    }

    #[must_use]
    pub const fn step(&self) -> RecoveryStep {
        self.step
    }

    #[must_use]
    pub const fn probes(&self) -> u8 {
        self.probes
    }

    #[must_use]
    pub const fn retries(&self) -> u8 {
        self.retries
    }

    /// Records the probe result; only an authenticated probe earns a retry.
    pub fn probed(&mut self, authenticated: bool) {
        if self.step != RecoveryStep::Probe {
            self.step = RecoveryStep::Escalate;
            return;
        }
        self.probes += 1;
        self.step = if authenticated {
            RecoveryStep::Retry
        } else {
            RecoveryStep::Escalate
        };
    }

    /// Records a failed retry. A successful retry ends the protocol without
    /// consulting the machine again.
    pub fn retry_failed(&mut self) {
        if self.step == RecoveryStep::Retry {
            self.retries += 1;
        }
        self.step = RecoveryStep::Escalate;
    }
}

impl Default for UnauthorizedRecovery {
    fn default() -> Self {
        Self::new()
    }
}

/// Authenticated request wrapper bound to one session.
#[derive(Clone, Debug)]
pub struct Gateway {
    context: Arc<SessionContext>,
    environment: Environment,
}

impl Gateway {
    pub(crate) fn new(context: Arc<SessionContext>, environment: Environment) -> Self {
        Self {
            context,
            environment,
        }
    }

    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Performs an authenticated call and returns the decoded JSON body.
    ///
    /// # Errors
    /// See [`Gateway::request_json`].
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, SessionError> {
        self.request_json(path, options).await
    }

    /// Performs an authenticated call and decodes the JSON body into `T`.
    ///
    /// # Errors
    /// - `SessionError::Config` for a relative path without an API base.
    /// - `SessionError::Http` for non-401 failures, with the server's message.
    /// - `SessionError::SessionExpired` / `SessionError::Redirected` once the
    ///   401 recovery protocol is exhausted.
    /// - `SessionError::Network`, `Timeout` or `Parse` for transport and body errors.
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, SessionError> {
        let url = self.context.api.resolve_url(path)?;
        let request = ApiRequest {
            method: options.method.clone(),
            url: &url,
            body: options.body.as_ref(),
            headers: &options.headers,
        };

        let response = self.send(&request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return finish(response).await;
        }

        warn!(url = %url, "401 Unauthorized - attempting to refresh auth status");

        let mut recovery = UnauthorizedRecovery::new();
        loop {
            match recovery.step() {
                RecoveryStep::Probe => {
                    let authenticated = self.probe().await;
                    recovery.probed(authenticated);
                }
                RecoveryStep::Retry => {
                    info!(url = %url, "auth status refreshed, retrying request");
                    match self.send(&request).await {
                        Ok(response) if response.status().is_success() => {
                            return api::parse_json(response).await;
                        }
                        Ok(response) => {
                            warn!(status = %response.status(), "retry failed");
                            recovery.retry_failed();
                        }
                        Err(err) => {
                            warn!(error = %err, "retry failed");
                            recovery.retry_failed();
                        }
                    }
                }
                RecoveryStep::Escalate => {
                    debug!(
                        probes = recovery.probes(),
                        retries = recovery.retries(),
                        "recovery exhausted"
                    );
                    return Err(self.escalate());
                }
            }
        }
    }

    async fn send(&self, request: &ApiRequest<'_>) -> Result<Response, SessionError> {
        let credential = self.context.tokens.load();
        self.context.api.send(request, credential.as_ref()).await
    }

    /// Runs the recovery probe; publishes the user when the session is alive.
    async fn probe(&self) -> bool {
        match self.context.check_status().await.map(StatusResponse::into_user) {
            Ok(Some(user)) => {
                self.context.state.resolve(Some(user));
                true
            }
            Ok(None) => {
                debug!("probe reports no authenticated session");
                false
            }
            Err(err) => {
                warn!(error = %err, "Auth status check failed");
                false
            }
        }
    }

    /// Treats the session as genuinely expired.
    fn escalate(&self) -> SessionError {
        self.context.invalidate();

        match self.environment {
            Environment::Development => {
                warn!("session expired, surfacing error to caller");
                SessionError::SessionExpired
            }
            Environment::Production => {
                let location = self.context.config.login_route.clone();
                self.context
                    .navigator
                    .navigate(NavigationEffect::redirect(location.clone()));
                SessionError::Redirected { location }
            }
        }
    }
}

async fn finish<T: DeserializeOwned>(response: Response) -> Result<T, SessionError> {
    if response.status().is_success() {
        api::parse_json(response).await
    } else {
        Err(api::into_failure(response).await)
    }
}
