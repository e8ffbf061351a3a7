use super::{
    api::{self, ApiClient, ApiRequest},
    config::SessionConfig,
    errors::SessionError,
    navigation::Navigator,
    state::SessionState,
    token::TokenStore,
    types::{StatusResponse, STATUS_PATH},
};
use reqwest::Method;
use secrecy::SecretString;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, error, instrument};

/// Everything the manager, gateway and callback handler share. Owned once
/// behind an `Arc`; the state cell inside is the only mutable session data.
#[derive(Debug)]
pub(crate) struct SessionContext {
    pub(crate) config: SessionConfig,
    pub(crate) api: ApiClient,
    pub(crate) tokens: Arc<dyn TokenStore>,
    pub(crate) state: SessionState,
    pub(crate) navigator: Arc<dyn Navigator>,
    bootstrapped: AtomicBool,
}

impl SessionContext {
    pub(crate) fn new(
        config: SessionConfig,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, SessionError> {
        let api = ApiClient::new(&config)?;
        Ok(Self {
            config,
            api,
            tokens,
            state: SessionState::new(),
            navigator,
            bootstrapped: AtomicBool::new(false),
        })
    }

    /// Marks bootstrap as started; returns false if it already ran.
    pub(crate) fn claim_bootstrap(&self) -> bool {
        !self.bootstrapped.swap(true, Ordering::SeqCst)
    }

    /// Issues `GET /auth/status` with the current credential. A refreshed token
    /// in an authenticated response replaces the stored one.
    #[instrument(skip(self))]
    pub(crate) async fn check_status(&self) -> Result<StatusResponse, SessionError> {
        let base = self.config.api_base()?;
        let url = api::build_url_with_base(base, STATUS_PATH);
        let credential = self.tokens.load();

        let request = ApiRequest {
            method: Method::GET,
            url: &url,
            body: None,
            headers: &[],
        };
        let response = self.api.send(&request, credential.as_ref()).await?;
        if !response.status().is_success() {
            return Err(api::into_failure(response).await);
        }

        let status: StatusResponse = api::parse_json(response).await?;
        if let Some(token) = status.token.as_deref().filter(|t| !t.trim().is_empty()) {
            if status.authenticated {
                self.tokens.store(SecretString::from(token.trim().to_string()))?;
                debug!("status check rotated the stored credential");
            }
        }

        Ok(status)
    }

    /// Drops the credential and publishes the anonymous snapshot.
    pub(crate) fn invalidate(&self) {
        self.clear_credential();
        self.state.resolve(None);
    }

    /// Clears the stored credential; failures are logged, never propagated.
    pub(crate) fn clear_credential(&self) {
        if let Err(err) = self.tokens.clear() {
            error!(error = %err, "failed to clear stored credential");
        }
    }
}
