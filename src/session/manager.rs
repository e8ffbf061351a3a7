use super::{
    api::{self, ApiRequest},
    config::{Environment, SessionConfig},
    context::SessionContext,
    errors::SessionError,
    gateway::{Gateway, RequestOptions},
    navigation::{NavigationEffect, Navigator},
    state::{SessionSnapshot, User},
    token::TokenStore,
    types::{ProfileResponse, UpdateProfileRequest, LOGIN_PATH, LOGOUT_PATH, PROFILE_PATH},
};
use reqwest::Method;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Owns the session cell and keeps it in sync with the backend.
///
/// Cloning is cheap and every clone drives the same session.
#[derive(Clone, Debug)]
pub struct SessionManager {
    context: Arc<SessionContext>,
}

impl SessionManager {
    /// # Errors
    /// Returns `SessionError::Config` if the HTTP client cannot be built.
    pub fn new(
        config: SessionConfig,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, SessionError> {
        let context = SessionContext::new(config, tokens, navigator)?;
        Ok(Self {
            context: Arc::new(context),
        })
    }

    /// Resolves the initial session. Runs once per manager; later calls return
    /// the current snapshot without touching the network.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> SessionSnapshot {
        if !self.context.claim_bootstrap() {
            debug!("bootstrap already ran");
            return self.snapshot();
        }

        self.context.state.begin_loading();
        self.check_and_resolve().await
    }

    /// Re-checks the session without publishing a loading snapshot.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> SessionSnapshot {
        self.check_and_resolve().await
    }

    /// Re-checks the session, publishing `Loading` (with the cached user) first.
    #[instrument(skip(self))]
    pub async fn refresh_with_loading(&self) -> SessionSnapshot {
        self.context.state.begin_loading();
        self.check_and_resolve().await
    }

    async fn check_and_resolve(&self) -> SessionSnapshot {
        let user = match self.context.check_status().await {
            Ok(status) if status.authenticated => {
                let user = status.into_user();
                if user.is_none() {
                    warn!("status reported authenticated without a user");
                }
                user
            }
            Ok(_) => {
                debug!("backend reports no authenticated session");
                self.context.clear_credential();
                None
            }
            Err(err) => {
                warn!(error = %err, "Auth status check failed");
                None
            }
        };

        self.context.state.resolve(user);
        self.snapshot()
    }

    /// Sends the user to the identity provider entry point.
    ///
    /// # Errors
    /// Returns `SessionError::Config` when the API base is missing or invalid;
    /// nothing is emitted in that case.
    pub fn login(&self) -> Result<NavigationEffect, SessionError> {
        let base = self.context.config.api_base()?;
        let location = api::build_url_with_base(base, LOGIN_PATH);
        if !api::is_absolute_http(&location) {
            return Err(SessionError::Config(format!(
                "Login URL '{location}' is not an absolute http(s) URL."
            )));
        }

        let effect = NavigationEffect::redirect(location);
        info!("redirecting to identity provider");
        self.context.navigator.navigate(effect.clone());
        Ok(effect)
    }

    /// Ends the session. The backend call is best-effort; local state is
    /// always cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> SessionSnapshot {
        if let Err(err) = self.notify_logout().await {
            warn!(error = %err, "Logout request failed");
        }

        self.context.invalidate();
        info!("session cleared");
        self.snapshot()
    }

    async fn notify_logout(&self) -> Result<(), SessionError> {
        let base = self.context.config.api_base()?;
        let url = api::build_url_with_base(base, LOGOUT_PATH);
        let credential = self.context.tokens.load();
        let request = ApiRequest {
            method: Method::POST,
            url: &url,
            body: None,
            headers: &[],
        };

        let response = self.context.api.send(&request, credential.as_ref()).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(api::into_failure(response).await)
        }
    }

    /// Updates the display name and replaces the cached user with the
    /// server's copy.
    ///
    /// # Errors
    /// Any gateway error; the cached user is left unchanged.
    #[instrument(skip(self, name))]
    pub async fn update_profile(&self, name: &str) -> Result<User, SessionError> {
        let body = serde_json::to_value(UpdateProfileRequest {
            name: name.to_string(),
        })
        .map_err(|err| SessionError::Serialization(format!("Invalid profile update: {err}")))?;

        let profile: ProfileResponse = self
            .gateway()
            .request_json(PROFILE_PATH, RequestOptions::put(body))
            .await?;
        self.context.state.resolve(Some(profile.user.clone()));
        Ok(profile.user)
    }

    /// Fetches the profile and replaces the cached user with it.
    ///
    /// # Errors
    /// Any gateway error; the cached user is left unchanged.
    #[instrument(skip(self))]
    pub async fn get_profile(&self) -> Result<User, SessionError> {
        let profile: ProfileResponse = self
            .gateway()
            .request_json(PROFILE_PATH, RequestOptions::get())
            .await?;
        self.context.state.resolve(Some(profile.user.clone()));
        Ok(profile.user)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.context.state.snapshot()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.context.state.subscribe()
    }

    /// Gateway for the configured environment.
    #[must_use]
    pub fn gateway(&self) -> Gateway {
        self.gateway_for(self.context.config.environment)
    }

    #[must_use]
    pub fn gateway_for(&self, environment: Environment) -> Gateway {
        Gateway::new(self.context.clone(), environment)
    }

    #[must_use]
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.context.tokens
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.context.config
    }

    pub(crate) fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.context.navigator
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::{
        navigation::NavigationLog, state::Phase, token::MemoryTokenStore, Role,
    };
    use anyhow::Result;
    use secrecy::ExposeSecret;
    use serde_json::json;
    use std::{net::TcpListener, time::Duration};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn manager_with(
        config: SessionConfig,
        tokens: Arc<MemoryTokenStore>,
    ) -> (SessionManager, Arc<NavigationLog>) {
        let navigation = Arc::new(NavigationLog::new());
        let manager = SessionManager::new(config, tokens, navigation.clone()).unwrap();
        (manager, navigation)
    }

    async fn mount_status(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/auth/status"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn bootstrap_resolves_admin_user() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/status"))
            .and(header("Authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "authenticated": true,
                "user": {
                    "id": "u1",
                    "displayName": "Grace",
                    "email": "grace@example.dev",
                    "role": "admin",
                    "pictureUrl": "https://img.example.dev/g.png"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = Arc::new(MemoryTokenStore::with_token("abc123"));
        let (manager, _) = manager_with(SessionConfig::new(server.uri()), tokens);

        let snapshot = manager.bootstrap().await;
        assert!(!snapshot.is_loading());
        assert!(snapshot.is_authenticated());
        assert!(snapshot.is_admin());
        let user = snapshot.user().unwrap();
        assert_eq!(user.name, "Grace");
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.picture.as_deref(), Some("https://img.example.dev/g.png"));
        Ok(())
    }

    #[tokio::test]
    async fn bootstrap_settles_for_every_failure_mode() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }

        for response in [
            ResponseTemplate::new(200).set_body_json(json!({ "authenticated": false })),
            ResponseTemplate::new(200).set_body_json(json!({ "authenticated": true })),
            ResponseTemplate::new(401),
            ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })),
            ResponseTemplate::new(200).set_body_string("not json"),
        ] {
            let server = MockServer::start().await;
            mount_status(&server, response).await;
            let (manager, _) = manager_with(
                SessionConfig::new(server.uri()),
                Arc::new(MemoryTokenStore::new()),
            );

            let snapshot = manager.bootstrap().await;
            assert_eq!(snapshot, SessionSnapshot::anonymous());
            assert!(!snapshot.is_loading());
        }

        // Nothing listens on port 9.
        let (manager, _) = manager_with(
            SessionConfig::new("http://127.0.0.1:9"),
            Arc::new(MemoryTokenStore::new()),
        );
        assert!(!manager.bootstrap().await.is_loading());

        let (manager, _) = manager_with(
            SessionConfig::default(),
            Arc::new(MemoryTokenStore::with_token("abc123")),
        );
        let snapshot = manager.bootstrap().await;
        assert!(!snapshot.is_loading());
        assert!(!snapshot.is_authenticated());
        Ok(())
    }

    #[tokio::test]
    async fn bootstrap_runs_once() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "authenticated": true,
                "user": { "id": "u1", "role": "member" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (manager, _) = manager_with(
            SessionConfig::new(server.uri()),
            Arc::new(MemoryTokenStore::new()),
        );
        let first = manager.bootstrap().await;
        let second = manager.clone().bootstrap().await;
        assert_eq!(first, second);
        assert_eq!(second.phase(), Phase::Authenticated);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_twice_is_stable() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_status(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "authenticated": true,
                "user": { "id": "u1", "name": "Ada", "email": "ada@example.dev", "role": "member" }
            })),
        )
        .await;

        let (manager, _) = manager_with(
            SessionConfig::new(server.uri()),
            Arc::new(MemoryTokenStore::with_token("abc123")),
        );
        let first = manager.refresh().await;
        let second = manager.refresh().await;
        assert_eq!(first, second);
        assert!(first.is_authenticated());
        assert!(!first.is_admin());
        Ok(())
    }

    #[tokio::test]
    async fn refresh_with_loading_keeps_user_while_checking() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_status(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "authenticated": true,
                    "user": { "id": "u1", "role": "member" }
                }))
                .set_delay(Duration::from_millis(200)),
        )
        .await;

        let (manager, _) = manager_with(
            SessionConfig::new(server.uri()),
            Arc::new(MemoryTokenStore::new()),
        );
        manager.refresh().await;

        let refreshing = manager.clone();
        let pending = tokio::spawn(async move { refreshing.refresh_with_loading().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let in_flight = manager.snapshot();
        assert_eq!(in_flight.phase(), Phase::Loading);
        assert_eq!(in_flight.user().map(|u| u.id.as_str()), Some("u1"));

        let final_snapshot = pending.await?;
        assert!(final_snapshot.is_authenticated());
        assert_eq!(
            manager.context.state.published_phases(),
            vec![
                Phase::Loading,
                Phase::Authenticated,
                Phase::Loading,
                Phase::Authenticated
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn explicit_unauthenticated_status_clears_token() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_status(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "authenticated": false })),
        )
        .await;

        let tokens = Arc::new(MemoryTokenStore::with_token("old"));
        let (manager, _) = manager_with(SessionConfig::new(server.uri()), tokens.clone());
        let snapshot = manager.refresh().await;

        assert_eq!(snapshot, SessionSnapshot::anonymous());
        assert!(tokens.load().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn server_error_keeps_token() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_status(&server, ResponseTemplate::new(503)).await;

        let tokens = Arc::new(MemoryTokenStore::with_token("keep-me"));
        let (manager, _) = manager_with(SessionConfig::new(server.uri()), tokens.clone());
        let snapshot = manager.refresh().await;

        assert!(!snapshot.is_authenticated());
        assert_eq!(tokens.load().unwrap().expose_secret(), "keep-me");
        Ok(())
    }

    #[tokio::test]
    async fn logout_clears_state_even_when_endpoint_fails() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_status(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "authenticated": true,
                "user": { "id": "u1", "role": "admin" }
            })),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .and(header("Authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = Arc::new(MemoryTokenStore::with_token("abc123"));
        let (manager, _) = manager_with(SessionConfig::new(server.uri()), tokens.clone());
        assert!(manager.bootstrap().await.is_admin());

        let snapshot = manager.logout().await;
        assert!(snapshot.user().is_none());
        assert!(!snapshot.is_loading());
        assert!(tokens.load().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn logout_without_config_still_clears() {
        let tokens = Arc::new(MemoryTokenStore::with_token("abc123"));
        let (manager, _) = manager_with(SessionConfig::default(), tokens.clone());
        let snapshot = manager.logout().await;
        assert_eq!(snapshot, SessionSnapshot::anonymous());
        assert!(tokens.load().is_none());
    }

    #[test]
    fn login_redirects_to_provider_entry() {
        let (manager, navigation) = manager_with(
            SessionConfig::new("https://api.example.dev/"),
            Arc::new(MemoryTokenStore::new()),
        );
        let effect = manager.login().unwrap();
        assert_eq!(
            effect,
            NavigationEffect::redirect("https://api.example.dev/auth/google")
        );
        assert_eq!(navigation.effects(), vec![effect]);
    }

    #[test]
    fn login_without_api_base_emits_nothing() {
        for base in ["", "   ", "api.example.dev", "ftp://api.example.dev"] {
            let (manager, navigation) =
                manager_with(SessionConfig::new(base), Arc::new(MemoryTokenStore::new()));
            assert!(matches!(manager.login(), Err(SessionError::Config(_))));
            assert!(navigation.effects().is_empty());
        }
    }

    #[tokio::test]
    async fn profile_update_replaces_cached_user() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_status(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "authenticated": true,
                "user": { "id": "u1", "name": "Old", "role": "member" }
            })),
        )
        .await;
        Mock::given(method("PUT"))
            .and(path("/auth/me"))
            .and(body_json(json!({ "name": "New Name" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "id": "u1", "name": "New Name", "email": "n@example.dev", "role": "member" }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "id": "u1", "name": "Fetched", "role": "admin" }
            })))
            .mount(&server)
            .await;

        let (manager, _) = manager_with(
            SessionConfig::new(server.uri()).with_environment(Environment::Development),
            Arc::new(MemoryTokenStore::with_token("abc123")),
        );
        manager.bootstrap().await;

        let user = manager.update_profile("New Name").await?;
        assert_eq!(user.name, "New Name");
        assert_eq!(
            manager.snapshot().user().map(|user| user.name.as_str()),
            Some("New Name")
        );

        let fetched = manager.get_profile().await?;
        assert!(fetched.is_admin());
        assert!(manager.snapshot().is_admin());
        Ok(())
    }

    #[tokio::test]
    async fn failed_profile_update_keeps_user() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_status(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "authenticated": true,
                "user": { "id": "u1", "name": "Old", "role": "member" }
            })),
        )
        .await;
        Mock::given(method("PUT"))
            .and(path("/auth/me"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "message": "Name too long" })),
            )
            .mount(&server)
            .await;

        let (manager, _) = manager_with(
            SessionConfig::new(server.uri()),
            Arc::new(MemoryTokenStore::new()),
        );
        manager.bootstrap().await;

        let err = manager.update_profile(&"x".repeat(300)).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(
            manager.snapshot().user().map(|user| user.name.as_str()),
            Some("Old")
        );
        Ok(())
    }
}
