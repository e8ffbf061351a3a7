use anyhow::{ensure, Context, Result};
use authsession::session::{
    CallbackHandler, CallbackOutcome, Environment, FileTokenStore, GuardDecision,
    NavigationEffect, NavigationLog, Phase, RequestOptions, Requirement, SessionConfig,
    SessionError, SessionManager, TokenStore,
};
use secrecy::ExposeSecret;
use serde_json::json;
use std::{fs, net::TcpListener, path::PathBuf, sync::Arc, time::Duration};
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Result<Self> {
        let dir = std::env::temp_dir().join(format!("authsession-flow-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).context("failed to create temp dir")?;
        Ok(Self(dir))
    }

    fn file(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn config(server: &MockServer, environment: Environment) -> SessionConfig {
    let mut config = SessionConfig::new(server.uri()).with_environment(environment);
    config.settle_delay = Duration::from_millis(10);
    config.failure_display_delay = Duration::from_millis(10);
    config
}

async fn count_requests(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}

#[tokio::test]
async fn sign_in_request_and_sign_out() -> Result<()> {
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
            "user": { "id": "u1", "displayName": "Ada", "email": "ada@example.dev", "role": "member" }
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "authenticated": false })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/devices/list"))
        .and(header("Authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "serialNumber": "SN-1" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    let tokens = Arc::new(FileTokenStore::new(dir.file("tokens.json"), "auth_token"));
    let navigation = Arc::new(NavigationLog::new());
    let manager = SessionManager::new(
        config(&server, Environment::Production),
        tokens.clone(),
        navigation.clone(),
    )?;

    // Nobody is signed in yet.
    let snapshot = manager.bootstrap().await;
    ensure!(snapshot.phase() == Phase::Anonymous, "expected anonymous start");
    ensure!(
        GuardDecision::evaluate(&snapshot, Requirement::Authenticated) == GuardDecision::Login,
        "guard should send anonymous users to login"
    );

    let redirect = manager.login()?;
    ensure!(
        redirect == NavigationEffect::redirect(format!("{}/auth/google", server.uri())),
        "unexpected login redirect: {redirect}"
    );

    let outcome = CallbackHandler::new(manager.clone())
        .handle("/auth/success?token=abc123")
        .await;
    ensure!(
        matches!(outcome, CallbackOutcome::Authenticated { .. }),
        "callback did not authenticate: {outcome:?}"
    );
    ensure!(
        navigation.drain()
            == vec![
                redirect,
                NavigationEffect::ReplaceUrl {
                    url: "/auth/success".to_string()
                },
                NavigationEffect::replace_with("/dashboard"),
            ],
        "unexpected navigation sequence"
    );

    // A second manager over the same file sees the persisted credential.
    let reopened = FileTokenStore::new(dir.file("tokens.json"), "auth_token");
    ensure!(
        reopened
            .load()
            .is_some_and(|token| token.expose_secret() == "abc123"),
        "credential was not persisted"
    );

    let devices = manager
        .gateway()
        .request("/devices/list", RequestOptions::get())
        .await?;
    ensure!(devices == json!([{ "serialNumber": "SN-1" }]), "unexpected body");

    let snapshot = manager.logout().await;
    ensure!(snapshot.user().is_none(), "user survived logout");
    ensure!(tokens.load().is_none(), "credential survived logout");
    ensure!(
        !dir.file("tokens.json").exists(),
        "empty token file should be removed"
    );
    Ok(())
}

#[tokio::test]
async fn expired_session_in_development_surfaces_error() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/list"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "expired" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authenticated": true,
            "user": { "id": "u9", "role": "admin" }
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    let tokens = Arc::new(FileTokenStore::new(dir.file("tokens.json"), "auth_token"));
    tokens.store("stale".to_string().into())?;
    let navigation = Arc::new(NavigationLog::new());
    let manager = SessionManager::new(
        config(&server, Environment::Development),
        tokens.clone(),
        navigation.clone(),
    )?;

    let result = manager
        .gateway()
        .request("/users/list", RequestOptions::get())
        .await;

    ensure!(
        result == Err(SessionError::SessionExpired),
        "unexpected result: {result:?}"
    );
    ensure!(count_requests(&server, "/users/list").await == 2, "expected one retry");
    ensure!(count_requests(&server, "/auth/status").await == 1, "expected one probe");
    ensure!(tokens.load().is_none(), "credential survived expiry");
    ensure!(
        manager.snapshot().phase() == Phase::Anonymous,
        "session should be anonymous"
    );
    ensure!(navigation.effects().is_empty(), "development must not redirect");
    Ok(())
}

#[tokio::test]
async fn failed_callback_returns_to_login() -> Result<()> {
    let dir = TempDir::new()?;
    let tokens = Arc::new(FileTokenStore::new(dir.file("tokens.json"), "auth_token"));
    let navigation = Arc::new(NavigationLog::new());
    let mut config = SessionConfig::new("https://api.example.dev");
    config.failure_display_delay = Duration::from_millis(10);
    let manager = SessionManager::new(config, tokens, navigation.clone())?;

    let outcome = CallbackHandler::new(manager)
        .handle("https://app.example.dev/auth/failure?error=invalid_request")
        .await;

    let CallbackOutcome::Failed { notice } = outcome else {
        anyhow::bail!("expected failure outcome");
    };
    ensure!(
        notice.message == "Invalid authentication request. Please try again.",
        "unexpected notice: {}",
        notice.message
    );
    ensure!(
        navigation.effects() == vec![NavigationEffect::replace_with("/login")],
        "expected login navigation"
    );
    Ok(())
}
