//! Session configuration with defaults and optional runtime overrides. Shells
//! (the CLI, a browser bootstrap script) collect overrides into a
//! [`RuntimeConfig`]; empty values are ignored so a blank env var never wipes a
//! default. Configuration values are public; do not store secrets here.

use super::errors::SessionError;
use std::{fmt, str::FromStr, time::Duration};
use url::Url;

/// Default storage key for the bearer credential.
pub const DEFAULT_STORAGE_KEY: &str = "auth_token";
/// Route the user lands on after a successful login.
pub const DEFAULT_LANDING_ROUTE: &str = "/dashboard";
/// Route that renders the login screen.
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";
/// Delay between persisting a callback token and refreshing the session.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;
/// How long a callback failure message stays visible before going to login.
pub const DEFAULT_FAILURE_DISPLAY_MS: u64 = 3_000;
/// Default request timeout (milliseconds) applied to every HTTP call.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Controls how the gateway surfaces an unrecoverable session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    /// Raise a descriptive "session expired" error to the caller.
    Development,
    /// Emit a hard redirect to the login route instead of returning data.
    #[default]
    Production,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!(
                "invalid environment '{other}', expected development or production"
            )),
        }
    }
}

/// Session configuration shared by the manager, gateway and callback handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub api_base_url: String,
    pub environment: Environment,
    pub storage_key: String,
    pub landing_route: String,
    pub login_route: String,
    pub settle_delay: Duration,
    pub failure_display_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            environment: Environment::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            landing_route: DEFAULT_LANDING_ROUTE.to_string(),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            failure_display_delay: Duration::from_millis(DEFAULT_FAILURE_DISPLAY_MS),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl SessionConfig {
    /// Builds a config for the given API base with every other value defaulted.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Returns the trimmed API base URL without a trailing slash.
    ///
    /// # Errors
    /// Returns `SessionError::Config` when no API base is configured or it is not
    /// an absolute http(s) URL.
    pub fn api_base(&self) -> Result<&str, SessionError> {
        let base = self.api_base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(SessionError::Config(
                "API URL not set. Please check environment variables.".to_string(),
            ));
        }

        match Url::parse(base) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(base),
            _ => Err(SessionError::Config(format!(
                "API URL '{base}' is not an absolute http(s) URL."
            ))),
        }
    }

    /// Applies non-empty runtime overrides on top of the current values.
    pub fn apply_overrides(&mut self, runtime: RuntimeConfig) {
        if let Some(value) = runtime.api_base_url {
            self.api_base_url = value;
        }
        if let Some(value) = runtime.environment {
            self.environment = value;
        }
        if let Some(value) = runtime.storage_key {
            self.storage_key = value;
        }
        if let Some(value) = runtime.landing_route {
            self.landing_route = value;
        }
        if let Some(value) = runtime.login_route {
            self.login_route = value;
        }
        if let Some(value) = runtime.settle_delay {
            self.settle_delay = value;
        }
        if let Some(value) = runtime.failure_display_delay {
            self.failure_display_delay = value;
        }
        if let Some(value) = runtime.request_timeout {
            self.request_timeout = value;
        }
    }

    /// Key/value pairs describing the effective configuration, for debug output.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<(&'static str, String)> {
        let api_base_url =
            normalize_value(&self.api_base_url).unwrap_or_else(|| "undefined".to_string());

        vec![
            ("environment", self.environment.to_string()),
            ("api_base_url", api_base_url),
            ("storage_key", self.storage_key.clone()),
            ("landing_route", self.landing_route.clone()),
            ("login_route", self.login_route.clone()),
            ("request_timeout_ms", self.request_timeout.as_millis().to_string()),
        ]
    }
}

/// Optional overrides collected by a shell; `None` keeps the existing value.
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    pub api_base_url: Option<String>,
    pub environment: Option<Environment>,
    pub storage_key: Option<String>,
    pub landing_route: Option<String>,
    pub login_route: Option<String>,
    pub settle_delay: Option<Duration>,
    pub failure_display_delay: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

/// Trims a raw override and rejects empty values.
#[must_use]
pub fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
