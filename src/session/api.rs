//! HTTP helpers for JSON APIs with consistent timeouts and error handling. The
//! manager and the gateway use these helpers to avoid duplicating request setup.
//! The helpers do not store tokens; they only attach the credential a caller
//! hands them, and keep the ambient cookie jar shared across calls.

use super::{config::SessionConfig, errors::SessionError, types::ErrorBody};
use crate::APP_USER_AGENT;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION},
    Client, Method, Response, StatusCode,
};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info_span, Instrument};
use url::Url;

/// Message used when the server gives no usable error description.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";
/// Maximum number of error body characters surfaced to the UI.
const MAX_ERROR_CHARS: usize = 200;

/// Thin wrapper over a cookie-keeping `reqwest::Client` bound to the API base.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

/// One outbound request, independent of the credential attached to it.
#[derive(Clone, Debug)]
pub struct ApiRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub body: Option<&'a Value>,
    pub headers: &'a [(String, String)],
}

impl ApiClient {
    /// # Errors
    /// Returns `SessionError::Config` if the HTTP client cannot be initialized.
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| {
                SessionError::Config(format!("Failed to initialize HTTP client: {err}"))
            })?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
        })
    }

    /// Resolves `path` against the API base; absolute http(s) URLs pass through.
    ///
    /// # Errors
    /// Returns `SessionError::Config` for a relative path when no API base is set.
    pub fn resolve_url(&self, path: &str) -> Result<String, SessionError> {
        let path = path.trim();
        if is_absolute_http(path) {
            return Ok(path.to_string());
        }
        if self.base_url.trim().is_empty() {
            return Err(SessionError::Config(
                "API URL not set. Please check environment variables.".to_string(),
            ));
        }
        Ok(build_url_with_base(&self.base_url, path))
    }

    /// Sends a request, attaching the bearer credential when one is given. The
    /// credential replaces any caller-supplied `Authorization` header.
    ///
    /// # Errors
    /// Returns `SessionError::Serialization` for invalid headers and
    /// `SessionError::Network`/`SessionError::Timeout` for transport failures.
    pub async fn send(
        &self,
        request: &ApiRequest<'_>,
        credential: Option<&SecretString>,
    ) -> Result<Response, SessionError> {
        let mut headers = HeaderMap::new();
        for (name, value) in request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                SessionError::Serialization(format!("Invalid header name: {err}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|err| {
                SessionError::Serialization(format!("Invalid header value: {err}"))
            })?;
            headers.insert(name, value);
        }

        if let Some(token) = credential {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|_| {
                    SessionError::Serialization("Stored credential is not a valid header".into())
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = self
            .http
            .request(request.method.clone(), request.url)
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.json(body);
        }

        let span = info_span!(
            "session.http",
            http.method = %request.method,
            url = %request.url,
            bearer = credential.is_some()
        );
        let response = builder
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)?;

        debug!(status = %response.status(), url = %request.url, "response received");

        Ok(response)
    }
}

/// True for absolute `http://` or `https://` URLs.
#[must_use]
pub fn is_absolute_http(path: &str) -> bool {
    Url::parse(path).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Builds a URL from an explicit base URL and the provided path.
#[must_use]
pub fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

/// Maps transport errors into `SessionError` variants with timeout detection.
fn map_request_error(err: reqwest::Error) -> SessionError {
    if err.is_timeout() {
        SessionError::Timeout("Request timed out. Please try again.".to_string())
    } else if err.is_builder() {
        SessionError::Serialization(format!("Failed to build request: {err}"))
    } else {
        SessionError::Network(format!("Unable to reach the server: {err}"))
    }
}

/// Parses a successful JSON body; an empty body decodes as `null`.
///
/// # Errors
/// Returns `SessionError::Network` if the body cannot be read and
/// `SessionError::Parse` if it does not decode into `T`.
pub async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, SessionError> {
    let body = response
        .text()
        .await
        .map_err(|err| SessionError::Network(format!("Failed to read response: {err}")))?;
    let body = if body.trim().is_empty() { "null" } else { body.as_str() };

    serde_json::from_str(body)
        .map_err(|err| SessionError::Parse(format!("Failed to decode response: {err}")))
}

/// Converts a non-success response into `SessionError::Http` with the best
/// message the body offers.
pub async fn into_failure(response: Response) -> SessionError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    http_error(status, &body)
}

/// Builds `SessionError::Http` from a status and raw body.
#[must_use]
pub fn http_error(status: StatusCode, body: &str) -> SessionError {
    SessionError::Http {
        status: status.as_u16(),
        message: error_message(body),
    }
}

/// Extracts `error` (or `message`) from a JSON body, falling back to the
/// generic failure message for anything else.
#[must_use]
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error.or(parsed.message))
        .map(|message| sanitize_message(&message))
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
}

/// Trims and truncates server-provided text for user-facing messages.
fn sanitize_message(message: &str) -> String {
    message.trim().chars().take(MAX_ERROR_CHARS).collect()
}
