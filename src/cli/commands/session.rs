use crate::session::{config::normalize_value, Environment, RuntimeConfig};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::{path::PathBuf, time::Duration};

pub const ARG_API_BASE_URL: &str = "api-base-url";
pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_TOKEN_FILE: &str = "token-file";
pub const ARG_STORAGE_KEY: &str = "storage-key";
pub const ARG_LANDING_ROUTE: &str = "landing-route";
pub const ARG_LOGIN_ROUTE: &str = "login-route";
pub const ARG_SETTLE_DELAY_MS: &str = "settle-delay-ms";
pub const ARG_FAILURE_DELAY_MS: &str = "failure-delay-ms";
pub const ARG_TIMEOUT_MS: &str = "timeout-ms";

const DEFAULT_TOKEN_FILE: &str = ".authsession.json";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_connection_args(command);
    with_route_args(command)
}

fn with_connection_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_BASE_URL)
                .long(ARG_API_BASE_URL)
                .help("Backend API base URL, example: https://api.example.dev")
                .env("AUTHSESSION_API_BASE_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Runtime environment: development surfaces session expiry, production redirects to login")
                .env("AUTHSESSION_ENVIRONMENT")
                .global(true)
                .value_parser(["development", "dev", "production", "prod"]),
        )
        .arg(
            Arg::new(ARG_TOKEN_FILE)
                .long(ARG_TOKEN_FILE)
                .help("File that persists the bearer credential between runs")
                .env("AUTHSESSION_TOKEN_FILE")
                .global(true)
                .default_value(DEFAULT_TOKEN_FILE)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_STORAGE_KEY)
                .long(ARG_STORAGE_KEY)
                .help("Key the credential is stored under inside the token file")
                .env("AUTHSESSION_STORAGE_KEY")
                .global(true),
        )
        .arg(
            Arg::new(ARG_TIMEOUT_MS)
                .long(ARG_TIMEOUT_MS)
                .help("HTTP request timeout in milliseconds")
                .env("AUTHSESSION_TIMEOUT_MS")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

fn with_route_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LANDING_ROUTE)
                .long(ARG_LANDING_ROUTE)
                .help("Route opened after a confirmed sign-in")
                .env("AUTHSESSION_LANDING_ROUTE")
                .global(true),
        )
        .arg(
            Arg::new(ARG_LOGIN_ROUTE)
                .long(ARG_LOGIN_ROUTE)
                .help("Route opened when the session is missing or expired")
                .env("AUTHSESSION_LOGIN_ROUTE")
                .global(true),
        )
        .arg(
            Arg::new(ARG_SETTLE_DELAY_MS)
                .long(ARG_SETTLE_DELAY_MS)
                .help("Wait before confirming a sign-in callback, in milliseconds")
                .env("AUTHSESSION_SETTLE_DELAY_MS")
                .global(true)
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_FAILURE_DELAY_MS)
                .long(ARG_FAILURE_DELAY_MS)
                .help("How long a sign-in failure is shown before returning to login, in milliseconds")
                .env("AUTHSESSION_FAILURE_DELAY_MS")
                .global(true)
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug, Clone)]
pub struct Options {
    pub runtime: RuntimeConfig,
    pub token_file: PathBuf,
}

impl Options {
    /// Collects session overrides; empty values keep the defaults.
    ///
    /// # Errors
    /// Returns an error if the environment value cannot be parsed.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let text = |id: &str| {
            matches
                .get_one::<String>(id)
                .and_then(|value| normalize_value(value))
        };
        let millis = |id: &str| matches.get_one::<u64>(id).copied().map(Duration::from_millis);

        let environment = text(ARG_ENVIRONMENT)
            .map(|value| value.parse::<Environment>())
            .transpose()
            .map_err(|err| anyhow::anyhow!(err))
            .context("invalid --environment")?;

        let token_file = matches
            .get_one::<PathBuf>(ARG_TOKEN_FILE)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE));

        Ok(Self {
            runtime: RuntimeConfig {
                api_base_url: text(ARG_API_BASE_URL),
                environment,
                storage_key: text(ARG_STORAGE_KEY),
                landing_route: text(ARG_LANDING_ROUTE),
                login_route: text(ARG_LOGIN_ROUTE),
                settle_delay: millis(ARG_SETTLE_DELAY_MS),
                failure_display_delay: millis(ARG_FAILURE_DELAY_MS),
                request_timeout: millis(ARG_TIMEOUT_MS),
            },
            token_file,
        })
    }
}
