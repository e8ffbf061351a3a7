//! Command-line argument dispatch.
//!
//! This module turns validated CLI arguments into the [`Action`] for the chosen
//! subcommand, with the shared session settings resolved once up front.

use crate::cli::actions::{callback, profile, request, Action};
use crate::cli::commands::{
    self, session, ARG_DATA, ARG_HEADER, ARG_METHOD, ARG_NAME, ARG_PATH, ARG_URL,
};
use crate::cli::globals::GlobalArgs;
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let options = session::Options::parse(matches)?;
    let globals = GlobalArgs::new(options.runtime, options.token_file);

    // Closure to return a required string argument of a subcommand
    let required = |sub_m: &ArgMatches, id: &str| -> Result<String> {
        sub_m
            .get_one::<String>(id)
            .cloned()
            .with_context(|| format!("missing required argument: {id}"))
    };

    match matches.subcommand() {
        Some((commands::CMD_STATUS, _)) => Ok(Action::Status(globals)),
        Some((commands::CMD_LOGIN, _)) => Ok(Action::Login(globals)),
        Some((commands::CMD_CALLBACK, sub_m)) => Ok(Action::Callback(callback::Args {
            globals,
            url: required(sub_m, ARG_URL)?,
        })),
        Some((commands::CMD_LOGOUT, _)) => Ok(Action::Logout(globals)),
        Some((commands::CMD_PROFILE, sub_m)) => Ok(Action::Profile(profile::Args {
            globals,
            name: sub_m.get_one::<String>(ARG_NAME).cloned(),
        })),
        Some((commands::CMD_REQUEST, sub_m)) => Ok(Action::Request(request::Args {
            globals,
            path: required(sub_m, ARG_PATH)?,
            method: sub_m
                .get_one::<String>(ARG_METHOD)
                .cloned()
                .unwrap_or_else(|| "GET".to_string()),
            data: sub_m.get_one::<String>(ARG_DATA).cloned(),
            headers: sub_m
                .get_many::<String>(ARG_HEADER)
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        })),
        Some((commands::CMD_INFO, _)) => Ok(Action::Info(globals)),
        Some((other, _)) => Err(anyhow!("unknown subcommand: {other}")),
        None => Err(anyhow!("missing subcommand")),
    }
}
