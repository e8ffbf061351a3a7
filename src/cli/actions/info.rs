use crate::cli::{actions::print_json, globals::GlobalArgs};
use crate::session::TokenStore;
use crate::{APP_USER_AGENT, GIT_COMMIT_HASH};
use anyhow::Result;
use serde_json::{json, Map, Value};

/// Print build metadata and the effective session configuration.
///
/// # Errors
/// Returns an error if output fails.
pub fn execute(globals: &GlobalArgs) -> Result<()> {
    print_json(&report(globals))
}

fn report(globals: &GlobalArgs) -> Value {
    let config: Map<String, Value> = globals
        .config
        .diagnostics()
        .into_iter()
        .map(|(key, value)| (key.to_string(), Value::String(value)))
        .collect();

    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": GIT_COMMIT_HASH,
        "user_agent": APP_USER_AGENT,
        "config": config,
        "token_file": globals.token_file.display().to_string(),
        "token_present": globals.token_store().load().is_some(),
    })
}
