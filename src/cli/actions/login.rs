use crate::cli::{actions::print_json, globals::GlobalArgs};
use anyhow::{Context, Result};

/// Print the sign-in redirect.
///
/// # Errors
/// Returns an error when no valid API base URL is configured.
pub fn execute(globals: &GlobalArgs) -> Result<()> {
    let manager = globals.manager()?;
    let effect = manager
        .login()
        .context("cannot start sign-in, set --api-base-url or AUTHSESSION_API_BASE_URL")?;
    print_json(&effect)
}
