use crate::cli::{actions::print_json, globals::GlobalArgs};
use anyhow::{Context, Result};

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub name: Option<String>,
}

/// Show the profile, or update the display name when one is given.
///
/// # Errors
/// Returns an error if the profile call fails.
pub async fn execute(args: Args) -> Result<()> {
    let manager = args.globals.manager()?;

    let user = match args.name.as_deref() {
        Some(name) => manager
            .update_profile(name)
            .await
            .context("failed to update profile")?,
        None => manager
            .get_profile()
            .await
            .context("failed to fetch profile")?,
    };

    print_json(&user)
}
