use crate::cli::{actions::print_json, globals::GlobalArgs};
use crate::session::CallbackHandler;
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub url: String,
}

/// Complete a sign-in from the provider redirect URL.
///
/// # Errors
/// Returns an error if the manager cannot be built or output fails.
pub async fn execute(args: Args) -> Result<()> {
    let manager = args.globals.manager()?;
    let outcome = CallbackHandler::new(manager).handle(&args.url).await;
    print_json(&outcome)
}
