pub mod callback;
pub mod info;
pub mod login;
pub mod logout;
pub mod profile;
pub mod request;
pub mod status;

// Internal "interpreter" for `Action`.
// We keep the match in a separate module so `mod.rs` stays small as more actions are added.
mod run;

use crate::cli::globals::GlobalArgs;
use crate::session::SessionSnapshot;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug)]
pub enum Action {
    Status(GlobalArgs),
    Login(GlobalArgs),
    Callback(callback::Args),
    Logout(GlobalArgs),
    Profile(profile::Args),
    Request(request::Args),
    Info(GlobalArgs),
}

impl Action {
    // Convenience wrapper so call sites can do `action.execute().await`.
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> Result<()> {
        run::execute(self).await
    }
}

/// JSON view of a snapshot for terminal output.
#[must_use]
pub fn snapshot_json(snapshot: &SessionSnapshot) -> Value {
    json!({
        "phase": snapshot.phase(),
        "loading": snapshot.is_loading(),
        "authenticated": snapshot.is_authenticated(),
        "admin": snapshot.is_admin(),
        "user": snapshot.user(),
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
