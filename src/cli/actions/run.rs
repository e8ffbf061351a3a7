use crate::cli::actions::{callback, info, login, logout, profile, request, status, Action};
use anyhow::Result;

/// Execute the provided action.
// This is the single dispatch point for all CLI actions.
// To add a new action, add a new `Action::*` variant and a corresponding `*::execute` call here.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Status(globals) => status::execute(&globals).await,
        Action::Login(globals) => login::execute(&globals),
        Action::Callback(args) => callback::execute(args).await,
        Action::Logout(globals) => logout::execute(&globals).await,
        Action::Profile(args) => profile::execute(args).await,
        Action::Request(args) => request::execute(args).await,
        Action::Info(globals) => info::execute(&globals),
    }
}
