use crate::cli::{
    actions::{print_json, snapshot_json},
    globals::GlobalArgs,
};
use anyhow::Result;

/// Notify the backend and forget the stored credential.
///
/// # Errors
/// Returns an error if the manager cannot be built or output fails.
pub async fn execute(globals: &GlobalArgs) -> Result<()> {
    let manager = globals.manager()?;
    let snapshot = manager.logout().await;
    print_json(&snapshot_json(&snapshot))
}
