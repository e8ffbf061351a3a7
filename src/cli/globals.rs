use crate::session::{
    FileTokenStore, NavigationEffect, Navigator, RuntimeConfig, SessionConfig, SessionManager,
};
use anyhow::{Context, Result};
use std::{path::PathBuf, sync::Arc};

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub config: SessionConfig,
    pub token_file: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(runtime: RuntimeConfig, token_file: PathBuf) -> Self {
        let mut config = SessionConfig::default();
        config.apply_overrides(runtime);
        Self { config, token_file }
    }

    #[must_use]
    pub fn token_store(&self) -> FileTokenStore {
        FileTokenStore::new(self.token_file.clone(), self.config.storage_key.clone())
    }

    /// Builds a session manager backed by the token file, printing navigation to stderr.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn manager(&self) -> Result<SessionManager> {
        SessionManager::new(
            self.config.clone(),
            Arc::new(self.token_store()),
            Arc::new(ConsoleNavigator),
        )
        .context("failed to initialize session manager")
    }
}

/// Navigator for terminal use: there is no page to move, so effects are printed.
#[derive(Debug, Default)]
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, effect: NavigationEffect) {
        eprintln!("-> {effect}");
    }
}
