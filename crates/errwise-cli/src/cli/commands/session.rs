//! Shared session wiring for CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use errwise_core::api::ApiClient;
use errwise_core::config::{Config, paths};
use errwise_core::session::{
    FileSessionStorage, LogoutReason, Navigator, RefreshCoordinator, SessionController, TokenStore,
};

/// Navigator for a terminal process: there is no login page to land on, so
/// a forced logout surfaces its one-time message on stderr.
struct CliNavigator;

impl Navigator for CliNavigator {
    fn redirect_to_login(&self, reason: LogoutReason) {
        if let Some(message) = reason.user_message() {
            eprintln!("{message}");
        }
    }
}

/// One CLI invocation's view of the session: store, controller, and the
/// authenticated API client, wired from config.
pub struct AppSession {
    pub controller: Arc<SessionController>,
    pub api: ApiClient,
}

impl AppSession {
    pub fn new() -> Result<Self> {
        let config = Config::load().context("load config")?;
        let base_url = config.resolve_base_url()?;

        let store = Arc::new(TokenStore::new(Box::new(FileSessionStorage::new(
            paths::session_path(),
        ))));
        let controller = SessionController::new(
            base_url.clone(),
            Arc::clone(&store),
            config.idle_config()?,
            Arc::new(CliNavigator),
        )?;
        let refresh = Arc::new(RefreshCoordinator::new(
            base_url.clone(),
            Arc::clone(&store),
            config.refresh_timeout(),
        )?);
        let api = ApiClient::new(
            base_url,
            config.request_timeout(),
            store,
            refresh,
            Arc::clone(&controller),
        )?;

        Ok(Self { controller, api })
    }

    /// Restores the persisted session, failing with a login hint when
    /// there is none.
    pub fn require_session(&self) -> Result<()> {
        anyhow::ensure!(
            self.controller.resume(),
            "Not logged in. Run `errwise login --username <name>` first."
        );
        Ok(())
    }
}
