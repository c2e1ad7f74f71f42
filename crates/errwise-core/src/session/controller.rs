//! Session lifecycle controller.
//!
//! Owns login, logout, and the idle monitor; ties the two forced-logout
//! paths (refresh failure and idle expiry) into a single teardown that runs
//! exactly once per session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;

use crate::session::events::{LogoutReason, Navigator, SessionEvent};
use crate::session::idle::{IdleConfig, IdleEvent, IdleMonitor};
use crate::session::store::{TokenStore, UserProfile};

/// Path of the server-side logout notification.
const LOGOUT_PATH: &str = "/auth/logout";

/// Orchestrates the session lifecycle.
///
/// All logout paths converge on [`SessionController::logout`]: user
/// request, refresh failure, idle expiry. Teardown order is fixed — stop
/// the idle monitor, notify the server (best-effort), clear the store,
/// navigate, broadcast.
pub struct SessionController {
    store: Arc<TokenStore>,
    idle: IdleMonitor,
    navigator: Arc<dyn Navigator>,
    events: broadcast::Sender<SessionEvent>,
    http: reqwest::Client,
    base_url: String,
    /// True while a session is active; the logout swap on this flag is what
    /// makes teardown exactly-once.
    active: AtomicBool,
}

impl SessionController {
    pub fn new(
        base_url: impl Into<String>,
        store: Arc<TokenStore>,
        idle_config: IdleConfig,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Arc<Self>> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("build logout http client")?;
        let (events, _) = broadcast::channel(32);
        Ok(Arc::new(Self {
            store,
            idle: IdleMonitor::new(idle_config),
            navigator,
            events,
            http,
            base_url: base_url.into(),
            active: AtomicBool::new(false),
        }))
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.active.load(Ordering::SeqCst) && self.store.is_authenticated()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.store.user()
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Feeds a tracked activity event to the idle monitor.
    pub fn record_activity(&self) {
        if self.active.load(Ordering::SeqCst) {
            self.idle.record_activity();
        }
    }

    /// Establishes a fresh session from login credentials.
    pub fn login(
        self: &Arc<Self>,
        user: UserProfile,
        access_token: String,
        refresh_token: Option<String>,
    ) -> Result<()> {
        self.store
            .set_session(user.clone(), access_token, refresh_token)?;
        self.arm(user);
        Ok(())
    }

    /// Restores a persisted session, if one exists. Returns whether a
    /// session became active.
    pub fn resume(self: &Arc<Self>) -> bool {
        let Some(user) = self.store.user() else {
            return false;
        };
        tracing::info!(username = %user.username, "restored persisted session");
        self.arm(user);
        true
    }

    /// Marks the session active, arms the idle monitor, and wires its
    /// escalations into warnings and forced logout.
    fn arm(self: &Arc<Self>, user: UserProfile) {
        self.active.store(true, Ordering::SeqCst);

        let mut idle_events = self.idle.start();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = idle_events.recv().await {
                match event {
                    IdleEvent::Warned { seconds_remaining } => {
                        tracing::info!(seconds_remaining, "idle warning");
                        let _ = controller
                            .events
                            .send(SessionEvent::IdleWarning { seconds_remaining });
                    }
                    IdleEvent::Expired => {
                        controller.logout(LogoutReason::Inactivity).await;
                        break;
                    }
                }
            }
        });

        let _ = self.events.send(SessionEvent::LoggedIn { user });
    }

    /// Announces a successful token refresh to subscribers.
    pub fn notify_refreshed(&self) {
        let _ = self.events.send(SessionEvent::TokenRefreshed);
    }

    /// Ends the session.
    ///
    /// Idempotent and infallible: concurrent or repeated calls after the
    /// first are no-ops, and a failed server notification never blocks
    /// local teardown.
    pub async fn logout(&self, reason: LogoutReason) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::info!(%reason, "ending session");

        self.idle.stop();

        // Server-side revocation is best-effort.
        if let Some(token) = self.store.access_token() {
            let url = format!("{}{}", self.base_url, LOGOUT_PATH);
            if let Err(e) = self.http.post(&url).bearer_auth(token).send().await {
                tracing::warn!("server logout notification failed: {e}");
            }
        }

        self.store.clear();
        self.navigator.redirect_to_login(reason);
        let _ = self.events.send(SessionEvent::LoggedOut { reason });
    }
}
