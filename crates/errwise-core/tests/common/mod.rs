//! Shared harness for session integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use errwise_core::api::ApiClient;
use errwise_core::session::{
    IdleConfig, LogoutReason, MemorySessionStorage, Navigator, RefreshCoordinator,
    SessionController, TokenStore, UserProfile,
};
use wiremock::MockServer;

pub const STALE_TOKEN: &str = "stale-token";
pub const FRESH_TOKEN: &str = "fresh-token";
pub const REFRESH_TOKEN: &str = "refresh-credential";

/// Records forced-logout navigations instead of performing them.
#[derive(Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<LogoutReason>>,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> Vec<LogoutReason> {
        self.redirects.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self, reason: LogoutReason) {
        self.redirects.lock().unwrap().push(reason);
    }
}

/// A full session stack wired against a wiremock backend, logged in with
/// a stale access token and a refresh credential.
pub struct Harness {
    pub server: MockServer,
    pub store: Arc<TokenStore>,
    pub refresh: Arc<RefreshCoordinator>,
    pub controller: Arc<SessionController>,
    pub navigator: Arc<RecordingNavigator>,
    pub api: ApiClient,
}

pub fn user() -> UserProfile {
    UserProfile {
        id: "u-1".to_string(),
        username: "dev".to_string(),
        email: "dev@example.com".to_string(),
        subscription_tier: Some("free".to_string()),
    }
}

impl Harness {
    pub async fn logged_in() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();

        let store = Arc::new(TokenStore::new(Box::new(MemorySessionStorage::default())));
        let navigator = Arc::new(RecordingNavigator::default());
        let controller = SessionController::new(
            base_url.clone(),
            Arc::clone(&store),
            IdleConfig::default(),
            Arc::clone(&navigator) as Arc<dyn Navigator>,
        )
        .unwrap();
        controller
            .login(
                user(),
                STALE_TOKEN.to_string(),
                Some(REFRESH_TOKEN.to_string()),
            )
            .unwrap();

        let refresh = Arc::new(
            RefreshCoordinator::new(base_url.clone(), Arc::clone(&store), Duration::from_secs(2))
                .unwrap(),
        );
        let api = ApiClient::new(
            base_url,
            Duration::from_secs(5),
            Arc::clone(&store),
            Arc::clone(&refresh),
            Arc::clone(&controller),
        )
        .unwrap();

        Self {
            server,
            store,
            refresh,
            controller,
            navigator,
            api,
        }
    }
}
