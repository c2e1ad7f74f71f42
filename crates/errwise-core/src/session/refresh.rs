//! Single-flight access-token refresh.
//!
//! Any number of callers hitting an expired token at the same instant
//! collapse into exactly one network exchange; everyone else queues on the
//! outcome and settles with the token (or error) that exchange produced.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::sync::{Mutex, oneshot};

use crate::session::errors::AuthError;
use crate::session::store::TokenStore;

/// Path of the refresh exchange on the backend.
pub const REFRESH_PATH: &str = "/auth/refresh-token";

type RefreshOutcome = std::result::Result<String, AuthError>;

/// The `isRefreshing` flag and the pending queue, fused into one state so
/// they can never disagree: waiters exist only while a flight is up.
enum RefreshState {
    Idle,
    InFlight {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

/// Exchanges the refresh credential for a new access token, single-flight.
///
/// Constructed once per client; holds its own bare HTTP client so a 401
/// from the refresh endpoint can never re-enter the request interceptor.
pub struct RefreshCoordinator {
    http: reqwest::Client,
    base_url: String,
    store: Arc<TokenStore>,
    state: Mutex<RefreshState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

impl RefreshCoordinator {
    /// Creates a coordinator with the given refresh timeout.
    ///
    /// A timed-out refresh is treated exactly like a failed one, so queued
    /// callers are never left pending.
    pub fn new(
        base_url: impl Into<String>,
        store: Arc<TokenStore>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build refresh http client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            store,
            state: Mutex::new(RefreshState::Idle),
        })
    }

    /// Refreshes the access token, sharing any in-flight exchange.
    ///
    /// On success the new token is written to the [`TokenStore`] *before*
    /// any caller is settled, so nobody ever acts on a stale token. On
    /// failure the store is cleared and every caller receives the same
    /// error; the caller is responsible for routing it into forced logout.
    pub async fn refresh(&self) -> RefreshOutcome {
        // Queue behind an in-flight exchange, or claim the flight.
        let waiter = {
            let mut state = self.state.lock().await;
            match &mut *state {
                RefreshState::InFlight { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    tracing::debug!(queued = waiters.len(), "refresh in flight; queueing caller");
                    Some(rx)
                }
                RefreshState::Idle => {
                    *state = RefreshState::InFlight {
                        waiters: Vec::new(),
                    };
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            return rx
                .await
                .unwrap_or_else(|_| Err(AuthError::refresh_failed("refresh abandoned mid-flight")));
        }

        let outcome = match self.exchange().await {
            Ok(token) => match self.store.replace_access_token(&token) {
                Ok(()) => Ok(token),
                Err(e) => Err(AuthError::refresh_failed(format!(
                    "failed to persist refreshed token: {e:#}"
                ))),
            },
            Err(e) => Err(e),
        };

        if outcome.is_err() {
            // A failed refresh ends the session.
            self.store.clear();
        }

        // Settle every queued caller exactly once, then release the flight.
        let waiters = {
            let mut state = self.state.lock().await;
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::InFlight { waiters } => waiters,
                RefreshState::Idle => Vec::new(),
            }
        };
        match &outcome {
            Ok(_) => tracing::info!(waiters = waiters.len(), "access token refreshed"),
            Err(e) => tracing::warn!(waiters = waiters.len(), "token refresh failed: {e}"),
        }
        for tx in waiters {
            let _ = tx.send(outcome.clone());
        }

        outcome
    }

    /// Performs the actual network exchange.
    async fn exchange(&self) -> RefreshOutcome {
        let Some(refresh_token) = self.store.current().and_then(|s| s.refresh_token) else {
            return Err(AuthError::refresh_failed("no refresh credential available"));
        };

        let url = format!("{}{}", self.base_url, REFRESH_PATH);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::timeout("refresh request timed out")
                } else {
                    AuthError::refresh_failed(format!("refresh request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(
                AuthError::refresh_failed(format!("refresh endpoint returned HTTP {status}"))
                    .with_details(body),
            );
        }

        let parsed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| AuthError::refresh_failed(format!("failed to parse refresh response: {e}")))?;

        Ok(parsed.access_token)
    }

    /// Test hook: drops any in-flight bookkeeping between runs.
    #[cfg(test)]
    pub(crate) async fn reset(&self) {
        *self.state.lock().await = RefreshState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::errors::AuthErrorKind;
    use crate::session::store::MemorySessionStorage;

    fn store() -> Arc<TokenStore> {
        Arc::new(TokenStore::new(Box::new(MemorySessionStorage::default())))
    }

    /// Test: a missing refresh credential is a terminal failure, no network.
    #[tokio::test]
    async fn test_missing_credential_is_terminal() {
        let store = store();
        store
            .set_session(
                crate::session::store::UserProfile {
                    id: "u-1".to_string(),
                    username: "dev".to_string(),
                    email: "dev@example.com".to_string(),
                    subscription_tier: None,
                },
                "stale".to_string(),
                None,
            )
            .unwrap();

        // Port 1 refuses connections; the coordinator must fail before
        // reaching the network when no credential exists.
        let coordinator =
            RefreshCoordinator::new("http://127.0.0.1:1", Arc::clone(&store), Duration::from_secs(1))
                .unwrap();

        let err = coordinator.refresh().await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::RefreshFailed);
        assert!(!store.is_authenticated(), "failed refresh clears the store");

        coordinator.reset().await;
        assert!(coordinator.refresh().await.is_err());
    }
}
