//! Authenticated API client.
//!
//! Every request carries the current access token. A 401 with the
//! expired-token code triggers a single-flight refresh and one retry; any
//! other authentication failure (or a failed refresh) forces logout.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::session::controller::SessionController;
use crate::session::errors::AuthError;
use crate::session::events::LogoutReason;
use crate::session::refresh::RefreshCoordinator;
use crate::session::store::{TokenStore, UserProfile};

/// Backend error code meaning "access token expired, refresh may recover".
const TOKEN_EXPIRED_CODE: &str = "TOKEN_EXPIRED";

/// Structured error body returned by the backend.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn summary(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

/// Response from the login exchange.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: UserProfile,
}

/// One analyzed error explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    #[serde(default)]
    pub id: Option<String>,
    pub explanation: String,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// One entry of the analysis history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub error_text: String,
    pub explanation: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// HTTP client for the backend, with token attachment and the
/// expired-token retry baked into every call.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<TokenStore>,
    refresh: Arc<RefreshCoordinator>,
    controller: Arc<SessionController>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: std::time::Duration,
        store: Arc<TokenStore>,
        refresh: Arc<RefreshCoordinator>,
        controller: Arc<SessionController>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build api http client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            store,
            refresh,
            controller,
        })
    }

    /// Exchanges credentials for a session and activates it.
    ///
    /// Login is unauthenticated and bypasses the retry path: a 401 here
    /// means wrong credentials, not an expired token.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile> {
        let url = format!("{}/auth/login", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .context("POST /auth/login")?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            anyhow::bail!(
                "login failed (HTTP {status}): {}",
                body.summary().unwrap_or("invalid credentials")
            );
        }

        let login: LoginResponse = response.json().await.context("parse login response")?;
        let user = login.user.clone();
        self.controller
            .login(login.user, login.access_token, login.refresh_token)?;
        Ok(user)
    }

    /// Fetches the authenticated user's profile.
    pub async fn me(&self) -> Result<UserProfile> {
        self.get("/auth/me").await
    }

    /// Submits an error text for analysis.
    pub async fn analyze(&self, error_text: &str) -> Result<Explanation> {
        self.post(
            "/errors/analyze",
            serde_json::json!({ "errorText": error_text }),
        )
        .await
    }

    /// Fetches the analysis history.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        self.get("/history").await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(reqwest::Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        self.request(reqwest::Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        self.request(reqwest::Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(reqwest::Method::DELETE, path, None).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let response = self.execute(method, path, body).await?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            anyhow::bail!(
                "API request failed (HTTP {status}): {}",
                body.summary().unwrap_or("unknown error")
            );
        }

        response.json().await.context("parse response body")
    }

    /// Sends the request, running the refresh-and-retry dance on a
    /// retryable 401. At most one retry per call; concurrent callers share
    /// one refresh through the coordinator.
    async fn execute(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let response = self.send_once(method.clone(), path, body.as_ref()).await?;
        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let failure = auth_failure(response).await;
        if !failure.is_retryable() {
            tracing::warn!(%path, "terminal authentication failure: {failure}");
            self.controller.logout(LogoutReason::Expired).await;
            return Err(failure.into());
        }

        tracing::debug!(%path, "access token expired; refreshing");
        if let Err(e) = self.refresh.refresh().await {
            self.controller.logout(LogoutReason::Expired).await;
            return Err(e.into());
        }
        self.controller.notify_refreshed();

        let retried = self.send_once(method, path, body.as_ref()).await?;
        if retried.status() == reqwest::StatusCode::UNAUTHORIZED {
            // The fresh token was rejected too; give up on the session.
            let failure = auth_failure(retried).await;
            self.controller.logout(LogoutReason::Expired).await;
            return Err(failure.into());
        }
        Ok(retried)
    }

    async fn send_once(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = self.store.access_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .with_context(|| format!("{method} {path}"))
    }
}

/// Classifies a 401 response body: the expired-token code is retryable,
/// everything else is terminal.
async fn auth_failure(response: reqwest::Response) -> AuthError {
    let body: ErrorBody = response.json().await.unwrap_or_default();
    let message = body.summary().unwrap_or("authentication failed").to_string();
    match body.code.as_deref() {
        Some(TOKEN_EXPIRED_CODE) => AuthError::token_expired(message),
        Some(code) => AuthError::invalid_token(message).with_details(code.to_string()),
        None => AuthError::invalid_token(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: error bodies prefer `message` over `error` and tolerate both
    /// being absent.
    #[test]
    fn test_error_body_summary() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"code":"TOKEN_EXPIRED","message":"expired"}"#).unwrap();
        assert_eq!(body.summary(), Some("expired"));
        assert_eq!(body.code.as_deref(), Some("TOKEN_EXPIRED"));

        let body: ErrorBody = serde_json::from_str(r#"{"error":"nope"}"#).unwrap();
        assert_eq!(body.summary(), Some("nope"));

        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.summary().is_none());
    }
}
