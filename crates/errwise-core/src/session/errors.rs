//! Authentication error taxonomy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of an authentication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    /// Access token expired; a refresh may recover the session.
    TokenExpired,
    /// Credential rejected as invalid or revoked.
    InvalidToken,
    /// The refresh exchange failed (non-2xx, network error, missing credential).
    RefreshFailed,
    /// The refresh request timed out.
    Timeout,
    /// Local idle-timeout policy ended the session.
    IdleTimeout,
}

impl AuthErrorKind {
    /// Returns true if the failure can be recovered by a token refresh.
    pub fn is_retryable(self) -> bool {
        matches!(self, AuthErrorKind::TokenExpired)
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthErrorKind::TokenExpired => write!(f, "token_expired"),
            AuthErrorKind::InvalidToken => write!(f, "invalid_token"),
            AuthErrorKind::RefreshFailed => write!(f, "refresh_failed"),
            AuthErrorKind::Timeout => write!(f, "timeout"),
            AuthErrorKind::IdleTimeout => write!(f, "idle_timeout"),
        }
    }
}

/// Structured authentication error with kind and details.
///
/// Clone is deliberate: one refresh failure settles every queued caller
/// with the same error value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthError {
    /// Error category
    pub kind: AuthErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl AuthError {
    /// Creates a new authentication error.
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Attaches additional details (e.g., a raw response body).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Creates a retryable expired-token error.
    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::TokenExpired, message)
    }

    /// Creates a terminal invalid/revoked-credential error.
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::InvalidToken, message)
    }

    /// Creates a terminal refresh-exchange error.
    pub fn refresh_failed(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::RefreshFailed, message)
    }

    /// Creates a refresh timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Timeout, message)
    }

    /// Creates an idle-timeout error.
    pub fn idle_timeout(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::IdleTimeout, message)
    }

    /// Returns true if the failure can be recovered by a token refresh.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AuthError {}
