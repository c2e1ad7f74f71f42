//! Session lifecycle events.
//!
//! This module defines the contract between the session subsystem and the
//! rest of the application: an event stream for reactive consumers and the
//! navigation seam used on forced logout.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::session::store::UserProfile;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// The user asked to log out.
    UserRequested,
    /// The access token could not be refreshed, or the credential was revoked.
    Expired,
    /// The idle timeout elapsed without tracked activity.
    Inactivity,
}

impl LogoutReason {
    /// Cause indicator carried to the login surface.
    pub fn cause(self) -> &'static str {
        match self {
            LogoutReason::UserRequested => "user",
            LogoutReason::Expired => "expired",
            LogoutReason::Inactivity => "inactivity",
        }
    }

    /// One-time message shown on arrival at the login surface.
    ///
    /// None for user-requested logout: the user already knows.
    pub fn user_message(self) -> Option<&'static str> {
        match self {
            LogoutReason::UserRequested => None,
            LogoutReason::Expired => Some("Your session has expired. Please log in again."),
            LogoutReason::Inactivity => Some("You were logged out due to inactivity."),
        }
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cause())
    }
}

/// Events emitted by the session controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A session became active (fresh login or restored from disk).
    LoggedIn { user: UserProfile },

    /// The access token was replaced by a successful refresh.
    TokenRefreshed,

    /// The idle warning window was entered; fired once per quiet period.
    IdleWarning { seconds_remaining: u64 },

    /// The session ended. Fired exactly once per session.
    LoggedOut { reason: LogoutReason },
}

/// Navigation side effect on logout.
///
/// Production sends the user to the login surface with the cause attached;
/// tests substitute a recorder. The controller guarantees this is invoked
/// at most once per session.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self, reason: LogoutReason);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: forced-logout reasons carry a one-time message, user logout doesn't.
    #[test]
    fn test_user_messages() {
        assert!(LogoutReason::UserRequested.user_message().is_none());
        assert!(
            LogoutReason::Expired
                .user_message()
                .unwrap()
                .contains("expired")
        );
        assert!(
            LogoutReason::Inactivity
                .user_message()
                .unwrap()
                .contains("inactivity")
        );
    }

    /// Test: events serialize with a type tag for downstream consumers.
    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&SessionEvent::LoggedOut {
            reason: LogoutReason::Inactivity,
        })
        .unwrap();
        assert!(json.contains("\"type\":\"logged_out\""));
        assert!(json.contains("\"reason\":\"inactivity\""));
    }
}
