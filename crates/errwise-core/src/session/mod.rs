//! Authenticated-session lifecycle.
//!
//! Token storage, single-flight refresh, idle-timeout monitoring, and the
//! controller that ties login/logout and both forced-logout paths together.

pub mod controller;
pub mod errors;
pub mod events;
pub mod idle;
pub mod refresh;
pub mod store;

pub use controller::SessionController;
pub use errors::{AuthError, AuthErrorKind};
pub use events::{LogoutReason, Navigator, SessionEvent};
pub use idle::{IdleConfig, IdleEvent, IdleMonitor, IdleState};
pub use refresh::RefreshCoordinator;
pub use store::{
    FileSessionStorage, MemorySessionStorage, Session, SessionStorage, TokenStore, UserProfile,
};
