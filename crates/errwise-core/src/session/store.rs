//! Session persistence and the token store.
//!
//! The persisted session lives in `${ERRWISE_HOME}/session.json` with
//! restricted permissions (0600). The refresh credential travels nowhere
//! else; tokens are never logged or displayed in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated user record returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_tier: Option<String>,
}

/// The current authenticated session.
///
/// Owned exclusively by [`TokenStore`]: created on login, replaced on
/// successful refresh, destroyed on logout or unrecoverable refresh failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Short-lived credential attached to API calls.
    pub access_token: String,
    /// Long-lived credential used only to mint new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub user: UserProfile,
    pub authenticated_at: DateTime<Utc>,
}

/// Durable backing for the session.
///
/// Production uses [`FileSessionStorage`]; tests substitute
/// [`MemorySessionStorage`] so no real storage is touched.
pub trait SessionStorage: Send + Sync {
    /// Loads the persisted session.
    ///
    /// Absent, unreadable, or unparsable state is `None` — a corrupted
    /// session file means "unauthenticated", never an error.
    fn load(&self) -> Option<Session>;

    fn save(&self, session: &Session) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// File-backed session storage.
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Option<Session> {
        if !self.path.exists() {
            return None;
        }

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("failed to read session file {}: {e}", self.path.display());
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(
                    "ignoring corrupted session file {}: {e}",
                    self.path.display()
                );
                None
            }
        }
    }

    /// Saves the session with restricted permissions (0600).
    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(session).context("Failed to serialize session")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

/// In-memory session storage for tests.
#[derive(Default)]
pub struct MemorySessionStorage {
    inner: Mutex<Option<Session>>,
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Option<Session> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Sole owner of the session: the single source of truth for "authenticated".
///
/// Reads are synchronous and side-effect free; every mutation is written
/// through to the backing storage before it becomes visible.
pub struct TokenStore {
    storage: Box<dyn SessionStorage>,
    current: RwLock<Option<Session>>,
}

impl TokenStore {
    /// Creates a store, restoring any persisted session.
    pub fn new(storage: Box<dyn SessionStorage>) -> Self {
        let current = storage.load();
        Self {
            storage,
            current: RwLock::new(current),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the session wholesale and marks the store authenticated.
    pub fn set_session(
        &self,
        user: UserProfile,
        access_token: String,
        refresh_token: Option<String>,
    ) -> Result<()> {
        let session = Session {
            access_token,
            refresh_token,
            user,
            authenticated_at: Utc::now(),
        };
        self.storage.save(&session)?;
        *self.write() = Some(session);
        Ok(())
    }

    /// Swaps in a freshly minted access token, keeping the rest of the session.
    pub fn replace_access_token(&self, access_token: &str) -> Result<()> {
        let mut guard = self.write();
        let Some(session) = guard.as_mut() else {
            anyhow::bail!("no active session to update");
        };
        session.access_token = access_token.to_string();
        self.storage.save(session)?;
        Ok(())
    }

    /// Current access token, if authenticated.
    pub fn access_token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.access_token.clone())
    }

    /// Current user record, if authenticated.
    pub fn user(&self) -> Option<UserProfile> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    /// Snapshot of the full session, if authenticated.
    pub fn current(&self) -> Option<Session> {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Wipes the session. Infallible by design: a failed file removal is
    /// logged, the in-memory state is cleared regardless.
    pub fn clear(&self) {
        if let Err(e) = self.storage.clear() {
            tracing::warn!("failed to clear persisted session: {e:#}");
        }
        *self.write() = None;
    }
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}
