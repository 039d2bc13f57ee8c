//! Authenticated session: credential token plus active user, persisted.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kontrak_graphql::CredentialSource;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Identity of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActiveUser {
    pub id: Option<String>,
    pub uuid: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub role_name: Option<String>,
    pub user_role_id: Option<String>,
    pub selected_role: Option<Value>,
    pub menu: Option<Vec<Value>>,
    pub scoped_model: Option<Value>,
    pub sso_identity: Option<String>,
    pub tahun_aktif: Option<String>,
}

impl ActiveUser {
    /// `scopedModel.unit.id`, when numeric.
    #[must_use]
    pub fn scoped_unit_id(&self) -> Option<i64> {
        let id = self.scoped_model.as_ref()?.get("unit")?.get("id")?;
        id.as_i64()
            .or_else(|| id.as_str().and_then(|raw| raw.parse().ok()))
    }
}

/// Persisted session contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionState {
    pub token: Option<String>,
    pub active_user: ActiveUser,
}

/// Session persistence failure.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session storage I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("session data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Backend that keeps the session across restarts.
pub trait SessionStorage: Send + Sync + fmt::Debug {
    /// Previously saved state, if any.
    fn load(&self) -> Result<Option<SessionState>, SessionError>;

    fn save(&self, state: &SessionState) -> Result<(), SessionError>;

    /// Forget the saved state. Clearing an empty storage succeeds.
    fn clear(&self) -> Result<(), SessionError>;
}

/// Storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    state: Mutex<Option<SessionState>>,
}

impl MemorySessionStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<SessionState>, SessionError> {
        Ok(self.state.lock().clone())
    }

    fn save(&self, state: &SessionState) -> Result<(), SessionError> {
        *self.state.lock() = Some(state.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.state.lock() = None;
        Ok(())
    }
}

/// JSON file storage.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<SessionState>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn save(&self, state: &SessionState) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let raw = serde_json::to_vec_pretty(state)?;
        std::fs::write(&self.path, raw).map_err(|err| self.io_error(err))
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

#[derive(Debug)]
struct SessionInner {
    state: RwLock<SessionState>,
    storage: Arc<dyn SessionStorage>,
    tx: watch::Sender<SessionState>,
}

/// Shared session handle.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl SessionStore {
    /// Empty session backed by `storage`. Nothing is loaded.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self::with_state(storage, SessionState::default())
    }

    /// Empty session kept in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStorage::new()))
    }

    /// Session loaded from `storage`.
    pub fn restore(storage: Arc<dyn SessionStorage>) -> Result<Self, SessionError> {
        let state = storage.load()?.unwrap_or_default();
        debug!(authenticated = state.token.is_some(), "session restored");
        Ok(Self::with_state(storage, state))
    }

    fn with_state(storage: Arc<dyn SessionStorage>, state: SessionState) -> Self {
        let (tx, _rx) = watch::channel(state.clone());
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(state),
                storage,
                tx,
            }),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) -> Result<(), SessionError> {
        let token = token.into();
        self.update(|state| state.token = Some(token))
    }

    pub fn clear_token(&self) -> Result<(), SessionError> {
        self.update(|state| state.token = None)
    }

    pub fn set_active_user(&self, user: ActiveUser) -> Result<(), SessionError> {
        self.update(|state| state.active_user = user)
    }

    pub fn clear_active_user(&self) -> Result<(), SessionError> {
        self.update(|state| state.active_user = ActiveUser::default())
    }

    /// Drop credential and identity, in memory and in storage.
    ///
    /// Never fails; storage errors are logged.
    pub fn logout(&self) {
        let snapshot = {
            let mut state = self.inner.state.write();
            *state = SessionState::default();
            state.clone()
        };
        self.inner.tx.send_replace(snapshot);
        if let Err(err) = self.inner.storage.clear() {
            warn!(error = %err, "failed to clear persisted session");
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner.state.read().token.clone()
    }

    #[must_use]
    pub fn active_user(&self) -> ActiveUser {
        self.inner.state.read().active_user.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.read().clone()
    }

    /// A non-empty credential is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .state
            .read()
            .token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }

    /// The active user has a role.
    #[must_use]
    pub fn is_role_assigned(&self) -> bool {
        self.inner
            .state
            .read()
            .active_user
            .role
            .as_deref()
            .is_some_and(|role| !role.is_empty())
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.tx.subscribe()
    }

    fn update(&self, apply: impl FnOnce(&mut SessionState)) -> Result<(), SessionError> {
        let snapshot = {
            let mut state = self.inner.state.write();
            apply(&mut state);
            state.clone()
        };
        self.inner.tx.send_replace(snapshot.clone());
        self.inner.storage.save(&snapshot)
    }
}

impl CredentialSource for SessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.token().filter(|token| !token.is_empty())
    }
}
