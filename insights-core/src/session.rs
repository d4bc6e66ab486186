//! Backend session state.
//!
//! `NoToken --authenticate ok--> Holding`, `NoToken --authenticate err--> NoToken`.
//! A held token never expires; a failed authentication is retried the next time
//! a caller needs a token.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{InsightError, backend::BackendApi, model::AuthToken};

pub const KEYRING_SERVICE: &str = "city-insights";
const KEYRING_USER: &str = "backend-token";

/// Keeps the session token between runs: in the OS keychain when one is
/// configured and reachable, otherwise in a file only the owner can read.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
    keyring_service: Option<String>,
}

impl TokenStore {
    /// File-only store.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            keyring_service: None,
        }
    }

    /// Prefer the OS keychain entry for `service`, keeping the file as fallback.
    pub fn with_keyring(mut self, service: impl Into<String>) -> Self {
        self.keyring_service = Some(service.into());
        self
    }

    fn keyring_entry(&self) -> Option<keyring::Entry> {
        let service = self.keyring_service.as_deref()?;

        match keyring::Entry::new(service, KEYRING_USER) {
            Ok(entry) => Some(entry),
            Err(error) => {
                warn!(%error, "keyring unavailable; using token file");
                None
            }
        }
    }

    pub fn load(&self) -> Result<Option<AuthToken>> {
        if let Some(entry) = self.keyring_entry()
            && let Ok(token) = entry.get_password()
            && !token.trim().is_empty()
        {
            return Ok(Some(AuthToken::new(token.trim())));
        }

        self.load_file()
    }

    pub fn save(&self, token: &AuthToken) -> Result<()> {
        if let Some(entry) = self.keyring_entry() {
            match entry.set_password(token.as_str()) {
                Ok(()) => return Ok(()),
                Err(error) => warn!(%error, "keyring store failed; falling back to token file"),
            }
        }

        self.save_file(token)
    }

    pub fn clear(&self) -> Result<()> {
        if let Some(entry) = self.keyring_entry()
            && let Err(error) = entry.delete_credential()
            && !matches!(error, keyring::Error::NoEntry)
        {
            warn!(%error, "failed to remove keyring token");
        }

        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove token file: {}", self.path.display()))?;
        }
        Ok(())
    }

    fn load_file(&self) -> Result<Option<AuthToken>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file: {}", self.path.display()))?;
        let token = contents.trim();

        Ok((!token.is_empty()).then(|| AuthToken::new(token)))
    }

    /// Directory is 0700 and the file 0600 on unix.
    fn save_file(&self, token: &AuthToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(error) = fs::set_permissions(parent, fs::Permissions::from_mode(0o700)) {
                    warn!(%error, dir = %parent.display(), "failed to restrict data directory");
                }
            }
        }

        fs::write(&self.path, token.as_str())
            .with_context(|| format!("Failed to write token file: {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600)).with_context(
                || format!("Failed to restrict token file: {}", self.path.display()),
            )?;
        }

        Ok(())
    }
}

/// Holds the current token and hands it to every backend call.
#[derive(Debug, Default)]
pub struct Session {
    token: Mutex<Option<AuthToken>>,
    store: Option<TokenStore>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_token(token: AuthToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
            store: None,
        }
    }

    /// Start from whatever token the store holds. An unreadable store starts
    /// without a token.
    pub fn with_store(store: TokenStore) -> Self {
        let token = store.load().unwrap_or_else(|err| {
            warn!(error = %format!("{err:#}"), "ignoring unreadable token file");
            None
        });

        Self {
            token: Mutex::new(token),
            store: Some(store),
        }
    }

    pub async fn current(&self) -> Option<AuthToken> {
        self.token.lock().await.clone()
    }

    /// The held token, authenticating first if there is none. The lock is held
    /// across authentication so concurrent callers share one attempt.
    pub async fn with_token(&self, backend: &dyn BackendApi) -> Result<AuthToken, InsightError> {
        let mut guard = self.token.lock().await;

        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }

        let token = self.authenticate(backend).await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Drop the held token and authenticate again.
    pub async fn refresh(&self, backend: &dyn BackendApi) -> Result<AuthToken, InsightError> {
        let mut guard = self.token.lock().await;
        *guard = None;

        let token = self.authenticate(backend).await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    pub async fn clear(&self) {
        *self.token.lock().await = None;

        if let Some(store) = &self.store
            && let Err(err) = store.clear()
        {
            warn!(error = %format!("{err:#}"), "failed to remove persisted token");
        }
    }

    async fn authenticate(&self, backend: &dyn BackendApi) -> Result<AuthToken, InsightError> {
        let token = backend.authenticate().await.map_err(|err| {
            warn!(error = %format!("{err:#}"), "backend authentication failed");
            InsightError::Auth(format!("{err:#}"))
        })?;

        debug!("backend authentication succeeded");

        if let Some(store) = &self.store
            && let Err(err) = store.save(&token)
        {
            warn!(error = %format!("{err:#}"), "failed to persist token");
        }

        Ok(token)
    }
}
