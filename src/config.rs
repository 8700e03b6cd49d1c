use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use crate::error::Error;
use crate::navigation::NavigationConfig;
#[cfg(feature = "http")]
use crate::oauth::OAuthConfig;
use crate::session::{CredentialStorage, FileStorage, MemoryStorage, SessionStore};

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Top-level client configuration.
///
/// Required field (`api_base_url`) is a constructor parameter. Use
/// [`from_env()`](ClientConfig::from_env) for convention-based setup.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_base_url: Url,
    session_dir: Option<PathBuf>,
    navigation: NavigationConfig,
}

impl ClientConfig {
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            session_dir: None,
            navigation: NavigationConfig::default(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `TROC_API_URL`: API base URL (default `http://localhost:8080`)
    /// - `TROC_SESSION_DIR`: persist the session to files in this directory
    ///   instead of keeping it in memory
    /// - `TROC_LOGIN_PATH`, `TROC_UNAUTHORIZED_PATH`, `TROC_HOME_PATH`:
    ///   override navigation destinations
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `TROC_API_URL` is not a valid URL.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let api_url = lookup("TROC_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        let api_base_url: Url = api_url
            .parse()
            .map_err(|e| Error::Config(format!("TROC_API_URL: {e}")))?;
        if api_base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("TROC_API_URL: {api_url} cannot be a base URL")));
        }

        let mut navigation = NavigationConfig::default();
        if let Some(path) = lookup("TROC_LOGIN_PATH") {
            navigation = navigation.with_login_path(path);
        }
        if let Some(path) = lookup("TROC_UNAUTHORIZED_PATH") {
            navigation = navigation.with_unauthorized_path(path);
        }
        if let Some(path) = lookup("TROC_HOME_PATH") {
            navigation = navigation.with_home_path(path);
        }

        let mut config = Self::new(api_base_url).with_navigation(navigation);
        if let Some(dir) = lookup("TROC_SESSION_DIR").filter(|d| !d.trim().is_empty()) {
            config = config.with_session_dir(dir);
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_navigation(mut self, navigation: NavigationConfig) -> Self {
        self.navigation = navigation;
        self
    }

    #[must_use]
    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    #[must_use]
    pub fn session_dir(&self) -> Option<&PathBuf> {
        self.session_dir.as_ref()
    }

    #[must_use]
    pub fn navigation(&self) -> &NavigationConfig {
        &self.navigation
    }

    /// Storage back-end selected by this config.
    #[must_use]
    pub fn storage(&self) -> Arc<dyn CredentialStorage> {
        match &self.session_dir {
            Some(dir) => Arc::new(FileStorage::new(dir)),
            None => Arc::new(MemoryStorage::new()),
        }
    }

    /// Open the session, restoring whatever the configured storage holds.
    #[must_use]
    pub fn open_session(&self) -> Arc<SessionStore> {
        Arc::new(SessionStore::new(self.storage()))
    }

    /// Token endpoint configuration derived from the API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the token URL cannot be built.
    #[cfg(feature = "http")]
    pub fn oauth(&self) -> Result<OAuthConfig, Error> {
        OAuthConfig::new(&self.api_base_url)
    }
}
