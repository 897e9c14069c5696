//! Signed-in admin session
//!
//! The session is an explicit value handed to whatever needs the current user.
//! [`SessionStore`] persists it between CLI invocations: `login` writes the
//! file and `logout` removes it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const FALLBACK_NAME: &str = "Admin";
const FALLBACK_EMAIL: &str = "admin@example.com";

/// The signed-in user as returned by the login endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Contact email
    #[serde(default)]
    pub email: Option<String>,
}

/// Current session state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    /// A session with nobody signed in
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user: None }
    }

    /// Record a login
    pub fn login(&mut self, user: User) {
        self.user = Some(user);
    }

    /// Forget the user
    pub fn logout(&mut self) {
        self.user = None;
    }

    /// The signed-in user, if any
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Whether somebody is signed in
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Name shown in the header
    #[must_use]
    pub fn greeting(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|u| u.name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_NAME)
    }

    /// Two-line profile card
    #[must_use]
    pub fn profile_summary(&self) -> String {
        let email = self
            .user
            .as_ref()
            .and_then(|u| u.email.as_deref())
            .filter(|email| !email.is_empty())
            .unwrap_or(FALLBACK_EMAIL);

        format!("Name: {}\nEmail: {email}", self.greeting())
    }
}

/// JSON file holding the persisted [`Session`]
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the configured path, or in the platform data directory
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn from_config(config: &crate::config::SessionConfig) -> Result<Self> {
        if let Some(path) = &config.path {
            return Ok(Self::new(path.clone()));
        }

        let dirs = directories::ProjectDirs::from("travel", "kerala", "kerala-admin")
            .ok_or_else(|| Error::Session("cannot determine a data directory".to_string()))?;

        Ok(Self::new(dirs.data_dir().join("session.json")))
    }

    /// File location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the session; a missing file means nobody is signed in
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<Session> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No session file");
                Ok(Session::anonymous())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a login
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&self.path, content).await?;

        info!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    /// Remove the persisted session
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and cannot be removed.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
