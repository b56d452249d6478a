//! Client identity: where to connect and as whom

use crate::endpoint::Family;
use crate::error::{Error, Result};
use std::env;
use std::fmt;

/// Base URL and credentials a client connects with.
///
/// An identity without a URL is valid: every operation on a client
/// built from it is a no-op returning an empty result.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Identity {
    /// Identity pointing at the family's default localhost URL.
    #[must_use]
    pub fn default_for(family: Family) -> Self {
        Self::from_url(family.default_url())
    }

    /// Identity for `url` with no credentials.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            username: None,
            password: None,
        }
    }

    /// Identity for `url` authenticating as `username`.
    #[must_use]
    pub fn with_credentials(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: Some(url.into()),
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Identity with no URL; operations never connect.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// Load an identity from environment variables
    ///
    /// Reads from `.env` file if present. With `prefix = "IMAP"`:
    /// - `IMAP_URL` (default: the family's localhost URL)
    /// - `IMAP_USERNAME` (optional)
    /// - `IMAP_PASSWORD` (required when `IMAP_USERNAME` is set)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a username is set without a
    /// password.
    pub fn from_env(prefix: &str, family: Family) -> Result<Self> {
        dotenvy::dotenv().ok();

        let url = env::var(format!("{prefix}_URL"))
            .unwrap_or_else(|_| family.default_url().to_string());
        let username = env::var(format!("{prefix}_USERNAME")).ok();
        let password = match username {
            Some(_) => Some(
                env::var(format!("{prefix}_PASSWORD"))
                    .map_err(|_| Error::Config(format!("{prefix}_PASSWORD not set")))?,
            ),
            None => env::var(format!("{prefix}_PASSWORD")).ok(),
        };

        Ok(Self {
            url: Some(url),
            username,
            password,
        })
    }

    /// Whether operations will actually connect.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

// Keeps passwords out of logs.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}
