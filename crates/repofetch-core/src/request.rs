//! Immutable description of one fetch: source, destination, credentials,
//! stored change-identifier, and per-connection timeout.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::FetchError;

/// Default connect/read timeout per connection attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Username/password pair for HTTP Basic auth. Present as a unit or not at all.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Builds a pair from optional halves; one half without the other is rejected.
    pub fn from_parts(
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Option<Self>, FetchError> {
        match (username, password) {
            (Some(u), Some(p)) => Ok(Some(Self::new(u, p))),
            (None, None) => Ok(None),
            _ => Err(FetchError::InvalidCredentials),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    url: Url,
    dest: PathBuf,
    credentials: Option<Credentials>,
    cache_tag: Option<String>,
    timeout: Duration,
}

impl FetchRequest {
    /// Parses `url` up front so no network action ever starts from a malformed source.
    pub fn new(url: &str, dest: impl Into<PathBuf>) -> Result<Self, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::malformed(url, e))?;
        match parsed.scheme() {
            "http" | "https" | "file" => {}
            other => return Err(FetchError::UnsupportedScheme(other.to_string())),
        }
        Ok(Self {
            url: parsed,
            dest: dest.into(),
            credentials: None,
            cache_tag: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Change-identifier persisted by the caller from a previous download.
    /// Empty strings are treated as "no stored tag".
    pub fn with_cache_tag(mut self, tag: Option<String>) -> Self {
        self.cache_tag = tag.filter(|t| !t.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn cache_tag(&self) -> Option<&str> {
        self.cache_tag.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
