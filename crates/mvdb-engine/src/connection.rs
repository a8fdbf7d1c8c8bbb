//! Connection configuration and the open-session registry
//!
//! Sessions are keyed by URL and stay open until disconnected, so switching
//! back to a named in-memory store finds its data intact.

use std::collections::BTreeMap;
use std::path::PathBuf;

use mvdb_core::{ExError, ModelError};
use mvdb_core_types::Sensitive;
use mvdb_store::db;
use mvdb_store::Result;
use rusqlite::Connection;

const URL_PREFIX: &str = "mvdb:sqlite:";

/// Supported backing stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    /// Private in-memory SQLite database, named by the URL
    SqliteMemory,
    /// SQLite database file
    SqliteFile,
}

impl DbKind {
    /// Build the connection URL for a database of this kind
    ///
    /// SQLite is embedded, so `host` and `port` only exist for call-site
    /// compatibility with server-backed kinds and are ignored.
    ///
    /// ```
    /// use mvdb_engine::DbKind;
    ///
    /// assert_eq!(DbKind::SqliteMemory.url("localhost", 0, "models"), "mvdb:sqlite:mem:models");
    /// assert_eq!(DbKind::SqliteFile.url("", 0, "/tmp/m.db"), "mvdb:sqlite:file:/tmp/m.db");
    /// ```
    pub fn url(&self, _host: &str, _port: u16, db_name: &str) -> String {
        match self {
            DbKind::SqliteMemory => format!("{}mem:{}", URL_PREFIX, db_name),
            DbKind::SqliteFile => format!("{}file:{}", URL_PREFIX, db_name),
        }
    }

    /// Split a URL into its kind and database name (or path)
    ///
    /// # Errors
    ///
    /// `InvalidUrl` for anything not produced by [`DbKind::url`].
    pub fn from_url(url: &str) -> std::result::Result<(DbKind, String), ModelError> {
        let invalid = || ModelError::InvalidUrl {
            url: url.to_string(),
        };
        let rest = url.strip_prefix(URL_PREFIX).ok_or_else(invalid)?;
        let (kind, name) = if let Some(name) = rest.strip_prefix("mem:") {
            (DbKind::SqliteMemory, name)
        } else if let Some(path) = rest.strip_prefix("file:") {
            (DbKind::SqliteFile, path)
        } else {
            return Err(invalid());
        };
        if name.is_empty() {
            return Err(invalid());
        }
        Ok((kind, name.to_string()))
    }
}

/// Validated connection settings
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub url: String,
    pub login: Option<String>,
    pub password: Option<Sensitive<String>>,
}

impl ConnectionConfig {
    /// Validate a URL and optional credentials
    ///
    /// # Errors
    ///
    /// `IncompleteCredentials` when exactly one of login and password is
    /// given, `InvalidUrl` when the URL is not understood.
    pub fn new(
        url: &str,
        login: Option<&str>,
        password: Option<&str>,
    ) -> std::result::Result<Self, ModelError> {
        if login.is_some() != password.is_some() {
            return Err(ModelError::IncompleteCredentials);
        }
        DbKind::from_url(url)?;
        Ok(Self {
            url: url.to_string(),
            login: login.map(str::to_string),
            password: password.map(|p| Sensitive::new(p.to_string())),
        })
    }

    pub fn kind(&self) -> DbKind {
        // url was validated in new()
        DbKind::from_url(&self.url)
            .map(|(kind, _)| kind)
            .unwrap_or(DbKind::SqliteMemory)
    }

    fn open(&self) -> Result<Connection> {
        let (kind, name) = DbKind::from_url(&self.url).map_err(ExError::from)?;
        match kind {
            DbKind::SqliteMemory => db::open_in_memory(),
            DbKind::SqliteFile => db::open(PathBuf::from(name)),
        }
    }
}

/// One open store
pub struct Session {
    pub config: ConnectionConfig,
    pub conn: Connection,
}

/// Registry of open sessions plus the current pointer
#[derive(Default)]
pub struct ConnectionManager {
    sessions: BTreeMap<String, Session>,
    current: Option<String>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `config` current, opening its store on first use
    ///
    /// A session already open for the same URL is reused; its recorded
    /// credentials are replaced by the new ones.
    pub fn connect(&mut self, config: ConnectionConfig) -> Result<&mut Session> {
        self.current = None;
        let url = config.url.clone();
        if let Some(session) = self.sessions.get_mut(&url) {
            session.config = config;
        } else {
            let conn = config.open()?;
            tracing::debug!(url = %url, "opened store");
            self.sessions.insert(url.clone(), Session { config, conn });
        }
        self.current = Some(url.clone());
        self.sessions
            .get_mut(&url)
            .ok_or_else(|| ModelError::NotConnected.into())
    }

    /// Forget the current pointer without closing anything
    pub fn detach(&mut self) {
        self.current = None;
    }

    /// Close the current session and return it
    pub fn close_current(&mut self) -> Option<Session> {
        let url = self.current.take()?;
        self.sessions.remove(&url)
    }

    pub fn is_connected(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Result<&Session> {
        self.current
            .as_ref()
            .and_then(|url| self.sessions.get(url))
            .ok_or_else(|| ModelError::NotConnected.into())
    }

    pub fn current_mut(&mut self) -> Result<&mut Session> {
        match &self.current {
            Some(url) => self
                .sessions
                .get_mut(url)
                .ok_or_else(|| ModelError::NotConnected.into()),
            None => Err(ModelError::NotConnected.into()),
        }
    }

    /// An open session by URL, current or not
    pub fn session_mut(&mut self, url: &str) -> Option<&mut Session> {
        self.sessions.get_mut(url)
    }
}
