//! Connection settings for the graph connector.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`CYPHERLINK__NEO4J__` prefix)
//! 2. Config file (`cypherlink.toml`, `[neo4j]` section)
//! 3. Defaults

use std::fmt;

use serde::Deserialize;

use crate::error::Result;

/// Database used when none is configured.
pub const DEFAULT_DATABASE: &str = "neo4j";

/// Immutable connection settings, passed once at construction.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct ConnectorConfig {
    /// Bolt endpoint (e.g. `bolt://localhost:7687`).
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Target database; every session is bound to it.
    #[serde(default = "default_database")]
    pub database: String,

    /// Upper bound on pooled Bolt connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Rows pulled per round-trip while streaming results.
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

impl ConnectorConfig {
    pub fn new(
        uri: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Bind sessions to a database other than the default.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Load the `[neo4j]` section from `<file_prefix>.{toml,yaml,json}` and
    /// `CYPHERLINK__NEO4J__*` environment variables.
    ///
    /// A missing file or section yields the defaults.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("CYPHERLINK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match cfg.get::<ConnectorConfig>("neo4j") {
            Ok(c) => Ok(c),
            Err(config::ConfigError::NotFound(_)) => {
                tracing::debug!(file_prefix, "No [neo4j] section found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("fetch_size", &self.fetch_size)
            .finish()
    }
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_username() -> String {
    "neo4j".to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            username: default_username(),
            password: String::new(),
            database: default_database(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ConnectorConfig::default();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.username, "neo4j");
        assert_eq!(config.database, "neo4j");
        assert_eq!(config.max_connections, 16);
        assert_eq!(config.fetch_size, 256);
    }

    #[test]
    fn test_new_keeps_default_database() {
        let config = ConnectorConfig::new("bolt://db:7687", "alice", "s3cret");
        assert_eq!(config.uri, "bolt://db:7687");
        assert_eq!(config.database, DEFAULT_DATABASE);

        let config = config.with_database("movies");
        assert_eq!(config.database, "movies");
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ConnectorConfig::new("bolt://db:7687", "alice", "s3cret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connector.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[neo4j]\nuri = \"bolt://graph:7687\"\nusername = \"reader\"\npassword = \"pw\"\ndatabase = \"catalog\""
        )
        .unwrap();

        let prefix = dir.path().join("connector");
        let config = ConnectorConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.uri, "bolt://graph:7687");
        assert_eq!(config.username, "reader");
        assert_eq!(config.password, "pw");
        assert_eq!(config.database, "catalog");
        assert_eq!(config.max_connections, 16);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let config = ConnectorConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.database, "neo4j");
    }
}
