//! Configuration resolution for the PV sponsorship service.
//!
//! Resolution order (later wins):
//! 1. Built-in defaults
//! 2. TOML config file (`pv.toml` unless overridden)
//! 3. Environment variables
//!
//! CLI flags are applied by the binaries on top of the result.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pv.toml";

/// Minimum accepted length of the session signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Complete service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub session: SessionConfig,
    pub elements: ElementsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            session: SessionConfig::default(),
            elements: ElementsConfig::default(),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Prefix every API route is nested under.
    pub path_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            path_prefix: "/pv/api".to_string(),
        }
    }
}

/// `SQLite` store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("pv.db"),
            max_connections: 5,
        }
    }
}

/// Inventory cache timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a cached inventory snapshot.
    pub expiration_secs: u64,
    /// Interval of the background purge of expired entries.
    pub purge_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expiration_secs: 300,
            purge_secs: 600,
        }
    }
}

/// Session token and cookie configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// HMAC secret used to sign session tokens.
    pub secret: String,
    pub ttl_secs: u64,
    pub cookie_name: String,
    /// Set the `Secure` attribute on the session cookie.
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_secs: 7 * 24 * 60 * 60,
            cookie_name: "session".to_string(),
            secure_cookie: false,
        }
    }
}

/// Inclusive numeric range allowed after an element descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRange {
    pub from: u32,
    pub to: u32,
}

impl ElementRange {
    pub const fn new(from: u32, to: u32) -> Self {
        Self { from, to }
    }
}

/// Catalogue of reservable element classes, keyed by descriptor prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementsConfig {
    pub classes: BTreeMap<String, ElementRange>,
}

impl Default for ElementsConfig {
    fn default() -> Self {
        let mut classes = BTreeMap::new();
        classes.insert("bs-".to_string(), ElementRange::new(1, 2));
        classes.insert("wr-".to_string(), ElementRange::new(1, 4));
        classes.insert("pv-a".to_string(), ElementRange::new(1, 16));
        classes.insert("pv-b".to_string(), ElementRange::new(2, 37));
        classes.insert("pv-c".to_string(), ElementRange::new(3, 37));
        classes.insert("pv-d".to_string(), ElementRange::new(3, 37));
        for row in ['e', 'f', 'g'] {
            classes.insert(format!("pv-{row}"), ElementRange::new(1, 6));
        }
        for row in 'h'..='v' {
            classes.insert(format!("pv-{row}"), ElementRange::new(1, 7));
        }
        Self { classes }
    }
}

impl Config {
    /// Parse a config from TOML text, filling gaps with defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Write the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("PV_LISTEN_ADDR") {
            match val.parse() {
                Ok(addr) => self.server.addr = addr,
                Err(_) => tracing::warn!(value = %val, "Ignoring unparsable PV_LISTEN_ADDR"),
            }
        }
        if let Some(val) = lookup("PV_DATABASE_PATH") {
            self.database.path = PathBuf::from(val);
        }
        if let Some(val) = lookup("PV_SESSION_SECRET") {
            self.session.secret = val;
        }
        if let Some(val) = lookup("PV_LOG_LEVEL") {
            self.log_level = val;
        }
    }

    /// Check everything the server needs before it may start.
    pub fn validate(&self) -> Result<()> {
        if self.session.secret.len() < MIN_SECRET_LEN {
            return Err(Error::Config(format!(
                "session.secret must be at least {MIN_SECRET_LEN} bytes; run pv-setup"
            )));
        }
        if self.session.ttl_secs == 0 {
            return Err(Error::Config("session.ttl_secs must be positive".into()));
        }
        if self.session.cookie_name.is_empty() {
            return Err(Error::Config("session.cookie_name must not be empty".into()));
        }
        if self.cache.expiration_secs == 0 || self.cache.purge_secs == 0 {
            return Err(Error::Config(
                "cache.expiration_secs and cache.purge_secs must be positive".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(Error::Config("database.max_connections must be positive".into()));
        }
        if self.elements.classes.is_empty() {
            return Err(Error::Config("elements.classes must not be empty".into()));
        }
        for (descriptor, range) in &self.elements.classes {
            if descriptor.is_empty() {
                return Err(Error::Config("element descriptors must not be empty".into()));
            }
            if range.from > range.to || range.to > 99 {
                return Err(Error::Config(format!(
                    "element class {descriptor:?} has invalid range {}..={}",
                    range.from, range.to
                )));
            }
        }
        Ok(())
    }

    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session.ttl_secs)
    }

    pub const fn cache_expiration(&self) -> Duration {
        Duration::from_secs(self.cache.expiration_secs)
    }

    pub const fn cache_purge_interval(&self) -> Duration {
        Duration::from_secs(self.cache.purge_secs)
    }
}

/// Load configuration: defaults, then the file at `path`, then environment.
///
/// With `path = None` the default file is read only if it exists. An explicit
/// path that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                load_config_file(default_path)?
            } else {
                Config::default()
            }
        }
    };

    config.apply_overrides(|key| std::env::var(key).ok());

    Ok(config)
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.session.secret = "x".repeat(MIN_SECRET_LEN);
        config
    }

    #[test]
    fn default_catalogue_matches_installation() {
        let classes = ElementsConfig::default().classes;
        assert_eq!(classes.len(), 24);
        assert_eq!(classes["pv-a"], ElementRange::new(1, 16));
        assert_eq!(classes["pv-b"], ElementRange::new(2, 37));
        assert_eq!(classes["wr-"], ElementRange::new(1, 4));
        assert_eq!(classes["pv-v"], ElementRange::new(1, 7));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            log_level = "debug"

            [session]
            ttl_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.session.ttl_secs, 60);
        assert_eq!(config.session.cookie_name, "session");
        assert_eq!(config.server.path_prefix, "/pv/api");
        assert_eq!(config.cache.expiration_secs, 300);
    }

    #[test]
    fn custom_element_classes_replace_defaults() {
        let config = Config::from_toml(
            r#"
            [elements.classes]
            "pv-x" = { from = 1, to = 3 }
            "#,
        )
        .unwrap();

        assert_eq!(config.elements.classes.len(), 1);
        assert_eq!(config.elements.classes["pv-x"], ElementRange::new(1, 3));
    }

    #[test]
    fn env_overrides_win() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "PV_LISTEN_ADDR" => Some("0.0.0.0:9000".into()),
            "PV_SESSION_SECRET" => Some("from-env".into()),
            _ => None,
        });

        assert_eq!(config.server.addr.port(), 9000);
        assert_eq!(config.session.secret, "from-env");
        assert_eq!(config.database.path, PathBuf::from("pv.db"));
    }

    #[test]
    fn short_secret_is_rejected() {
        let mut config = valid_config();
        assert!(config.validate().is_ok());

        config.session.secret = "short".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut config = valid_config();
        config
            .elements
            .classes
            .insert("pv-z".into(), ElementRange::new(5, 2));
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pv.toml");

        let mut config = valid_config();
        config.cache.purge_secs = 42;
        config.save(&path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.cache.purge_secs, 42);
        assert_eq!(loaded.elements.classes.len(), config.elements.classes.len());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
