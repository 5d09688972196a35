//! Store configuration
//!
//! Loaded from TOML, overridable from the environment:
//!
//! ```toml
//! path = "querystudy.db"
//! flush_mode = "manual"
//! foreign_keys = true
//! ```

use crate::errors::{config_error, io_error, Result};
use crate::{db, migrations};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming the database file
pub const ENV_DB: &str = "QUERYSTUDY_DB";
/// Environment variable selecting the flush mode
pub const ENV_FLUSH_MODE: &str = "QUERYSTUDY_FLUSH_MODE";

/// When pending writes reach the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushMode {
    /// Before every query and on commit
    #[default]
    Auto,
    /// Only on explicit `flush` and on commit
    Manual,
}

impl FromStr for FlushMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(FlushMode::Auto),
            "manual" => Ok(FlushMode::Manual),
            other => Err(format!("unknown flush mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Database file; in-memory when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub flush_mode: FlushMode,
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
}

fn default_foreign_keys() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            flush_mode: FlushMode::default(),
            foreign_keys: default_foreign_keys(),
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| config_error(&format!("TOML parse error: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| io_error("config_load", e))?;
        Self::from_toml_str(&content)
    }

    /// Apply `QUERYSTUDY_DB` and `QUERYSTUDY_FLUSH_MODE` from a variable lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup(ENV_DB).filter(|p| !p.is_empty()) {
            self.path = Some(PathBuf::from(path));
        }
        if let Some(mode) = lookup(ENV_FLUSH_MODE) {
            self.flush_mode = mode.parse().map_err(|e: String| config_error(&e))?;
        }
        Ok(self)
    }

    /// Open, configure and migrate a connection
    pub fn open(&self) -> Result<Connection> {
        let mut conn = match &self.path {
            Some(path) => db::open(path)?,
            None => db::open_in_memory()?,
        };
        db::configure(&conn, self.foreign_keys, self.path.is_some())?;
        migrations::apply_migrations(&mut conn)?;
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querystudy_core::errors::ExErrorKind;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.path, None);
        assert_eq!(config.flush_mode, FlushMode::Auto);
        assert!(config.foreign_keys);
    }

    #[test]
    fn test_from_toml() {
        let config = StoreConfig::from_toml_str(
            r#"
path = "members.db"
flush_mode = "manual"
"#,
        )
        .unwrap();
        assert_eq!(config.path, Some(PathBuf::from("members.db")));
        assert_eq!(config.flush_mode, FlushMode::Manual);
        assert!(config.foreign_keys);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = StoreConfig::from_toml_str("pool_size = 4").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> =
            [(ENV_DB, "/tmp/q.db"), (ENV_FLUSH_MODE, "MANUAL")].into_iter().collect();
        let config = StoreConfig::default()
            .with_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.path, Some(PathBuf::from("/tmp/q.db")));
        assert_eq!(config.flush_mode, FlushMode::Manual);
    }

    #[test]
    fn test_bad_flush_mode_override() {
        let err = StoreConfig::default()
            .with_overrides(|k| (k == ENV_FLUSH_MODE).then(|| "sometimes".to_string()))
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_open_in_memory_is_migrated() {
        let conn = StoreConfig::in_memory().open().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master \
                 WHERE type = 'table' AND name IN ('member', 'team')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }
}
