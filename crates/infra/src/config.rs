//! Configuration loading and representation.
//!
//! Everything is read from environment variables once at startup; any error
//! here is fatal and should stop initialization.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use farmgate_auth::{ConfigurationError, RoleTable};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STORE_TIMEOUT_MS: u64 = 250;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),

    #[error("failed to read role table from {path}: {source}")]
    RoleTableIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    RoleTable(#[from] ConfigurationError),
}

/// Which override store adapter to wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres { database_url: String },
}

/// Process configuration for the access-control service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    pub bind_addr: SocketAddr,
    /// JSON role table replacing the builtin one.
    pub role_table_path: Option<PathBuf>,
    /// Bound on the override read; `None` disables it.
    pub store_timeout: Option<Duration>,
    pub backend: StoreBackend,
}

impl AccessConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` (environment-agnostic for tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            var: "BIND_ADDR",
            value: raw_addr.clone(),
            reason: e.to_string(),
        })?;

        let role_table_path = lookup("ROLE_TABLE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let store_timeout = match lookup("OVERRIDE_STORE_TIMEOUT_MS") {
            None => Some(Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS)),
            Some(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                    var: "OVERRIDE_STORE_TIMEOUT_MS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
                (ms > 0).then(|| Duration::from_millis(ms))
            }
        };

        let persistent = lookup("USE_PERSISTENT_STORES")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);
        let backend = if persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|u| !u.trim().is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            StoreBackend::Postgres { database_url }
        } else {
            StoreBackend::InMemory
        };

        Ok(Self {
            bind_addr,
            role_table_path,
            store_timeout,
            backend,
        })
    }

    /// Load the role table: the configured JSON file, or the builtin table.
    pub fn load_role_table(&self) -> Result<RoleTable, ConfigError> {
        let Some(path) = &self.role_table_path else {
            return Ok(RoleTable::builtin());
        };

        let doc = std::fs::read_to_string(path).map_err(|source| ConfigError::RoleTableIo {
            path: path.clone(),
            source,
        })?;
        let table = RoleTable::from_json(&doc)?;
        tracing::info!(path = %path.display(), "loaded role table");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use farmgate_auth::{Permission, Role};

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = AccessConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(config.store_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.backend, StoreBackend::InMemory);
        assert!(config.role_table_path.is_none());
        assert_eq!(config.load_role_table().unwrap(), RoleTable::builtin());
    }

    #[test]
    fn zero_timeout_disables_it() {
        let config = AccessConfig::from_lookup(lookup(&[("OVERRIDE_STORE_TIMEOUT_MS", "0")])).unwrap();
        assert_eq!(config.store_timeout, None);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = AccessConfig::from_lookup(lookup(&[("OVERRIDE_STORE_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("OVERRIDE_STORE_TIMEOUT_MS"));

        let err = AccessConfig::from_lookup(lookup(&[("BIND_ADDR", "localhost")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "BIND_ADDR", .. }));
    }

    #[test]
    fn persistent_stores_need_a_database_url() {
        let err = AccessConfig::from_lookup(lookup(&[("USE_PERSISTENT_STORES", "true")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));

        let config = AccessConfig::from_lookup(lookup(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/farmgate"),
        ]))
        .unwrap();
        assert_eq!(
            config.backend,
            StoreBackend::Postgres {
                database_url: "postgres://localhost/farmgate".to_string()
            }
        );
    }

    #[test]
    fn role_table_is_loaded_from_file() {
        let path = std::env::temp_dir().join(format!("farmgate-roles-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{ "ADMIN": ["users:delete"], "COMPANY": [], "CUSTOMER": ["designer:use"],
                 "FARMER": [], "BANK": [], "SUPPORT": [] }"#,
        )
        .unwrap();

        let config = AccessConfig::from_lookup(lookup(&[("ROLE_TABLE_PATH", path.to_str().unwrap())])).unwrap();
        let table = config.load_role_table().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(table.base_permissions(Role::Customer).contains(&Permission::DesignerUse));
        assert!(table.base_permissions(Role::Company).is_empty());
    }

    #[test]
    fn broken_role_table_is_a_configuration_error() {
        let path = std::env::temp_dir().join(format!("farmgate-bad-roles-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "ADMIN": ["users:fly"] }"#).unwrap();

        let config = AccessConfig::from_lookup(lookup(&[("ROLE_TABLE_PATH", path.to_str().unwrap())])).unwrap();
        let err = config.load_role_table().unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            err,
            ConfigError::RoleTable(ConfigurationError::UnknownPermission { .. })
        ));
    }

    #[test]
    fn missing_role_table_file_is_reported() {
        let config = AccessConfig::from_lookup(lookup(&[("ROLE_TABLE_PATH", "/nonexistent/roles.json")])).unwrap();
        assert!(matches!(config.load_role_table(), Err(ConfigError::RoleTableIo { .. })));
    }
}
