//! Infrastructure layer: override store adapters and process configuration.

pub mod config;
pub mod override_store;

pub use config::{AccessConfig, ConfigError, StoreBackend};
pub use override_store::PostgresOverrideStore;
