use std::sync::Arc;
use std::time::Duration;

use farmgate_auth::{AccessControl, InMemoryOverrideStore, OverrideAdmin, OverrideStore, RoleTable};
use farmgate_infra::{AccessConfig, PostgresOverrideStore, StoreBackend};

/// The override store as wired at startup.
pub type SharedStore = Arc<dyn OverrideStore>;

/// Shared service graph handed to every handler.
pub struct AppServices {
    pub access: AccessControl<SharedStore>,
    pub admin: OverrideAdmin<SharedStore>,
}

impl AppServices {
    /// Both services share one role table and one store.
    pub fn new(roles: RoleTable, store: SharedStore, read_timeout: Option<Duration>) -> Self {
        let roles = Arc::new(roles);

        let mut access = AccessControl::new(roles.clone(), store.clone());
        if let Some(limit) = read_timeout {
            access = access.with_read_timeout(limit);
        }

        Self {
            access,
            admin: OverrideAdmin::new(roles, store),
        }
    }

    /// Builtin role table over an empty in-memory store.
    pub fn in_memory() -> Self {
        Self::new(
            RoleTable::builtin(),
            Arc::new(InMemoryOverrideStore::new()),
            None,
        )
    }

    pub fn roles(&self) -> &RoleTable {
        self.access.roles()
    }
}

/// Wire services from configuration.
///
/// A role table that fails to load aborts startup; the service never runs on
/// a partial table.
pub async fn build_services(config: &AccessConfig) -> anyhow::Result<AppServices> {
    let roles = config.load_role_table()?;

    let store: SharedStore = match &config.backend {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory override store");
            Arc::new(InMemoryOverrideStore::new())
        }
        StoreBackend::Postgres { database_url } => {
            let store = PostgresOverrideStore::connect(database_url).await?;
            tracing::info!("using postgres override store");
            Arc::new(store)
        }
    };

    Ok(AppServices::new(roles, store, config.store_timeout))
}
