//! Postgres-backed override store.
//!
//! ## Optimistic Concurrency
//!
//! Compare-and-set is pushed into a single statement so no transaction or row
//! lock is held across the read-modify-write cycle:
//!
//! | expected version | statement                                                   |
//! |------------------|-------------------------------------------------------------|
//! | `Absent`         | `INSERT ... ON CONFLICT (user_id) DO NOTHING RETURNING`     |
//! | `Exact(v)`       | `UPDATE ... SET version = version + 1 WHERE version = v RETURNING` |
//!
//! No returned row means another writer got there first; the current version is
//! then read back to build [`StoreError::Conflict`].
//!
//! ## Error Mapping
//!
//! Every SQLx error maps to [`StoreError::Unavailable`], which the access check
//! turns into a fail-closed denial. A stored token outside the permission
//! catalog is treated the same way.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use farmgate_auth::{OverrideStore, Permission, Role, StoreError, UserOverride};
use farmgate_core::{CompanyId, ExpectedVersion, UserId};

/// DDL for the overrides table (idempotent).
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS user_overrides (
    user_id             TEXT PRIMARY KEY,
    role                TEXT NOT NULL,
    company_id          TEXT NULL,
    custom_permissions  TEXT[] NOT NULL DEFAULT '{}',
    revoked_permissions TEXT[] NOT NULL DEFAULT '{}',
    updated_at          TIMESTAMPTZ NOT NULL,
    version             BIGINT NOT NULL CHECK (version > 0)
)
"#;

/// Postgres-backed [`OverrideStore`].
///
/// Uses the SQLx connection pool, which is `Send + Sync` and cheap to clone.
#[derive(Debug, Clone)]
pub struct PostgresOverrideStore {
    pool: Arc<PgPool>,
}

impl PostgresOverrideStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the table exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn current_version(&self, user_id: &UserId) -> Result<u64, StoreError> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM user_overrides WHERE user_id = $1")
                .bind(user_id.as_str())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("current_version", e))?;
        Ok(version.map_or(0, |v| v as u64))
    }

    async fn insert_new(&self, record: &UserOverride) -> Result<Option<i64>, StoreError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO user_overrides (
                user_id, role, company_id, custom_permissions, revoked_permissions, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, 1)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING version
            "#,
        )
        .bind(record.user_id.as_str())
        .bind(record.role.as_str())
        .bind(record.company_id.as_ref().map(|c| c.as_str()))
        .bind(tokens(&record.custom_permissions))
        .bind(tokens(&record.revoked_permissions))
        .bind(record.updated_at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_override", e))
    }

    async fn update_existing(
        &self,
        record: &UserOverride,
        expected: u64,
    ) -> Result<Option<i64>, StoreError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE user_overrides
            SET role = $2,
                company_id = $3,
                custom_permissions = $4,
                revoked_permissions = $5,
                updated_at = $6,
                version = version + 1
            WHERE user_id = $1 AND version = $7
            RETURNING version
            "#,
        )
        .bind(record.user_id.as_str())
        .bind(record.role.as_str())
        .bind(record.company_id.as_ref().map(|c| c.as_str()))
        .bind(tokens(&record.custom_permissions))
        .bind(tokens(&record.revoked_permissions))
        .bind(record.updated_at)
        .bind(expected as i64)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_override", e))
    }
}

#[async_trait::async_trait]
impl OverrideStore for PostgresOverrideStore {
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn get_override(&self, user_id: &UserId) -> Result<Option<UserOverride>, StoreError> {
        let row: Option<OverrideRow> = sqlx::query_as(
            r#"
            SELECT user_id, role, company_id, custom_permissions, revoked_permissions, updated_at, version
            FROM user_overrides
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_override", e))?;

        row.map(UserOverride::try_from).transpose()
    }

    #[instrument(
        skip(self, record),
        fields(user_id = %record.user_id, expected_version = expected_version.as_raw()),
        err
    )]
    async fn save_override(
        &self,
        mut record: UserOverride,
        expected_version: ExpectedVersion,
    ) -> Result<UserOverride, StoreError> {
        let written = match expected_version {
            ExpectedVersion::Absent => self.insert_new(&record).await?,
            ExpectedVersion::Exact(v) => self.update_existing(&record, v).await?,
        };

        match written {
            Some(version) => {
                record.version = version as u64;
                Ok(record)
            }
            None => Err(StoreError::Conflict {
                expected: expected_version.as_raw(),
                actual: self.current_version(&record.user_id).await?,
            }),
        }
    }
}

fn tokens(perms: &BTreeSet<Permission>) -> Vec<String> {
    perms.iter().map(|p| p.as_str().to_string()).collect()
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Unavailable(format!(
            "database error in {operation}: {}",
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {operation}"))
        }
        other => StoreError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

// SQLx row types

#[derive(Debug)]
struct OverrideRow {
    user_id: String,
    role: String,
    company_id: Option<String>,
    custom_permissions: Vec<String>,
    revoked_permissions: Vec<String>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for OverrideRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: row.try_get("user_id")?,
            role: row.try_get("role")?,
            company_id: row.try_get("company_id")?,
            custom_permissions: row.try_get("custom_permissions")?,
            revoked_permissions: row.try_get("revoked_permissions")?,
            updated_at: row.try_get("updated_at")?,
            version: row.try_get("version")?,
        })
    }
}

impl TryFrom<OverrideRow> for UserOverride {
    type Error = StoreError;

    fn try_from(row: OverrideRow) -> Result<Self, Self::Error> {
        let corrupt = |what: String| StoreError::Unavailable(format!("corrupt override row: {what}"));

        let user_id = UserId::new(row.user_id).map_err(|e| corrupt(e.to_string()))?;
        let role: Role = row.role.parse().map_err(|e: farmgate_auth::UnknownRole| corrupt(e.to_string()))?;
        let company_id = row
            .company_id
            .map(CompanyId::new)
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(UserOverride {
            user_id,
            role,
            company_id,
            custom_permissions: parse_tokens(&row.custom_permissions).map_err(corrupt)?,
            revoked_permissions: parse_tokens(&row.revoked_permissions).map_err(corrupt)?,
            updated_at: row.updated_at,
            version: row.version as u64,
        })
    }
}

fn parse_tokens(raw: &[String]) -> Result<BTreeSet<Permission>, String> {
    raw.iter()
        .map(|t| Permission::parse(t).map_err(|e| e.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> OverrideRow {
        OverrideRow {
            user_id: "sup-1".to_string(),
            role: "SUPPORT".to_string(),
            company_id: Some("acme".to_string()),
            custom_permissions: vec!["users:delete".to_string()],
            revoked_permissions: vec!["tickets:respond".to_string()],
            updated_at: Utc::now(),
            version: 3,
        }
    }

    #[test]
    fn row_converts_to_override() {
        let o = UserOverride::try_from(row()).unwrap();
        assert_eq!(o.role, Role::Support);
        assert_eq!(o.version, 3);
        assert!(o.custom_permissions.contains(&Permission::UsersDelete));
        assert!(o.revoked_permissions.contains(&Permission::TicketsRespond));
    }

    #[test]
    fn unknown_stored_token_is_unavailable() {
        let mut r = row();
        r.custom_permissions.push("users:teleport".to_string());
        let err = UserOverride::try_from(r).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(msg) if msg.contains("users:teleport")));
    }

    #[test]
    fn unknown_stored_role_is_unavailable() {
        let mut r = row();
        r.role = "WIZARD".to_string();
        assert!(matches!(UserOverride::try_from(r), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn tokens_follow_catalog_order() {
        let perms: BTreeSet<_> = [Permission::UsersView, Permission::ProjectsView].into_iter().collect();
        assert_eq!(tokens(&perms), vec!["projects:view", "users:view"]);
    }
}
