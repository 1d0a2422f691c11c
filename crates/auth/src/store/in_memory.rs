//! In-memory override store for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;

use farmgate_core::{ExpectedVersion, UserId};

use super::{OverrideStore, StoreError};
use crate::overrides::UserOverride;

/// In-memory override store.
///
/// Compare-and-set happens under the write lock, so concurrent writers with
/// the same expected version see exactly one success.
#[derive(Debug, Default)]
pub struct InMemoryOverrideStore {
    records: RwLock<HashMap<UserId, UserOverride>>,
}

impl InMemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed records directly (bypasses version checks).
    pub fn with_overrides(records: impl IntoIterator<Item = UserOverride>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.user_id.clone(), r))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl OverrideStore for InMemoryOverrideStore {
    async fn get_override(&self, user_id: &UserId) -> Result<Option<UserOverride>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(records.get(user_id).cloned())
    }

    async fn save_override(
        &self,
        mut record: UserOverride,
        expected_version: ExpectedVersion,
    ) -> Result<UserOverride, StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let current = records.get(&record.user_id).map_or(0, |r| r.version);
        if !expected_version.matches(current) {
            return Err(StoreError::Conflict {
                expected: expected_version.as_raw(),
                actual: current,
            });
        }

        record.version = current + 1;
        records.insert(record.user_id.clone(), record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overrides::Subject;
    use crate::{Permission, Role};

    fn record(user: &str) -> UserOverride {
        UserOverride::empty(&Subject::new(UserId::new(user).unwrap(), Role::Customer, None))
    }

    #[tokio::test]
    async fn missing_override_is_none() {
        let store = InMemoryOverrideStore::new();
        let got = store.get_override(&UserId::new("nobody").unwrap()).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn saves_bump_the_version() {
        let store = InMemoryOverrideStore::new();
        let first = store.save_override(record("u-1"), ExpectedVersion::Absent).await.unwrap();
        assert_eq!(first.version, 1);

        let second = store
            .save_override(first.clone(), ExpectedVersion::Exact(1))
            .await
            .unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn stale_save_conflicts_and_leaves_record_unchanged() {
        let store = InMemoryOverrideStore::new();
        let user = UserId::new("u-1").unwrap();
        let stored = store.save_override(record("u-1"), ExpectedVersion::Absent).await.unwrap();

        let mut stale = stored.clone();
        stale.custom_permissions.insert(Permission::UsersDelete);
        let err = store
            .save_override(stale, ExpectedVersion::Absent)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Conflict { expected: 0, actual: 1 });

        let after = store.get_override(&user).await.unwrap().unwrap();
        assert_eq!(after, stored);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_writers_with_the_same_version_see_one_success() {
        let store = std::sync::Arc::new(InMemoryOverrideStore::new());
        let stored = store.save_override(record("u-1"), ExpectedVersion::Absent).await.unwrap();

        let mut left = stored.clone();
        left.custom_permissions.insert(Permission::UsersDelete);
        let mut right = stored.clone();
        right.custom_permissions.insert(Permission::FinanceManage);

        let (a, b) = tokio::join!(
            tokio::spawn({
                let store = store.clone();
                async move { store.save_override(left, ExpectedVersion::Exact(1)).await }
            }),
            tokio::spawn({
                let store = store.clone();
                async move { store.save_override(right, ExpectedVersion::Exact(1)).await }
            }),
        );
        let outcomes = [a.unwrap(), b.unwrap()];

        let winners: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].version, 2);
        assert!(outcomes.iter().any(|r| matches!(
            r,
            Err(StoreError::Conflict { expected: 1, actual: 2 })
        )));

        let after = store.get_override(&UserId::new("u-1").unwrap()).await.unwrap().unwrap();
        assert_eq!(&after, winners[0]);
    }
}
