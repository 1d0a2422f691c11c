//! Administrative write path for per-user overrides.
//!
//! Every write is read-modify-write guarded by `version`: the caller passes the
//! version it last read, and a stale version is rejected with
//! [`MutationError::Conflict`] without touching the store. There is no locking;
//! callers re-read and retry.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use farmgate_core::ExpectedVersion;

use crate::overrides::{Subject, UserOverride};
use crate::store::{OverrideStore, StoreError};
use crate::{Permission, RoleTable};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MutationError {
    /// The change would break an override invariant.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The stored version differs from the caller's; re-read and retry.
    #[error("optimistic concurrency check failed (expected: {expected}, actual: {actual})")]
    Conflict { expected: u64, actual: u64 },

    #[error("override store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for MutationError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict { expected, actual } => MutationError::Conflict { expected, actual },
            StoreError::Unavailable(msg) => MutationError::Unavailable(msg),
        }
    }
}

/// The kind of override change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideChange {
    Grant,
    Revoke,
    Restore,
}

impl core::fmt::Display for OverrideChange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OverrideChange::Grant => f.write_str("grant"),
            OverrideChange::Revoke => f.write_str("revoke"),
            OverrideChange::Restore => f.write_str("restore"),
        }
    }
}

/// Apply `change` to `record` in place, enforcing the override invariants
/// against `base` (the base set of `record.role`).
///
/// - grant: add a custom grant; a token already in `base` is an accepted
///   no-op that leaves any revocation in place (restore lifts it)
/// - revoke: remove a custom grant if there is one; otherwise revoke from
///   `base`; tokens in neither are rejected
/// - restore: drop a revocation of a base permission; tokens outside `base`
///   are rejected
pub fn apply_change(
    record: &mut UserOverride,
    base: &BTreeSet<Permission>,
    change: OverrideChange,
    permission: Permission,
) -> Result<(), MutationError> {
    match change {
        OverrideChange::Grant => {
            if !base.contains(&permission) {
                record.custom_permissions.insert(permission);
            }
        }
        OverrideChange::Revoke => {
            if record.custom_permissions.remove(&permission) {
                return Ok(());
            }
            if !base.contains(&permission) {
                return Err(MutationError::InvalidOperation(format!(
                    "cannot revoke '{permission}': role {} never granted it",
                    record.role
                )));
            }
            record.revoked_permissions.insert(permission);
        }
        OverrideChange::Restore => {
            if !base.contains(&permission) {
                return Err(MutationError::InvalidOperation(format!(
                    "cannot restore '{permission}': not a base permission of role {}",
                    record.role
                )));
            }
            record.revoked_permissions.remove(&permission);
        }
    }
    Ok(())
}

/// Override Mutation service.
pub struct OverrideAdmin<S> {
    roles: Arc<RoleTable>,
    store: S,
}

impl<S> OverrideAdmin<S>
where
    S: OverrideStore,
{
    pub fn new(roles: Arc<RoleTable>, store: S) -> Self {
        Self { roles, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn grant_permission(
        &self,
        subject: &Subject,
        permission: Permission,
        expected_version: ExpectedVersion,
    ) -> Result<UserOverride, MutationError> {
        self.mutate(subject, OverrideChange::Grant, permission, expected_version)
            .await
    }

    pub async fn revoke_permission(
        &self,
        subject: &Subject,
        permission: Permission,
        expected_version: ExpectedVersion,
    ) -> Result<UserOverride, MutationError> {
        self.mutate(subject, OverrideChange::Revoke, permission, expected_version)
            .await
    }

    pub async fn restore_permission(
        &self,
        subject: &Subject,
        permission: Permission,
        expected_version: ExpectedVersion,
    ) -> Result<UserOverride, MutationError> {
        self.mutate(subject, OverrideChange::Restore, permission, expected_version)
            .await
    }

    /// Read, check version, modify, compare-and-set.
    ///
    /// A change that leaves the override as it was is not written; the current
    /// snapshot is returned with its version unchanged.
    pub async fn mutate(
        &self,
        subject: &Subject,
        change: OverrideChange,
        permission: Permission,
        expected_version: ExpectedVersion,
    ) -> Result<UserOverride, MutationError> {
        let current = self.store.get_override(&subject.user_id).await?;
        let actual = current.as_ref().map_or(0, |o| o.version);

        if !expected_version.matches(actual) {
            tracing::warn!(
                user_id = %subject.user_id,
                expected = expected_version.as_raw(),
                actual,
                "stale override version"
            );
            return Err(MutationError::Conflict {
                expected: expected_version.as_raw(),
                actual,
            });
        }

        let base = self.roles.base_permissions(subject.role);
        let mut next = current
            .clone()
            .unwrap_or_else(|| UserOverride::empty(subject));
        if next.role != subject.role {
            next.rebase(subject.role, base);
        }
        next.company_id = subject.company_id.clone();

        apply_change(&mut next, base, change, permission)?;

        let unchanged = match &current {
            Some(current) => current.same_content(&next),
            None => next.is_neutral(),
        };
        if unchanged {
            tracing::debug!(user_id = %subject.user_id, %change, %permission, "override unchanged");
            return Ok(current.unwrap_or(next));
        }

        next.updated_at = Utc::now();
        let saved = self.store.save_override(next, expected_version).await?;

        tracing::info!(
            user_id = %saved.user_id,
            role = %saved.role,
            %change,
            %permission,
            version = saved.version,
            "override updated"
        );
        Ok(saved)
    }
}
