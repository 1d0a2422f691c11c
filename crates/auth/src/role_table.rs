//! Static role → base permission mapping.
//!
//! The table is built once at process start and shared read-only behind an
//! `Arc`. Any inconsistency is a [`ConfigurationError`] and must stop startup.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::overrides::UserOverride;
use crate::resolver;
use crate::{Permission, Role};

static NO_PERMISSIONS: BTreeSet<Permission> = BTreeSet::new();

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("role table is not valid JSON: {0}")]
    Malformed(String),

    #[error("role table names unknown role '{0}'")]
    UnknownRole(String),

    #[error("role {role} lists unknown permission '{token}'")]
    UnknownPermission { role: Role, token: String },

    #[error("role table has no entry for role {0}")]
    MissingRole(Role),
}

/// Immutable mapping of every [`Role`] to its base permission set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTable {
    roles: BTreeMap<Role, BTreeSet<Permission>>,
}

impl RoleTable {
    /// The role table shipped with the platform.
    pub fn builtin() -> Self {
        let roles = Role::ALL
            .into_iter()
            .map(|role| (role, builtin_permissions(role).into_iter().collect()))
            .collect();
        Self { roles }
    }

    /// Load a role table from a JSON document of the form
    /// `{ "ROLE": ["resource:action", ...], ... }`.
    ///
    /// Every role must be present; unknown role names and unknown tokens are
    /// rejected.
    pub fn from_json(doc: &str) -> Result<Self, ConfigurationError> {
        let raw: BTreeMap<String, Vec<String>> =
            serde_json::from_str(doc).map_err(|e| ConfigurationError::Malformed(e.to_string()))?;

        let mut roles = BTreeMap::new();
        for (name, tokens) in raw {
            let role: Role = name
                .parse()
                .map_err(|_| ConfigurationError::UnknownRole(name.clone()))?;

            let mut perms = BTreeSet::new();
            for token in tokens {
                let perm = Permission::parse(&token)
                    .map_err(|_| ConfigurationError::UnknownPermission { role, token })?;
                perms.insert(perm);
            }
            roles.insert(role, perms);
        }

        if let Some(missing) = Role::ALL.into_iter().find(|r| !roles.contains_key(r)) {
            return Err(ConfigurationError::MissingRole(missing));
        }

        Ok(Self { roles })
    }

    /// Base permission set granted to `role`.
    pub fn base_permissions(&self, role: Role) -> &BTreeSet<Permission> {
        // Construction guarantees every role has an entry.
        self.roles.get(&role).unwrap_or(&NO_PERMISSIONS)
    }

    /// Effective permission set for `role` after layering `override_` on top.
    pub fn effective_permissions(
        &self,
        role: Role,
        override_: Option<&UserOverride>,
    ) -> BTreeSet<Permission> {
        resolver::effective_permissions(self.base_permissions(role), override_)
    }

    /// Roles and their base sets, in role order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &BTreeSet<Permission>)> {
        self.roles.iter().map(|(role, perms)| (*role, perms))
    }

    /// Roles whose base set includes `permission`.
    pub fn roles_granting(&self, permission: Permission) -> Vec<Role> {
        self.iter()
            .filter(|(_, perms)| perms.contains(&permission))
            .map(|(role, _)| role)
            .collect()
    }
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_permissions(role: Role) -> Vec<Permission> {
    use Permission::*;

    match role {
        Role::Admin => Permission::ALL.to_vec(),
        Role::Company => vec![
            // Projects & quotes
            ProjectsView,
            ProjectsCreate,
            ProjectsEdit,
            ProjectsDelete,
            QuotesView,
            QuotesCreate,
            QuotesApprove,
            // Finance (no payment management)
            InvoicesView,
            InvoicesCreate,
            FinanceView,
            // HR & staff
            HrView,
            HrManage,
            UsersView,
            UsersCreate,
            UsersEdit,
            CompaniesView,
            // Tools
            DesignerUse,
            CalculatorUse,
            ReportsView,
        ],
        Role::Customer => vec![
            DesignerUse,
            CalculatorUse,
            ProjectsView,
            QuotesView,
            InvoicesView,
            InvoicesPay,
        ],
        Role::Farmer => vec![FarmsView, FarmsManage, CalculatorUse, LoansView, QuotesView],
        Role::Bank => vec![LoansView, LoansApprove, FinanceView, CompaniesView, ReportsView],
        Role::Support => vec![UsersView, TicketsView, TicketsRespond, ProjectsView, AuditView],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_role() {
        let table = RoleTable::builtin();
        for role in Role::ALL {
            assert!(!table.base_permissions(role).is_empty(), "{role} has no permissions");
        }
        assert_eq!(table.base_permissions(Role::Admin).len(), Permission::ALL.len());
    }

    #[test]
    fn builtin_customer_and_support_sets() {
        let table = RoleTable::builtin();
        let customer = table.base_permissions(Role::Customer);
        assert!(customer.contains(&Permission::DesignerUse));
        assert!(customer.contains(&Permission::CalculatorUse));

        let support = table.base_permissions(Role::Support);
        assert!(!support.contains(&Permission::UsersDelete));
    }

    #[test]
    fn from_json_loads_a_complete_table() {
        let doc = r#"{
            "ADMIN": ["users:delete", "users:manage_permissions"],
            "COMPANY": ["projects:view"],
            "CUSTOMER": ["designer:use", "calculator:use"],
            "FARMER": [],
            "BANK": ["loans:approve"],
            "SUPPORT": ["tickets:view"]
        }"#;
        let table = RoleTable::from_json(doc).unwrap();
        assert!(table.base_permissions(Role::Farmer).is_empty());
        assert_eq!(table.roles_granting(Permission::LoansApprove), vec![Role::Bank]);
    }

    #[test]
    fn from_json_rejects_unknown_role() {
        let err = RoleTable::from_json(r#"{ "AUDITOR": [] }"#).unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownRole("AUDITOR".to_string()));
    }

    #[test]
    fn from_json_rejects_unknown_permission() {
        let doc = r#"{
            "ADMIN": [], "COMPANY": [], "CUSTOMER": ["designer:fly"],
            "FARMER": [], "BANK": [], "SUPPORT": []
        }"#;
        let err = RoleTable::from_json(doc).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownPermission {
                role: Role::Customer,
                token: "designer:fly".to_string()
            }
        );
    }

    #[test]
    fn from_json_rejects_missing_role() {
        let doc = r#"{ "ADMIN": [], "COMPANY": [], "CUSTOMER": [], "FARMER": [], "BANK": [] }"#;
        let err = RoleTable::from_json(doc).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingRole(Role::Support));
    }

    #[test]
    fn from_json_rejects_malformed_documents() {
        assert!(matches!(
            RoleTable::from_json("[1, 2, 3]"),
            Err(ConfigurationError::Malformed(_))
        ));
    }
}
