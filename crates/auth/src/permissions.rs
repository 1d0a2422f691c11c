use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A token that is not part of the permission catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

macro_rules! permission_catalog {
    ($($variant:ident => $token:literal,)+) => {
        /// Permission identifier drawn from the closed catalog.
        ///
        /// Every permission has a canonical `"<resource>:<action>"` token. Tokens
        /// arriving from outside the process are parsed with [`core::str::FromStr`];
        /// anything not listed here is rejected rather than coerced.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum Permission {
            $($variant,)+
        }

        impl Permission {
            /// The full catalog, in declaration order.
            pub const ALL: &'static [Permission] = &[$(Permission::$variant,)+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Permission::$variant => $token,)+
                }
            }
        }
    };
}

permission_catalog! {
    ProjectsView => "projects:view",
    ProjectsCreate => "projects:create",
    ProjectsEdit => "projects:edit",
    ProjectsDelete => "projects:delete",
    QuotesView => "quotes:view",
    QuotesCreate => "quotes:create",
    QuotesApprove => "quotes:approve",
    InvoicesView => "invoices:view",
    InvoicesCreate => "invoices:create",
    InvoicesPay => "invoices:pay",
    FinanceView => "finance:view",
    FinanceManage => "finance:manage",
    HrView => "hr:view",
    HrManage => "hr:manage",
    UsersView => "users:view",
    UsersCreate => "users:create",
    UsersEdit => "users:edit",
    UsersDelete => "users:delete",
    UsersManagePermissions => "users:manage_permissions",
    CompaniesView => "companies:view",
    CompaniesManage => "companies:manage",
    DesignerUse => "designer:use",
    CalculatorUse => "calculator:use",
    FarmsView => "farms:view",
    FarmsManage => "farms:manage",
    LoansView => "loans:view",
    LoansApprove => "loans:approve",
    TicketsView => "tickets:view",
    TicketsRespond => "tickets:respond",
    ReportsView => "reports:view",
    AuditView => "audit:view",
    SettingsManage => "settings:manage",
}

impl Permission {
    /// Look up a catalog entry by its token.
    pub fn parse(token: &str) -> Result<Self, UnknownPermission> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == token)
            .ok_or_else(|| UnknownPermission(token.to_string()))
    }

    /// Resource half of the token (`"projects"` for `"projects:view"`).
    ///
    /// Display grouping only; authorization never looks at it.
    pub fn category(self) -> &'static str {
        let token = self.as_str();
        token.split_once(':').map_or(token, |(resource, _)| resource)
    }
}

/// Whether `token` names a catalog permission.
pub fn is_known_permission(token: &str) -> bool {
    Permission::parse(token).is_ok()
}

impl core::str::FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Permission {
    type Error = UnknownPermission;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.as_str().to_string()
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn tokens_are_unique_and_well_formed() {
        let mut seen = HashSet::new();
        for p in Permission::ALL {
            assert!(seen.insert(p.as_str()), "duplicate token {p}");
            let (resource, action) = p.as_str().split_once(':').unwrap();
            assert!(!resource.is_empty() && !action.is_empty());
            assert!(!action.contains(':'));
        }
    }

    #[test]
    fn parse_round_trips_through_display() {
        for p in Permission::ALL {
            assert_eq!(p.to_string().parse::<Permission>().unwrap(), *p);
        }
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert!(!is_known_permission("not:a:real:permission"));
        assert!(!is_known_permission("Designer:use"));
        assert!(!is_known_permission(""));
        assert!(is_known_permission("designer:use"));
    }

    #[test]
    fn serde_uses_the_token() {
        let json = serde_json::to_string(&Permission::UsersDelete).unwrap();
        assert_eq!(json, "\"users:delete\"");

        let bad: Result<Permission, _> = serde_json::from_str("\"users:explode\"");
        assert!(bad.is_err());
    }

    #[test]
    fn category_is_resource_prefix() {
        assert_eq!(Permission::UsersManagePermissions.category(), "users");
        assert_eq!(Permission::CalculatorUse.category(), "calculator");
    }
}
