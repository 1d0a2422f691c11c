use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A role name outside the closed role set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

/// Role assigned to a user at account creation.
///
/// `Admin` is the designated super-role: it is the only role that bypasses
/// company scoping.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Company,
    Customer,
    Farmer,
    Bank,
    Support,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Company,
        Role::Customer,
        Role::Farmer,
        Role::Bank,
        Role::Support,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Company => "COMPANY",
            Role::Customer => "CUSTOMER",
            Role::Farmer => "FARMER",
            Role::Bank => "BANK",
            Role::Support => "SUPPORT",
        }
    }

    pub const fn bypasses_company_scope(self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn description(self) -> &'static str {
        match self {
            Role::Admin => "Platform administrator with every permission",
            Role::Company => "Company account managing projects, quotes and staff",
            Role::Customer => "End customer using the designer and calculator tools",
            Role::Farmer => "Farm operator managing farms and financing requests",
            Role::Bank => "Financing partner reviewing loans",
            Role::Support => "Support staff handling tickets with read access to users",
        }
    }
}

impl core::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_matches_serde_names() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_eq!("admin".parse::<Role>(), Err(UnknownRole("admin".to_string())));
        assert!(serde_json::from_str::<Role>("\"AUDITOR\"").is_err());
    }

    #[test]
    fn only_admin_bypasses_company_scope() {
        let bypassing: Vec<_> = Role::ALL.into_iter().filter(|r| r.bypasses_company_scope()).collect();
        assert_eq!(bypassing, vec![Role::Admin]);
    }
}
