//! Strongly-typed identifiers.
//!
//! Identities are issued by the authentication collaborator as opaque strings,
//! so these newtypes only guarantee the value is non-blank.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of an authenticated user (actor identity).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

/// Identifier of a company (tenant boundary).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompanyId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Build an identifier, rejecting blank values.
            pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(DomainError::validation(concat!($name, " must not be blank")));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

impl_string_newtype!(UserId, "UserId");
impl_string_newtype!(CompanyId, "CompanyId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_rejected() {
        assert!(UserId::new("").is_err());
        assert!(CompanyId::new("   ").is_err());
        assert_eq!(UserId::new("u-1").unwrap().as_str(), "u-1");
    }

    #[test]
    fn serde_rejects_blank_ids() {
        let parsed: Result<CompanyId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());

        let parsed: UserId = serde_json::from_str("\"user-42\"").unwrap();
        assert_eq!(parsed.to_string(), "user-42");
    }
}
