//! Optimistic concurrency primitives.

use serde::{Deserialize, Serialize};

/// Optimistic concurrency expectation for a versioned record.
///
/// Version `0` means "no record stored yet"; every successful write bumps the
/// stored version by exactly one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedVersion {
    /// The record must not exist yet.
    Absent,
    /// Require the record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Interpret a caller-supplied version number (`0` = absent).
    pub fn from_raw(version: u64) -> Self {
        if version == 0 {
            ExpectedVersion::Absent
        } else {
            ExpectedVersion::Exact(version)
        }
    }

    pub fn as_raw(self) -> u64 {
        match self {
            ExpectedVersion::Absent => 0,
            ExpectedVersion::Exact(v) => v,
        }
    }

    pub fn matches(self, actual: u64) -> bool {
        self.as_raw() == actual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_means_absent() {
        assert_eq!(ExpectedVersion::from_raw(0), ExpectedVersion::Absent);
        assert!(ExpectedVersion::Absent.matches(0));
        assert!(!ExpectedVersion::Absent.matches(1));
    }

    #[test]
    fn exact_version_matches_only_itself() {
        assert_eq!(ExpectedVersion::from_raw(3), ExpectedVersion::Exact(3));
        assert!(ExpectedVersion::Exact(3).matches(3));
        assert!(!ExpectedVersion::Exact(2).matches(3));
        assert_eq!(ExpectedVersion::Exact(3).as_raw(), 3);
    }
}
