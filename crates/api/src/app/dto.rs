use serde::{Deserialize, Serialize};

use farmgate_auth::{Permission, Role};
use farmgate_core::CompanyId;

/// Body of `POST /overrides/:user_id/{grant,revoke,restore}`.
///
/// `role` and `companyId` describe the target user as the caller knows them;
/// `expectedVersion` is the override version last read (0 when none exists).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideChangeBody {
    pub role: Role,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    pub permission: String,
    pub expected_version: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleView {
    pub role: Role,
    pub description: &'static str,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionView {
    pub permission: Permission,
    pub category: &'static str,
    pub granted_by: Vec<Role>,
}
