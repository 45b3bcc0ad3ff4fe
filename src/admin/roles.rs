/// Admin Role Catalog
use crate::admin::permissions::PermissionSet;
use crate::error::{AdminError, AdminResult};
use serde::{Deserialize, Serialize};

/// Admin role levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Reviews reports and content, reads dashboards
    Moderator,
    /// Manages users and settings on top of moderation
    Admin,
    /// Full access
    SuperAdmin,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::Moderator => "moderator",
            AdminRole::Admin => "admin",
            AdminRole::SuperAdmin => "super_admin",
        }
    }

    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s.to_lowercase().as_str() {
            "moderator" => Ok(AdminRole::Moderator),
            "admin" => Ok(AdminRole::Admin),
            "super_admin" | "superadmin" => Ok(AdminRole::SuperAdmin),
            _ => Err(AdminError::Validation(format!("Invalid role: {}", s))),
        }
    }

    /// Check if this role can perform actions requiring another role
    pub fn can_act_as(&self, required: AdminRole) -> bool {
        self >= &required
    }

    /// Permissions implied by the role. This is the authoritative source;
    /// any stored permission set is a cache of it.
    pub fn permissions(&self) -> PermissionSet {
        match self {
            AdminRole::Moderator => PermissionSet::CONTENT_MODERATION | PermissionSet::ANALYTICS,
            AdminRole::Admin => {
                PermissionSet::USER_MANAGEMENT
                    | PermissionSet::CONTENT_MODERATION
                    | PermissionSet::SYSTEM_SETTINGS
                    | PermissionSet::ANALYTICS
            }
            AdminRole::SuperAdmin => PermissionSet::all(),
        }
    }

    pub fn all() -> &'static [AdminRole] {
        &[AdminRole::Moderator, AdminRole::Admin, AdminRole::SuperAdmin]
    }
}

/// Resolve the granted set for a role, adding `SUPER_ADMIN` for break-glass identities.
pub fn resolve_permissions(role: AdminRole, break_glass: bool) -> PermissionSet {
    let mut granted = role.permissions();
    if break_glass {
        granted |= PermissionSet::SUPER_ADMIN;
    }
    granted
}
