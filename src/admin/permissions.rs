//! Permission catalog and the permission gate.
//!
//! Capabilities are a closed enum ([`Permission`]) backed by a bitflag set
//! ([`PermissionSet`]). The superset rule for `SUPER_ADMIN` lives in exactly
//! one place, [`PermissionSet::grants`], and is evaluated at check time; the
//! stored set is never expanded.

use crate::admin::session::AdminSession;
use crate::error::{AdminError, AdminResult};
use crate::metrics;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Atomic right to perform a class of administrative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Change account status, ban and unban users
    UserManagement,
    /// Review reports and moderate content
    ContentModeration,
    /// Change service settings, read the audit log
    SystemSettings,
    /// Read dashboards and counters
    Analytics,
    /// Implies every other permission
    SuperAdmin,
}

impl Permission {
    /// Stable token used in persisted sessions and error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Permission::UserManagement => "USER_MANAGEMENT",
            Permission::ContentModeration => "CONTENT_MODERATION",
            Permission::SystemSettings => "SYSTEM_SETTINGS",
            Permission::Analytics => "ANALYTICS",
            Permission::SuperAdmin => "SUPER_ADMIN",
        }
    }

    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s.to_uppercase().as_str() {
            "USER_MANAGEMENT" => Ok(Permission::UserManagement),
            "CONTENT_MODERATION" => Ok(Permission::ContentModeration),
            "SYSTEM_SETTINGS" => Ok(Permission::SystemSettings),
            "ANALYTICS" => Ok(Permission::Analytics),
            "SUPER_ADMIN" => Ok(Permission::SuperAdmin),
            _ => Err(AdminError::Validation(format!("Invalid permission: {}", s))),
        }
    }

    /// Every defined permission, for iteration and exhaustive checks.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::UserManagement,
            Self::ContentModeration,
            Self::SystemSettings,
            Self::Analytics,
            Self::SuperAdmin,
        ]
    }

    /// The single flag corresponding to this permission.
    #[must_use]
    pub const fn flag(self) -> PermissionSet {
        match self {
            Permission::UserManagement => PermissionSet::USER_MANAGEMENT,
            Permission::ContentModeration => PermissionSet::CONTENT_MODERATION,
            Permission::SystemSettings => PermissionSet::SYSTEM_SETTINGS,
            Permission::Analytics => PermissionSet::ANALYTICS,
            Permission::SuperAdmin => PermissionSet::SUPER_ADMIN,
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Set of granted permissions.
    ///
    /// Serialized as the flag names joined by `|`, so persisted sessions stay
    /// readable and independent of bit positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PermissionSet: u8 {
        const USER_MANAGEMENT    = 1 << 0;
        const CONTENT_MODERATION = 1 << 1;
        const SYSTEM_SETTINGS    = 1 << 2;
        const ANALYTICS          = 1 << 3;
        const SUPER_ADMIN        = 1 << 4;
    }
}

impl PermissionSet {
    /// Gate rule: the permission itself or `SUPER_ADMIN`.
    #[must_use]
    pub fn grants(&self, permission: Permission) -> bool {
        self.contains(permission.flag()) || self.contains(Self::SUPER_ADMIN)
    }

    /// Explicitly stored permissions, without superset expansion.
    #[must_use]
    pub fn permissions(&self) -> Vec<Permission> {
        Permission::all()
            .iter()
            .copied()
            .filter(|p| self.contains(p.flag()))
            .collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        iter.into_iter()
            .fold(PermissionSet::empty(), |set, p| set | p.flag())
    }
}

/// Is `permission` granted to `session`? Pure and total.
#[must_use]
pub fn has_permission(session: &AdminSession, permission: Permission) -> bool {
    session.granted_permissions.grants(permission)
}

/// Gate consulted first by every mutating operation.
pub fn require_permission(session: &AdminSession, permission: Permission) -> AdminResult<()> {
    if has_permission(session, permission) {
        return Ok(());
    }

    tracing::warn!(
        "Permission {} denied for admin {} ({})",
        permission,
        session.identity.id,
        session.identity.role.as_str()
    );
    metrics::record_permission_denial(permission.as_str());

    Err(AdminError::PermissionDenied { permission })
}
