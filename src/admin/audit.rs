/// Admin audit trail
use crate::{
    admin::{permissions::require_permission, AdminSession, AuditLogEntry, Permission},
    error::AdminResult,
    store::{Collection, DocumentStore},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Actor recorded for machine-initiated transitions
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Clone)]
pub struct AuditLog {
    entries: Collection<AuditLogEntry>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            entries: Collection::new(store),
        }
    }

    /// Log admin action to audit log
    pub async fn record(
        &self,
        admin_id: &str,
        action: &str,
        subject_id: Option<&str>,
        details: Option<String>,
    ) -> AdminResult<AuditLogEntry> {
        let entry = AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            admin_id: admin_id.to_string(),
            action: action.to_string(),
            subject_id: subject_id.map(String::from),
            details,
            timestamp: Utc::now(),
        };

        Ok(self.entries.insert(entry).await?.record)
    }

    /// Newest entries first. Requires `SYSTEM_SETTINGS`.
    pub async fn recent(&self, session: &AdminSession, limit: usize) -> AdminResult<Vec<AuditLogEntry>> {
        require_permission(session, Permission::SystemSettings)?;

        let mut entries: Vec<AuditLogEntry> =
            self.entries.list().await?.into_iter().map(|v| v.record).collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        entries.truncate(limit);

        Ok(entries)
    }
}
