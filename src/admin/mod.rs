/// Admin Access-Control and Moderation System
///
/// Decides who may act as an administrator, what they may do, and how
/// reported content and user accounts move through their states.

pub mod audit;
pub mod lifecycle;
pub mod moderation;
pub mod permissions;
pub mod query;
pub mod reports;
pub mod roles;
pub mod session;
pub mod stats;
pub mod users;

pub use audit::AuditLog;
pub use lifecycle::Lifecycle;
pub use moderation::{
    ContentAction, ContentKind, ContentModerationManager, ContentStatus, DeleteConfirmation,
    ModeratableContent,
};
pub use permissions::{has_permission, require_permission, Permission, PermissionSet};
pub use query::{QueryEngine, QueryPage, QueryParams, SortOrder};
pub use reports::{NewReport, Report, ReportAction, ReportManager, ReportPriority, ReportStatus, ReportType};
pub use roles::AdminRole;
pub use session::{
    AdminCredential, AdminIdentity, AdminSession, CredentialDirectory, SessionAuthority,
    SessionPolicy, StaticCredentialDirectory,
};
pub use stats::{DashboardStats, StatsAggregator};
pub use users::{BanDuration, ContentCounters, ManagedUser, UserLifecycleManager, UserRole, UserStatus};

use crate::{
    error::AdminResult,
    metrics,
    notify::{NotificationLevel, NotificationSink},
    store::{Record, ADMIN_AUDIT_LOG},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Admin action audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub admin_id: String,
    pub action: String,
    pub subject_id: Option<String>,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Record for AuditLogEntry {
    const COLLECTION: &'static str = ADMIN_AUDIT_LOG;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Follow-up work shared by every mutating admin operation: audit, metrics,
/// stats refresh and user feedback.
#[derive(Clone)]
pub struct ActionEffects {
    stats: Arc<StatsAggregator>,
    audit: AuditLog,
    notifier: Arc<dyn NotificationSink>,
}

impl ActionEffects {
    pub fn new(stats: Arc<StatsAggregator>, audit: AuditLog, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            stats,
            audit,
            notifier,
        }
    }

    /// Settle an action outcome. `action` is `<target>.<verb>`, e.g. `user.ban`.
    pub(crate) async fn finish<T>(
        &self,
        session: &AdminSession,
        action: &'static str,
        subject_id: &str,
        details: Option<String>,
        outcome: AdminResult<T>,
    ) -> AdminResult<T> {
        match outcome {
            Ok(value) => {
                if let Err(e) = self
                    .audit
                    .record(&session.identity.id, action, Some(subject_id), details)
                    .await
                {
                    tracing::warn!("Failed to write audit entry for {}: {}", action, e);
                }

                let (target, verb) = action.split_once('.').unwrap_or(("admin", action));
                metrics::record_moderation_action(verb, target);

                if let Err(e) = self.stats.refresh().await {
                    tracing::warn!("Stats refresh after {} failed: {}", action, e);
                }

                self.notifier.notify(
                    &format!("{} on {} succeeded", action, subject_id),
                    NotificationLevel::Success,
                );
                Ok(value)
            }
            Err(e) => {
                self.fail(action, subject_id, &e);
                Err(e)
            }
        }
    }

    /// Report a failed action without touching state
    pub(crate) fn fail(&self, action: &str, subject_id: &str, error: &crate::error::AdminError) {
        tracing::debug!("{} on {} failed: {}", action, subject_id, error);
        self.notifier.notify(
            &format!("{} on {} failed: {}", action, subject_id, error),
            NotificationLevel::Error,
        );
    }

    pub(crate) fn info(&self, message: &str) {
        self.notifier.notify(message, NotificationLevel::Info);
    }
}
