//! Dashboard statistics
//!
//! Derived counters are recomputed from the collections rather than
//! incremented, so a refresh after any mutation always converges. The
//! aggregator is also the only writer of `ModeratableContent::report_count`
//! and `ManagedUser::content_counters`, and owns auto-escalation of heavily
//! reported content.

use crate::{
    admin::{
        audit::{AuditLog, SYSTEM_ACTOR},
        lifecycle::Lifecycle,
        moderation::{ContentKind, ContentStatus, ModeratableContent},
        reports::{Report, ReportStatus},
        users::{ContentCounters, ManagedUser, UserStatus},
    },
    error::{AdminError, AdminResult},
    metrics,
    notify::{NotificationLevel, NotificationSink},
    store::{Collection, DocumentStore, Versioned},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Dashboard snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub active_users: u64,
    pub total_moments: u64,
    pub total_stories: u64,
    pub pending_reports: u64,
    pub generated_at: Option<DateTime<Utc>>,
}

pub struct StatsAggregator {
    users: Collection<ManagedUser>,
    reports: Collection<Report>,
    content: Collection<ModeratableContent>,
    auto_flag_threshold: u32,
    snapshot: RwLock<DashboardStats>,
    audit: AuditLog,
    notifier: Arc<dyn NotificationSink>,
}

impl StatsAggregator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        auto_flag_threshold: u32,
        audit: AuditLog,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            users: Collection::new(Arc::clone(&store)),
            reports: Collection::new(Arc::clone(&store)),
            content: Collection::new(store),
            auto_flag_threshold,
            snapshot: RwLock::new(DashboardStats::default()),
            audit,
            notifier,
        }
    }

    /// Last computed snapshot
    pub async fn current(&self) -> DashboardStats {
        self.snapshot.read().await.clone()
    }

    /// Recompute every derived counter from the collections
    pub async fn refresh(&self) -> AdminResult<DashboardStats> {
        let users = self.users.list().await?;
        let reports = self.reports.list().await?;
        let content = self.content.list().await?;

        let mut report_counts: HashMap<(&str, ContentKind), u32> = HashMap::new();
        for report in reports.iter().map(|v| &v.record) {
            *report_counts
                .entry((report.subject_content_id.as_str(), report.subject_content_type))
                .or_default() += 1;
        }

        let mut counters: HashMap<&str, ContentCounters> = HashMap::new();
        let mut stats = DashboardStats::default();

        for item in content.iter().map(|v| &v.record) {
            if item.status == ContentStatus::Removed {
                continue;
            }
            let author = counters.entry(item.author_id.as_str()).or_default();
            match item.kind {
                ContentKind::Moment => {
                    stats.total_moments += 1;
                    author.moments += 1;
                }
                ContentKind::Story => {
                    stats.total_stories += 1;
                    author.stories += 1;
                }
            }
        }

        stats.total_users = users.len() as u64;
        stats.active_users = users
            .iter()
            .filter(|v| v.record.status == UserStatus::Active)
            .count() as u64;
        stats.pending_reports = reports
            .iter()
            .filter(|v| v.record.status == ReportStatus::Pending)
            .count() as u64;
        stats.generated_at = Some(Utc::now());

        for stored in &content {
            let derived = report_counts
                .get(&(stored.record.id.as_str(), stored.record.kind))
                .copied()
                .unwrap_or(0);
            settle(self.apply_report_count(stored, derived).await, &stored.record.id)?;
        }

        for stored in &users {
            let derived = counters
                .get(stored.record.id.as_str())
                .copied()
                .unwrap_or_default();
            if stored.record.content_counters != derived {
                let mut updated = stored.record.clone();
                updated.content_counters = derived;
                settle(self.users.replace(stored.version, updated).await, &stored.record.id)?;
            }
        }

        metrics::set_dashboard_gauges(&stats);
        *self.snapshot.write().await = stats.clone();

        tracing::debug!(
            "Stats refreshed: {} users, {} pending reports",
            stats.total_users,
            stats.pending_reports
        );

        Ok(stats)
    }

    /// Update the report count of one content item after a new report and
    /// auto-flag it when the count first reaches the threshold.
    ///
    /// Only published content is escalated. Content already flagged, under
    /// review or removed keeps its status.
    pub async fn record_report(&self, content_id: &str) -> AdminResult<ModeratableContent> {
        let current = self.content.require(content_id).await?;
        let kind = current.record.kind;

        let count = self
            .reports
            .list()
            .await?
            .into_iter()
            .filter(|v| v.record.subject_content_id == content_id && v.record.subject_content_type == kind)
            .count() as u32;

        self.apply_report_count(&current, count).await
    }

    /// Write a count derived from the reports collection and escalate on the
    /// first time it reaches the threshold.
    ///
    /// The `auto_flagged` marker travels with the same write, so whichever
    /// caller lands the count also lands the escalation.
    async fn apply_report_count(
        &self,
        stored: &Versioned<ModeratableContent>,
        count: u32,
    ) -> AdminResult<ModeratableContent> {
        let mut updated = stored.record.clone();
        updated.report_count = count;

        let mut escalate = false;
        if count >= self.auto_flag_threshold && !updated.auto_flagged {
            updated.auto_flagged = true;
            if updated.status == ContentStatus::Published {
                updated.status = updated.status.transition(ContentStatus::Flagged)?;
                updated.updated_at = Utc::now();
                escalate = true;
            }
        }

        if updated == stored.record {
            return Ok(updated);
        }

        let updated = self.content.replace(stored.version, updated).await?.record;

        if escalate {
            tracing::info!(
                "Auto-flagged {} {} after {} reports",
                updated.kind.as_str(),
                updated.id,
                count
            );
            metrics::record_auto_flag();
            if let Err(e) = self
                .audit
                .record(
                    SYSTEM_ACTOR,
                    "content.auto_flag",
                    Some(&updated.id),
                    Some(format!("reports={}", count)),
                )
                .await
            {
                tracing::warn!("Failed to audit auto-flag of {}: {}", updated.id, e);
            }
            self.notifier.notify(
                &format!("Content {} was auto-flagged after {} reports", updated.id, count),
                NotificationLevel::Info,
            );
        }

        Ok(updated)
    }
}

/// A derived-counter write that lost a race is left for the next refresh
fn settle<T>(result: AdminResult<T>, id: &str) -> AdminResult<()> {
    match result {
        Ok(_) => Ok(()),
        Err(AdminError::Conflict(msg)) => {
            tracing::debug!("Skipping counter update for {}: {}", id, msg);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
