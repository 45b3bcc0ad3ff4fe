/// Report Management System
use crate::{
    admin::{
        lifecycle::Lifecycle,
        moderation::{ContentKind, ModeratableContent},
        permissions::{require_permission, Permission},
        ActionEffects, AdminSession, StatsAggregator,
    },
    error::{AdminError, AdminResult},
    metrics,
    store::{Collection, DocumentStore, Record, REPORTS},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Report reason types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    InappropriateContent,
    Spam,
    Harassment,
    FakeInformation,
    Copyright,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::InappropriateContent => "inappropriate_content",
            ReportType::Spam => "spam",
            ReportType::Harassment => "harassment",
            ReportType::FakeInformation => "fake_information",
            ReportType::Copyright => "copyright",
        }
    }

    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s.to_lowercase().as_str() {
            "inappropriate_content" => Ok(ReportType::InappropriateContent),
            "spam" => Ok(ReportType::Spam),
            "harassment" => Ok(ReportType::Harassment),
            "fake_information" => Ok(ReportType::FakeInformation),
            "copyright" => Ok(ReportType::Copyright),
            _ => Err(AdminError::Validation(format!("Invalid report type: {}", s))),
        }
    }
}

/// Report status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewing,
    Resolved,
    Dismissed,
}

impl Lifecycle for ReportStatus {
    const ENTITY: &'static str = "report";

    fn successors(self) -> &'static [Self] {
        match self {
            ReportStatus::Pending => &[
                ReportStatus::Reviewing,
                ReportStatus::Resolved,
                ReportStatus::Dismissed,
            ],
            ReportStatus::Reviewing => &[ReportStatus::Resolved, ReportStatus::Dismissed],
            ReportStatus::Resolved | ReportStatus::Dismissed => &[],
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewing => "reviewing",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }
}

impl ReportStatus {
    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "reviewing" => Ok(ReportStatus::Reviewing),
            "resolved" => Ok(ReportStatus::Resolved),
            "dismissed" => Ok(ReportStatus::Dismissed),
            _ => Err(AdminError::Validation(format!("Invalid report status: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl ReportPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPriority::Low => "low",
            ReportPriority::Medium => "medium",
            ReportPriority::High => "high",
            ReportPriority::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(ReportPriority::Low),
            "medium" => Ok(ReportPriority::Medium),
            "high" => Ok(ReportPriority::High),
            "critical" => Ok(ReportPriority::Critical),
            _ => Err(AdminError::Validation(format!("Invalid report priority: {}", s))),
        }
    }
}

/// Moderator decision on a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportAction {
    /// Uphold the report
    Approve,
    /// Dismiss the report
    Reject,
    /// Start reviewing
    Review,
}

impl ReportAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportAction::Approve => "approve",
            ReportAction::Reject => "reject",
            ReportAction::Review => "review",
        }
    }

    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s.to_lowercase().as_str() {
            "approve" => Ok(ReportAction::Approve),
            "reject" => Ok(ReportAction::Reject),
            "review" => Ok(ReportAction::Review),
            _ => Err(AdminError::Validation(format!("Invalid report action: {}", s))),
        }
    }

    pub fn target_status(&self) -> ReportStatus {
        match self {
            ReportAction::Approve => ReportStatus::Resolved,
            ReportAction::Reject => ReportStatus::Dismissed,
            ReportAction::Review => ReportStatus::Reviewing,
        }
    }

    fn audit_name(&self) -> &'static str {
        match self {
            ReportAction::Approve => "report.approve",
            ReportAction::Reject => "report.reject",
            ReportAction::Review => "report.review",
        }
    }
}

/// Report record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub status: ReportStatus,
    pub priority: ReportPriority,
    pub subject_content_id: String,
    pub subject_content_type: ContentKind,
    pub reporter_id: String,
    pub reported_user_id: Option<String>,
    pub description: String,
    pub moderator_notes: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Report {
    const COLLECTION: &'static str = REPORTS;

    fn id(&self) -> &str {
        &self.id
    }
}

/// End-user report submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub title: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub priority: ReportPriority,
    pub subject_content_id: String,
    pub subject_content_type: ContentKind,
    pub reporter_id: String,
    pub description: String,
}

/// Report manager
#[derive(Clone)]
pub struct ReportManager {
    reports: Collection<Report>,
    content: Collection<ModeratableContent>,
    stats: Arc<StatsAggregator>,
    effects: ActionEffects,
}

impl ReportManager {
    pub fn new(store: Arc<dyn DocumentStore>, stats: Arc<StatsAggregator>, effects: ActionEffects) -> Self {
        Self {
            reports: Collection::new(Arc::clone(&store)),
            content: Collection::new(store),
            stats,
            effects,
        }
    }

    /// Submit a report. End users submit reports, so this is not gated.
    pub async fn submit_report(&self, new: NewReport) -> AdminResult<Report> {
        let description = new.description.trim();
        if description.is_empty() {
            return Err(AdminError::Validation(
                "Report description must not be empty".to_string(),
            ));
        }

        let subject = self.content.require(&new.subject_content_id).await?.record;
        if subject.kind != new.subject_content_type {
            return Err(AdminError::Validation(format!(
                "Content {} is a {}, not a {}",
                subject.id,
                subject.kind.as_str(),
                new.subject_content_type.as_str()
            )));
        }

        let now = Utc::now();
        let report = Report {
            id: Uuid::new_v4().to_string(),
            title: new.title.trim().to_string(),
            report_type: new.report_type,
            status: ReportStatus::Pending,
            priority: new.priority,
            subject_content_id: subject.id.clone(),
            subject_content_type: subject.kind,
            reporter_id: new.reporter_id,
            reported_user_id: Some(subject.author_id.clone()),
            description: description.to_string(),
            moderator_notes: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };

        let report = self.reports.insert(report).await?.record;
        metrics::record_report_submitted(report.report_type.as_str());
        tracing::info!(
            "Report {} submitted against {} {}",
            report.id,
            report.subject_content_type.as_str(),
            report.subject_content_id
        );

        if let Err(e) = self.stats.record_report(&report.subject_content_id).await {
            tracing::warn!(
                "Failed to update report count for content {}: {}",
                report.subject_content_id,
                e
            );
        }
        if let Err(e) = self.stats.refresh().await {
            tracing::warn!("Stats refresh after report submission failed: {}", e);
        }

        Ok(report)
    }

    pub async fn get(&self, report_id: &str) -> AdminResult<Option<Report>> {
        Ok(self.reports.get(report_id).await?.map(|v| v.record))
    }

    /// Apply a moderator decision. Empty notes leave existing notes untouched.
    pub async fn apply_action(
        &self,
        session: &AdminSession,
        report_id: &str,
        action: ReportAction,
        notes: Option<&str>,
    ) -> AdminResult<Report> {
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        let outcome = self.transition(session, report_id, action, notes).await;
        self.effects
            .finish(
                session,
                action.audit_name(),
                report_id,
                notes.map(String::from),
                outcome,
            )
            .await
    }

    async fn transition(
        &self,
        session: &AdminSession,
        report_id: &str,
        action: ReportAction,
        notes: Option<&str>,
    ) -> AdminResult<Report> {
        require_permission(session, Permission::ContentModeration)?;

        let current = self.reports.require(report_id).await?;
        let mut report = current.record;
        report.status = report.status.transition(action.target_status())?;

        let now = Utc::now();
        if let Some(notes) = notes {
            report.moderator_notes = Some(notes.to_string());
        }
        report.reviewed_by = Some(session.identity.id.clone());
        report.reviewed_at = Some(now);
        report.updated_at = now;

        Ok(self.reports.replace(current.version, report).await?.record)
    }
}
