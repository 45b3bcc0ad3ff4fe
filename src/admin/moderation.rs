/// Content Moderation System
///
/// Drives moments and stories through their review states. Deletion is a
/// two-step operation: `request_delete` issues a single-use confirmation
/// token and `confirm_delete` redeems it.
use crate::{
    admin::{
        lifecycle::Lifecycle,
        permissions::{require_permission, Permission},
        ActionEffects, AdminSession,
    },
    error::{AdminError, AdminResult},
    store::{Collection, DocumentStore, Record, MODERATABLE_CONTENT},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Kind of moderatable content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Moment,
    Story,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Moment => "moment",
            ContentKind::Story => "story",
        }
    }

    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s {
            "moment" => Ok(ContentKind::Moment),
            "story" => Ok(ContentKind::Story),
            _ => Err(AdminError::Validation(format!("Invalid content kind: {}", s))),
        }
    }
}

/// Moderation status of a piece of content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Published,
    Flagged,
    UnderReview,
    Removed,
}

impl Lifecycle for ContentStatus {
    const ENTITY: &'static str = "content";

    fn successors(self) -> &'static [Self] {
        match self {
            ContentStatus::Published => &[
                ContentStatus::Flagged,
                ContentStatus::UnderReview,
                ContentStatus::Removed,
            ],
            ContentStatus::Flagged => &[
                ContentStatus::Published,
                ContentStatus::UnderReview,
                ContentStatus::Removed,
            ],
            ContentStatus::UnderReview => &[ContentStatus::Published, ContentStatus::Removed],
            ContentStatus::Removed => &[],
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Published => "published",
            ContentStatus::Flagged => "flagged",
            ContentStatus::UnderReview => "under_review",
            ContentStatus::Removed => "removed",
        }
    }
}

impl ContentStatus {
    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s {
            "published" => Ok(ContentStatus::Published),
            "flagged" => Ok(ContentStatus::Flagged),
            "under_review" => Ok(ContentStatus::UnderReview),
            "removed" => Ok(ContentStatus::Removed),
            _ => Err(AdminError::Validation(format!("Invalid content status: {}", s))),
        }
    }
}

/// Moderator action on content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentAction {
    /// Restore to public view
    Approve,
    /// Mark as suspicious
    Flag,
    /// Take under review
    Review,
    /// Remove permanently. Only reachable through delete confirmation.
    Delete,
}

impl ContentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentAction::Approve => "approve",
            ContentAction::Flag => "flag",
            ContentAction::Review => "review",
            ContentAction::Delete => "delete",
        }
    }

    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s.to_lowercase().as_str() {
            "approve" => Ok(ContentAction::Approve),
            "flag" => Ok(ContentAction::Flag),
            "review" => Ok(ContentAction::Review),
            "delete" => Ok(ContentAction::Delete),
            _ => Err(AdminError::Validation(format!("Invalid content action: {}", s))),
        }
    }

    /// Audit action name, `content.<verb>`
    pub fn audit_name(&self) -> &'static str {
        match self {
            ContentAction::Approve => "content.approve",
            ContentAction::Flag => "content.flag",
            ContentAction::Review => "content.review",
            ContentAction::Delete => "content.delete",
        }
    }

    pub fn target_status(&self) -> ContentStatus {
        match self {
            ContentAction::Approve => ContentStatus::Published,
            ContentAction::Flag => ContentStatus::Flagged,
            ContentAction::Review => ContentStatus::UnderReview,
            ContentAction::Delete => ContentStatus::Removed,
        }
    }
}

/// A moment or story subject to moderation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeratableContent {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    pub status: ContentStatus,
    pub author_id: String,
    /// Maintained by the stats aggregator, never set by hand
    #[serde(default)]
    pub report_count: u32,
    /// Set once the report count has reached the auto-flag threshold
    #[serde(default)]
    pub auto_flagged: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModeratableContent {
    pub fn new(
        id: impl Into<String>,
        kind: ContentKind,
        title: impl Into<String>,
        author_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            status: ContentStatus::Published,
            author_id: author_id.into(),
            report_count: 0,
            auto_flagged: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for ModeratableContent {
    const COLLECTION: &'static str = MODERATABLE_CONTENT;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Token handed out by `request_delete`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteConfirmation {
    pub token: String,
    pub content_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct PendingDelete {
    content_id: String,
    version: u64,
    requested_by: String,
    expires_at: DateTime<Utc>,
}

/// Content moderation manager
#[derive(Clone)]
pub struct ContentModerationManager {
    content: Collection<ModeratableContent>,
    pending_deletes: Arc<Mutex<HashMap<String, PendingDelete>>>,
    confirmation_ttl: Duration,
    effects: ActionEffects,
}

impl ContentModerationManager {
    pub fn new(store: Arc<dyn DocumentStore>, confirmation_ttl: Duration, effects: ActionEffects) -> Self {
        Self {
            content: Collection::new(store),
            pending_deletes: Arc::new(Mutex::new(HashMap::new())),
            confirmation_ttl,
            effects,
        }
    }

    /// Add newly published content. Called by the publishing side, not gated.
    pub async fn register(&self, content: ModeratableContent) -> AdminResult<ModeratableContent> {
        let content = self.content.insert(content).await?.record;
        tracing::debug!("Registered {} {}", content.kind.as_str(), content.id);
        Ok(content)
    }

    pub async fn get(&self, content_id: &str) -> AdminResult<Option<ModeratableContent>> {
        Ok(self.content.get(content_id).await?.map(|v| v.record))
    }

    /// Apply approve, flag or review. Delete must go through confirmation.
    pub async fn apply_action(
        &self,
        session: &AdminSession,
        content_id: &str,
        action: ContentAction,
    ) -> AdminResult<ModeratableContent> {
        let outcome = self.transition(session, content_id, action).await;
        self.effects
            .finish(session, action.audit_name(), content_id, None, outcome)
            .await
    }

    async fn transition(
        &self,
        session: &AdminSession,
        content_id: &str,
        action: ContentAction,
    ) -> AdminResult<ModeratableContent> {
        require_permission(session, Permission::ContentModeration)?;

        if action == ContentAction::Delete {
            return Err(AdminError::Validation(
                "Deleting content requires a confirmed delete request".to_string(),
            ));
        }

        let current = self.content.require(content_id).await?;
        let mut content = current.record;
        content.status = content.status.transition(action.target_status())?;
        content.updated_at = Utc::now();

        Ok(self.content.replace(current.version, content).await?.record)
    }

    /// First step of deletion. Nothing is mutated until the returned token
    /// is confirmed.
    pub async fn request_delete(
        &self,
        session: &AdminSession,
        content_id: &str,
    ) -> AdminResult<DeleteConfirmation> {
        match self.issue_delete_token(session, content_id).await {
            Ok(confirmation) => {
                self.effects.info(&format!(
                    "Confirm deletion of content {} before {}",
                    content_id,
                    confirmation.expires_at.to_rfc3339()
                ));
                Ok(confirmation)
            }
            Err(e) => {
                self.effects.fail("content.delete_request", content_id, &e);
                Err(e)
            }
        }
    }

    async fn issue_delete_token(
        &self,
        session: &AdminSession,
        content_id: &str,
    ) -> AdminResult<DeleteConfirmation> {
        require_permission(session, Permission::ContentModeration)?;

        let current = self.content.require(content_id).await?;
        current.record.status.transition(ContentStatus::Removed)?;

        let now = Utc::now();
        let token = Uuid::new_v4().to_string();
        let expires_at = now + self.confirmation_ttl;

        let mut pending = self.pending_deletes.lock().await;
        pending.retain(|_, p| p.expires_at > now);
        pending.insert(
            token.clone(),
            PendingDelete {
                content_id: content_id.to_string(),
                version: current.version,
                requested_by: session.identity.id.clone(),
                expires_at,
            },
        );

        tracing::debug!("Issued delete confirmation for content {}", content_id);

        Ok(DeleteConfirmation {
            token,
            content_id: content_id.to_string(),
            expires_at,
        })
    }

    /// Second step of deletion. The token is consumed whatever the outcome.
    pub async fn confirm_delete(
        &self,
        session: &AdminSession,
        token: &str,
    ) -> AdminResult<ModeratableContent> {
        let pending = self.pending_deletes.lock().await.remove(token);
        let subject = pending
            .as_ref()
            .map(|p| p.content_id.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let outcome = self.redeem(session, pending).await;
        self.effects
            .finish(session, "content.delete", &subject, None, outcome)
            .await
    }

    async fn redeem(
        &self,
        session: &AdminSession,
        pending: Option<PendingDelete>,
    ) -> AdminResult<ModeratableContent> {
        require_permission(session, Permission::ContentModeration)?;

        let pending = pending.ok_or_else(|| {
            AdminError::Validation("Unknown or already used delete confirmation".to_string())
        })?;

        if pending.expires_at <= Utc::now() {
            return Err(AdminError::Validation("Delete confirmation expired".to_string()));
        }
        if pending.requested_by != session.identity.id {
            return Err(AdminError::Validation(
                "Delete confirmation was issued to another administrator".to_string(),
            ));
        }

        let current = self.content.require(&pending.content_id).await?;
        if current.version != pending.version {
            return Err(AdminError::Conflict(format!(
                "Content {} changed since deletion was requested",
                pending.content_id
            )));
        }

        let mut content = current.record;
        content.status = content.status.transition(ContentStatus::Removed)?;
        content.updated_at = Utc::now();

        Ok(self.content.replace(current.version, content).await?.record)
    }
}
