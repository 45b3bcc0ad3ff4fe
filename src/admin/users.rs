/// User Lifecycle Manager
///
/// Applies administrator-initiated status transitions to end-user accounts.
use crate::{
    admin::{
        lifecycle::Lifecycle,
        permissions::{require_permission, Permission},
        ActionEffects, AdminSession,
    },
    error::{AdminError, AdminResult},
    store::{Collection, DocumentStore, Record, MANAGED_USERS},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// End-user account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Banned,
    Pending,
}

impl Lifecycle for UserStatus {
    const ENTITY: &'static str = "user";

    fn successors(self) -> &'static [Self] {
        match self {
            UserStatus::Active => &[UserStatus::Inactive, UserStatus::Banned],
            UserStatus::Inactive => &[UserStatus::Active, UserStatus::Banned],
            UserStatus::Banned => &[UserStatus::Active],
            UserStatus::Pending => &[UserStatus::Active],
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Banned => "banned",
            UserStatus::Pending => "pending",
        }
    }
}

impl UserStatus {
    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "banned" => Ok(UserStatus::Banned),
            "pending" => Ok(UserStatus::Pending),
            _ => Err(AdminError::Validation(format!("Invalid user status: {}", s))),
        }
    }
}

/// End-user role. Unrelated to [`AdminRole`](crate::admin::AdminRole).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }
}

/// How long a ban lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BanDuration {
    #[serde(rename = "7_days")]
    SevenDays,
    #[serde(rename = "30_days")]
    ThirtyDays,
    #[serde(rename = "90_days")]
    NinetyDays,
    #[serde(rename = "permanent")]
    Permanent,
}

impl BanDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            BanDuration::SevenDays => "7_days",
            BanDuration::ThirtyDays => "30_days",
            BanDuration::NinetyDays => "90_days",
            BanDuration::Permanent => "permanent",
        }
    }

    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s {
            "7_days" => Ok(BanDuration::SevenDays),
            "30_days" => Ok(BanDuration::ThirtyDays),
            "90_days" => Ok(BanDuration::NinetyDays),
            "permanent" => Ok(BanDuration::Permanent),
            _ => Err(AdminError::Validation(format!("Invalid ban duration: {}", s))),
        }
    }

    /// When a ban issued at `banned_at` lapses. `None` for permanent bans.
    pub fn expires_at(&self, banned_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            BanDuration::SevenDays => 7,
            BanDuration::ThirtyDays => 30,
            BanDuration::NinetyDays => 90,
            BanDuration::Permanent => return None,
        };
        Some(banned_at + Duration::days(days))
    }
}

/// Non-removed content authored by a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCounters {
    pub moments: u64,
    pub stories: u64,
}

/// End-user account as seen by administrators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub status: UserStatus,
    pub role: UserRole,
    pub ban_reason: Option<String>,
    pub ban_duration: Option<BanDuration>,
    pub banned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content_counters: ContentCounters,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ManagedUser {
    /// A fresh active account with the `user` role
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            status: UserStatus::Active,
            role: UserRole::User,
            ban_reason: None,
            ban_duration: None,
            banned_at: None,
            content_counters: ContentCounters::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn ban_expires_at(&self) -> Option<DateTime<Utc>> {
        match (self.ban_duration, self.banned_at) {
            (Some(duration), Some(banned_at)) => duration.expires_at(banned_at),
            _ => None,
        }
    }

    fn clear_ban(&mut self) {
        self.ban_reason = None;
        self.ban_duration = None;
        self.banned_at = None;
    }
}

impl Record for ManagedUser {
    const COLLECTION: &'static str = MANAGED_USERS;

    fn id(&self) -> &str {
        &self.id
    }
}

/// User account management
#[derive(Clone)]
pub struct UserLifecycleManager {
    users: Collection<ManagedUser>,
    effects: ActionEffects,
}

impl UserLifecycleManager {
    pub fn new(store: Arc<dyn DocumentStore>, effects: ActionEffects) -> Self {
        Self {
            users: Collection::new(store),
            effects,
        }
    }

    /// Add an account to the managed collection. Provisioning happens
    /// outside the admin surface, so this is not permission-gated.
    pub async fn register(&self, user: ManagedUser) -> AdminResult<ManagedUser> {
        let user = self.users.insert(user).await?.record;
        tracing::debug!("Registered managed user {}", user.id);
        Ok(user)
    }

    pub async fn get(&self, user_id: &str) -> AdminResult<Option<ManagedUser>> {
        Ok(self.users.get(user_id).await?.map(|v| v.record))
    }

    /// Move a user to a non-banned status
    pub async fn set_status(
        &self,
        session: &AdminSession,
        user_id: &str,
        new_status: UserStatus,
    ) -> AdminResult<ManagedUser> {
        let outcome = self.apply_status(session, user_id, new_status).await;
        self.effects
            .finish(
                session,
                "user.set_status",
                user_id,
                Some(format!("status={}", new_status.as_str())),
                outcome,
            )
            .await
    }

    async fn apply_status(
        &self,
        session: &AdminSession,
        user_id: &str,
        new_status: UserStatus,
    ) -> AdminResult<ManagedUser> {
        require_permission(session, Permission::UserManagement)?;

        if new_status == UserStatus::Banned {
            return Err(AdminError::Validation(
                "Use the ban operation to ban a user".to_string(),
            ));
        }

        let current = self.users.require(user_id).await?;
        let mut user = current.record;
        user.status = user.status.transition(new_status)?;
        if new_status == UserStatus::Active {
            user.clear_ban();
        }
        user.updated_at = Utc::now();

        Ok(self.users.replace(current.version, user).await?.record)
    }

    /// Ban a user. Re-banning an already banned user overwrites the ban.
    pub async fn ban(
        &self,
        session: &AdminSession,
        user_id: &str,
        reason: &str,
        duration: BanDuration,
    ) -> AdminResult<ManagedUser> {
        let outcome = self.apply_ban(session, user_id, reason, duration).await;
        self.effects
            .finish(
                session,
                "user.ban",
                user_id,
                Some(format!("duration={} reason={}", duration.as_str(), reason.trim())),
                outcome,
            )
            .await
    }

    async fn apply_ban(
        &self,
        session: &AdminSession,
        user_id: &str,
        reason: &str,
        duration: BanDuration,
    ) -> AdminResult<ManagedUser> {
        require_permission(session, Permission::UserManagement)?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AdminError::Validation("Ban reason must not be empty".to_string()));
        }

        let current = self.users.require(user_id).await?;
        let mut user = current.record;
        if user.status != UserStatus::Banned {
            user.status = user.status.transition(UserStatus::Banned)?;
        }

        let now = Utc::now();
        user.ban_reason = Some(reason.to_string());
        user.ban_duration = Some(duration);
        user.banned_at = Some(now);
        user.updated_at = now;

        Ok(self.users.replace(current.version, user).await?.record)
    }

    pub async fn unban(&self, session: &AdminSession, user_id: &str) -> AdminResult<ManagedUser> {
        let outcome = self.apply_unban(session, user_id).await;
        self.effects
            .finish(session, "user.unban", user_id, None, outcome)
            .await
    }

    async fn apply_unban(&self, session: &AdminSession, user_id: &str) -> AdminResult<ManagedUser> {
        require_permission(session, Permission::UserManagement)?;

        let current = self.users.require(user_id).await?;
        let mut user = current.record;
        if user.status != UserStatus::Banned {
            return Err(AdminError::InvalidTransition {
                entity: UserStatus::ENTITY,
                from: user.status.as_str().to_string(),
                to: UserStatus::Active.as_str().to_string(),
            });
        }

        user.status = UserStatus::Active;
        user.clear_ban();
        user.updated_at = Utc::now();

        Ok(self.users.replace(current.version, user).await?.record)
    }

    /// Banned users whose ban has lapsed by `now`. Bans never lift on their
    /// own; an operator job calls this and unbans the results.
    pub async fn expired_bans(&self, now: DateTime<Utc>) -> AdminResult<Vec<ManagedUser>> {
        Ok(self
            .users
            .list()
            .await?
            .into_iter()
            .map(|v| v.record)
            .filter(|u| u.status == UserStatus::Banned)
            .filter(|u| u.ban_expires_at().map_or(false, |at| at <= now))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{fixtures, AdminRole};
    use crate::notify::NotificationLevel;

    #[test]
    fn test_user_status_transitions() {
        assert!(UserStatus::Active.can_transition_to(UserStatus::Inactive));
        assert!(UserStatus::Inactive.can_transition_to(UserStatus::Banned));
        assert!(UserStatus::Pending.can_transition_to(UserStatus::Active));
        assert!(!UserStatus::Pending.can_transition_to(UserStatus::Banned));
        assert!(!UserStatus::Banned.can_transition_to(UserStatus::Inactive));
        assert!(!UserStatus::Active.can_transition_to(UserStatus::Active));
        assert!(UserStatus::from_str("suspended").is_err());
    }

    #[test]
    fn test_ban_duration_expiry() {
        let at = Utc::now();
        assert_eq!(BanDuration::SevenDays.expires_at(at), Some(at + Duration::days(7)));
        assert_eq!(BanDuration::NinetyDays.expires_at(at), Some(at + Duration::days(90)));
        assert_eq!(BanDuration::Permanent.expires_at(at), None);
        assert_eq!(
            serde_json::to_value(BanDuration::ThirtyDays).unwrap(),
            serde_json::json!("30_days")
        );
    }

    #[tokio::test]
    async fn test_ban_then_unban() {
        let h = fixtures::harness().await;
        h.users.register(ManagedUser::new("u1", "Ada", "ada@example.com")).await.unwrap();
        let admin = fixtures::session(AdminRole::Admin);

        let banned = h
            .users
            .ban(&admin, "u1", "  spam  ", BanDuration::SevenDays)
            .await
            .unwrap();
        assert_eq!(banned.status, UserStatus::Banned);
        assert_eq!(banned.ban_reason.as_deref(), Some("spam"));
        assert!(banned.banned_at.is_some());

        let unbanned = h.users.unban(&admin, "u1").await.unwrap();
        assert_eq!(unbanned.status, UserStatus::Active);
        assert!(unbanned.ban_reason.is_none());
        assert!(unbanned.ban_duration.is_none());
        assert!(unbanned.banned_at.is_none());

        assert_eq!(h.notifier.last().unwrap().1, NotificationLevel::Success);
    }

    #[tokio::test]
    async fn test_ban_requires_reason() {
        let h = fixtures::harness().await;
        h.users.register(ManagedUser::new("u1", "Ada", "ada@example.com")).await.unwrap();
        let admin = fixtures::session(AdminRole::Admin);

        let err = h
            .users
            .ban(&admin, "u1", "   ", BanDuration::Permanent)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        let user = h.users.get("u1").await.unwrap().unwrap();
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(h.notifier.last().unwrap().1, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn test_rebanning_overwrites_ban() {
        let h = fixtures::harness().await;
        h.users.register(ManagedUser::new("u1", "Ada", "ada@example.com")).await.unwrap();
        let admin = fixtures::session(AdminRole::Admin);

        h.users.ban(&admin, "u1", "spam", BanDuration::SevenDays).await.unwrap();
        let again = h
            .users
            .ban(&admin, "u1", "harassment", BanDuration::Permanent)
            .await
            .unwrap();

        assert_eq!(again.ban_reason.as_deref(), Some("harassment"));
        assert_eq!(again.ban_duration, Some(BanDuration::Permanent));
    }

    #[tokio::test]
    async fn test_moderator_cannot_ban() {
        let h = fixtures::harness().await;
        h.users.register(ManagedUser::new("u1", "Ada", "ada@example.com")).await.unwrap();
        let moderator = fixtures::session(AdminRole::Moderator);

        let err = h
            .users
            .ban(&moderator, "u1", "spam", BanDuration::SevenDays)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AdminError::PermissionDenied {
                permission: Permission::UserManagement
            }
        ));
        assert_eq!(h.users.get("u1").await.unwrap().unwrap().status, UserStatus::Active);
    }

    #[tokio::test]
    async fn test_invalid_status_changes() {
        let h = fixtures::harness().await;
        let mut pending = ManagedUser::new("u2", "Bo", "bo@example.com");
        pending.status = UserStatus::Pending;
        h.users.register(pending).await.unwrap();
        h.users.register(ManagedUser::new("u1", "Ada", "ada@example.com")).await.unwrap();
        let admin = fixtures::session(AdminRole::Admin);

        let err = h.users.set_status(&admin, "u1", UserStatus::Banned).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        let err = h.users.set_status(&admin, "u1", UserStatus::Active).await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidTransition { .. }));

        let err = h.users.unban(&admin, "u1").await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidTransition { .. }));

        let err = h
            .users
            .ban(&admin, "u2", "spam", BanDuration::SevenDays)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::InvalidTransition { .. }));

        let activated = h.users.set_status(&admin, "u2", UserStatus::Active).await.unwrap();
        assert_eq!(activated.status, UserStatus::Active);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let h = fixtures::harness().await;
        let admin = fixtures::session(AdminRole::Admin);

        let err = h.users.unban(&admin, "ghost").await.unwrap_err();
        assert!(matches!(err, AdminError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_expired_bans() {
        let h = fixtures::harness().await;
        h.users.register(ManagedUser::new("u1", "Ada", "ada@example.com")).await.unwrap();
        h.users.register(ManagedUser::new("u2", "Bo", "bo@example.com")).await.unwrap();
        let admin = fixtures::session(AdminRole::Admin);

        h.users.ban(&admin, "u1", "spam", BanDuration::SevenDays).await.unwrap();
        h.users.ban(&admin, "u2", "spam", BanDuration::Permanent).await.unwrap();

        assert!(h.users.expired_bans(Utc::now()).await.unwrap().is_empty());

        let later = Utc::now() + Duration::days(8);
        let expired = h.users.expired_bans(later).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, "u1");

        // Expiry is reported, never applied
        assert_eq!(h.users.get("u1").await.unwrap().unwrap().status, UserStatus::Banned);
    }
}
