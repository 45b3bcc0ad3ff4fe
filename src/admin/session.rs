//! Admin Session Authority
//!
//! Validates administrator credentials, issues a time-boxed session and
//! revalidates it lazily on every restore. The authority is the only writer
//! of the persisted `adminSession` record.
//!
//! The stored `grantedPermissions` is a cache: on every restore the set is
//! re-derived from the identity's role, so a session persisted by an older
//! build never carries a stale capability set.

use crate::{
    admin::{
        permissions::{self, Permission, PermissionSet},
        roles::{resolve_permissions, AdminRole},
    },
    error::{AdminError, AdminResult},
    metrics,
    store::KeyValueStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Key of the persisted session record
pub const SESSION_KEY: &str = "adminSession";

/// Administrator identity, immutable for the life of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminIdentity {
    pub id: String,
    pub email: String,
    pub role: AdminRole,
    pub display_name: String,
}

/// Authenticated admin session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub identity: AdminIdentity,
    pub granted_permissions: PermissionSet,
    pub issued_at: DateTime<Utc>,
    pub session_id: String,
}

impl AdminSession {
    pub fn has_permission(&self, permission: Permission) -> bool {
        permissions::has_permission(self, permission)
    }

    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.issued_at + ttl
    }
}

/// Provisioned admin account: identity plus login secret
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCredential {
    #[serde(flatten)]
    pub identity: AdminIdentity,
    pub password: String,
}

impl std::fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredential")
            .field("identity", &self.identity)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Lookup of provisioned admin accounts
#[async_trait]
pub trait CredentialDirectory: Send + Sync {
    /// Find a credential by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> AdminResult<Option<AdminCredential>>;
}

/// Credential directory held in memory, optionally loaded from a JSON file
#[derive(Debug, Default)]
pub struct StaticCredentialDirectory {
    by_email: HashMap<String, AdminCredential>,
}

impl StaticCredentialDirectory {
    pub fn new(credentials: Vec<AdminCredential>) -> Self {
        let by_email = credentials
            .into_iter()
            .map(|c| (normalize_email(&c.identity.email), c))
            .collect();
        Self { by_email }
    }

    /// Load a JSON array of `{id, email, role, displayName, password}`
    pub async fn load_from_file(path: &Path) -> AdminResult<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let credentials: Vec<AdminCredential> = serde_json::from_str(&raw)?;
        info!(
            "Loaded {} admin account(s) from {}",
            credentials.len(),
            path.display()
        );
        Ok(Self::new(credentials))
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

#[async_trait]
impl CredentialDirectory for StaticCredentialDirectory {
    async fn find_by_email(&self, email: &str) -> AdminResult<Option<AdminCredential>> {
        Ok(self.by_email.get(&normalize_email(email)).cloned())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Session lifetime and escalation policy
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub ttl: Duration,
    /// Lowercased emails that receive `SUPER_ADMIN` on top of their role
    pub break_glass_emails: HashSet<String>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(24),
            break_glass_emails: HashSet::new(),
        }
    }
}

impl SessionPolicy {
    pub fn new(ttl: Duration, break_glass_emails: &[String]) -> Self {
        Self {
            ttl,
            break_glass_emails: break_glass_emails.iter().map(|e| normalize_email(e)).collect(),
        }
    }

    fn is_break_glass(&self, email: &str) -> bool {
        self.break_glass_emails.contains(&normalize_email(email))
    }
}

/// Issues, restores and terminates admin sessions
pub struct SessionAuthority {
    credentials: Arc<dyn CredentialDirectory>,
    store: Arc<dyn KeyValueStore>,
    policy: SessionPolicy,
}

impl SessionAuthority {
    pub fn new(
        credentials: Arc<dyn CredentialDirectory>,
        store: Arc<dyn KeyValueStore>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            credentials,
            store,
            policy,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.policy.ttl
    }

    /// Check credentials and issue a new session, replacing any persisted one
    pub async fn authenticate(&self, email: &str, password: &str) -> AdminResult<AdminSession> {
        let credential = match self.credentials.find_by_email(email).await? {
            Some(c) if !password.is_empty() && c.password == password => c,
            _ => {
                // Same error whether or not the account exists
                debug!("Admin login rejected for {}", normalize_email(email));
                metrics::record_auth_attempt("failure");
                return Err(AdminError::InvalidCredentials);
            }
        };

        let identity = credential.identity;
        let session = AdminSession {
            granted_permissions: self.permissions_for(&identity),
            identity,
            issued_at: Utc::now(),
            session_id: Uuid::new_v4().to_string(),
        };

        self.store
            .put_value(SESSION_KEY, serde_json::to_value(&session)?)
            .await?;

        metrics::record_auth_attempt("success");
        info!(
            "Admin {} signed in as {} (session {})",
            session.identity.id,
            session.identity.role.as_str(),
            session.session_id
        );

        Ok(session)
    }

    /// Apply the expiry policy to a persisted session.
    ///
    /// Returns `None` once `now - issuedAt` reaches the TTL. A live session is
    /// returned with its permissions re-derived from the role.
    pub fn restore_session(&self, persisted: AdminSession, now: DateTime<Utc>) -> Option<AdminSession> {
        if now - persisted.issued_at >= self.policy.ttl {
            return None;
        }

        let granted_permissions = self.permissions_for(&persisted.identity);
        Some(AdminSession {
            granted_permissions,
            ..persisted
        })
    }

    /// Restore the persisted session, if any and still live
    pub async fn restore(&self) -> AdminResult<Option<AdminSession>> {
        self.restore_at(Utc::now()).await
    }

    /// Restore the persisted session as of `now`.
    ///
    /// Expired or unreadable sessions are discarded and reported as `None`
    /// (silent logout).
    pub async fn restore_at(&self, now: DateTime<Utc>) -> AdminResult<Option<AdminSession>> {
        let Some(value) = self.store.get_value(SESSION_KEY).await? else {
            return Ok(None);
        };

        let persisted: AdminSession = match serde_json::from_value(value) {
            Ok(session) => session,
            Err(e) => {
                warn!("Discarding unreadable admin session: {}", e);
                self.store.delete_value(SESSION_KEY).await?;
                return Ok(None);
            }
        };

        let session_id = persisted.session_id.clone();
        match self.restore_session(persisted, now) {
            Some(session) => Ok(Some(session)),
            None => {
                debug!("Admin session {} expired, discarding", session_id);
                self.store.delete_value(SESSION_KEY).await?;
                Ok(None)
            }
        }
    }

    /// Resolve a bearer session id to a live session
    pub async fn validate(&self, session_id: &str) -> AdminResult<AdminSession> {
        match self.restore().await? {
            Some(session) if session.session_id == session_id => Ok(session),
            _ => Err(AdminError::SessionExpired),
        }
    }

    /// Discard the persisted session. Idempotent; a newer session issued to
    /// someone else is left alone.
    pub async fn terminate(&self, session: &AdminSession) -> AdminResult<()> {
        let Some(value) = self.store.get_value(SESSION_KEY).await? else {
            return Ok(());
        };

        let persisted_id = value
            .get("sessionId")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        if persisted_id.as_deref().map_or(true, |id| id == session.session_id) {
            self.store.delete_value(SESSION_KEY).await?;
            info!("Admin session {} terminated", session.session_id);
        }

        Ok(())
    }

    fn permissions_for(&self, identity: &AdminIdentity) -> PermissionSet {
        resolve_permissions(identity.role, self.policy.is_break_glass(&identity.email))
    }
}
