/// Authentication extractors and utilities
use crate::{
    admin::{require_permission, AdminSession, Permission},
    api::middleware::extract_bearer_token,
    context::AdminContext,
    error::{AdminError, AdminResult},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Admin authentication context
///
/// The bearer token is the session id issued at login. A missing, stale or
/// superseded token is rejected with `SessionExpired`.
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub session: AdminSession,
}

impl AdminAuthContext {
    pub fn admin_id(&self) -> &str {
        &self.session.identity.id
    }

    /// Gate a read-only endpoint on `permission`
    pub fn require(&self, permission: Permission) -> AdminResult<()> {
        require_permission(&self.session, permission)
    }
}

#[async_trait]
impl FromRequestParts<AdminContext> for AdminAuthContext {
    type Rejection = AdminError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AdminContext,
    ) -> Result<Self, Self::Rejection> {
        // Extract bearer token
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            tracing::debug!("AdminAuthContext: missing authorization header");
            AdminError::SessionExpired
        })?;

        let session = state.session_authority.validate(&token).await?;

        Ok(AdminAuthContext { session })
    }
}
