/// Admin API Endpoints
use crate::{
    admin::{
        AdminIdentity, AuditLogEntry, BanDuration, ContentAction, DashboardStats,
        DeleteConfirmation, ManagedUser, ModeratableContent, Permission, PermissionSet, QueryPage,
        QueryParams, Report, ReportAction, UserStatus,
    },
    auth::AdminAuthContext,
    context::AdminContext,
    error::AdminResult,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

const DEFAULT_AUDIT_LIMIT: usize = 50;
const MAX_AUDIT_LIMIT: usize = 500;

/// Build admin API routes
pub fn routes() -> Router<AdminContext> {
    Router::new()
        // Session
        .route(
            "/admin/session",
            post(create_session).get(get_session).delete(delete_session),
        )
        // Dashboard
        .route("/admin/stats", get(get_stats))
        .route("/admin/audit", get(get_audit_log))
        // Users
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id/status", post(set_user_status))
        .route("/admin/users/:id/ban", post(ban_user))
        .route("/admin/users/:id/unban", post(unban_user))
        // Reports
        .route("/admin/reports", get(list_reports))
        .route("/admin/reports/:id/action", post(apply_report_action))
        // Content
        .route("/admin/content", get(list_content))
        .route("/admin/content/:id/action", post(apply_content_action))
        .route("/admin/content/:id/delete-request", post(request_content_delete))
        .route("/admin/content/delete-confirm", post(confirm_content_delete))
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
struct LoginRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1, max = 256))]
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session_id: String,
    identity: AdminIdentity,
    granted_permissions: Vec<Permission>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionResponse {
    fn new(ctx: &AdminContext, session: crate::admin::AdminSession) -> Self {
        Self {
            expires_at: session.expires_at(ctx.session_authority.ttl()),
            granted_permissions: expand(session.granted_permissions),
            session_id: session.session_id,
            identity: session.identity,
            issued_at: session.issued_at,
        }
    }
}

/// Effective permissions, with the `SUPER_ADMIN` superset applied
fn expand(granted: PermissionSet) -> Vec<Permission> {
    Permission::all()
        .iter()
        .copied()
        .filter(|p| granted.grants(*p))
        .collect()
}

/// Sign in
async fn create_session(
    State(ctx): State<AdminContext>,
    Json(req): Json<LoginRequest>,
) -> AdminResult<Json<SessionResponse>> {
    req.validate()?;
    ctx.rate_limiter.check_login(&req.email)?;

    let session = ctx
        .session_authority
        .authenticate(&req.email, &req.password)
        .await?;

    Ok(Json(SessionResponse::new(&ctx, session)))
}

/// Describe the current session
async fn get_session(
    State(ctx): State<AdminContext>,
    auth: AdminAuthContext,
) -> Json<SessionResponse> {
    Json(SessionResponse::new(&ctx, auth.session))
}

/// Sign out
async fn delete_session(
    State(ctx): State<AdminContext>,
    auth: AdminAuthContext,
) -> AdminResult<StatusCode> {
    ctx.session_authority.terminate(&auth.session).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Dashboard
// ============================================================================

async fn get_stats(
    State(ctx): State<AdminContext>,
    auth: AdminAuthContext,
) -> AdminResult<Json<DashboardStats>> {
    auth.require(Permission::Analytics)?;
    Ok(Json(ctx.stats.current().await))
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct AuditResponse {
    entries: Vec<AuditLogEntry>,
}

async fn get_audit_log(
    State(ctx): State<AdminContext>,
    auth: AdminAuthContext,
    Query(query): Query<AuditQuery>,
) -> AdminResult<Json<AuditResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);
    let entries = ctx.audit.recent(&auth.session, limit).await?;
    Ok(Json(AuditResponse { entries }))
}

// ============================================================================
// Users
// ============================================================================

async fn list_users(
    State(ctx): State<AdminContext>,
    _auth: AdminAuthContext,
    Query(params): Query<QueryParams>,
) -> AdminResult<Json<QueryPage<ManagedUser>>> {
    Ok(Json(ctx.query.query_users(&params).await?))
}

#[derive(Debug, Deserialize)]
struct SetStatusRequest {
    status: UserStatus,
}

async fn set_user_status(
    State(ctx): State<AdminContext>,
    auth: AdminAuthContext,
    Path(user_id): Path<String>,
    Json(req): Json<SetStatusRequest>,
) -> AdminResult<Json<ManagedUser>> {
    let user = ctx
        .users
        .set_status(&auth.session, &user_id, req.status)
        .await?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize, Validate)]
struct BanRequest {
    #[validate(length(min = 1, max = 500))]
    reason: String,
    duration: BanDuration,
}

async fn ban_user(
    State(ctx): State<AdminContext>,
    auth: AdminAuthContext,
    Path(user_id): Path<String>,
    Json(req): Json<BanRequest>,
) -> AdminResult<Json<ManagedUser>> {
    req.validate()?;
    let user = ctx
        .users
        .ban(&auth.session, &user_id, &req.reason, req.duration)
        .await?;
    Ok(Json(user))
}

async fn unban_user(
    State(ctx): State<AdminContext>,
    auth: AdminAuthContext,
    Path(user_id): Path<String>,
) -> AdminResult<Json<ManagedUser>> {
    Ok(Json(ctx.users.unban(&auth.session, &user_id).await?))
}

// ============================================================================
// Reports
// ============================================================================

async fn list_reports(
    State(ctx): State<AdminContext>,
    _auth: AdminAuthContext,
    Query(params): Query<QueryParams>,
) -> AdminResult<Json<QueryPage<Report>>> {
    Ok(Json(ctx.query.query_reports(&params).await?))
}

#[derive(Debug, Deserialize, Validate)]
struct ReportActionRequest {
    action: ReportAction,
    #[validate(length(max = 2000))]
    notes: Option<String>,
}

async fn apply_report_action(
    State(ctx): State<AdminContext>,
    auth: AdminAuthContext,
    Path(report_id): Path<String>,
    Json(req): Json<ReportActionRequest>,
) -> AdminResult<Json<Report>> {
    req.validate()?;
    let report = ctx
        .reports
        .apply_action(&auth.session, &report_id, req.action, req.notes.as_deref())
        .await?;
    Ok(Json(report))
}

// ============================================================================
// Content
// ============================================================================

async fn list_content(
    State(ctx): State<AdminContext>,
    _auth: AdminAuthContext,
    Query(params): Query<QueryParams>,
) -> AdminResult<Json<QueryPage<ModeratableContent>>> {
    Ok(Json(ctx.query.query_content(&params).await?))
}

#[derive(Debug, Deserialize)]
struct ContentActionRequest {
    action: ContentAction,
}

async fn apply_content_action(
    State(ctx): State<AdminContext>,
    auth: AdminAuthContext,
    Path(content_id): Path<String>,
    Json(req): Json<ContentActionRequest>,
) -> AdminResult<Json<ModeratableContent>> {
    let content = ctx
        .content
        .apply_action(&auth.session, &content_id, req.action)
        .await?;
    Ok(Json(content))
}

async fn request_content_delete(
    State(ctx): State<AdminContext>,
    auth: AdminAuthContext,
    Path(content_id): Path<String>,
) -> AdminResult<Json<DeleteConfirmation>> {
    Ok(Json(
        ctx.content.request_delete(&auth.session, &content_id).await?,
    ))
}

#[derive(Debug, Deserialize, Validate)]
struct ConfirmDeleteRequest {
    #[validate(length(min = 1, max = 64))]
    token: String,
}

async fn confirm_content_delete(
    State(ctx): State<AdminContext>,
    auth: AdminAuthContext,
    Json(req): Json<ConfirmDeleteRequest>,
) -> AdminResult<Json<ModeratableContent>> {
    req.validate()?;
    Ok(Json(
        ctx.content.confirm_delete(&auth.session, &req.token).await?,
    ))
}
