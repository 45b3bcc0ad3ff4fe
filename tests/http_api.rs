/// HTTP surface tests driven through the router without a socket
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use memoria_admin::{
    admin::{
        AdminCredential, AdminIdentity, AdminRole, ContentKind, ManagedUser, ModeratableContent,
        StaticCredentialDirectory,
    },
    notify::RecordingNotifier,
    server::build_router,
    store::{DocumentStore, KeyValueStore, MemoryStore},
    AdminContext, ServerConfig,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const PASSWORD: &str = "hunter2-but-longer";

async fn setup() -> (Router, AdminContext) {
    let store = Arc::new(MemoryStore::new());
    let credentials = StaticCredentialDirectory::new(
        [
            ("mod-1", "moderator@example.com", AdminRole::Moderator),
            ("admin-1", "admin@example.com", AdminRole::Admin),
        ]
        .into_iter()
        .map(|(id, email, role)| AdminCredential {
            identity: AdminIdentity {
                id: id.to_string(),
                email: email.to_string(),
                role,
                display_name: id.to_string(),
            },
            password: PASSWORD.to_string(),
        })
        .collect(),
    );

    let ctx = AdminContext::with_components(
        ServerConfig::default(),
        store.clone() as Arc<dyn DocumentStore>,
        store as Arc<dyn KeyValueStore>,
        Arc::new(credentials),
        Arc::new(RecordingNotifier::new()),
    )
    .await
    .unwrap();

    (build_router(ctx.clone()), ctx)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/admin/session",
            None,
            json!({ "email": email, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["sessionId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_login_returns_session_with_expanded_permissions() {
    let (app, _) = setup().await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/admin/session",
            None,
            json!({ "email": "moderator@example.com", "password": PASSWORD }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["sessionId"].as_str().is_some());
    assert_eq!(body["identity"]["role"], "moderator");
    let granted: Vec<&str> = body["grantedPermissions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p.as_str())
        .collect();
    assert_eq!(granted, vec!["CONTENT_MODERATION", "ANALYTICS"]);
}

#[tokio::test]
async fn test_bad_password_is_unauthorized() {
    let (app, _) = setup().await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/admin/session",
            None,
            json!({ "email": "admin@example.com", "password": "wrong" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "InvalidCredentials");
}

#[tokio::test]
async fn test_malformed_email_is_rejected_before_lookup() {
    let (app, _) = setup().await;

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/admin/session",
            None,
            json!({ "email": "not-an-email", "password": PASSWORD }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_routes_require_a_session() {
    let (app, _) = setup().await;

    let (status, _) = send(&app, get("/admin/users", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get("/admin/users", Some("made-up"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_moderator_ban_is_forbidden() {
    let (app, ctx) = setup().await;
    ctx.users
        .register(ManagedUser::new("u1", "Ada", "ada@example.com"))
        .await
        .unwrap();
    let token = login(&app, "moderator@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/admin/users/u1/ban",
            Some(&token),
            json!({ "reason": "spam", "duration": "30_days" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "PermissionDenied");
}

#[tokio::test]
async fn test_admin_bans_and_lists_users() {
    let (app, ctx) = setup().await;
    for (id, name) in [("u1", "Ada"), ("u2", "Grace")] {
        ctx.users
            .register(ManagedUser::new(id, name, format!("{}@example.com", id)))
            .await
            .unwrap();
    }
    let token = login(&app, "admin@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/admin/users/u1/ban",
            Some(&token),
            json!({ "reason": "spam", "duration": "30_days" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "banned");
    assert_eq!(body["banReason"], "spam");

    let (status, body) = send(&app, get("/admin/users?statusFilter=banned", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 1);
    assert_eq!(body["items"][0]["id"], "u1");

    let (status, body) = send(&app, get("/admin/stats", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalUsers"], 2);
    assert_eq!(body["activeUsers"], 1);
}

#[tokio::test]
async fn test_invalid_content_transition_is_a_conflict() {
    let (app, ctx) = setup().await;
    ctx.content
        .register(ModeratableContent::new("c1", ContentKind::Moment, "Picnic", "u1"))
        .await
        .unwrap();
    let token = login(&app, "moderator@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/admin/content/c1/delete-request",
            Some(&token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let confirm = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/admin/content/delete-confirm",
            Some(&token),
            json!({ "token": confirm }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "removed");

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/admin/content/c1/action",
            Some(&token),
            json!({ "action": "approve" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InvalidTransition");
}

#[tokio::test]
async fn test_logout_invalidates_the_token() {
    let (app, _) = setup().await;
    let token = login(&app, "admin@example.com").await;

    let (status, body) = send(&app, get("/admin/session", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], token.as_str());

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/admin/session")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get("/admin/session", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_audit_log_is_admin_only() {
    let (app, _) = setup().await;

    let token = login(&app, "moderator@example.com").await;
    let (status, _) = send(&app, get("/admin/audit", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let token = login(&app, "admin@example.com").await;
    let (status, body) = send(&app, get("/admin/audit?limit=5", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["entries"].is_array());
}

#[tokio::test]
async fn test_health_and_metrics_are_public() {
    let (app, _) = setup().await;

    let (status, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, get("/health/live", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");

    let response = app.clone().oneshot(get("/metrics", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("admin_http_requests_total"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = setup().await;
    let (status, body) = send(&app, get("/nowhere", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}
