/// End-to-end admin workflows over the in-memory and SQLite stores
use memoria_admin::{
    admin::{
        AdminCredential, AdminIdentity, AdminRole, BanDuration, ContentAction, ContentKind,
        ContentStatus, Lifecycle, ManagedUser, ModeratableContent, NewReport, Permission,
        QueryParams, ReportAction, ReportPriority, ReportStatus, ReportType, StaticCredentialDirectory,
        UserStatus,
    },
    config::StorageBackend,
    notify::{NotificationLevel, RecordingNotifier},
    store::{sqlite::DatabaseOptions, DocumentStore, KeyValueStore, MemoryStore, SqliteStore},
    AdminContext, AdminError, ServerConfig,
};
use std::path::Path;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

const PASSWORD: &str = "correct horse battery staple";

fn credential(id: &str, email: &str, role: AdminRole) -> AdminCredential {
    AdminCredential {
        identity: AdminIdentity {
            id: id.to_string(),
            email: email.to_string(),
            role,
            display_name: id.to_string(),
        },
        password: PASSWORD.to_string(),
    }
}

fn directory() -> StaticCredentialDirectory {
    StaticCredentialDirectory::new(vec![
        credential("mod-1", "moderator@example.com", AdminRole::Moderator),
        credential("admin-1", "admin@example.com", AdminRole::Admin),
        credential("root-1", "root@example.com", AdminRole::SuperAdmin),
    ])
}

async fn context_with(config: ServerConfig) -> (AdminContext, Arc<RecordingNotifier>) {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let ctx = AdminContext::with_components(
        config,
        store.clone() as Arc<dyn DocumentStore>,
        store as Arc<dyn KeyValueStore>,
        Arc::new(directory()),
        notifier.clone(),
    )
    .await
    .unwrap();
    (ctx, notifier)
}

async fn context() -> (AdminContext, Arc<RecordingNotifier>) {
    context_with(ServerConfig::default()).await
}

async fn open_sqlite(data_directory: &Path, db_path: &Path) -> AdminContext {
    let store = Arc::new(
        SqliteStore::open(db_path, DatabaseOptions::default())
            .await
            .unwrap(),
    );

    let mut config = ServerConfig::default();
    config.storage.data_directory = data_directory.to_path_buf();
    config.storage.backend = StorageBackend::Sqlite {
        path: db_path.to_path_buf(),
    };

    AdminContext::with_components(
        config,
        store.clone() as Arc<dyn DocumentStore>,
        store as Arc<dyn KeyValueStore>,
        Arc::new(directory()),
        Arc::new(RecordingNotifier::new()),
    )
    .await
    .unwrap()
}

fn report_on(content_id: &str, reporter: &str) -> NewReport {
    NewReport {
        title: "Offensive caption".to_string(),
        report_type: ReportType::InappropriateContent,
        priority: ReportPriority::Medium,
        subject_content_id: content_id.to_string(),
        subject_content_type: ContentKind::Moment,
        reporter_id: reporter.to_string(),
        description: "The caption insults another family member".to_string(),
    }
}

#[tokio::test]
async fn test_moderator_login_grants_moderation_only() {
    let (ctx, _) = context().await;

    let session = assert_ok!(
        ctx.session_authority
            .authenticate("moderator@example.com", PASSWORD)
            .await
    );

    assert!(!session.has_permission(Permission::UserManagement));
    assert!(session.has_permission(Permission::ContentModeration));
    assert!(session.has_permission(Permission::Analytics));
    assert!(!session.has_permission(Permission::SystemSettings));
}

#[tokio::test]
async fn test_login_rejects_bad_credentials_uniformly() {
    let (ctx, _) = context().await;

    let wrong_password = ctx
        .session_authority
        .authenticate("admin@example.com", "nope")
        .await;
    let unknown = ctx
        .session_authority
        .authenticate("ghost@example.com", PASSWORD)
        .await;

    assert!(matches!(wrong_password, Err(AdminError::InvalidCredentials)));
    assert!(matches!(unknown, Err(AdminError::InvalidCredentials)));
    assert!(ctx.session_authority.restore().await.unwrap().is_none());
}

#[tokio::test]
async fn test_new_login_supersedes_previous_session() {
    let (ctx, _) = context().await;

    let first = ctx
        .session_authority
        .authenticate("moderator@example.com", PASSWORD)
        .await
        .unwrap();
    let second = ctx
        .session_authority
        .authenticate("admin@example.com", PASSWORD)
        .await
        .unwrap();

    assert_err!(ctx.session_authority.validate(&first.session_id).await);
    let live = assert_ok!(ctx.session_authority.validate(&second.session_id).await);
    assert_eq!(live.identity.id, "admin-1");

    // Logging out the stale session leaves the live one alone
    ctx.session_authority.terminate(&first).await.unwrap();
    assert_ok!(ctx.session_authority.validate(&second.session_id).await);
}

#[tokio::test]
async fn test_approving_a_report_twice_is_an_invalid_transition() {
    let (ctx, notifier) = context().await;
    ctx.content
        .register(ModeratableContent::new("c1", ContentKind::Moment, "Beach day", "u1"))
        .await
        .unwrap();
    let report = ctx.reports.submit_report(report_on("c1", "u2")).await.unwrap();
    assert_eq!(report.status, ReportStatus::Pending);

    let moderator = ctx
        .session_authority
        .authenticate("moderator@example.com", PASSWORD)
        .await
        .unwrap();

    let resolved = ctx
        .reports
        .apply_action(&moderator, &report.id, ReportAction::Approve, Some("Caption removed"))
        .await
        .unwrap();
    assert_eq!(resolved.status, ReportStatus::Resolved);
    assert_eq!(resolved.reviewed_by.as_deref(), Some("mod-1"));
    assert_eq!(resolved.moderator_notes.as_deref(), Some("Caption removed"));

    let again = ctx
        .reports
        .apply_action(&moderator, &report.id, ReportAction::Approve, None)
        .await;
    assert!(matches!(again, Err(AdminError::InvalidTransition { .. })));
    assert_eq!(
        notifier.last().map(|(_, level)| level),
        Some(NotificationLevel::Error)
    );

    let stored = ctx.reports.get(&report.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ReportStatus::Resolved);
}

#[tokio::test]
async fn test_ban_then_unban_restores_a_clean_account() {
    let (ctx, _) = context().await;
    ctx.users
        .register(ManagedUser::new("u1", "Ada", "ada@example.com"))
        .await
        .unwrap();
    let admin = ctx
        .session_authority
        .authenticate("admin@example.com", PASSWORD)
        .await
        .unwrap();

    let banned = ctx
        .users
        .ban(&admin, "u1", "spam", BanDuration::ThirtyDays)
        .await
        .unwrap();
    assert_eq!(banned.status, UserStatus::Banned);
    assert_eq!(banned.ban_reason.as_deref(), Some("spam"));
    assert_eq!(banned.ban_duration, Some(BanDuration::ThirtyDays));
    assert!(banned.ban_expires_at().is_some());

    let unbanned = ctx.users.unban(&admin, "u1").await.unwrap();
    assert_eq!(unbanned.status, UserStatus::Active);
    assert_eq!(unbanned.ban_reason, None);
    assert_eq!(unbanned.ban_duration, None);
    assert_eq!(unbanned.banned_at, None);

    let entries = ctx.audit.recent(&admin, 10).await.unwrap();
    let actions: Vec<&str> = entries.iter().map(|e| e.action.as_str()).collect();
    assert!(actions.contains(&"user.ban"));
    assert!(actions.contains(&"user.unban"));
}

#[tokio::test]
async fn test_moderator_cannot_ban() {
    let (ctx, _) = context().await;
    ctx.users
        .register(ManagedUser::new("u1", "Ada", "ada@example.com"))
        .await
        .unwrap();
    let moderator = ctx
        .session_authority
        .authenticate("moderator@example.com", PASSWORD)
        .await
        .unwrap();

    let result = ctx
        .users
        .ban(&moderator, "u1", "spam", BanDuration::Permanent)
        .await;

    assert!(matches!(
        result,
        Err(AdminError::PermissionDenied {
            permission: Permission::UserManagement
        })
    ));
    let user = ctx.users.get("u1").await.unwrap().unwrap();
    assert_eq!(user.status, UserStatus::Active);
}

#[tokio::test]
async fn test_third_report_flags_content_exactly_once() {
    let (ctx, _) = context_with({
        let mut config = ServerConfig::default();
        config.moderation.auto_flag_threshold = 3;
        config
    })
    .await;
    ctx.content
        .register(ModeratableContent::new("c1", ContentKind::Moment, "Beach day", "u1"))
        .await
        .unwrap();

    for reporter in ["u2", "u3"] {
        ctx.reports.submit_report(report_on("c1", reporter)).await.unwrap();
    }
    let content = ctx.content.get("c1").await.unwrap().unwrap();
    assert_eq!(content.status, ContentStatus::Published);

    ctx.reports.submit_report(report_on("c1", "u4")).await.unwrap();
    let content = ctx.content.get("c1").await.unwrap().unwrap();
    assert_eq!(content.status, ContentStatus::Flagged);
    assert_eq!(content.report_count, 3);

    ctx.reports.submit_report(report_on("c1", "u5")).await.unwrap();
    let content = ctx.content.get("c1").await.unwrap().unwrap();
    assert_eq!(content.status, ContentStatus::Flagged);
    assert_eq!(content.report_count, 4);

    let root = ctx
        .session_authority
        .authenticate("root@example.com", PASSWORD)
        .await
        .unwrap();
    let flags = ctx
        .audit
        .recent(&root, 100)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.action == "content.auto_flag")
        .count();
    assert_eq!(flags, 1);
}

#[tokio::test]
async fn test_delete_requires_a_confirmation_token() {
    let (ctx, _) = context().await;
    ctx.content
        .register(ModeratableContent::new("s1", ContentKind::Story, "Grandpa's war years", "u1"))
        .await
        .unwrap();
    let moderator = ctx
        .session_authority
        .authenticate("moderator@example.com", PASSWORD)
        .await
        .unwrap();

    let direct = ctx
        .content
        .apply_action(&moderator, "s1", ContentAction::Delete)
        .await;
    assert!(matches!(direct, Err(AdminError::Validation(_))));

    let confirmation = ctx.content.request_delete(&moderator, "s1").await.unwrap();
    let removed = ctx
        .content
        .confirm_delete(&moderator, &confirmation.token)
        .await
        .unwrap();
    assert_eq!(removed.status, ContentStatus::Removed);
    assert!(removed.status.is_terminal());

    let reused = ctx.content.confirm_delete(&moderator, &confirmation.token).await;
    assert!(matches!(reused, Err(AdminError::Validation(_))));
}

#[tokio::test]
async fn test_dashboard_and_queries_reflect_mutations() {
    let (ctx, _) = context().await;
    for (id, name) in [("u1", "Ada"), ("u2", "Grace"), ("u3", "Linus")] {
        ctx.users
            .register(ManagedUser::new(id, name, format!("{}@example.com", id)))
            .await
            .unwrap();
    }
    ctx.content
        .register(ModeratableContent::new("c1", ContentKind::Moment, "Beach day", "u1"))
        .await
        .unwrap();
    ctx.content
        .register(ModeratableContent::new("s1", ContentKind::Story, "Family recipes", "u2"))
        .await
        .unwrap();
    ctx.reports.submit_report(report_on("c1", "u3")).await.unwrap();

    let admin = ctx
        .session_authority
        .authenticate("admin@example.com", PASSWORD)
        .await
        .unwrap();
    ctx.users
        .ban(&admin, "u3", "harassment", BanDuration::SevenDays)
        .await
        .unwrap();

    let stats = ctx.stats.current().await;
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.active_users, 2);
    assert_eq!(stats.total_moments, 1);
    assert_eq!(stats.total_stories, 1);
    assert_eq!(stats.pending_reports, 1);

    let banned = ctx
        .query
        .query_users(&QueryParams::default().with_status(UserStatus::Banned.as_str()))
        .await
        .unwrap();
    assert_eq!(banned.total_count, 1);
    assert_eq!(banned.items[0].id, "u3");

    let searched = ctx
        .query
        .query_users(&QueryParams::default().with_search("GRACE"))
        .await
        .unwrap();
    assert_eq!(searched.items.len(), 1);
    assert_eq!(searched.items[0].id, "u2");

    let author = ctx.users.get("u1").await.unwrap().unwrap();
    assert_eq!(author.content_counters.moments, 1);
    assert_eq!(author.content_counters.stories, 0);
}

#[tokio::test]
async fn test_credentials_load_from_accounts_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("admins.json");
    let accounts = serde_json::json!([{
        "id": "admin-1",
        "email": "Admin@Example.com",
        "role": "admin",
        "displayName": "Site Admin",
        "password": PASSWORD
    }]);
    tokio::fs::write(&path, accounts.to_string()).await.unwrap();

    let directory = StaticCredentialDirectory::load_from_file(&path).await.unwrap();
    assert_eq!(directory.len(), 1);

    let mut config = ServerConfig::default();
    config.session.accounts_file = Some(path);
    let ctx = AdminContext::new(config).await.unwrap();

    let session = ctx
        .session_authority
        .authenticate("admin@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(session.identity.display_name, "Site Admin");
    assert!(session.has_permission(Permission::UserManagement));
}

#[tokio::test]
async fn test_sqlite_store_persists_sessions_and_records_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("admin.sqlite");

    let session_id = {
        let ctx = open_sqlite(dir.path(), &db_path).await;
        ctx.users
            .register(ManagedUser::new("u1", "Ada", "ada@example.com"))
            .await
            .unwrap();
        let admin = ctx
            .session_authority
            .authenticate("admin@example.com", PASSWORD)
            .await
            .unwrap();
        ctx.users
            .set_status(&admin, "u1", UserStatus::Inactive)
            .await
            .unwrap();
        admin.session_id
    };

    let ctx = open_sqlite(dir.path(), &db_path).await;
    let restored = assert_ok!(ctx.session_authority.validate(&session_id).await);
    assert_eq!(restored.identity.id, "admin-1");

    let user = ctx.users.get("u1").await.unwrap().unwrap();
    assert_eq!(user.status, UserStatus::Inactive);
    assert_eq!(ctx.stats.current().await.active_users, 0);
}
