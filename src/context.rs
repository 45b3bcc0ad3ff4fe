/// Application context and dependency injection
use crate::{
    admin::{
        ActionEffects, AuditLog, ContentModerationManager, CredentialDirectory, QueryEngine,
        ReportManager, SessionAuthority, SessionPolicy, StaticCredentialDirectory, StatsAggregator,
        UserLifecycleManager,
    },
    config::{ServerConfig, StorageBackend},
    error::{AdminError, AdminResult},
    notify::{NotificationSink, TracingNotifier},
    rate_limit::RateLimiter,
    store::{sqlite::DatabaseOptions, DocumentStore, KeyValueStore, MemoryStore, SqliteStore},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AdminContext {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub session_authority: Arc<SessionAuthority>,
    // Admin & Moderation
    pub users: Arc<UserLifecycleManager>,
    pub reports: Arc<ReportManager>,
    pub content: Arc<ContentModerationManager>,
    pub query: Arc<QueryEngine>,
    pub stats: Arc<StatsAggregator>,
    pub audit: AuditLog,
    // Rate limiter
    pub rate_limiter: Arc<RateLimiter>,
    pub notifier: Arc<dyn NotificationSink>,
}

impl AdminContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AdminResult<Self> {
        // Validate configuration
        config.validate()?;

        let (documents, values): (Arc<dyn DocumentStore>, Arc<dyn KeyValueStore>) =
            match &config.storage.backend {
                StorageBackend::Memory => {
                    tracing::warn!("Using in-memory storage; admin data is lost on restart");
                    let store = Arc::new(MemoryStore::new());
                    (store.clone() as Arc<dyn DocumentStore>, store as Arc<dyn KeyValueStore>)
                }
                StorageBackend::Sqlite { path } => {
                    Self::ensure_directories(&config).await?;
                    let store = Arc::new(SqliteStore::open(path, DatabaseOptions::default()).await?);
                    tracing::info!("Admin store opened at {}", path.display());
                    (store.clone() as Arc<dyn DocumentStore>, store as Arc<dyn KeyValueStore>)
                }
            };

        let credentials: Arc<dyn CredentialDirectory> = match &config.session.accounts_file {
            Some(path) => Arc::new(StaticCredentialDirectory::load_from_file(path).await?),
            None => {
                tracing::warn!("ADMIN_ACCOUNTS_FILE not set; no administrator can sign in");
                Arc::new(StaticCredentialDirectory::new(Vec::new()))
            }
        };

        Self::with_components(config, documents, values, credentials, Arc::new(TracingNotifier)).await
    }

    /// Wire the services over explicit collaborators
    pub async fn with_components(
        config: ServerConfig,
        documents: Arc<dyn DocumentStore>,
        values: Arc<dyn KeyValueStore>,
        credentials: Arc<dyn CredentialDirectory>,
        notifier: Arc<dyn NotificationSink>,
    ) -> AdminResult<Self> {
        let session_ttl = chrono::Duration::from_std(config.session.ttl)
            .map_err(|e| AdminError::Validation(format!("Invalid session TTL: {}", e)))?;
        let confirmation_ttl = chrono::Duration::from_std(config.moderation.delete_confirmation_ttl)
            .map_err(|e| AdminError::Validation(format!("Invalid delete confirmation TTL: {}", e)))?;

        let session_authority = Arc::new(SessionAuthority::new(
            credentials,
            values,
            SessionPolicy::new(session_ttl, &config.session.break_glass_emails),
        ));

        let audit = AuditLog::new(Arc::clone(&documents));
        let stats = Arc::new(StatsAggregator::new(
            Arc::clone(&documents),
            config.moderation.auto_flag_threshold,
            audit.clone(),
            Arc::clone(&notifier),
        ));
        let effects = ActionEffects::new(Arc::clone(&stats), audit.clone(), Arc::clone(&notifier));

        let users = Arc::new(UserLifecycleManager::new(Arc::clone(&documents), effects.clone()));
        let reports = Arc::new(ReportManager::new(
            Arc::clone(&documents),
            Arc::clone(&stats),
            effects.clone(),
        ));
        let content = Arc::new(ContentModerationManager::new(
            Arc::clone(&documents),
            confirmation_ttl,
            effects,
        ));
        let query = Arc::new(QueryEngine::new(
            Arc::clone(&documents),
            config.query.default_page_size,
        ));

        // Initialize rate limiter
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        if let Err(e) = stats.refresh().await {
            tracing::error!("Initial stats refresh failed, dashboard starts empty: {}", e);
        }

        Ok(Self {
            config: Arc::new(config),
            store: documents,
            session_authority,
            users,
            reports,
            content,
            query,
            stats,
            audit,
            rate_limiter,
            notifier,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> AdminResult<()> {
        let mut dirs = vec![config.storage.data_directory.clone()];
        if let StorageBackend::Sqlite { path } = &config.storage.backend {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                dirs.push(parent.to_path_buf());
            }
        }

        for dir in dirs {
            if !dir.exists() {
                tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                    AdminError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
