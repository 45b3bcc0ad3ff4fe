/// Configuration management for the Memoria admin service
use crate::error::{AdminError, AdminResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Longest admin session accepted
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 3600);
/// Longest delete confirmation window accepted
pub const MAX_DELETE_CONFIRMATION_TTL: Duration = Duration::from_secs(24 * 3600);

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub moderation: ModerationConfig,
    pub query: QueryConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub backend: StorageBackend,
}

/// Where collections and the session record live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageBackend {
    /// Process-local, lost on restart
    Memory,
    Sqlite { path: PathBuf },
}

/// Admin session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub ttl: Duration,
    /// Admin accounts file (JSON array of credentials)
    pub accounts_file: Option<PathBuf>,
    /// Emails granted SUPER_ADMIN on login regardless of role
    pub break_glass_emails: Vec<String>,
}

/// Moderation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Report count at which published content is auto-flagged
    pub auto_flag_threshold: u32,
    pub delete_confirmation_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_page_size: usize,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub login_attempts_per_minute: u32,
    pub requests_per_second: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ServerConfig {
    /// In-memory configuration with stock limits
    fn default() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 8088,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                backend: StorageBackend::Memory,
            },
            session: SessionConfig {
                ttl: Duration::from_secs(24 * 3600),
                accounts_file: None,
                break_glass_emails: Vec::new(),
            },
            moderation: ModerationConfig {
                auto_flag_threshold: 3,
                delete_confirmation_ttl: Duration::from_secs(300),
            },
            query: QueryConfig {
                default_page_size: 10,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                login_attempts_per_minute: 10,
                requests_per_second: 50,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AdminResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("ADMIN_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("ADMIN_PORT")
            .unwrap_or_else(|_| "8088".to_string())
            .parse()
            .map_err(|e| AdminError::Validation(format!("Invalid port: {}", e)))?;
        let version = env::var("ADMIN_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("ADMIN_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let backend = match env::var("ADMIN_STORAGE_BACKEND")
            .unwrap_or_else(|_| "sqlite".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "sqlite" => StorageBackend::Sqlite {
                path: env::var("ADMIN_DATABASE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| data_directory.join("admin.sqlite")),
            },
            other => {
                return Err(AdminError::Validation(format!(
                    "Unknown storage backend: {}",
                    other
                )))
            }
        };

        let session_ttl_hours: u64 = env::var("ADMIN_SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);
        let session_ttl_secs = session_ttl_hours.checked_mul(3600).ok_or_else(|| {
            AdminError::Validation(format!(
                "ADMIN_SESSION_TTL_HOURS is out of range: {}",
                session_ttl_hours
            ))
        })?;
        let accounts_file = env::var("ADMIN_ACCOUNTS_FILE").ok().map(PathBuf::from);
        let break_glass_emails = env::var("ADMIN_BREAK_GLASS_EMAILS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let auto_flag_threshold = env::var("ADMIN_AUTO_FLAG_THRESHOLD")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .unwrap_or(3);
        let delete_confirmation_secs: u64 = env::var("ADMIN_DELETE_CONFIRMATION_TTL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        let default_page_size = env::var("ADMIN_PAGE_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let rate_limit_enabled = env::var("ADMIN_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let login_attempts_per_minute = env::var("ADMIN_LOGIN_ATTEMPTS_PER_MINUTE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let requests_per_second = env::var("ADMIN_REQUESTS_PER_SECOND")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                backend,
            },
            session: SessionConfig {
                ttl: Duration::from_secs(session_ttl_secs),
                accounts_file,
                break_glass_emails,
            },
            moderation: ModerationConfig {
                auto_flag_threshold,
                delete_confirmation_ttl: Duration::from_secs(delete_confirmation_secs),
            },
            query: QueryConfig { default_page_size },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                login_attempts_per_minute,
                requests_per_second,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AdminResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AdminError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.session.ttl.is_zero() {
            return Err(AdminError::Validation(
                "Session TTL must be greater than zero".to_string(),
            ));
        }

        if self.session.ttl > MAX_SESSION_TTL {
            return Err(AdminError::Validation(format!(
                "Session TTL must not exceed {} hours",
                MAX_SESSION_TTL.as_secs() / 3600
            )));
        }

        if self.moderation.delete_confirmation_ttl > MAX_DELETE_CONFIRMATION_TTL {
            return Err(AdminError::Validation(format!(
                "Delete confirmation TTL must not exceed {} seconds",
                MAX_DELETE_CONFIRMATION_TTL.as_secs()
            )));
        }

        if self.moderation.auto_flag_threshold == 0 {
            return Err(AdminError::Validation(
                "Auto-flag threshold must be at least 1".to_string(),
            ));
        }

        if self.query.default_page_size == 0 {
            return Err(AdminError::Validation(
                "Default page size must be at least 1".to_string(),
            ));
        }

        if self.rate_limit.enabled
            && (self.rate_limit.login_attempts_per_minute == 0 || self.rate_limit.requests_per_second == 0)
        {
            return Err(AdminError::Validation(
                "Rate limit quotas must be at least 1 when rate limiting is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.hostname, self.service.port)
    }
}
