//! Memoria admin service
//!
//! Administrative access control and content moderation for the Memoria
//! family-memory platform: admin sessions, a permission gate, user lifecycle
//! management, report and content state machines, an admin query engine and
//! dashboard statistics.

pub mod admin;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod rate_limit;
pub mod server;
pub mod store;

pub use config::ServerConfig;
pub use context::AdminContext;
pub use error::{AdminError, AdminResult};
