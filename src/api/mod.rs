/// API routes and handlers
pub mod admin;
pub mod health;
pub mod middleware;

use crate::context::AdminContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AdminContext> {
    Router::new()
        .merge(health::routes())
        .merge(admin::routes())
}
