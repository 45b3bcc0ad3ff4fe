/// Memoria admin service
///
/// Serves the administrative back office API: admin sign-in, user lifecycle
/// management and report/content moderation.

use memoria_admin::{server, AdminContext, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so RUST_LOG from .env is honoured
    let config = ServerConfig::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memoria_admin=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!("Log level from configuration: {}", config.logging.level);

    tracing::info!("Memoria admin service v{}", env!("CARGO_PKG_VERSION"));

    // Create application context
    let ctx = AdminContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
