use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use goaltrack::api::{self, AppState};
use goaltrack::config::Config;
use goaltrack::db::Database;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "goaltrack=debug,tower_http=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    Database::connect(&config.db_path)
        .and_then(|db| db.migrate())
        .with_context(|| format!("preparing database at {}", config.db_path.display()))?;
    if config.auth_secret.is_none() {
        tracing::warn!("AUTH_SECRET is not set, sign-in is disabled");
    }

    let app = api::router(AppState::new(&config));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, db = %config.db_path.display(), "goaltrack listening");

    axum::serve(listener, app).await?;

    Ok(())
}
