use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use previz_daemon::config::Config;
use previz_daemon::db::Database;
use previz_daemon::providers::Providers;
use previz_daemon::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "previz_daemon=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(addr = %config.bind_addr(), "Loaded configuration");

    let db = match &config.database_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let db = Database::new(path)?;
            tracing::info!(path = %path.display(), "Database initialized");
            db
        }
        None => {
            tracing::warn!("PREVIZ_DATABASE_PATH not set; using an in-memory store that is lost on exit");
            Database::open_in_memory()?
        }
    };

    let providers = Providers::from_config(&config);
    let configured = providers.configured();
    if configured.is_empty() {
        tracing::warn!("No provider keys configured; generation endpoints will return 503");
    } else {
        tracing::info!(providers = ?configured, "Providers configured");
    }

    let bind_addr = config.bind_addr();
    let app = previz_daemon::build_app(AppState::new(db, config, providers));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Starting daemon server");
    axum::serve(listener, app).await?;

    Ok(())
}
