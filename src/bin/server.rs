//! crudsync-server: per-user settings documents and their MCP server entries
//! over HTTP.
//!
//! Configured through `CRUDSYNC_PORT`, `CRUDSYNC_DATA_DIR` and
//! `CRUDSYNC_CONFIG`. The config file lists the accepted keys:
//!
//! ```yaml
//! api_keys:
//!   - key: "your-secret-key-here"
//!     user_id: "user1"
//! ```

use crudsync::server::{router, ApiKeyStore, AppState, ServerConfig, SettingsStorage};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run(ServerConfig::from_env()).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.data_dir).map_err(|e| {
        format!(
            "Failed to create data directory {}: {}",
            config.data_dir.display(),
            e
        )
    })?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        config = %config.config_path.display(),
        "starting crudsync-server"
    );

    let state = AppState::new(
        ApiKeyStore::load(&config.config_path),
        SettingsStorage::new(&config.data_dir),
    );

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crudsync=info,crudsync_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
