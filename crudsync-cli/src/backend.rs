//! Picks the settings store and persistence strategy for a command.
//!
//! With a server configured, MCP servers go through the per-item `/mcps`
//! endpoints and everything else through `PUT /settings`. Without one the
//! local settings file is the only store.

use crudsync_core::{
    ApiClient, EventBus, MarketplaceClient, MarketplaceService, McpApi, McpServer, Notifier,
    PersistenceStrategy, QueryKey, Settings, SettingsApi, SettingsStore,
};
use std::sync::Arc;

use crate::config::Config;
use crate::console::ConsoleNotifier;
use crate::store::{FileSettingsStore, RemoteSettingsStore};

pub struct Backend {
    pub store: Arc<dyn SettingsStore<Settings>>,
    pub mcp_strategy: PersistenceStrategy<McpServer>,
    pub notifier: Arc<dyn Notifier>,
    pub events: EventBus,
    pub invalidates: QueryKey,
}

impl Backend {
    pub async fn connect(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
        let invalidates = config
            .item_cache_key
            .value
            .parse::<QueryKey>()
            .unwrap_or(QueryKey::MarketplaceInstalled);

        let (store, mcp_strategy) = match config.server.credentials() {
            Some((url, key)) => {
                tracing::debug!(server = url, "using server settings");
                let client = ApiClient::new(url, key);
                let store: Arc<dyn SettingsStore<Settings>> = Arc::new(
                    RemoteSettingsStore::connect(SettingsApi::new(client.clone()), notifier.clone())
                        .await?,
                );
                (store, PersistenceStrategy::remote(McpApi::new(client)))
            }
            None => {
                let path = &config.settings_path.value;
                tracing::debug!(path = %path.display(), "using local settings file");
                let store: Arc<dyn SettingsStore<Settings>> =
                    Arc::new(FileSettingsStore::open(path, notifier.clone())?);
                (store, PersistenceStrategy::AggregateFallback)
            }
        };

        Ok(Self {
            store,
            mcp_strategy,
            notifier,
            events: EventBus::new(),
            invalidates,
        })
    }
}

/// Builds the marketplace service; the marketplace needs a server.
pub fn marketplace(config: &Config) -> Result<MarketplaceService, Box<dyn std::error::Error>> {
    let (url, key) = config.server.credentials().ok_or(
        "The marketplace needs a server. Set server.url and server.api_key \
         (or CRUDSYNC_SERVER_URL and CRUDSYNC_API_KEY).",
    )?;
    let client = MarketplaceClient::new(ApiClient::new(url, key));
    Ok(MarketplaceService::new(client, EventBus::new()))
}
