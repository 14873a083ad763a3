//! Plugin marketplace client and its cached service wrapper.

use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::client::{ensure_response, ApiClient};
use crate::error::RemoteError;
use crate::events::{EventBus, QueryKey};
use crate::models::{
    InstallComponentRequest, InstallResponse, InstalledPlugin, MarketplacePlugin, PluginDetails,
    UninstallComponentRequest, UninstallResponse,
};

/// How long a fetched catalog stays fresh.
pub const CATALOG_TTL: Duration = Duration::from_secs(5 * 60);

/// Marketplace endpoints.
#[derive(Debug, Clone)]
pub struct MarketplaceClient {
    client: ApiClient,
}

impl MarketplaceClient {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn get_catalog(&self, force_refresh: bool) -> Result<Vec<MarketplacePlugin>, RemoteError> {
        let params = if force_refresh { "?force_refresh=true" } else { "" };
        let catalog = self
            .client
            .get(&format!("/marketplace/catalog{}", params))
            .await?;
        Ok(catalog.unwrap_or_default())
    }

    pub async fn get_plugin_details(&self, plugin_name: &str) -> Result<PluginDetails, RemoteError> {
        let path = format!("/marketplace/catalog/{}", urlencoding::encode(plugin_name));
        let details = self.client.get(&path).await?;
        ensure_response(details, "Plugin not found")
    }

    pub async fn install_components(
        &self,
        request: &InstallComponentRequest,
    ) -> Result<InstallResponse, RemoteError> {
        let response = self.client.post("/marketplace/install", request).await?;
        ensure_response(response, "Installation failed")
    }

    pub async fn uninstall_components(
        &self,
        request: &UninstallComponentRequest,
    ) -> Result<UninstallResponse, RemoteError> {
        let response = self.client.post("/marketplace/uninstall", request).await?;
        ensure_response(response, "Uninstallation failed")
    }

    pub async fn get_installed_plugins(&self) -> Result<Vec<InstalledPlugin>, RemoteError> {
        let installed = self.client.get("/marketplace/installed").await?;
        Ok(installed.unwrap_or_default())
    }
}

struct CachedCatalog {
    fetched_at: Instant,
    plugins: Vec<MarketplacePlugin>,
}

/// [`MarketplaceClient`] plus a catalog cache and invalidation events.
///
/// Installs and uninstalls change both the installed list and the settings
/// document, so both keys are invalidated after each one succeeds.
pub struct MarketplaceService {
    client: MarketplaceClient,
    events: EventBus,
    ttl: Duration,
    catalog: RwLock<Option<CachedCatalog>>,
}

impl MarketplaceService {
    pub fn new(client: MarketplaceClient, events: EventBus) -> Self {
        Self {
            client,
            events,
            ttl: CATALOG_TTL,
            catalog: RwLock::new(None),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Returns the catalog, from cache while it is fresh.
    ///
    /// A forced refresh always hits the server and replaces the cache.
    pub async fn catalog(&self, force_refresh: bool) -> Result<Vec<MarketplacePlugin>, RemoteError> {
        if !force_refresh {
            let cached = self.catalog.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.fetched_at.elapsed() < self.ttl {
                    tracing::debug!(plugins = entry.plugins.len(), "catalog served from cache");
                    return Ok(entry.plugins.clone());
                }
            }
        }

        let plugins = self.client.get_catalog(force_refresh).await?;
        *self.catalog.write().await = Some(CachedCatalog {
            fetched_at: Instant::now(),
            plugins: plugins.clone(),
        });
        if force_refresh {
            self.events.invalidate(QueryKey::MarketplaceCatalog);
        }
        Ok(plugins)
    }

    pub async fn plugin_details(&self, plugin_name: &str) -> Result<PluginDetails, RemoteError> {
        self.client.get_plugin_details(plugin_name).await
    }

    pub async fn installed(&self) -> Result<Vec<InstalledPlugin>, RemoteError> {
        self.client.get_installed_plugins().await
    }

    pub async fn install(&self, request: &InstallComponentRequest) -> Result<InstallResponse, RemoteError> {
        let response = self.client.install_components(request).await?;
        tracing::info!(
            plugin = %response.plugin_name,
            installed = response.installed.len(),
            failed = response.failed.len(),
            "components installed"
        );
        self.invalidate_installed();
        Ok(response)
    }

    pub async fn uninstall(
        &self,
        request: &UninstallComponentRequest,
    ) -> Result<UninstallResponse, RemoteError> {
        let response = self.client.uninstall_components(request).await?;
        tracing::info!(
            plugin = %response.plugin_name,
            uninstalled = response.uninstalled.len(),
            failed = response.failed.len(),
            "components uninstalled"
        );
        self.invalidate_installed();
        Ok(response)
    }

    fn invalidate_installed(&self) {
        self.events.invalidate(QueryKey::MarketplaceInstalled);
        self.events.invalidate(QueryKey::Settings);
    }
}
