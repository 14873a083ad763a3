use super::client::{ensure_response, ApiClient};
use crate::error::RemoteError;
use crate::models::Settings;

/// Whole-document settings endpoints.
#[derive(Debug, Clone)]
pub struct SettingsApi {
    client: ApiClient,
}

impl SettingsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetches the settings document. A user without one gets the default.
    pub async fn get(&self) -> Result<Settings, RemoteError> {
        let settings = self.client.get("/settings").await?;
        Ok(settings.unwrap_or_default())
    }

    /// Replaces the settings document, returning what the server stored.
    pub async fn put(&self, settings: &Settings) -> Result<Settings, RemoteError> {
        let response = self.client.put("/settings", settings).await?;
        ensure_response(response, "Failed to save settings")
    }
}
