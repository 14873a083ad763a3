use async_trait::async_trait;

use super::client::{ensure_response, ApiClient};
use crate::error::RemoteError;
use crate::models::{McpCreateRequest, McpServer, McpUpdateRequest};
use crate::strategy::{Capabilities, RemoteItemApi};

/// Per-item MCP server endpoints.
#[derive(Debug, Clone)]
pub struct McpApi {
    client: ApiClient,
}

impl McpApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn item_path(name: &str) -> String {
        format!("/mcps/{}", urlencoding::encode(name))
    }
}

#[async_trait]
impl RemoteItemApi<McpServer> for McpApi {
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    async fn create(&self, draft: &McpServer) -> Result<McpServer, RemoteError> {
        let body = McpCreateRequest::from(draft);
        let response = self.client.post("/mcps/", &body).await?;
        ensure_response(response, "Failed to create MCP")
    }

    async fn update(&self, name: &str, draft: &McpServer) -> Result<McpServer, RemoteError> {
        let body = McpUpdateRequest::from(draft);
        let response = self.client.put(&Self::item_path(name), &body).await?;
        ensure_response(response, "Failed to update MCP")
    }

    async fn delete(&self, name: &str) -> Result<(), RemoteError> {
        self.client.delete(&Self::item_path(name)).await
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> Result<McpServer, RemoteError> {
        let body = McpUpdateRequest::enabled_only(enabled);
        let response = self.client.put(&Self::item_path(name), &body).await?;
        ensure_response(response, "Failed to update MCP")
    }
}
