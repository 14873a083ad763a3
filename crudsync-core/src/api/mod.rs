//! HTTP clients for the crudsync server.

mod client;
mod marketplace;
mod mcp;
mod settings;

pub use client::{ensure_response, ApiClient};
pub use marketplace::{MarketplaceClient, MarketplaceService, CATALOG_TTL};
pub use mcp::McpApi;
pub use settings::SettingsApi;
