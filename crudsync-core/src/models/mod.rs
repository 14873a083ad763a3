mod marketplace;
mod mcp;
mod settings;

pub use marketplace::{
    ComponentKind, ComponentRef, InstallComponentRequest, InstallComponentResult,
    InstallResponse, InstalledPlugin, MarketplaceAuthor, MarketplacePlugin, PluginComponents,
    PluginDetails, UninstallComponentRequest, UninstallResponse,
};
pub use mcp::{
    mcp_validator, CommandType, DeleteStatus, McpCreateRequest, McpDeleteResponse,
    McpServer, McpUpdateRequest, DESCRIPTION_MAX_LEN, NAME_MAX_LEN,
};
pub use settings::{env_var_validator, CustomEnvVar, Settings, ENV_VARS, MCP_SERVERS};
