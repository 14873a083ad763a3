//! Server-side modules for the crudsync settings server.

pub mod auth;
pub mod config;
pub mod routes;
pub mod storage;

pub use auth::{auth_middleware, ApiKeyEntry, ApiKeyStore, AuthUser};
pub use config::ServerConfig;
pub use routes::{router, AppState};
pub use storage::{SettingsStorage, StorageError};
