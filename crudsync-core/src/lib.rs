//! crudsync core library
//!
//! A form engine for editing lists that live inside a larger settings
//! document, with persistence through either per-item remote endpoints or a
//! whole-document write, plus the settings models and HTTP clients the
//! crudsync tools share.

pub mod api;
pub mod engine;
pub mod error;
pub mod events;
pub mod form;
pub mod item;
pub mod lens;
pub mod models;
pub mod notify;
pub mod store;
pub mod strategy;

pub use api::{ApiClient, MarketplaceClient, MarketplaceService, McpApi, SettingsApi};
pub use engine::{CrudForm, CrudOptions, MutationOutcome};
pub use error::{CrudError, PersistError, RemoteError};
pub use events::{EngineEvent, EventBus, QueryKey};
pub use form::FormState;
pub use item::{CrudItem, Field, Toggleable};
pub use lens::ItemLens;
pub use models::{CommandType, CustomEnvVar, McpServer, Settings};
pub use notify::{Notifier, TracingNotifier};
pub use store::{MemoryStore, PersistMessages, SettingsStore, Updater};
pub use strategy::{Capabilities, IdentityPolicy, MutationKind, PersistenceStrategy, RemoteItemApi};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
