//! Change notifications for views that cache remote data.
//!
//! The engine never touches a cache directly. It publishes
//! [`EngineEvent::Invalidate`] on an [`EventBus`] and whoever holds cached
//! copies of that resource subscribes and refetches.

use std::fmt;

use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Identifies a cached remote resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Settings,
    MarketplaceCatalog,
    MarketplaceInstalled,
    PluginDetails(String),
    Custom(String),
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Settings => write!(f, "settings"),
            QueryKey::MarketplaceCatalog => write!(f, "marketplace/catalog"),
            QueryKey::MarketplaceInstalled => write!(f, "marketplace/installed"),
            QueryKey::PluginDetails(name) => write!(f, "marketplace/plugin/{}", name),
            QueryKey::Custom(key) => write!(f, "{}", key),
        }
    }
}

impl std::str::FromStr for QueryKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "settings" => QueryKey::Settings,
            "marketplace/catalog" => QueryKey::MarketplaceCatalog,
            "marketplace/installed" => QueryKey::MarketplaceInstalled,
            other => match other.strip_prefix("marketplace/plugin/") {
                Some(name) => QueryKey::PluginDetails(name.to_string()),
                None => QueryKey::Custom(other.to_string()),
            },
        })
    }
}

/// Events published after successful mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Cached copies of this resource are stale
    Invalidate(QueryKey),
}

/// Broadcast channel for [`EngineEvent`]s. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event. Having no subscribers is not an error.
    pub fn publish(&self, event: EngineEvent) {
        tracing::debug!(?event, "publishing engine event");
        let _ = self.sender.send(event);
    }

    pub fn invalidate(&self, key: QueryKey) {
        self.publish(EngineEvent::Invalidate(key));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
