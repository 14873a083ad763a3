//! How a form engine persists mutations.
//!
//! A configuration picks one [`PersistenceStrategy`] up front. With
//! `RemoteBacked`, each mutation still falls back to the whole-aggregate
//! path when the API lacks that capability or the item has no identity.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RemoteError;

/// The four mutations the engine performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    Toggle,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Create => write!(f, "create"),
            MutationKind::Update => write!(f, "update"),
            MutationKind::Delete => write!(f, "delete"),
            MutationKind::Toggle => write!(f, "toggle"),
        }
    }
}

/// Which mutations a remote API implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub create: bool,
    pub update: bool,
    pub delete: bool,
    pub toggle: bool,
}

impl Capabilities {
    pub const fn all() -> Self {
        Self {
            create: true,
            update: true,
            delete: true,
            toggle: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            create: false,
            update: false,
            delete: false,
            toggle: false,
        }
    }

    pub fn supports(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::Create => self.create,
            MutationKind::Update => self.update,
            MutationKind::Delete => self.delete,
            MutationKind::Toggle => self.toggle,
        }
    }

    pub fn with(mut self, kind: MutationKind) -> Self {
        match kind {
            MutationKind::Create => self.create = true,
            MutationKind::Update => self.update = true,
            MutationKind::Delete => self.delete = true,
            MutationKind::Toggle => self.toggle = true,
        }
        self
    }
}

/// Dedicated per-item endpoints, addressed by item identity.
///
/// Every method defaults to [`RemoteError::Unsupported`]; implementors
/// override the ones listed in [`capabilities`](Self::capabilities).
#[async_trait]
pub trait RemoteItemApi<T: Send + Sync>: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    async fn create(&self, _draft: &T) -> Result<T, RemoteError> {
        Err(RemoteError::Unsupported(MutationKind::Create))
    }

    async fn update(&self, _name: &str, _draft: &T) -> Result<T, RemoteError> {
        Err(RemoteError::Unsupported(MutationKind::Update))
    }

    async fn delete(&self, _name: &str) -> Result<(), RemoteError> {
        Err(RemoteError::Unsupported(MutationKind::Delete))
    }

    async fn set_enabled(&self, _name: &str, _enabled: bool) -> Result<T, RemoteError> {
        Err(RemoteError::Unsupported(MutationKind::Toggle))
    }
}

/// What to do when a remote-backed mutation targets an item with no identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityPolicy {
    /// Persist through the aggregate path instead (logged as a warning)
    #[default]
    FallbackToAggregate,
    /// Fail the operation with `CrudError::MissingIdentity`
    Reject,
}

/// Persistence strategy for a form engine, fixed at configuration time.
pub enum PersistenceStrategy<T: Send + Sync> {
    RemoteBacked(Arc<dyn RemoteItemApi<T>>),
    AggregateFallback,
}

impl<T: Send + Sync> PersistenceStrategy<T> {
    pub fn remote(api: impl RemoteItemApi<T> + 'static) -> Self {
        PersistenceStrategy::RemoteBacked(Arc::new(api))
    }

    /// The API to use for `kind`, if this strategy has one that supports it.
    pub fn api_for(&self, kind: MutationKind) -> Option<&Arc<dyn RemoteItemApi<T>>> {
        match self {
            PersistenceStrategy::RemoteBacked(api) if api.capabilities().supports(kind) => {
                Some(api)
            }
            _ => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, PersistenceStrategy::RemoteBacked(_))
    }
}

impl<T: Send + Sync> Clone for PersistenceStrategy<T> {
    fn clone(&self) -> Self {
        match self {
            PersistenceStrategy::RemoteBacked(api) => PersistenceStrategy::RemoteBacked(api.clone()),
            PersistenceStrategy::AggregateFallback => PersistenceStrategy::AggregateFallback,
        }
    }
}

impl<T: Send + Sync> fmt::Debug for PersistenceStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceStrategy::RemoteBacked(api) => f
                .debug_tuple("RemoteBacked")
                .field(&api.capabilities())
                .finish(),
            PersistenceStrategy::AggregateFallback => write!(f, "AggregateFallback"),
        }
    }
}
