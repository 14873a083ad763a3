//! Path selection and list edits shared by the remote and aggregate paths.
//!
//! Every edit here takes the previous aggregate by reference and returns a
//! new one, so a snapshot handed out earlier never changes underneath its
//! reader.

use std::sync::Arc;

use crate::error::CrudError;
use crate::item::{CrudItem, Toggleable};
use crate::lens::ItemLens;
use crate::strategy::{IdentityPolicy, MutationKind, PersistenceStrategy, RemoteItemApi};

/// Where a single mutation goes.
pub(crate) enum Route<T: Send + Sync> {
    Remote(Arc<dyn RemoteItemApi<T>>),
    Aggregate,
}

/// Picks the path for one mutation.
///
/// The remote path is taken when the strategy has an API supporting `kind`
/// and, except for creates, the target has an identity. An identity-less
/// target falls back to the aggregate path or fails, per `policy`.
pub(crate) fn route<T: Send + Sync>(
    strategy: &PersistenceStrategy<T>,
    policy: IdentityPolicy,
    kind: MutationKind,
    identity: Option<&str>,
    item_name: &str,
) -> Result<Route<T>, CrudError> {
    let Some(api) = strategy.api_for(kind) else {
        return Ok(Route::Aggregate);
    };

    if kind == MutationKind::Create || identity.is_some() {
        return Ok(Route::Remote(api.clone()));
    }

    match policy {
        IdentityPolicy::FallbackToAggregate => {
            tracing::warn!(
                %kind,
                item = item_name,
                "remote {} available but item has no name, persisting whole settings instead",
                kind
            );
            Ok(Route::Aggregate)
        }
        IdentityPolicy::Reject => Err(CrudError::MissingIdentity(item_name.to_string())),
    }
}

/// Finds the current position of the item that was at `index` when the
/// operation started.
///
/// Named items are looked up by name, so a list that changed in the
/// meantime is still edited at the right place. Unnamed items can only
/// be addressed by position.
pub(crate) fn locate<T: CrudItem>(items: &[T], index: usize, identity: Option<&str>) -> Option<usize> {
    match identity {
        Some(name) => {
            if items.get(index).and_then(|i| i.identity()) == Some(name) {
                return Some(index);
            }
            items.iter().position(|i| i.identity() == Some(name))
        }
        None => (index < items.len()).then_some(index),
    }
}

/// Removes the entry, storing `None` when nothing is left.
pub(crate) fn remove_entry<S: Clone, T: CrudItem>(
    lens: &ItemLens<S, T>,
    prev: &S,
    index: usize,
    identity: Option<&str>,
) -> S {
    lens.rebuild_collapsing(prev, |items| match locate(items, index, identity) {
        Some(pos) => {
            items.remove(pos);
        }
        None => tracing::debug!(index, "entry already gone, nothing to remove"),
    })
}

/// Replaces the entry with `item`, leaving the list as-is if it is gone.
pub(crate) fn replace_entry<S: Clone, T: CrudItem>(
    lens: &ItemLens<S, T>,
    prev: &S,
    index: usize,
    identity: Option<&str>,
    item: T,
) -> S {
    lens.rebuild(prev, |items| match locate(items, index, identity) {
        Some(pos) => items[pos] = item,
        None => tracing::warn!(index, "entry disappeared before it could be replaced"),
    })
}

/// Sets `enabled` on the entry, keeping every other field.
pub(crate) fn set_entry_enabled<S: Clone, T: Toggleable>(
    lens: &ItemLens<S, T>,
    prev: &S,
    index: usize,
    identity: Option<&str>,
    enabled: bool,
) -> S {
    lens.rebuild(prev, |items| {
        if let Some(pos) = locate(items, index, identity) {
            items[pos].set_enabled(enabled);
        }
    })
}

/// Writes a saved item back: in place when editing, appended when creating.
///
/// An edited entry that vanished in the meantime is appended rather than
/// dropped, since the save itself succeeded.
pub(crate) fn splice_saved<S: Clone, T: CrudItem>(
    lens: &ItemLens<S, T>,
    prev: &S,
    target: Option<(usize, Option<&str>)>,
    item: T,
) -> S {
    lens.rebuild(prev, |items| match target {
        Some((index, identity)) => match locate(items, index, identity) {
            Some(pos) => items[pos] = item,
            None => {
                tracing::warn!(index, "edited entry disappeared, appending saved item");
                items.push(item);
            }
        },
        None => items.push(item),
    })
}
