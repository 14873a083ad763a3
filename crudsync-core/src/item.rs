//! Traits describing the items a form engine manages.

use std::fmt;

/// An item stored in a list inside the settings aggregate.
pub trait CrudItem: Clone + Send + Sync + 'static {
    /// Stable identity used to address the item remotely.
    ///
    /// Items without one can only be persisted through the whole-aggregate
    /// path. Implementations should return `None` for an empty name.
    fn identity(&self) -> Option<&str> {
        None
    }
}

/// Items that carry an `enabled` flag.
pub trait Toggleable: CrudItem {
    fn enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);
}

/// Treats an empty identity the same as a missing one.
pub fn non_empty(name: &str) -> Option<&str> {
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// A typed setter for one field of a draft.
///
/// ```ignore
/// const DESCRIPTION: Field<McpServer, String> =
///     Field::new("description", |m, v| m.description = v);
/// form.change_field(DESCRIPTION, "Filesystem access".to_string());
/// ```
pub struct Field<T, V> {
    name: &'static str,
    set: fn(&mut T, V),
}

impl<T, V> Field<T, V> {
    pub const fn new(name: &'static str, set: fn(&mut T, V)) -> Self {
        Self { name, set }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Writes `value` into `target`.
    pub fn apply(&self, target: &mut T, value: V) {
        (self.set)(target, value)
    }
}

impl<T, V> Clone for Field<T, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V> Copy for Field<T, V> {}

impl<T, V> fmt::Debug for Field<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}
