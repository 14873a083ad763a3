//! Typed access to the item list stored inside the settings aggregate.

use std::fmt;

/// Reads and replaces one list field of the aggregate `S`.
///
/// A missing list (`None`) and an empty list read the same way, so callers
/// never have to tell the two apart.
pub struct ItemLens<S, T> {
    key: &'static str,
    get: fn(&S) -> Option<&[T]>,
    set: fn(&mut S, Option<Vec<T>>),
}

impl<S, T: Clone> ItemLens<S, T> {
    pub const fn new(
        key: &'static str,
        get: fn(&S) -> Option<&[T]>,
        set: fn(&mut S, Option<Vec<T>>),
    ) -> Self {
        Self { key, get, set }
    }

    /// Name of the aggregate field this lens targets.
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// The current items, empty when the field is absent.
    pub fn items<'a>(&self, aggregate: &'a S) -> &'a [T] {
        (self.get)(aggregate).unwrap_or(&[])
    }

    pub fn get(&self, aggregate: &S, index: usize) -> Option<T> {
        self.items(aggregate).get(index).cloned()
    }

    pub fn len(&self, aggregate: &S) -> usize {
        self.items(aggregate).len()
    }

    pub fn is_empty(&self, aggregate: &S) -> bool {
        self.items(aggregate).is_empty()
    }

    /// Stores `items` into the aggregate as-is.
    pub fn store(&self, aggregate: &mut S, items: Option<Vec<T>>) {
        (self.set)(aggregate, items)
    }

    /// Builds a new aggregate whose list is `edit` applied to a copy of the
    /// current list. `prev` is never modified.
    pub fn rebuild<F>(&self, prev: &S, edit: F) -> S
    where
        S: Clone,
        F: FnOnce(&mut Vec<T>),
    {
        let mut next = prev.clone();
        let mut items = self.items(prev).to_vec();
        edit(&mut items);
        self.store(&mut next, Some(items));
        next
    }

    /// Like [`rebuild`](Self::rebuild) but collapses an empty result to `None`.
    pub fn rebuild_collapsing<F>(&self, prev: &S, edit: F) -> S
    where
        S: Clone,
        F: FnOnce(&mut Vec<T>),
    {
        let mut next = prev.clone();
        let mut items = self.items(prev).to_vec();
        edit(&mut items);
        self.store(&mut next, if items.is_empty() { None } else { Some(items) });
        next
    }
}

impl<S, T> Clone for ItemLens<S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, T> Copy for ItemLens<S, T> {}

impl<S, T> fmt::Debug for ItemLens<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemLens").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Doc {
        tags: Option<Vec<String>>,
        title: String,
    }

    fn tags(doc: &Doc) -> Option<&[String]> {
        doc.tags.as_deref()
    }

    fn set_tags(doc: &mut Doc, tags: Option<Vec<String>>) {
        doc.tags = tags;
    }

    const TAGS: ItemLens<Doc, String> = ItemLens::new("tags", tags, set_tags);

    #[test]
    fn test_absent_and_empty_read_the_same() {
        let absent = Doc::default();
        let empty = Doc {
            tags: Some(vec![]),
            ..Doc::default()
        };
        assert!(TAGS.items(&absent).is_empty());
        assert!(TAGS.items(&empty).is_empty());
        assert_eq!(TAGS.len(&absent), TAGS.len(&empty));
    }

    #[test]
    fn test_rebuild_leaves_previous_untouched() {
        let prev = Doc {
            tags: Some(vec!["a".into()]),
            title: "t".into(),
        };
        let next = TAGS.rebuild(&prev, |items| items.push("b".into()));

        assert_eq!(prev.tags, Some(vec!["a".to_string()]));
        assert_eq!(next.tags, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(next.title, "t");
    }

    #[test]
    fn test_rebuild_collapsing_stores_none_when_empty() {
        let prev = Doc {
            tags: Some(vec!["a".into()]),
            ..Doc::default()
        };
        let next = TAGS.rebuild_collapsing(&prev, |items| {
            items.remove(0);
        });
        assert_eq!(next.tags, None);
    }

    #[test]
    fn test_get_out_of_range() {
        let doc = Doc {
            tags: Some(vec!["a".into()]),
            ..Doc::default()
        };
        assert_eq!(TAGS.get(&doc, 0), Some("a".to_string()));
        assert_eq!(TAGS.get(&doc, 1), None);
        assert_eq!(TAGS.key(), "tags");
    }
}
