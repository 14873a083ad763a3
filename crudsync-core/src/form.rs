//! In-memory state of the add/edit dialog.

use crate::item::Field;

/// The draft being edited plus the dialog bookkeeping around it.
///
/// `editing_index` is only meaningful while the dialog is open: it is
/// cleared by every reset.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState<T> {
    draft: T,
    dialog_open: bool,
    editing_index: Option<usize>,
    error: Option<String>,
}

impl<T: Clone> FormState<T> {
    pub fn new(seed: T) -> Self {
        Self {
            draft: seed,
            dialog_open: false,
            editing_index: None,
            error: None,
        }
    }

    pub fn draft(&self) -> &T {
        &self.draft
    }

    pub fn is_dialog_open(&self) -> bool {
        self.dialog_open
    }

    pub fn editing_index(&self) -> Option<usize> {
        self.editing_index
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_editing(&self) -> bool {
        self.editing_index.is_some()
    }

    /// Discards the draft and any error, keeping the dialog flag as it is.
    pub fn reset(&mut self, seed: T) {
        self.draft = seed;
        self.editing_index = None;
        self.error = None;
    }

    /// Opens the dialog on a fresh draft.
    pub fn open_create(&mut self, seed: T) {
        self.reset(seed);
        self.dialog_open = true;
    }

    /// Opens the dialog on a copy of the item at `index`.
    pub fn open_edit(&mut self, index: usize, item: &T) {
        self.draft = item.clone();
        self.editing_index = Some(index);
        self.error = None;
        self.dialog_open = true;
    }

    pub fn close(&mut self, seed: T) {
        self.dialog_open = false;
        self.reset(seed);
    }

    pub fn set_field<V>(&mut self, field: Field<T, V>, value: V) {
        field.apply(&mut self.draft, value);
    }

    pub fn update_draft<F: FnOnce(&mut T)>(&mut self, edit: F) {
        edit(&mut self.draft);
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Entry {
        key: String,
        value: String,
    }

    const VALUE: Field<Entry, String> = Field::new("value", |e, v| e.value = v);

    fn entry(key: &str, value: &str) -> Entry {
        Entry {
            key: key.into(),
            value: value.into(),
        }
    }

    #[test]
    fn test_new_is_closed_and_clean() {
        let form = FormState::new(Entry::default());
        assert!(!form.is_dialog_open());
        assert_eq!(form.editing_index(), None);
        assert_eq!(form.error(), None);
    }

    #[test]
    fn test_open_edit_copies_item() {
        let mut form = FormState::new(Entry::default());
        let item = entry("PATH", "/bin");
        form.open_edit(2, &item);

        assert!(form.is_dialog_open());
        assert!(form.is_editing());
        assert_eq!(form.editing_index(), Some(2));
        assert_eq!(form.draft(), &item);
    }

    #[test]
    fn test_set_field_does_not_validate_or_clear_error() {
        let mut form = FormState::new(Entry::default());
        form.open_create(Entry::default());
        form.set_error("Key is required");
        form.set_field(VALUE, "x".to_string());

        assert_eq!(form.draft().value, "x");
        assert_eq!(form.error(), Some("Key is required"));
    }

    #[test]
    fn test_close_twice_is_same_as_once() {
        let mut form = FormState::new(Entry::default());
        form.open_edit(0, &entry("A", "1"));
        form.set_error("bad");

        form.close(Entry::default());
        let once = form.clone();
        form.close(Entry::default());
        assert_eq!(form, once);
        assert!(!form.is_dialog_open());
        assert_eq!(form.editing_index(), None);
        assert_eq!(form.error(), None);
        assert_eq!(form.draft(), &Entry::default());
    }

    #[test]
    fn test_open_create_clears_previous_edit() {
        let mut form = FormState::new(Entry::default());
        form.open_edit(1, &entry("A", "1"));
        form.open_create(Entry::default());

        assert!(form.is_dialog_open());
        assert_eq!(form.editing_index(), None);
        assert_eq!(form.draft(), &Entry::default());
    }
}
