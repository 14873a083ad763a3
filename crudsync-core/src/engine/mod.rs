//! The CRUD form engine.
//!
//! [`CrudForm`] manages one list inside a settings aggregate: it holds the
//! add/edit dialog state, validates drafts, and persists every mutation
//! through either a dedicated remote API or a whole-aggregate persist.
//!
//! # Flow
//!
//! 1. `add()` / `edit(i)` open the dialog on a draft
//! 2. `change_field()` edits the draft
//! 3. `save()` validates, persists, writes the result back and closes
//!
//! `delete(i)` and `toggle_enabled(i, on)` act on the list directly.
//!
//! # Consistency
//!
//! Each mutation makes at most one remote call and, only when it succeeds,
//! one local update. A failure leaves the aggregate and the list as they
//! were. Mutating operations take `&mut self`, so one engine never runs two
//! of them at once.

mod gateway;

use std::sync::Arc;

use crate::error::CrudError;
use crate::events::{EventBus, QueryKey};
use crate::form::FormState;
use crate::item::{CrudItem, Field, Toggleable};
use crate::lens::ItemLens;
use crate::notify::{capitalize, Notifier};
use crate::store::{PersistMessages, SettingsStore};
use crate::strategy::{IdentityPolicy, MutationKind, PersistenceStrategy};

use gateway::{remove_entry, replace_entry, route, set_entry_enabled, splice_saved, Route};

type DefaultFn<T> = Box<dyn Fn() -> T + Send + Sync>;
type ValidateFn<T> = Box<dyn Fn(&T, Option<usize>) -> Option<String> + Send + Sync>;

fn accept_any<T>(_draft: &T, _editing: Option<usize>) -> Option<String> {
    None
}

/// How a successful mutation was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The whole aggregate was patched and persisted
    AppliedLocally,
    /// A dedicated remote call succeeded and the local list was updated
    AppliedRemotely,
}

impl MutationOutcome {
    pub fn is_remote(&self) -> bool {
        matches!(self, MutationOutcome::AppliedRemotely)
    }
}

/// Configuration for a [`CrudForm`].
pub struct CrudOptions<S, T: Send + Sync> {
    item_name: String,
    lens: ItemLens<S, T>,
    create_default: DefaultFn<T>,
    validate: ValidateFn<T>,
    strategy: PersistenceStrategy<T>,
    invalidates: QueryKey,
    identity_policy: IdentityPolicy,
}

impl<S, T: CrudItem> CrudOptions<S, T> {
    /// Options with no validation, the aggregate fallback strategy, and
    /// invalidation of the installed-items query.
    pub fn new(
        item_name: impl Into<String>,
        lens: ItemLens<S, T>,
        create_default: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            item_name: item_name.into(),
            lens,
            create_default: Box::new(create_default),
            validate: Box::new(accept_any::<T>),
            strategy: PersistenceStrategy::AggregateFallback,
            invalidates: QueryKey::MarketplaceInstalled,
            identity_policy: IdentityPolicy::default(),
        }
    }

    /// Validator run by `save()`; returns an error message for a bad draft.
    pub fn validator(
        mut self,
        validate: impl Fn(&T, Option<usize>) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.validate = Box::new(validate);
        self
    }

    pub fn strategy(mut self, strategy: PersistenceStrategy<T>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Cache key published after each successful mutation.
    pub fn invalidates(mut self, key: QueryKey) -> Self {
        self.invalidates = key;
        self
    }

    pub fn identity_policy(mut self, policy: IdentityPolicy) -> Self {
        self.identity_policy = policy;
        self
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn lens(&self) -> &ItemLens<S, T> {
        &self.lens
    }
}

/// Form controller for one list of `T` inside the aggregate `S`.
pub struct CrudForm<S: Send + Sync, T: Send + Sync> {
    options: CrudOptions<S, T>,
    store: Arc<dyn SettingsStore<S>>,
    notifier: Arc<dyn Notifier>,
    events: EventBus,
    form: FormState<T>,
    /// Name of the item opened by `edit()`, captured when the dialog opened
    editing_identity: Option<String>,
}

impl<S, T> CrudForm<S, T>
where
    S: Clone + Send + Sync + 'static,
    T: CrudItem,
{
    pub fn new(
        options: CrudOptions<S, T>,
        store: Arc<dyn SettingsStore<S>>,
        notifier: Arc<dyn Notifier>,
        events: EventBus,
    ) -> Self {
        let form = FormState::new((options.create_default)());
        Self {
            options,
            store,
            notifier,
            events,
            form,
            editing_identity: None,
        }
    }

    // ========== State exposed to the view ==========

    pub fn is_dialog_open(&self) -> bool {
        self.form.is_dialog_open()
    }

    pub fn editing_index(&self) -> Option<usize> {
        self.form.editing_index()
    }

    pub fn draft(&self) -> &T {
        self.form.draft()
    }

    pub fn form_error(&self) -> Option<&str> {
        self.form.error()
    }

    pub fn form_state(&self) -> &FormState<T> {
        &self.form
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The managed list as currently stored.
    pub fn items(&self) -> Vec<T> {
        self.options.lens.items(&self.store.snapshot()).to_vec()
    }

    /// Position of the item named `name`, if present.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.options
            .lens
            .items(&self.store.snapshot())
            .iter()
            .position(|item| item.identity() == Some(name))
    }

    // ========== Dialog operations ==========

    /// Opens the dialog on a fresh draft.
    pub fn add(&mut self) {
        self.editing_identity = None;
        self.form.open_create((self.options.create_default)());
    }

    /// Opens the dialog on a copy of the item at `index`.
    ///
    /// Returns `false`, leaving everything as it was, when no such item exists.
    pub fn edit(&mut self, index: usize) -> bool {
        let snapshot = self.store.snapshot();
        match self.options.lens.get(&snapshot, index) {
            Some(item) => {
                self.editing_identity = item.identity().map(str::to_owned);
                self.form.open_edit(index, &item);
                true
            }
            None => {
                tracing::debug!(index, key = self.options.lens.key(), "edit ignored, no item");
                false
            }
        }
    }

    /// Sets one field of the draft. Never validates.
    pub fn change_field<V>(&mut self, field: Field<T, V>, value: V) {
        self.form.set_field(field, value);
    }

    /// Edits several draft fields at once. Never validates.
    pub fn update_draft<F: FnOnce(&mut T)>(&mut self, edit: F) {
        self.form.update_draft(edit);
    }

    /// Closes the dialog and discards the draft.
    pub fn close(&mut self) {
        self.editing_identity = None;
        self.form.close((self.options.create_default)());
    }

    // ========== Mutations ==========

    /// Removes the item at `index`. A successful delete also closes an open
    /// dialog.
    pub async fn delete(&mut self, index: usize) -> Result<MutationOutcome, CrudError> {
        let outcome = self.delete_at(index).await?;
        if self.form.is_dialog_open() {
            self.close();
        }
        Ok(outcome)
    }

    async fn delete_at(&mut self, index: usize) -> Result<MutationOutcome, CrudError> {
        let item_name = self.options.item_name.clone();
        let lens = self.options.lens;
        let failed = format!("Failed to delete {}", item_name);

        let (identity, path) = self
            .resolve(index, MutationKind::Delete)
            .map_err(|e| self.fail(&failed, e))?;

        match (path, identity) {
            (Route::Remote(api), Some(name)) => {
                tracing::debug!(index, name = %name, "deleting through remote API");
                if let Err(e) = api.delete(&name).await {
                    tracing::warn!(name = %name, error = %e, "remote delete failed");
                    return Err(self.fail(&failed, e.into()));
                }

                let target = name.clone();
                self.store.apply_local(Box::new(move |prev: &S| {
                    remove_entry(&lens, prev, index, Some(target.as_str()))
                }));
                self.events.invalidate(self.options.invalidates.clone());
                self.notifier.success(&format!("Deleted {}", name));
                Ok(MutationOutcome::AppliedRemotely)
            }
            (_, identity) => {
                tracing::debug!(index, key = lens.key(), "deleting through settings persist");
                let success = match &identity {
                    Some(name) => format!("Deleted {}", name),
                    None => format!("{} deleted", capitalize(&item_name)),
                };
                let messages = PersistMessages::new().success(success).error(failed);

                self.store
                    .patch_and_persist(
                        Box::new(move |prev: &S| {
                            remove_entry(&lens, prev, index, identity.as_deref())
                        }),
                        messages,
                    )
                    .await
                    .map_err(|e| {
                        tracing::warn!(index, error = %e, "settings persist failed on delete");
                        CrudError::from(e)
                    })?;

                self.events.invalidate(self.options.invalidates.clone());
                Ok(MutationOutcome::AppliedLocally)
            }
        }
    }

    /// Validates the draft and persists it: in place when editing, appended
    /// when creating. On success the dialog closes.
    ///
    /// On failure the dialog stays open with `form_error()` set.
    pub async fn save(&mut self) -> Result<MutationOutcome, CrudError> {
        let editing = self.form.editing_index();
        if let Some(message) = (self.options.validate)(self.form.draft(), editing) {
            tracing::debug!(error = %message, "draft rejected by validator");
            self.form.set_error(message.clone());
            return Err(CrudError::Validation(message));
        }

        match self.persist_draft(editing).await {
            Ok(outcome) => {
                self.close();
                Ok(outcome)
            }
            Err(e) => {
                self.form.set_error(e.form_message());
                Err(e)
            }
        }
    }

    async fn persist_draft(&mut self, editing: Option<usize>) -> Result<MutationOutcome, CrudError> {
        let item_name = self.options.item_name.clone();
        let lens = self.options.lens;
        let draft = self.form.draft().clone();

        let kind = match editing {
            Some(_) => MutationKind::Update,
            None => MutationKind::Create,
        };
        let done = match kind {
            MutationKind::Update => format!("{} updated", capitalize(&item_name)),
            _ => format!("{} added", capitalize(&item_name)),
        };
        let failed = format!("Failed to save {}", item_name);

        // The name captured by edit() is the target; an unnamed item can only
        // be addressed by its index, which must still exist.
        let existing_identity = self.editing_identity.clone();
        let path = match editing {
            Some(index) if existing_identity.is_none() => self.item_at(index).and_then(|_| {
                route(&self.options.strategy, self.options.identity_policy, kind, None, &item_name)
            }),
            _ => route(
                &self.options.strategy,
                self.options.identity_policy,
                kind,
                existing_identity.as_deref(),
                &item_name,
            ),
        }
        .map_err(|e| self.fail(&failed, e))?;

        match path {
            Route::Remote(api) => {
                tracing::debug!(%kind, ?editing, "saving through remote API");
                let result = match (kind, existing_identity.as_deref()) {
                    (MutationKind::Update, Some(name)) => api.update(name, &draft).await,
                    _ => api.create(&draft).await,
                };
                let saved = match result {
                    Ok(saved) => saved,
                    Err(e) => {
                        tracing::warn!(%kind, error = %e, "remote save failed");
                        return Err(self.fail(&failed, e.into()));
                    }
                };

                self.store.apply_local(Box::new(move |prev: &S| {
                    let target = editing.map(|i| (i, existing_identity.as_deref()));
                    splice_saved(&lens, prev, target, saved)
                }));
                self.events.invalidate(self.options.invalidates.clone());
                self.notifier.success(&done);
                Ok(MutationOutcome::AppliedRemotely)
            }
            Route::Aggregate => {
                tracing::debug!(%kind, ?editing, key = lens.key(), "saving through settings persist");
                self.store
                    .patch_and_persist(
                        Box::new(move |prev: &S| {
                            let target = editing.map(|i| (i, existing_identity.as_deref()));
                            splice_saved(&lens, prev, target, draft)
                        }),
                        PersistMessages::new().success(done).error(failed),
                    )
                    .await
                    .map_err(|e| {
                        tracing::warn!(%kind, error = %e, "settings persist failed on save");
                        CrudError::from(e)
                    })?;

                self.events.invalidate(self.options.invalidates.clone());
                Ok(MutationOutcome::AppliedLocally)
            }
        }
    }

    /// The identity of the item at `index` and the path a `kind` mutation
    /// on it takes.
    fn resolve(
        &self,
        index: usize,
        kind: MutationKind,
    ) -> Result<(Option<String>, Route<T>), CrudError> {
        let item = self.item_at(index)?;
        let identity = item.identity().map(str::to_owned);
        let path = route(
            &self.options.strategy,
            self.options.identity_policy,
            kind,
            identity.as_deref(),
            &self.options.item_name,
        )?;
        Ok((identity, path))
    }

    /// Reports `message` for a mutation that failed without reaching the
    /// store, which reports its own failures.
    fn fail(&self, message: &str, error: CrudError) -> CrudError {
        self.notifier.error(message);
        error
    }

    fn item_at(&self, index: usize) -> Result<T, CrudError> {
        let snapshot = self.store.snapshot();
        let lens = &self.options.lens;
        lens.get(&snapshot, index)
            .ok_or_else(|| CrudError::IndexOutOfRange {
                index,
                len: lens.len(&snapshot),
            })
    }
}

impl<S, T> CrudForm<S, T>
where
    S: Clone + Send + Sync + 'static,
    T: Toggleable,
{
    /// Turns the item at `index` on or off.
    pub async fn toggle_enabled(
        &mut self,
        index: usize,
        enabled: bool,
    ) -> Result<MutationOutcome, CrudError> {
        let item_name = self.options.item_name.clone();
        let lens = self.options.lens;
        let failed = format!("Failed to update {} state", item_name);
        let state = if enabled { "enabled" } else { "disabled" };

        let (identity, path) = self
            .resolve(index, MutationKind::Toggle)
            .map_err(|e| self.fail(&failed, e))?;

        match (path, identity) {
            (Route::Remote(api), Some(name)) => {
                tracing::debug!(index, name = %name, enabled, "toggling through remote API");
                let updated = match api.set_enabled(&name, enabled).await {
                    Ok(updated) => updated,
                    Err(e) => {
                        tracing::warn!(name = %name, error = %e, "remote toggle failed");
                        return Err(self.fail(&failed, e.into()));
                    }
                };

                let target = name.clone();
                self.store.apply_local(Box::new(move |prev: &S| {
                    replace_entry(&lens, prev, index, Some(target.as_str()), updated)
                }));
                self.events.invalidate(self.options.invalidates.clone());
                self.notifier.success(&format!("{} {}", name, state));
                Ok(MutationOutcome::AppliedRemotely)
            }
            (_, identity) => {
                tracing::debug!(index, enabled, key = lens.key(), "toggling through settings persist");
                let done = match &identity {
                    Some(name) => format!("{} {}", name, state),
                    None => format!("{} {}", capitalize(&item_name), state),
                };
                self.store
                    .patch_and_persist(
                        Box::new(move |prev: &S| {
                            set_entry_enabled(&lens, prev, index, identity.as_deref(), enabled)
                        }),
                        PersistMessages::new().success(done).error(failed),
                    )
                    .await
                    .map_err(|e| {
                        tracing::warn!(index, error = %e, "settings persist failed on toggle");
                        CrudError::from(e)
                    })?;

                self.events.invalidate(self.options.invalidates.clone());
                Ok(MutationOutcome::AppliedLocally)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PersistError, RemoteError};
    use crate::events::EngineEvent;
    use crate::item::non_empty;
    use crate::notify::{Notice, RecordingNotifier};
    use crate::store::MemoryStore;
    use crate::strategy::{Capabilities, RemoteItemApi};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::broadcast;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Server {
        name: String,
        enabled: bool,
        note: String,
    }

    impl CrudItem for Server {
        fn identity(&self) -> Option<&str> {
            non_empty(&self.name)
        }
    }

    impl Toggleable for Server {
        fn enabled(&self) -> bool {
            self.enabled
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
        }
    }

    const NAME: Field<Server, String> = Field::new("name", |s, v| s.name = v);
    const NOTE: Field<Server, String> = Field::new("note", |s, v| s.note = v);

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Doc {
        servers: Option<Vec<Server>>,
        theme: String,
    }

    fn servers(doc: &Doc) -> Option<&[Server]> {
        doc.servers.as_deref()
    }

    fn set_servers(doc: &mut Doc, servers: Option<Vec<Server>>) {
        doc.servers = servers;
    }

    const SERVERS: ItemLens<Doc, Server> = ItemLens::new("servers", servers, set_servers);

    fn server(name: &str, enabled: bool) -> Server {
        Server {
            name: name.into(),
            enabled,
            note: String::new(),
        }
    }

    /// Remote API double that records calls and can be told to fail.
    struct FakeApi {
        caps: Capabilities,
        calls: Mutex<Vec<String>>,
        failure: Mutex<Option<RemoteError>>,
    }

    impl FakeApi {
        fn new(caps: Capabilities) -> Self {
            Self {
                caps,
                calls: Mutex::new(Vec::new()),
                failure: Mutex::new(None),
            }
        }

        fn failing(caps: Capabilities, error: RemoteError) -> Self {
            let api = Self::new(caps);
            *api.failure.lock().unwrap() = Some(error);
            api
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> Result<(), RemoteError> {
            self.calls.lock().unwrap().push(call);
            match self.failure.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl RemoteItemApi<Server> for FakeApi {
        fn capabilities(&self) -> Capabilities {
            self.caps
        }

        async fn create(&self, draft: &Server) -> Result<Server, RemoteError> {
            self.record(format!("create {}", draft.name))?;
            Ok(Server {
                note: "from server".into(),
                ..draft.clone()
            })
        }

        async fn update(&self, name: &str, draft: &Server) -> Result<Server, RemoteError> {
            self.record(format!("update {}", name))?;
            Ok(Server {
                note: "from server".into(),
                ..draft.clone()
            })
        }

        async fn delete(&self, name: &str) -> Result<(), RemoteError> {
            self.record(format!("delete {}", name))
        }

        async fn set_enabled(&self, name: &str, enabled: bool) -> Result<Server, RemoteError> {
            self.record(format!("toggle {} {}", name, enabled))?;
            Ok(Server {
                name: name.into(),
                enabled,
                note: "from server".into(),
            })
        }
    }

    struct Harness {
        form: CrudForm<Doc, Server>,
        store: Arc<MemoryStore<Doc>>,
        notifier: Arc<RecordingNotifier>,
        events: broadcast::Receiver<EngineEvent>,
    }

    impl Harness {
        fn doc(&self) -> Doc {
            self.store.snapshot()
        }

        fn invalidations(&mut self) -> usize {
            let mut count = 0;
            while let Ok(EngineEvent::Invalidate(_)) = self.events.try_recv() {
                count += 1;
            }
            count
        }
    }

    fn validate(draft: &Server, _editing: Option<usize>) -> Option<String> {
        if draft.name.trim().is_empty() {
            Some("Name is required".to_string())
        } else {
            None
        }
    }

    fn harness(items: Option<Vec<Server>>, api: Option<Arc<FakeApi>>) -> Harness {
        let notifier = Arc::new(RecordingNotifier::new());
        let store = Arc::new(MemoryStore::with_notifier(
            Doc {
                servers: items,
                theme: "dark".into(),
            },
            notifier.clone(),
        ));
        let strategy: PersistenceStrategy<Server> = match api {
            Some(api) => PersistenceStrategy::RemoteBacked(api),
            None => PersistenceStrategy::AggregateFallback,
        };
        let options = CrudOptions::new("server", SERVERS, Server::default)
            .validator(validate)
            .strategy(strategy);
        let bus = EventBus::new();
        let events = bus.subscribe();
        let form = CrudForm::new(options, store.clone(), notifier.clone(), bus);
        Harness {
            form,
            store,
            notifier,
            events,
        }
    }

    // ========== Dialog ==========

    #[test]
    fn test_edit_then_close_changes_nothing() {
        let items = vec![server("a", true), server("b", false)];
        let api = Arc::new(FakeApi::new(Capabilities::all()));
        let mut h = harness(Some(items.clone()), Some(api.clone()));
        let before = h.doc();

        for index in 0..items.len() {
            assert!(h.form.edit(index));
            assert_eq!(h.form.draft(), &items[index]);
            assert_eq!(h.form.editing_index(), Some(index));
            h.form.close();
        }

        assert_eq!(h.doc(), before);
        assert!(api.calls().is_empty());
        assert_eq!(h.store.persist_calls(), 0);
        assert!(h.notifier.notices().is_empty());
    }

    #[test]
    fn test_edit_out_of_range_is_ignored() {
        let mut h = harness(Some(vec![server("a", true)]), None);
        assert!(!h.form.edit(1));
        assert!(!h.form.is_dialog_open());
        assert_eq!(h.form.editing_index(), None);

        let mut empty = harness(None, None);
        assert!(!empty.form.edit(0));
        assert!(!empty.form.is_dialog_open());
    }

    #[test]
    fn test_add_resets_previous_edit() {
        let mut h = harness(Some(vec![server("a", true)]), None);
        h.form.edit(0);
        h.form.change_field(NOTE, "changed".into());
        h.form.add();

        assert!(h.form.is_dialog_open());
        assert_eq!(h.form.editing_index(), None);
        assert_eq!(h.form.draft(), &Server::default());
        assert_eq!(h.form.form_error(), None);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut h = harness(Some(vec![server("a", true)]), None);
        h.form.edit(0);
        h.form.close();
        let once = h.form.form_state().clone();
        h.form.close();
        assert_eq!(h.form.form_state(), &once);
    }

    #[test]
    fn test_change_field_does_not_touch_aggregate() {
        let mut h = harness(Some(vec![server("a", true)]), None);
        h.form.edit(0);
        h.form.change_field(NAME, "renamed".into());

        assert_eq!(h.form.draft().name, "renamed");
        assert_eq!(h.doc().servers, Some(vec![server("a", true)]));
    }

    // ========== Save ==========

    #[tokio::test]
    async fn test_remote_create_appends_server_item() {
        let api = Arc::new(FakeApi::new(Capabilities::all()));
        let mut h = harness(Some(vec![server("a", true)]), Some(api.clone()));

        h.form.add();
        h.form.change_field(NAME, "b".into());
        let outcome = h.form.save().await.unwrap();

        assert_eq!(outcome, MutationOutcome::AppliedRemotely);
        let servers = h.doc().servers.unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0], server("a", true));
        assert_eq!(servers[1].name, "b");
        assert_eq!(servers[1].note, "from server");
        assert_eq!(api.calls(), vec!["create b"]);
        assert_eq!(h.store.persist_calls(), 0);
        assert!(!h.form.is_dialog_open());
        assert_eq!(h.notifier.notices(), vec![Notice::Success("Server added".into())]);
        assert_eq!(h.invalidations(), 1);
    }

    #[tokio::test]
    async fn test_remote_update_touches_only_edited_index() {
        let api = Arc::new(FakeApi::new(Capabilities::all()));
        let items = vec![server("a", true), server("b", true), server("c", true)];
        let mut h = harness(Some(items), Some(api.clone()));

        assert!(h.form.edit(1));
        h.form.change_field(NOTE, "edited".into());
        h.form.save().await.unwrap();

        let servers = h.doc().servers.unwrap();
        assert_eq!(servers[0], server("a", true));
        assert_eq!(servers[1].note, "from server");
        assert_eq!(servers[2], server("c", true));
        assert_eq!(api.calls(), vec!["update b"]);
        assert_eq!(h.form.editing_index(), None);
    }

    #[tokio::test]
    async fn test_invalid_draft_makes_no_calls() {
        let api = Arc::new(FakeApi::new(Capabilities::all()));
        let mut h = harness(Some(vec![server("a", true)]), Some(api.clone()));
        let before = h.doc();

        h.form.add();
        let err = h.form.save().await.unwrap_err();

        assert_eq!(err, CrudError::Validation("Name is required".into()));
        assert_eq!(h.form.form_error(), Some("Name is required"));
        assert!(h.form.is_dialog_open());
        assert!(api.calls().is_empty());
        assert_eq!(h.store.persist_calls(), 0);
        assert_eq!(h.doc(), before);
        assert_eq!(h.invalidations(), 0);
    }

    #[tokio::test]
    async fn test_failed_remote_create_keeps_dialog_open() {
        let api = Arc::new(FakeApi::failing(
            Capabilities::all(),
            RemoteError::Status {
                status: 409,
                message: "Server 'b' already exists".into(),
            },
        ));
        let mut h = harness(Some(vec![server("a", true)]), Some(api.clone()));
        let before = h.doc();

        h.form.add();
        h.form.change_field(NAME, "b".into());
        assert!(h.form.save().await.is_err());

        assert_eq!(h.doc(), before);
        assert_eq!(h.form.form_error(), Some("Server 'b' already exists"));
        assert!(h.form.is_dialog_open());
        assert_eq!(h.form.draft().name, "b");
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::Error("Failed to save server".into())]
        );
        assert_eq!(h.store.persist_calls(), 0);
        assert_eq!(h.invalidations(), 0);
    }

    #[tokio::test]
    async fn test_failed_remote_update_keeps_dialog_open() {
        let api = Arc::new(FakeApi::failing(
            Capabilities::all(),
            RemoteError::Status {
                status: 404,
                message: "Server 'b' not found".into(),
            },
        ));
        let items = vec![server("a", true), server("b", true)];
        let mut h = harness(Some(items.clone()), Some(api.clone()));

        assert!(h.form.edit(1));
        h.form.change_field(NOTE, "edited".into());
        assert!(h.form.save().await.is_err());

        assert_eq!(api.calls(), vec!["update b"]);
        assert_eq!(h.doc().servers, Some(items));
        assert!(h.form.is_dialog_open());
        assert_eq!(h.form.editing_index(), Some(1));
        assert_eq!(h.form.draft().note, "edited");
        assert_eq!(h.form.form_error(), Some("Server 'b' not found"));
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::Error("Failed to save server".into())]
        );
        assert_eq!(h.store.persist_calls(), 0);
        assert_eq!(h.invalidations(), 0);
    }

    #[tokio::test]
    async fn test_delete_during_edit_resets_editing_index() {
        let items = vec![server("a", true), server("b", true), server("c", true)];
        let mut h = harness(Some(items), None);

        assert!(h.form.edit(1));
        h.form.change_field(NOTE, "edited b".into());
        h.form.delete(0).await.unwrap();

        assert!(!h.form.is_dialog_open());
        assert_eq!(h.form.editing_index(), None);
        assert_eq!(h.form.draft(), &Server::default());

        // Nothing left to save: the reset draft fails validation.
        assert!(h.form.save().await.is_err());
        assert_eq!(
            h.doc().servers,
            Some(vec![server("b", true), server("c", true)])
        );
        assert_eq!(h.store.persist_calls(), 1);
    }

    #[tokio::test]
    async fn test_save_targets_the_item_opened_for_edit() {
        let api = Arc::new(FakeApi::new(Capabilities::all()));
        let items = vec![server("a", true), server("b", true), server("c", true)];
        let mut h = harness(Some(items), Some(api.clone()));

        assert!(h.form.edit(1));
        h.form.change_field(NOTE, "edited b".into());
        // Another writer drops "a" while the dialog is open.
        h.store.apply_local(Box::new(|prev: &Doc| Doc {
            servers: Some(vec![server("b", true), server("c", true)]),
            ..prev.clone()
        }));
        h.form.save().await.unwrap();

        assert_eq!(api.calls(), vec!["update b"]);
        let servers = h.doc().servers.unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].name, "b");
        assert_eq!(servers[0].note, "from server");
        assert_eq!(servers[1], server("c", true));
    }

    #[tokio::test]
    async fn test_save_of_vanished_unnamed_item_is_reported() {
        let mut h = harness(Some(vec![server("", true)]), None);

        assert!(h.form.edit(0));
        h.form.change_field(NAME, "named".into());
        h.store.apply_local(Box::new(|prev: &Doc| Doc {
            servers: None,
            ..prev.clone()
        }));
        let err = h.form.save().await.unwrap_err();

        assert_eq!(err, CrudError::IndexOutOfRange { index: 0, len: 0 });
        assert!(h.form.is_dialog_open());
        assert_eq!(h.store.persist_calls(), 0);
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::Error("Failed to save server".into())]
        );
    }

    #[tokio::test]
    async fn test_fallback_save_passes_draft_through() {
        let mut h = harness(Some(vec![server("a", true)]), None);

        h.form.add();
        h.form.change_field(NAME, "b".into());
        h.form.change_field(NOTE, "local".into());
        let outcome = h.form.save().await.unwrap();

        assert_eq!(outcome, MutationOutcome::AppliedLocally);
        let servers = h.doc().servers.unwrap();
        assert_eq!(servers[1].note, "local");
        assert_eq!(h.store.persist_calls(), 1);
        assert_eq!(h.notifier.notices(), vec![Notice::Success("Server added".into())]);
        assert!(!h.form.is_dialog_open());
    }

    #[tokio::test]
    async fn test_fallback_save_failure_is_reported_once() {
        let mut h = harness(Some(vec![server("a", true)]), None);
        h.store.fail_next_persist(PersistError::Io("disk full".into()));

        h.form.edit(0);
        h.form.change_field(NOTE, "x".into());
        let err = h.form.save().await.unwrap_err();

        assert!(matches!(err, CrudError::Persist(_)));
        assert_eq!(h.doc().servers, Some(vec![server("a", true)]));
        assert_eq!(h.form.form_error(), Some("Failed to write settings: disk full"));
        assert!(h.form.is_dialog_open());
        assert_eq!(h.form.editing_index(), Some(0));
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::Error("Failed to save server".into())]
        );
        assert_eq!(h.invalidations(), 0);
    }

    #[tokio::test]
    async fn test_update_of_unnamed_item_falls_back() {
        let api = Arc::new(FakeApi::new(Capabilities::all()));
        let mut h = harness(Some(vec![server("", true)]), Some(api.clone()));

        h.form.edit(0);
        h.form.change_field(NAME, "named".into());
        let outcome = h.form.save().await.unwrap();

        assert_eq!(outcome, MutationOutcome::AppliedLocally);
        assert!(api.calls().is_empty());
        assert_eq!(h.doc().servers.unwrap()[0].name, "named");
    }

    #[tokio::test]
    async fn test_reject_policy_refuses_unnamed_item() {
        let api = Arc::new(FakeApi::new(Capabilities::all()));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = Arc::new(MemoryStore::with_notifier(
            Doc {
                servers: Some(vec![server("", true)]),
                ..Doc::default()
            },
            notifier.clone(),
        ));
        let options = CrudOptions::new("server", SERVERS, Server::default)
            .strategy(PersistenceStrategy::RemoteBacked(api.clone()))
            .identity_policy(IdentityPolicy::Reject);
        let mut form = CrudForm::new(options, store.clone(), notifier.clone(), EventBus::new());

        let err = form.toggle_enabled(0, false).await.unwrap_err();
        assert_eq!(err, CrudError::MissingIdentity("server".into()));
        assert!(api.calls().is_empty());
        assert_eq!(store.persist_calls(), 0);
        assert_eq!(
            notifier.notices(),
            vec![Notice::Error("Failed to update server state".into())]
        );
    }

    #[tokio::test]
    async fn test_create_with_update_only_api_uses_persist() {
        let api = Arc::new(FakeApi::new(
            Capabilities::none().with(MutationKind::Update),
        ));
        let mut h = harness(None, Some(api.clone()));

        h.form.add();
        h.form.change_field(NAME, "a".into());
        let outcome = h.form.save().await.unwrap();

        assert_eq!(outcome, MutationOutcome::AppliedLocally);
        assert!(api.calls().is_empty());
        assert_eq!(h.doc().servers, Some(vec![server("a", false)]));
    }

    // ========== Toggle ==========

    #[tokio::test]
    async fn test_fallback_toggle_merges_enabled() {
        let mut h = harness(Some(vec![server("a", true)]), None);

        let outcome = h.form.toggle_enabled(0, false).await.unwrap();

        assert_eq!(outcome, MutationOutcome::AppliedLocally);
        assert_eq!(h.doc().servers, Some(vec![server("a", false)]));
        assert_eq!(h.doc().theme, "dark");
        assert_eq!(h.store.persist_calls(), 1);
        assert_eq!(h.notifier.notices(), vec![Notice::Success("a disabled".into())]);
        assert_eq!(h.invalidations(), 1);
    }

    #[tokio::test]
    async fn test_fallback_toggle_of_unnamed_item_message() {
        let mut h = harness(Some(vec![server("", false)]), None);

        h.form.toggle_enabled(0, true).await.unwrap();

        assert_eq!(
            h.notifier.notices(),
            vec![Notice::Success("Server enabled".into())]
        );
    }

    #[tokio::test]
    async fn test_toggle_without_remote_toggle_uses_persist() {
        let api = Arc::new(FakeApi::new(
            Capabilities::none()
                .with(MutationKind::Create)
                .with(MutationKind::Update)
                .with(MutationKind::Delete),
        ));
        let mut h = harness(Some(vec![server("a", true), server("b", true)]), Some(api.clone()));

        let outcome = h.form.toggle_enabled(0, false).await.unwrap();

        assert_eq!(outcome, MutationOutcome::AppliedLocally);
        assert!(api.calls().is_empty());
        assert_eq!(h.store.persist_calls(), 1);
        assert_eq!(h.doc().servers, Some(vec![server("a", false), server("b", true)]));
        assert_eq!(h.notifier.notices(), vec![Notice::Success("a disabled".into())]);
        assert_eq!(h.invalidations(), 1);
    }

    #[tokio::test]
    async fn test_toggle_out_of_range_is_reported() {
        let mut h = harness(Some(vec![server("a", true)]), None);

        let err = h.form.toggle_enabled(1, false).await.unwrap_err();

        assert_eq!(err, CrudError::IndexOutOfRange { index: 1, len: 1 });
        assert_eq!(h.store.persist_calls(), 0);
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::Error("Failed to update server state".into())]
        );
    }

    #[tokio::test]
    async fn test_remote_toggle_uses_server_item() {
        let api = Arc::new(FakeApi::new(Capabilities::all()));
        let mut h = harness(Some(vec![server("a", true), server("b", true)]), Some(api.clone()));

        h.form.toggle_enabled(1, false).await.unwrap();

        let servers = h.doc().servers.unwrap();
        assert_eq!(servers[0], server("a", true));
        assert!(!servers[1].enabled);
        assert_eq!(servers[1].note, "from server");
        assert_eq!(api.calls(), vec!["toggle b false"]);
        assert_eq!(h.notifier.notices(), vec![Notice::Success("b disabled".into())]);
    }

    #[tokio::test]
    async fn test_failed_remote_toggle_leaves_item() {
        let api = Arc::new(FakeApi::failing(
            Capabilities::all(),
            RemoteError::Transport("connection refused".into()),
        ));
        let mut h = harness(Some(vec![server("a", true)]), Some(api));

        assert!(h.form.toggle_enabled(0, false).await.is_err());

        assert_eq!(h.doc().servers, Some(vec![server("a", true)]));
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::Error("Failed to update server state".into())]
        );
    }

    // ========== Delete ==========

    #[tokio::test]
    async fn test_fallback_delete_first_of_two() {
        let mut h = harness(Some(vec![server("a", true), server("b", true)]), None);

        h.form.delete(0).await.unwrap();

        assert_eq!(h.doc().servers, Some(vec![server("b", true)]));
        assert_eq!(h.notifier.notices(), vec![Notice::Success("Deleted a".into())]);
        assert_eq!(h.invalidations(), 1);
    }

    #[tokio::test]
    async fn test_delete_last_stores_none() {
        let mut h = harness(Some(vec![server("a", true)]), None);
        h.form.delete(0).await.unwrap();
        assert_eq!(h.doc().servers, None);

        let api = Arc::new(FakeApi::new(Capabilities::all()));
        let mut remote = harness(Some(vec![server("a", true)]), Some(api.clone()));
        let outcome = remote.form.delete(0).await.unwrap();
        assert_eq!(outcome, MutationOutcome::AppliedRemotely);
        assert_eq!(remote.doc().servers, None);
        assert_eq!(api.calls(), vec!["delete a"]);
        assert_eq!(remote.invalidations(), 1);
    }

    #[tokio::test]
    async fn test_fallback_delete_unnamed_item_message() {
        let mut h = harness(Some(vec![server("", true), server("b", true)]), None);
        h.form.delete(0).await.unwrap();
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::Success("Server deleted".into())]
        );
    }

    #[tokio::test]
    async fn test_failed_remote_delete_leaves_list() {
        let api = Arc::new(FakeApi::failing(
            Capabilities::all(),
            RemoteError::Status {
                status: 500,
                message: "boom".into(),
            },
        ));
        let mut h = harness(Some(vec![server("a", true)]), Some(api));

        let err = h.form.delete(0).await.unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert_eq!(h.doc().servers, Some(vec![server("a", true)]));
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::Error("Failed to delete server".into())]
        );
        assert_eq!(h.invalidations(), 0);
    }

    #[tokio::test]
    async fn test_delete_out_of_range() {
        let api = Arc::new(FakeApi::new(Capabilities::all()));
        let mut h = harness(Some(vec![server("a", true)]), Some(api.clone()));

        let err = h.form.delete(3).await.unwrap_err();

        assert_eq!(err, CrudError::IndexOutOfRange { index: 3, len: 1 });
        assert!(api.calls().is_empty());
        assert_eq!(h.store.persist_calls(), 0);
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::Error("Failed to delete server".into())]
        );
    }

    #[tokio::test]
    async fn test_stale_index_is_refused() {
        let api = Arc::new(FakeApi::new(Capabilities::all()));
        let mut h = harness(
            Some(vec![server("a", true), server("b", true), server("c", true)]),
            Some(api),
        );

        // Another writer drops "a" after the index was resolved.
        let stale = h.form.position_of("c").unwrap();
        h.store.apply_local(Box::new(|prev: &Doc| Doc {
            servers: Some(vec![server("b", true), server("c", true)]),
            ..prev.clone()
        }));
        let err = h.form.delete(stale).await.unwrap_err();
        assert!(matches!(err, CrudError::IndexOutOfRange { .. }));

        let fresh = h.form.position_of("c").unwrap();
        h.form.delete(fresh).await.unwrap();
        assert_eq!(h.doc().servers, Some(vec![server("b", true)]));
    }
}
