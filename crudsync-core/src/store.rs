//! The settings aggregate as seen by a form engine.
//!
//! The engine does not own the aggregate. It reads snapshots and hands
//! updaters to a [`SettingsStore`], which decides how changes are kept.

use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use crate::error::PersistError;
use crate::notify::{Notifier, TracingNotifier};

/// Builds the next aggregate from the previous one without modifying it.
pub type Updater<S> = Box<dyn FnOnce(&S) -> S + Send>;

/// Messages the store reports once a persist settles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistMessages {
    pub success: Option<String>,
    pub error: Option<String>,
}

impl PersistMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(mut self, message: impl Into<String>) -> Self {
        self.success = Some(message.into());
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

/// Owner of the settings aggregate.
#[async_trait]
pub trait SettingsStore<S: Send + Sync>: Send + Sync {
    /// The current local aggregate.
    fn snapshot(&self) -> S;

    /// Replaces the local aggregate without persisting it. Used after a
    /// dedicated remote call already made the change durable.
    fn apply_local(&self, updater: Updater<S>);

    /// Applies `updater` and persists the whole aggregate.
    ///
    /// On success the local aggregate holds the new value and
    /// `messages.success` has been reported; on failure the local aggregate
    /// is unchanged and `messages.error` has been reported.
    async fn patch_and_persist(
        &self,
        updater: Updater<S>,
        messages: PersistMessages,
    ) -> Result<(), PersistError>;
}

/// A store that keeps the aggregate in memory only.
///
/// `fail_next_persist` makes the following persist fail, which is how
/// callers exercise the error path.
pub struct MemoryStore<S> {
    state: RwLock<S>,
    notifier: Arc<dyn Notifier>,
    pending_failure: Mutex<Option<PersistError>>,
    persist_calls: Mutex<usize>,
}

impl<S: Clone + Send + Sync> MemoryStore<S> {
    pub fn new(initial: S) -> Self {
        Self::with_notifier(initial, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(initial: S, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: RwLock::new(initial),
            notifier,
            pending_failure: Mutex::new(None),
            persist_calls: Mutex::new(0),
        }
    }

    pub fn fail_next_persist(&self, error: PersistError) {
        if let Ok(mut pending) = self.pending_failure.lock() {
            *pending = Some(error);
        }
    }

    /// Number of `patch_and_persist` calls so far, failed ones included.
    pub fn persist_calls(&self) -> usize {
        self.persist_calls.lock().map(|n| *n).unwrap_or(0)
    }

    fn replace(&self, next: S) {
        match self.state.write() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

#[async_trait]
impl<S: Clone + Send + Sync> SettingsStore<S> for MemoryStore<S> {
    fn snapshot(&self) -> S {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn apply_local(&self, updater: Updater<S>) {
        let next = updater(&self.snapshot());
        self.replace(next);
    }

    async fn patch_and_persist(
        &self,
        updater: Updater<S>,
        messages: PersistMessages,
    ) -> Result<(), PersistError> {
        if let Ok(mut calls) = self.persist_calls.lock() {
            *calls += 1;
        }

        let failure = self.pending_failure.lock().ok().and_then(|mut p| p.take());
        if let Some(err) = failure {
            if let Some(message) = &messages.error {
                self.notifier.error(message);
            }
            return Err(err);
        }

        let next = updater(&self.snapshot());
        self.replace(next);
        if let Some(message) = &messages.success {
            self.notifier.success(message);
        }
        Ok(())
    }
}
