//! Settings held by a crudsync server.

use async_trait::async_trait;
use crudsync_core::{
    Notifier, PersistError, PersistMessages, RemoteError, Settings, SettingsApi, SettingsStore,
    Updater,
};
use std::sync::{Arc, RwLock};

/// Local copy of the server's settings document.
///
/// Persists send the whole document with `PUT /settings` and adopt what the
/// server stored.
pub struct RemoteSettingsStore {
    api: SettingsApi,
    state: RwLock<Settings>,
    notifier: Arc<dyn Notifier>,
}

impl RemoteSettingsStore {
    /// Fetches the current document from the server.
    pub async fn connect(api: SettingsApi, notifier: Arc<dyn Notifier>) -> Result<Self, RemoteError> {
        let settings = api.get().await?;
        tracing::debug!(mcps = settings.mcps().len(), "settings loaded from server");
        Ok(Self {
            api,
            state: RwLock::new(settings),
            notifier,
        })
    }

    fn replace(&self, next: Settings) {
        match self.state.write() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

#[async_trait]
impl SettingsStore<Settings> for RemoteSettingsStore {
    fn snapshot(&self) -> Settings {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn apply_local(&self, updater: Updater<Settings>) {
        let next = updater(&self.snapshot());
        self.replace(next);
    }

    async fn patch_and_persist(
        &self,
        updater: Updater<Settings>,
        messages: PersistMessages,
    ) -> Result<(), PersistError> {
        let mut next = updater(&self.snapshot());
        next.touch();

        match self.api.put(&next).await {
            Ok(stored) => {
                self.replace(stored);
                if let Some(message) = &messages.success {
                    self.notifier.success(message);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "settings upload failed");
                if let Some(message) = &messages.error {
                    self.notifier.error(message);
                }
                Err(e.into())
            }
        }
    }
}
