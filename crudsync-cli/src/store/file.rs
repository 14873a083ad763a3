//! Settings kept in a local JSON document.
//!
//! Writes go through a temp file and a rename so a crash never leaves a
//! half-written document behind.

use async_trait::async_trait;
use crudsync_core::{Notifier, PersistError, PersistMessages, Settings, SettingsStore, Updater};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub struct FileSettingsStore {
    path: PathBuf,
    state: RwLock<Settings>,
    notifier: Arc<dyn Notifier>,
}

impl FileSettingsStore {
    /// Opens the document at `path`. A missing file reads as empty settings.
    pub fn open(path: impl Into<PathBuf>, notifier: Arc<dyn Notifier>) -> Result<Self, PersistError> {
        let path = path.into();
        let settings = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                PersistError::Encode(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file yet");
                Settings::default()
            }
            Err(e) => return Err(PersistError::Io(format!("{}: {}", path.display(), e))),
        };

        Ok(Self {
            path,
            state: RwLock::new(settings),
            notifier,
        })
    }

    fn write(&self, settings: &Settings) -> Result<(), PersistError> {
        let io_err = |path: &Path, e: io::Error| PersistError::Io(format!("{}: {}", path.display(), e));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| PersistError::Encode(e.to_string()))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(|e| io_err(&temp_path, e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| io_err(&self.path, e))?;
        Ok(())
    }

    fn replace(&self, next: Settings) {
        match self.state.write() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

#[async_trait]
impl SettingsStore<Settings> for FileSettingsStore {
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

        if let Err(e) = self.write(&next) {
            tracing::warn!(path = %self.path.display(), error = %e, "settings write failed");
            if let Some(message) = &messages.error {
                self.notifier.error(message);
            }
            return Err(e);
        }

        tracing::debug!(path = %self.path.display(), "settings written");
        self.replace(next);
        if let Some(message) = &messages.success {
            self.notifier.success(message);
        }
        Ok(())
    }
}
