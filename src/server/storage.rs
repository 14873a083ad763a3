//! Per-user settings documents on disk.
//!
//! ```text
//! <DATA_DIR>/
//!   <user_id>/
//!     settings.json
//! ```

use crudsync_core::Settings;
use std::fs;
use std::io;
use std::path::PathBuf;

const SETTINGS_FILE: &str = "settings.json";

/// Errors that can occur during settings storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// The stored document is not valid settings JSON.
    ParseError(PathBuf, serde_json::Error),
    /// Invalid user ID (e.g., contains path separators).
    InvalidUserId(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            StorageError::ParseError(path, e) => {
                write!(f, "Failed to parse settings {}: {}", path.display(), e)
            }
            StorageError::InvalidUserId(id) => write!(f, "Invalid user ID: {}", id),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(_, e) => Some(e),
            StorageError::ParseError(_, e) => Some(e),
            StorageError::InvalidUserId(_) => None,
        }
    }
}

/// Settings documents, one per user, under the data directory.
#[derive(Debug, Clone)]
pub struct SettingsStorage {
    data_dir: PathBuf,
}

impl SettingsStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Validates a user ID to prevent path traversal.
    fn validate_user_id(user_id: &str) -> Result<(), StorageError> {
        if user_id.is_empty()
            || user_id.contains('/')
            || user_id.contains('\\')
            || user_id.contains("..")
            || user_id.starts_with('.')
        {
            return Err(StorageError::InvalidUserId(user_id.to_string()));
        }
        Ok(())
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(user_id)
    }

    fn settings_path(&self, user_id: &str) -> PathBuf {
        self.user_dir(user_id).join(SETTINGS_FILE)
    }

    /// Loads a user's settings.
    ///
    /// Returns `Ok(None)` if the user has no document yet.
    pub fn load(&self, user_id: &str) -> Result<Option<Settings>, StorageError> {
        Self::validate_user_id(user_id)?;

        let path = self.settings_path(user_id);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::ParseError(path, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }

    /// Saves a user's settings, creating the user directory if needed.
    pub fn save(&self, user_id: &str, settings: &Settings) -> Result<(), StorageError> {
        Self::validate_user_id(user_id)?;

        let user_dir = self.user_dir(user_id);
        let path = self.settings_path(user_id);

        fs::create_dir_all(&user_dir).map_err(|e| StorageError::IoError(user_dir.clone(), e))?;

        let bytes = serde_json::to_vec_pretty(settings)
            .map_err(|e| StorageError::ParseError(path.clone(), e))?;

        // Write atomically using temp file + rename
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, bytes).map_err(|e| StorageError::IoError(temp_path.clone(), e))?;
        fs::rename(&temp_path, &path).map_err(|e| StorageError::IoError(path, e))?;

        Ok(())
    }
}
