//! Settings stores backing the form engine in the CLI.

mod file;
mod remote;

pub use file::FileSettingsStore;
pub use remote::RemoteSettingsStore;
