//! Identity store
//!
//! Persistent key-value storage for the per-installation user identifier and
//! the cached username/email. The session model only ever touches this
//! narrow get/set interface; GUI hosts with their own preference system
//! implement [`IdentityStore`] over it, everyone else can use [`FileStore`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::xdg_config_home;
use crate::error::{Error, Result};

/// Narrow interface over the host's persistent preference storage.
///
/// Writes are best-effort: reporting calls never fail by contract, so `set`
/// does not return an error. Implementations log failed writes.
pub trait IdentityStore: Send + Sync {
    /// Returns the stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`.
    fn set(&self, key: &str, value: &str);
}

/// Identity store backed by a TOML file under the XDG config directory.
///
/// Values live in `$XDG_CONFIG_HOME/<app_id>/telemetry.toml` as a flat
/// string map. The whole map is rewritten on every `set`; the store holds a
/// handful of short identity strings, nothing more.
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store for an application, creating its config directory.
    pub fn open(app_id: &str) -> Result<Self> {
        let dir = xdg_config_home().join(app_id);
        std::fs::create_dir_all(&dir)?;
        Self::open_path(dir.join("telemetry.toml"))
    }

    /// Open a store at an explicit file path.
    pub fn open_path(path: PathBuf) -> Result<Self> {
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)
                .map_err(|e| Error::Store(format!("failed to parse {:?}: {}", path, e)))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn flush(&self, values: &HashMap<String, String>) {
        let content = match toml::to_string(values) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize identity store");
                return;
            }
        };

        if let Err(e) = std::fs::write(&self.path, content) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write identity store");
        }
    }
}

impl IdentityStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        self.flush(&values);
    }
}

/// In-memory identity store for tests and hosts without persistence.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
    }
}
