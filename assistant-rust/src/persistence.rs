use crate::{settings::AssistantSettings, store::StoreConfiguration, AssistantError};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use tempfile::NamedTempFile;

/// A single named slot holding the whole store configuration.
///
/// Both operations are best-effort: failures are logged, `save` always
/// returns and `load` answers `None`.
pub trait ConfigStore: Send + Sync {
    fn save(&self, config: &StoreConfiguration);
    fn load(&self) -> Option<StoreConfiguration>;
}

/// Stores the configuration as `<dir>/<key>.json`. Each write goes to its own
/// temporary file in `<dir>` that is renamed over the slot, so readers never
/// see a partial value and concurrent writers never share a temp file.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    dir: PathBuf,
    key: String,
}

impl FileConfigStore {
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            key: key.into(),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &AssistantSettings) -> Self {
        Self::new(settings.store_dir.clone(), settings.store_key.clone())
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    pub fn try_save(&self, config: &StoreConfiguration) -> Result<(), AssistantError> {
        let data = serde_json::to_vec_pretty(config)
            .map_err(|error| AssistantError::Persistence(format!("serialize: {error}")))?;

        fs::create_dir_all(&self.dir).map_err(|error| io_error(&self.dir, &error))?;

        // A dropped temp file deletes itself, including when persist fails.
        let mut file =
            NamedTempFile::new_in(&self.dir).map_err(|error| io_error(&self.dir, &error))?;
        file.write_all(&data).map_err(|error| io_error(file.path(), &error))?;

        let path = self.path();
        file.persist(&path).map_err(|error| io_error(&path, &error.error))?;

        Ok(())
    }

    /// `Ok(None)` when nothing has been saved yet.
    pub fn try_load(&self) -> Result<Option<StoreConfiguration>, AssistantError> {
        let path = self.path();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(io_error(&path, &error)),
        };

        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|error| AssistantError::Persistence(format!("{}: {error}", path.display())))
    }
}

impl ConfigStore for FileConfigStore {
    fn save(&self, config: &StoreConfiguration) {
        match self.try_save(config) {
            Ok(()) => tracing::info!(
                path = %self.path().display(),
                products = config.products.len(),
                "saved store configuration"
            ),
            Err(error) => tracing::error!(error = %error, "failed to save store configuration"),
        }
    }

    fn load(&self) -> Option<StoreConfiguration> {
        match self.try_load() {
            Ok(config) => config,
            Err(error) => {
                tracing::error!(error = %error, "failed to load store configuration");
                None
            }
        }
    }
}

fn io_error(path: &Path, error: &io::Error) -> AssistantError {
    AssistantError::Persistence(format!("{}: {error}", path.display()))
}

/// Keeps the serialized configuration in memory.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    slot: Mutex<Option<String>>,
}

impl MemoryConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with raw slot contents, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn save(&self, config: &StoreConfiguration) {
        match serde_json::to_string(config) {
            Ok(raw) => {
                *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw);
            }
            Err(error) => tracing::error!(error = %error, "failed to save store configuration"),
        }
    }

    fn load(&self) -> Option<StoreConfiguration> {
        let raw = self.raw()?;
        match serde_json::from_str(&raw) {
            Ok(config) => Some(config),
            Err(error) => {
                tracing::error!(error = %error, "failed to load store configuration");
                None
            }
        }
    }
}
