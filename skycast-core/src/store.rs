use async_trait::async_trait;
use chrono::Utc;
use directories::ProjectDirs;
use parking_lot::Mutex;
use std::{collections::HashMap, fmt::Debug, io, path::PathBuf, sync::Arc};
use thiserror::Error;

use crate::model::{HistoryEntry, HistoryLog, WeatherSnapshot};

/// Failure while reading or writing a persisted blob.
///
/// These never cross the component boundary: the coordinator logs and
/// swallows them, and reads degrade to "nothing cached".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read key '{key}': {source}")]
    Read { key: String, source: io::Error },

    #[error("failed to write key '{key}': {source}")]
    Write { key: String, source: io::Error },

    #[error("failed to encode key '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

/// Key-value backend holding serialized text blobs.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Backend persisting each key to a JSON file under one directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Store files under the platform data directory.
    pub fn open_default() -> anyhow::Result<Self> {
        let dirs = ProjectDirs::from("dev", "skycast", "skycast-cli")
            .ok_or_else(|| anyhow::anyhow!("Could not determine platform data directory"))?;

        Ok(Self::new(dirs.data_local_dir().to_path_buf()))
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl StoreBackend for DiskStore {
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.key_path(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Read {
                key: key.to_string(),
                source: err,
            }),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let to_write_err = |err: io::Error| StoreError::Write {
            key: key.to_string(),
            source: err,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(to_write_err)?;
        tokio::fs::write(self.key_path(key), value).await.map_err(to_write_err)
    }
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Logical key names for the two persisted regions. Injectable so tests and
/// embedders can namespace them.
#[derive(Debug, Clone)]
pub struct StoreKeys {
    pub last_snapshot: String,
    pub history: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self {
            last_snapshot: "lastWeatherData".to_string(),
            history: "weatherHistory".to_string(),
        }
    }
}

/// Persistence for the latest snapshot and the bounded search history.
///
/// The two keys are independent; nothing here needs cross-key atomicity.
#[derive(Debug, Clone)]
pub struct WeatherStore {
    backend: Arc<dyn StoreBackend>,
    keys: StoreKeys,
}

impl WeatherStore {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self::with_keys(backend, StoreKeys::default())
    }

    pub fn with_keys(backend: Arc<dyn StoreBackend>, keys: StoreKeys) -> Self {
        Self { backend, keys }
    }

    /// Overwrite the cached snapshot unconditionally.
    pub async fn save_snapshot(&self, snapshot: &WeatherSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot).map_err(|err| StoreError::Encode {
            key: self.keys.last_snapshot.clone(),
            source: err,
        })?;

        self.backend.write(&self.keys.last_snapshot, &json).await
    }

    /// The cached snapshot, or `None` when unset or unreadable. Read and
    /// parse failures degrade to `None` and are only logged.
    pub async fn load_snapshot(&self) -> Option<WeatherSnapshot> {
        let raw = match self.backend.read(&self.keys.last_snapshot).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read cached snapshot");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable cached snapshot");
                None
            }
        }
    }

    /// Record a successful lookup: prepend a timestamped entry to the log,
    /// keeping only the newest [`HistoryLog::CAPACITY`] entries.
    pub async fn append_history(&self, snapshot: &WeatherSnapshot) -> Result<(), StoreError> {
        let mut log = self.load_history().await;
        log.prepend(HistoryEntry {
            snapshot: snapshot.clone(),
            timestamp: Utc::now().to_rfc3339(),
        });

        let json = serde_json::to_string(&log).map_err(|err| StoreError::Encode {
            key: self.keys.history.clone(),
            source: err,
        })?;

        self.backend.write(&self.keys.history, &json).await
    }

    /// The stored history, or an empty log on absence or failure.
    pub async fn load_history(&self) -> HistoryLog {
        let raw = match self.backend.read(&self.keys.history).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return HistoryLog::default(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read search history");
                return HistoryLog::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(log) => log,
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable search history");
                HistoryLog::default()
            }
        }
    }
}
