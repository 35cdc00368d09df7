//! Saved war state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::PersistError;
use crate::model::{Coord, TownId};
use crate::war::SavedContest;

/// Everything needed to resume a war after restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedWar {
    /// Occupied cells keyed by the occupying town
    #[serde(default)]
    pub occupied: BTreeMap<TownId, Vec<Coord>>,
    /// Running contests
    #[serde(default)]
    pub attacks: Vec<SavedContest>,
}

impl SavedWar {
    /// Whether nothing is saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupied.values().all(Vec::is_empty) && self.attacks.is_empty()
    }
}

/// Storage backend for [`SavedWar`] snapshots.
#[async_trait::async_trait]
pub trait WarPersistence: Send + Sync {
    /// Loads the last saved state. A missing store yields an empty war.
    ///
    /// # Errors
    ///
    /// Returns an error when the store exists but cannot be read or parsed.
    async fn load_all(&self) -> Result<SavedWar, PersistError>;

    /// Stores a snapshot. `force_sync` asks for durable storage before
    /// returning.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot could not be written.
    async fn save(&self, snapshot: &SavedWar, force_sync: bool) -> Result<(), PersistError>;
}

/// Persistence that forgets everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersistence;

#[async_trait::async_trait]
impl WarPersistence for NoPersistence {
    async fn load_all(&self) -> Result<SavedWar, PersistError> {
        Ok(SavedWar::default())
    }

    async fn save(&self, _snapshot: &SavedWar, _force_sync: bool) -> Result<(), PersistError> {
        Ok(())
    }
}

/// Stores the war as one JSON document.
///
/// Each write goes to its own sibling temporary file which is then renamed
/// over the target, so readers never see a half-written document and
/// concurrent writers never share a temporary file.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }
}

#[async_trait::async_trait]
impl WarPersistence for JsonFilePersistence {
    async fn load_all(&self) -> Result<SavedWar, PersistError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no saved war state");
                return Ok(SavedWar::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, snapshot: &SavedWar, force_sync: bool) -> Result<(), PersistError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        let temp = self.temp_path();

        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(&json).await?;
        if force_sync {
            file.sync_all().await?;
        } else {
            file.flush().await?;
        }
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        debug!(
            path = %self.path.display(),
            bytes = json.len(),
            force_sync,
            "war state saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockPos, ResidentId};

    fn sample() -> SavedWar {
        let mut occupied = BTreeMap::new();
        occupied.insert(TownId(1), vec![Coord::new(0, 0), Coord::new(0, 1)]);
        SavedWar {
            occupied,
            attacks: vec![SavedContest {
                attacker: ResidentId::random(),
                coord: Coord::new(3, 3),
                flag: BlockPos::new("world", 48, 70, 48),
                progress: 400,
            }],
        }
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::new(dir.path().join("war.json"));
        let loaded = store.load_all().await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::new(dir.path().join("war.json"));
        let saved = sample();

        store.save(&saved, true).await.unwrap();
        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(files, vec![std::ffi::OsString::from("war.json")]);

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn document_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::new(dir.path().join("war.json"));
        store.save(&sample(), false).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["occupied"]["1"].is_array());
        assert_eq!(value["attacks"][0]["p"], 400);
        assert_eq!(value["attacks"][0]["c"]["x"], 3);
    }

    #[tokio::test]
    async fn overlapping_saves_use_separate_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::new(dir.path().join("war.json"));
        assert_ne!(store.temp_path(), store.temp_path());

        let first = sample();
        let second = SavedWar::default();
        let (a, b) = tokio::join!(store.save(&first, false), store.save(&second, true));
        a.unwrap();
        b.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert!(loaded == first || loaded == second);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("war.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFilePersistence::new(path);
        assert!(matches!(store.load_all().await, Err(PersistError::Json(_))));
    }
}
