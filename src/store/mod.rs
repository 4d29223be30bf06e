//! Durable single-slot model store with an in-process cache

use crate::error::{LuminaError, Result};
use crate::training::FittedArtifact;
use parking_lot::{Mutex, RwLock};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// File name of the current artifact inside the models directory
pub const MODEL_FILE_NAME: &str = "current_model.bin";

/// Holds the latest fitted artifact on disk and in memory.
///
/// Readers get an `Arc` snapshot; a save replaces the file atomically and
/// then swaps the cached snapshot.
#[derive(Debug)]
pub struct ModelStore {
    dir: PathBuf,
    path: PathBuf,
    cache: RwLock<Option<Arc<FittedArtifact>>>,
    write_lock: Mutex<()>,
}

impl ModelStore {
    /// Open the store in `models_dir`, creating the directory and loading an existing artifact
    pub fn open(models_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let store = Self {
            path: dir.join(MODEL_FILE_NAME),
            dir,
            cache: RwLock::new(None),
            write_lock: Mutex::new(()),
        };

        match store.load_latest() {
            Ok(artifact) => info!(
                path = %store.path.display(),
                target = %artifact.target,
                score = artifact.score,
                "Loaded saved model"
            ),
            Err(LuminaError::NoModelAvailable) => {}
            Err(e) => warn!(path = %store.path.display(), error = %e, "Saved model could not be loaded"),
        }
        Ok(store)
    }

    /// Location of the durable slot
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist an artifact as the current model
    pub fn save(&self, artifact: FittedArtifact) -> Result<Arc<FittedArtifact>> {
        let _guard = self.write_lock.lock();

        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            bincode::serialize_into(&mut writer, &artifact)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| LuminaError::IoError(e.error))?;

        let artifact = Arc::new(artifact);
        *self.cache.write() = Some(Arc::clone(&artifact));

        info!(
            path = %self.path.display(),
            target = %artifact.target,
            score = artifact.score,
            "Saved model"
        );
        Ok(artifact)
    }

    /// The current artifact, from cache or disk
    pub fn load_latest(&self) -> Result<Arc<FittedArtifact>> {
        if let Some(artifact) = self.cache.read().as_ref() {
            return Ok(Arc::clone(artifact));
        }

        // Hold the write lock so a concurrent save cannot be overwritten by a stale read
        let _guard = self.write_lock.lock();
        if let Some(artifact) = self.cache.read().as_ref() {
            return Ok(Arc::clone(artifact));
        }

        let artifact = Arc::new(self.read_from_disk()?);
        *self.cache.write() = Some(Arc::clone(&artifact));
        Ok(artifact)
    }

    /// Whether a model is available without touching the disk
    pub fn is_cached(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Drop the in-memory snapshot; the next load reads the file
    pub fn invalidate_cache(&self) {
        *self.cache.write() = None;
    }

    fn read_from_disk(&self) -> Result<FittedArtifact> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(LuminaError::NoModelAvailable),
            Err(e) => return Err(LuminaError::ModelUnavailable(e.to_string())),
        };
        bincode::deserialize_from(BufReader::new(file)).map_err(|e| LuminaError::ModelUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::open(dir.path().join("models")).unwrap();
        assert!(!store.is_cached());
        assert!(matches!(store.load_latest(), Err(LuminaError::NoModelAvailable)));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MODEL_FILE_NAME), b"garbage").unwrap();

        let store = ModelStore::open(dir.path()).unwrap();
        let err = store.load_latest().unwrap_err();
        assert!(matches!(err, LuminaError::ModelUnavailable(_)));
        assert!(!err.is_client_error());
    }
}
