use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use meritpath_citation::CitationAnalysisState;

use super::{PersistedState, STORAGE_KEY, StateStorage, StorageError};

/// JSON file `<dir>/citation-storage.json`.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous state intact.
#[derive(Debug, Clone)]
pub struct FileStateStorage {
    path: PathBuf,
}

impl FileStateStorage {
    /// Storage inside `dir`. The directory is created on first save.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl StateStorage for FileStateStorage {
    fn load(&self) -> Result<Option<CitationAnalysisState>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        PersistedState::decode(&raw).map(Some)
    }

    fn save(&self, state: &CitationAnalysisState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = PersistedState::encode(state)?;
        let tmp = self.tmp_path();
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
