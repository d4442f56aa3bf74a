use std::sync::Mutex;

use meritpath_citation::CitationAnalysisState;

use super::{PersistedState, StateStorage, StorageError};

/// Storage slot kept in memory, for tests and ephemeral sessions.
///
/// The state is kept serialized so that it goes through the same encoding as
/// the durable backends.
#[derive(Debug, Default)]
pub struct InMemoryStateStorage {
    slot: Mutex<Option<String>>,
}

impl InMemoryStateStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the slot with a raw document (e.g. from an older client).
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    /// The stored document, if any.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl StateStorage for InMemoryStateStorage {
    fn load(&self) -> Result<Option<CitationAnalysisState>, StorageError> {
        let slot = self.slot.lock().map_err(|_| StorageError::Poisoned)?;
        slot.as_deref().map(PersistedState::decode).transpose()
    }

    fn save(&self, state: &CitationAnalysisState) -> Result<(), StorageError> {
        let encoded = PersistedState::encode(state)?;
        *self.slot.lock().map_err(|_| StorageError::Poisoned)? = Some(encoded);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock().map_err(|_| StorageError::Poisoned)? = None;
        Ok(())
    }
}
