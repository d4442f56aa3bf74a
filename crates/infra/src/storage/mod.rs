//! Durable storage for the citation-analysis state.
//!
//! The state lives under a single named entry, [`STORAGE_KEY`], as the JSON
//! document `{"state": {"status": .., "isEligible": ..}, "version": 0}`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use meritpath_citation::CitationAnalysisState;

mod file;
mod in_memory;

pub use file::FileStateStorage;
pub use in_memory::InMemoryStateStorage;

/// Name of the persisted entry.
pub const STORAGE_KEY: &str = "citation-storage";

/// Schema version written alongside the state.
pub const STATE_VERSION: u32 = 0;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored state is not valid: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("stored state has version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Envelope written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub state: CitationAnalysisState,
    pub version: u32,
}

impl PersistedState {
    pub fn current(state: CitationAnalysisState) -> Self {
        Self {
            state,
            version: STATE_VERSION,
        }
    }

    /// Decode a stored document, rejecting other schema versions.
    pub fn decode(raw: &str) -> Result<CitationAnalysisState, StorageError> {
        let persisted: PersistedState = serde_json::from_str(raw)?;
        if persisted.version != STATE_VERSION {
            return Err(StorageError::VersionMismatch {
                found: persisted.version,
                expected: STATE_VERSION,
            });
        }
        Ok(persisted.state)
    }

    pub fn encode(state: &CitationAnalysisState) -> Result<String, StorageError> {
        Ok(serde_json::to_string(&Self::current(*state))?)
    }
}

/// Durable key-value slot holding the citation state.
///
/// Implementations are synchronous: the store writes through on every change
/// and reads back only at open/reload time.
pub trait StateStorage: Send + Sync + core::fmt::Debug {
    /// Load the persisted state, `None` when nothing was stored yet.
    fn load(&self) -> Result<Option<CitationAnalysisState>, StorageError>;

    fn save(&self, state: &CitationAnalysisState) -> Result<(), StorageError>;

    /// Remove the entry entirely.
    fn clear(&self) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use meritpath_citation::JobStatus;

    #[test]
    fn encodes_named_envelope() {
        let raw = PersistedState::encode(&CitationAnalysisState {
            status: JobStatus::Done,
            is_eligible: true,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "state": { "status": "done", "isEligible": true }, "version": 0 })
        );
    }

    #[test]
    fn rejects_other_versions() {
        let raw = r#"{"state":{"status":"done","isEligible":true},"version":3}"#;
        assert!(matches!(
            PersistedState::decode(raw),
            Err(StorageError::VersionMismatch { found: 3, expected: 0 })
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            PersistedState::decode("{not json"),
            Err(StorageError::Corrupt(_))
        ));
    }
}
