//! Infrastructure layer: persistence, the backend HTTP API, and realtime wiring.

pub mod api;
pub mod event_bus;
pub mod storage;
pub mod store;
pub mod workers;

pub use api::{AccessTokenSource, CitationApi, FetchError, HttpCitationApi, SessionToken};
pub use storage::{FileStateStorage, InMemoryStateStorage, StateStorage, StorageError};
pub use store::CitationStore;
pub use workers::{ListenerError, ListenerHandle, RealtimeListener};
