//! The citation job-status store.
//!
//! One instance per session, shared by reference (`Arc<CitationStore>`)
//! between views, the realtime listener and the session façade. Every write
//! goes through [`CitationStore::dispatch`]: the event is applied with the
//! reducer, and when the state actually changed it is written through to
//! storage and a snapshot is broadcast to watchers.

use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use meritpath_citation::{CitationAnalysisState, CitationEvent, JobStatus};
use meritpath_core::{Reducer, UserId};
use meritpath_events::{Event, EventBus, InMemoryEventBus, Subscription};

use crate::api::{CitationApi, FetchError};
use crate::storage::{InMemoryStateStorage, StateStorage};

#[derive(Debug)]
pub struct CitationStore {
    state: RwLock<CitationAnalysisState>,
    storage: Arc<dyn StateStorage>,
    changes: InMemoryEventBus<CitationAnalysisState>,
}

impl CitationStore {
    /// Open a store backed by `storage`, rehydrating whatever it holds.
    ///
    /// Unreadable or mismatched stored state is logged and replaced by the
    /// defaults; it is overwritten on the next change.
    pub fn open(storage: Arc<dyn StateStorage>) -> Self {
        let state = load_or_default(storage.as_ref());
        Self {
            state: RwLock::new(state),
            storage,
            changes: InMemoryEventBus::new(),
        }
    }

    /// Isolated store with nothing persisted, mostly for tests.
    pub fn in_memory() -> Self {
        Self::open(Arc::new(InMemoryStateStorage::new()))
    }

    pub fn snapshot(&self) -> CitationAnalysisState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self) -> JobStatus {
        self.snapshot().status
    }

    pub fn is_eligible(&self) -> bool {
        self.snapshot().is_eligible
    }

    /// Apply `event`; returns whether the state changed.
    pub fn dispatch(&self, event: &CitationEvent) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let before = *state;
        state.apply(event);
        let after = *state;

        if before == after {
            return false;
        }

        if let Err(err) = self.storage.save(&after) {
            warn!(error = %err, "failed to persist citation state");
        }

        info!(
            event = event.event_type(),
            from = %before.status,
            to = %after.status,
            eligible = after.is_eligible,
            "citation state changed"
        );

        // Published under the write lock so watchers see snapshots in apply order.
        if let Err(err) = self.changes.publish(after) {
            warn!(error = %err, "failed to broadcast citation state");
        }

        true
    }

    pub fn set_status(&self, status: JobStatus) -> bool {
        self.dispatch(&CitationEvent::StatusSet { status })
    }

    pub fn set_eligible(&self, eligible: bool) -> bool {
        self.dispatch(&CitationEvent::EligibilitySet { eligible })
    }

    /// Back to `{ NotStarted, not eligible }`.
    pub fn reset(&self) -> bool {
        self.dispatch(&CitationEvent::Reset)
    }

    /// Receive a snapshot after every change applied from now on.
    pub fn watch(&self) -> Subscription<CitationAnalysisState> {
        self.changes.subscribe()
    }

    /// Re-read storage, e.g. after another process wrote to it.
    ///
    /// Watchers are notified when the reloaded state differs.
    pub fn reload(&self) -> CitationAnalysisState {
        let loaded = load_or_default(self.storage.as_ref());
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if *state != loaded {
            *state = loaded;
            if let Err(err) = self.changes.publish(loaded) {
                warn!(error = %err, "failed to broadcast citation state");
            }
        }
        loaded
    }

    /// Ask the backend whether the user's citer job is done.
    ///
    /// A truthy answer moves the status to `Done`; a falsy one changes
    /// nothing. On failure the state is left untouched and the error is
    /// returned so the caller can show "status unknown".
    pub async fn check_remote_status<A>(&self, api: &A, user_id: UserId) -> Result<bool, FetchError>
    where
        A: CitationApi + ?Sized,
    {
        match api.job_done(user_id).await {
            Ok(job_done) => {
                self.dispatch(&CitationEvent::RemoteStatusChecked { job_done });
                Ok(job_done)
            }
            Err(err) => {
                warn!(%user_id, error = %err, "error checking citers status");
                Err(err)
            }
        }
    }
}

fn load_or_default(storage: &dyn StateStorage) -> CitationAnalysisState {
    match storage.load() {
        Ok(Some(state)) => state,
        Ok(None) => CitationAnalysisState::default(),
        Err(err) => {
            warn!(error = %err, "discarding unreadable citation state");
            CitationAnalysisState::default()
        }
    }
}
