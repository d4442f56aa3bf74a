use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use meritpath_citation::{CitationEvent, JobStatusChanged};
use meritpath_core::UserId;
use meritpath_events::{ChangeFeed, ChangeFilter, RowChange, Subscription};

use crate::store::CitationStore;

/// Table the backend writes job records to.
pub const JOBS_TABLE: &str = "jobs";

const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to subscribe to change feed: {0}")]
    Subscribe(String),
    #[error("failed to spawn listener thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Handle to a running listener.
///
/// Stopping (or dropping) the handle releases the feed subscription and joins
/// the thread, so a listener never outlives the view that started it.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Request shutdown and wait for the listener to stop.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    fn shutdown_and_join(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

/// Feeds job-record updates for one user into a [`CitationStore`].
#[derive(Debug)]
pub struct RealtimeListener;

impl RealtimeListener {
    /// `UPDATE` events on the jobs table, scoped to `user_id` by the backend.
    pub fn filter_for(user_id: UserId) -> ChangeFilter {
        ChangeFilter::updates(JOBS_TABLE).with_column_eq("user_id", user_id)
    }

    /// Subscribe to `feed` for `user_id` and apply matching updates to `store`
    /// on a background thread.
    pub fn spawn<F>(
        feed: &F,
        user_id: UserId,
        store: Arc<CitationStore>,
    ) -> Result<ListenerHandle, ListenerError>
    where
        F: ChangeFeed + ?Sized,
    {
        let filter = Self::filter_for(user_id);
        let sub = feed
            .subscribe(filter.clone())
            .map_err(|e| ListenerError::Subscribe(e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let join = thread::Builder::new()
            .name(format!("citation-listener-{user_id}"))
            .spawn(move || listen_loop(sub, shutdown_rx, &store))?;

        info!(%user_id, filter = %filter, "realtime listener started");

        Ok(ListenerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

/// Turn a row change into a store event.
///
/// Rows without a readable `job_type`/`status` are not ours to judge and
/// yield `None`.
pub fn decode_change(change: &RowChange) -> Option<CitationEvent> {
    match serde_json::from_value::<JobStatusChanged>(change.new.clone()) {
        Ok(update) => Some(CitationEvent::JobStatusChanged(update)),
        Err(err) => {
            debug!(table = %change.table, error = %err, "ignoring unrecognised job row");
            None
        }
    }
}

fn listen_loop(
    sub: Subscription<RowChange>,
    shutdown_rx: mpsc::Receiver<()>,
    store: &CitationStore,
) {
    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(TICK) {
            Ok(change) => {
                if let Some(event) = decode_change(&change) {
                    store.dispatch(&event);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("realtime change feed closed");
                break;
            }
        }
    }

    info!("realtime listener stopped");
}
