//! Realtime change feeds.

use std::sync::{Mutex, mpsc};

use serde_json::Value as JsonValue;

use crate::bus::Subscription;
use crate::change::{ChangeFilter, RowChange};
use crate::in_memory_bus::BusError;

/// Source of row-change notifications, filtered per subscription.
///
/// The realtime backend applies the filter on its side; in-process
/// implementations apply it before fan-out. Either way a subscriber only sees
/// changes that match its [`ChangeFilter`]. Dropping the returned
/// [`Subscription`] releases it.
pub trait ChangeFeed: Send + Sync {
    type Error: core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription<RowChange>, Self::Error>;
}

impl<F> ChangeFeed for std::sync::Arc<F>
where
    F: ChangeFeed + ?Sized,
{
    type Error = F::Error;

    fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription<RowChange>, Self::Error> {
        (**self).subscribe(filter)
    }
}

/// In-process change feed for tests and local wiring.
#[derive(Debug, Default)]
pub struct InMemoryChangeFeed {
    subscribers: Mutex<Vec<(ChangeFilter, mpsc::Sender<RowChange>)>>,
}

impl InMemoryChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `change` to every live subscriber whose filter matches it.
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&self, change: RowChange<JsonValue>) -> Result<usize, BusError> {
        let mut subs = self.subscribers.lock().map_err(|_| BusError::Poisoned)?;

        let mut delivered = 0;
        subs.retain(|(filter, tx)| {
            if !filter.matches(&change) {
                // Keep it; a closed channel is noticed on the next matching publish.
                return true;
            }
            let alive = tx.send(change.clone()).is_ok();
            if alive {
                delivered += 1;
            }
            alive
        });

        Ok(delivered)
    }

    /// Subscribers registered at the last publish (released ones included
    /// until a matching publish prunes them).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|subs| subs.len()).unwrap_or(0)
    }
}

impl ChangeFeed for InMemoryChangeFeed {
    type Error = BusError;

    fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription<RowChange>, Self::Error> {
        let (tx, rx) = mpsc::channel();
        let mut subs = self.subscribers.lock().map_err(|_| BusError::Poisoned)?;
        tracing::debug!(%filter, "change feed subscription opened");
        subs.push((filter, tx));
        Ok(Subscription::new(rx))
    }
}
