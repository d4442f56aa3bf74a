//! In-process pub/sub bus.

use std::sync::{Mutex, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("event bus lock poisoned")]
    Poisoned,
}

/// In-process broadcast of values such as state snapshots.
///
/// Every live subscriber gets each message in publish order.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribers registered at the last broadcast (released ones included
    /// until a broadcast prunes them).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|subs| subs.len()).unwrap_or(0)
    }
}

impl<M: Clone> InMemoryEventBus<M> {
    /// Send `message` to every live subscriber; returns how many received it.
    pub fn broadcast(&self, message: M) -> Result<usize, BusError> {
        let mut subs = self.subscribers.lock().map_err(|_| BusError::Poisoned)?;
        subs.retain(|tx| tx.send(message.clone()).is_ok());
        Ok(subs.len())
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = BusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        self.broadcast(message).map(|_| ())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        // The list only holds senders, so a poisoned lock is still usable.
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        Subscription::new(rx)
    }
}
