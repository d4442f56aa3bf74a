//! Redis pub/sub-backed change feed (optional).
//!
//! The realtime bridge publishes every job-row change as a JSON [`RowChange`]
//! on one channel; filtering per subscriber happens here. Pub/sub is not
//! durable: changes published while nobody listens are lost, which is why the
//! session also polls `job_done` once on load.

use std::sync::mpsc;
use std::thread;

use redis::Commands;
use thiserror::Error;
use tracing::{debug, warn};

use meritpath_events::{ChangeFeed, ChangeFilter, RowChange, Subscription};

/// Default channel the realtime bridge publishes job changes on.
pub const DEFAULT_CHANNEL: &str = "realtime:public:jobs";

#[derive(Debug, Error)]
pub enum RedisFeedError {
    #[error("redis error: {0}")]
    Redis(String),
    #[error("serialize error: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone)]
pub struct RedisChangeFeed {
    client: redis::Client,
    channel: String,
}

impl RedisChangeFeed {
    pub fn new(redis_url: impl AsRef<str>, channel: impl Into<String>) -> Result<Self, RedisFeedError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisFeedError::Redis(e.to_string()))?;
        Ok(Self {
            client,
            channel: channel.into(),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Publish a change, as the realtime bridge would.
    pub fn publish(&self, change: &RowChange) -> Result<(), RedisFeedError> {
        let payload =
            serde_json::to_string(change).map_err(|e| RedisFeedError::Serialize(e.to_string()))?;

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RedisFeedError::Redis(e.to_string()))?;

        let _: i64 = conn
            .publish(&self.channel, payload)
            .map_err(|e| RedisFeedError::Redis(e.to_string()))?;

        Ok(())
    }
}

/// Decode one pub/sub payload, keeping it only if `filter` matches.
pub fn decode_message(payload: &str, filter: &ChangeFilter) -> Option<RowChange> {
    let change: RowChange = match serde_json::from_str(payload) {
        Ok(c) => c,
        Err(err) => {
            debug!(error = %err, "ignoring malformed change payload");
            return None;
        }
    };
    filter.matches(&change).then_some(change)
}

impl ChangeFeed for RedisChangeFeed {
    type Error = RedisFeedError;

    /// The forwarding thread notices a released subscription on the next
    /// message it tries to deliver, and exits then.
    fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription<RowChange>, Self::Error> {
        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RedisFeedError::Redis(e.to_string()))?;

        let (tx, rx) = mpsc::channel();
        let channel = self.channel.clone();

        thread::spawn(move || {
            let mut pubsub = conn.as_pubsub();
            if let Err(err) = pubsub.subscribe(&channel) {
                warn!(channel = %channel, error = %err, "redis subscribe failed");
                return;
            }

            loop {
                let msg = match pubsub.get_message() {
                    Ok(m) => m,
                    Err(err) => {
                        warn!(channel = %channel, error = %err, "redis change feed disconnected");
                        return;
                    }
                };

                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                let Some(change) = decode_message(&payload, &filter) else {
                    continue;
                };

                if tx.send(change).is_err() {
                    return;
                }
            }
        });

        Ok(Subscription::new(rx))
    }
}
