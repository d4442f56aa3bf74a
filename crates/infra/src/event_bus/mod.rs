//! Infrastructure-backed change feeds.
//!
//! The feed abstraction lives in `meritpath-events` as pure mechanics. This
//! module provides transports for it (e.g. Redis).

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisChangeFeed, RedisFeedError};
