//! Background workers.

pub mod realtime_listener;

pub use realtime_listener::{ListenerError, ListenerHandle, RealtimeListener, decode_change};
