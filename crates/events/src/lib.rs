//! Events and realtime change-feed mechanics.
//!
//! - [`Event`]: facts applied to client state
//! - [`EventBus`] / [`Subscription`]: broadcast pub/sub, transport-agnostic
//! - [`RowChange`] / [`ChangeFilter`] / [`ChangeFeed`]: database row-change
//!   notifications as delivered by the realtime backend

pub mod bus;
pub mod change;
pub mod event;
pub mod feed;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use change::{ChangeFilter, ChangeKind, ColumnFilter, RowChange};
pub use event::Event;
pub use feed::{ChangeFeed, InMemoryChangeFeed};
pub use in_memory_bus::{BusError, InMemoryEventBus};
