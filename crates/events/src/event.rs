/// A domain-agnostic event.
///
/// Events are immutable facts. They carry a stable name so that logs and
/// persisted traces can refer to them without depending on Rust type names.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "citation.status.set").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32 {
        1
    }
}
