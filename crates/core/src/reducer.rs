//! Reducer contract for client-side state.

/// State that evolves only by applying events.
///
/// `apply` must be pure and deterministic: no IO, no clocks, no randomness.
/// Whoever owns the state (a store, a test) decides what to do with the result,
/// e.g. persist it or broadcast it.
///
/// Events may be delivered more than once (the realtime feed is at-least-once),
/// so implementations must be idempotent for every event that can arrive from
/// the outside.
pub trait Reducer {
    type Event: Clone + core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    fn apply(&mut self, event: &Self::Event);
}

/// Apply `events` in order to `state`.
///
/// Returns the number of events applied.
pub fn replay<'a, R>(state: &mut R, events: impl IntoIterator<Item = &'a R::Event>) -> usize
where
    R: Reducer,
    R::Event: 'a,
{
    let mut applied = 0;
    for event in events {
        state.apply(event);
        applied += 1;
    }
    applied
}
