use std::ops::RangeInclusive;

use thiserror::Error;

/// Errors surfaced by the event ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The event was rejected before any mutation. Host validation proper
    /// happens upstream; the ledger only refuses obviously unusable values
    /// such as empty hosts.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// A storage backend failure.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Selector that tags relevant events one by one.
/// Can carry some immutable state.
pub trait RelevantEventSelector {
    type Event;

    fn is_relevant_event(&self, event: &Self::Event) -> bool;
}

/// Interface to store impressions and retrieve them by epoch window.
///
/// Implementations must make `add_event` idempotent on the event identity
/// (duplicates are dropped silently) and must yield query results in
/// ascending timestamp order, deterministically, so that repeated scans of
/// an unchanged store see the same sequence.
pub trait EventStorage {
    type Event: Clone;
    type Error;

    /// Stores a new event. Re-adding an already stored event is a no-op.
    fn add_event(&mut self, event: Self::Event) -> Result<(), Self::Error>;

    /// Retrieves all events whose epoch falls in `epochs`, ordered by
    /// ascending timestamp. The iterator is produced lazily per epoch;
    /// calling again restarts the scan from the beginning.
    fn events_in_range(
        &mut self,
        epochs: RangeInclusive<u64>,
    ) -> Result<impl Iterator<Item = Self::Event> + '_, Self::Error>;

    /// Drops every stored event. Idempotent.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Snapshot of the events in `epochs` that `selector` tags as relevant,
    /// in the order of `events_in_range`.
    fn relevant_events<S>(
        &mut self,
        epochs: RangeInclusive<u64>,
        selector: &S,
    ) -> Result<Vec<Self::Event>, Self::Error>
    where
        S: RelevantEventSelector<Event = Self::Event>,
    {
        let events = self
            .events_in_range(epochs)?
            .filter(|event| selector.is_relevant_event(event))
            .collect();
        Ok(events)
    }
}
