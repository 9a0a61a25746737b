use std::{
    collections::{BTreeMap, HashSet},
    ops::RangeInclusive,
};

use log::debug;

use crate::events::{
    impression::ImpressionEvent,
    traits::{EventStorage, LedgerError},
};

/// In-memory event ledger, keyed by epoch.
///
/// Epochs live in a BTreeMap so range scans come out in epoch order; within
/// an epoch, events are sorted at query time. Epoch order plus per-epoch
/// timestamp order gives ascending timestamps across the whole scan, since
/// epochs partition the time line.
#[derive(Debug, Default)]
pub struct BTreeMapEventStorage {
    epochs: BTreeMap<u64, Vec<ImpressionEvent>>,
    seen: HashSet<(String, u64)>,
}

impl BTreeMapEventStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events, across all epochs.
    pub fn len(&self) -> usize {
        self.epochs.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
}

impl EventStorage for BTreeMapEventStorage {
    type Event = ImpressionEvent;
    type Error = LedgerError;

    fn add_event(&mut self, event: ImpressionEvent) -> Result<(), LedgerError> {
        event.validate()?;

        let key = (event.source_host.clone(), event.index);
        if self.seen.contains(&key) {
            debug!(
                "Dropping duplicate impression (source={}, index={})",
                key.0, key.1
            );
            return Ok(());
        }

        debug!("Registering impression {event:?}");
        self.seen.insert(key);
        self.epochs.entry(event.epoch_number).or_default().push(event);
        Ok(())
    }

    fn events_in_range(
        &mut self,
        epochs: RangeInclusive<u64>,
    ) -> Result<impl Iterator<Item = ImpressionEvent> + '_, LedgerError> {
        let iter = self.epochs.range(epochs).flat_map(|(_, events)| {
            let mut events = events.clone();
            events.sort_by(|a, b| {
                (a.timestamp, a.index, &a.source_host)
                    .cmp(&(b.timestamp, b.index, &b.source_host))
            });
            events
        });
        Ok(iter)
    }

    fn clear(&mut self) -> Result<(), LedgerError> {
        self.epochs.clear();
        self.seen.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::impression::ImpressionKind;

    fn impression(
        source: &str,
        index: u64,
        timestamp: u64,
        epoch: u64,
    ) -> ImpressionEvent {
        ImpressionEvent {
            index,
            timestamp,
            epoch_number: epoch,
            kind: ImpressionKind::View,
            source_host: source.into(),
            target_host: "shoes.example".into(),
            ad_id: "ad1".into(),
        }
    }

    #[test]
    fn test_duplicate_index_is_noop() -> Result<(), anyhow::Error> {
        let mut storage = BTreeMapEventStorage::new();
        storage.add_event(impression("blog.example", 1, 100, 0))?;
        // Same (source, index), different payload: kept as first recorded.
        storage.add_event(impression("blog.example", 1, 999, 0))?;
        // Same index from another source is a distinct event.
        storage.add_event(impression("news.example", 1, 200, 0))?;

        let events: Vec<_> = storage.events_in_range(0..=0)?.collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp, 100);
        assert_eq!(events[1].source_host, "news.example");
        Ok(())
    }

    #[test]
    fn test_rejects_empty_hosts_without_mutation() {
        let mut storage = BTreeMapEventStorage::new();
        let mut event = impression("", 1, 100, 0);
        assert!(storage.add_event(event.clone()).is_err());

        event.source_host = "blog.example".into();
        event.target_host = String::new();
        assert!(storage.add_event(event).is_err());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_range_scan_orders_by_timestamp() -> Result<(), anyhow::Error> {
        let mut storage = BTreeMapEventStorage::new();
        storage.add_event(impression("blog.example", 3, 250, 1))?;
        storage.add_event(impression("blog.example", 1, 50, 0))?;
        storage.add_event(impression("news.example", 2, 210, 1))?;
        storage.add_event(impression("blog.example", 2, 90, 0))?;

        let timestamps: Vec<_> = storage
            .events_in_range(0..=1)?
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(timestamps, vec![50, 90, 210, 250]);

        // Restarting the scan yields the same sequence.
        let again: Vec<_> = storage
            .events_in_range(0..=1)?
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(again, timestamps);

        // Out-of-window epochs are excluded.
        let only_first: Vec<_> = storage
            .events_in_range(0..=0)?
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(only_first, vec![50, 90]);
        Ok(())
    }

    #[test]
    fn test_clear_is_idempotent() -> Result<(), anyhow::Error> {
        let mut storage = BTreeMapEventStorage::new();
        storage.add_event(impression("blog.example", 1, 100, 0))?;
        storage.clear()?;
        assert!(storage.is_empty());
        storage.clear()?;
        assert!(storage.is_empty());

        // A cleared index no longer suppresses re-recording.
        storage.add_event(impression("blog.example", 1, 100, 0))?;
        assert_eq!(storage.len(), 1);
        Ok(())
    }
}
