//! Time-indexed storage of pending events.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::event::ScheduledEvent;

/// Thread-safe map from fire second to the events due then.
///
/// A key exists only while its bucket is non-empty. Keys are kept sorted, so
/// range queries come back in ascending order without a separate sort.
#[derive(Debug, Default)]
pub struct EventStore {
    buckets: RwLock<BTreeMap<i64, Vec<ScheduledEvent>>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<i64, Vec<ScheduledEvent>>> {
        self.buckets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<i64, Vec<ScheduledEvent>>> {
        self.buckets.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `event` to the bucket for its fire second.
    pub fn add(&self, event: ScheduledEvent) {
        self.write().entry(event.fire_at()).or_default().push(event);
    }

    /// Remove and return the bucket for `timestamp` (empty if absent).
    pub fn take(&self, timestamp: i64) -> Vec<ScheduledEvent> {
        self.write().remove(&timestamp).unwrap_or_default()
    }

    /// All keys `<= timestamp`, ascending.
    pub fn timestamps_up_to(&self, timestamp: i64) -> Vec<i64> {
        self.read().range(..=timestamp).map(|(ts, _)| *ts).collect()
    }

    /// True if any key is strictly before `now`.
    pub fn has_past_events(&self, now: i64) -> bool {
        self.read()
            .first_key_value()
            .is_some_and(|(earliest, _)| *earliest < now)
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.read().len()
    }

    /// Number of stored events across all buckets.
    pub fn event_count(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drop every pending event, returning how many were discarded.
    pub fn clear(&self) -> usize {
        let drained = std::mem::take(&mut *self.write());
        drained.values().map(Vec::len).sum()
    }
}
