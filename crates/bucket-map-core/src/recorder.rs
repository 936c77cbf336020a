//! Observer that keeps a bounded history of map events.

use std::{
    collections::VecDeque,
    sync::{PoisonError, RwLock},
};

use crate::{MapEvent, MapObserver};

/// Default history size limit (events).
const HISTORY_EVENTS: usize = 1024;

/// Event recorder with bounded history.
///
/// Oldest events are dropped once the limit is reached.
pub struct RecordingObserver {
    history: RwLock<VecDeque<MapEvent>>,
    limit: usize,
}

impl Default for RecordingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingObserver {
    /// Create a recorder with the default limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(HISTORY_EVENTS)
    }

    /// Create a recorder keeping at most `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            history: RwLock::new(VecDeque::with_capacity(limit.min(32))),
            limit: limit.max(1),
        }
    }

    /// Get a snapshot of the history.
    #[must_use]
    pub fn history(&self) -> Vec<MapEvent> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Number of `Saved` events in the history.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| matches!(e, MapEvent::Saved { .. }))
            .count()
    }

    /// Drop all recorded events.
    pub fn clear(&self) {
        self.history
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl MapObserver for RecordingObserver {
    fn on_event(&self, event: &MapEvent) {
        let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
        while history.len() >= self.limit {
            history.pop_front();
        }
        history.push_back(event.clone());
    }
}
