//! Observability hook for remote map activity.

use std::time::Duration;

/// Remote activity reported by a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapEvent {
    /// Existing object fetched and decoded.
    Loaded { file_name: String, entries: usize },
    /// Object was absent and has been created.
    Created { file_name: String },
    /// Full map written to the object.
    Saved {
        file_name: String,
        bytes: usize,
        elapsed: Duration,
    },
    /// Save requested while autosave is off and no force was given.
    SaveSkipped { file_name: String },
    /// Backing object removed.
    RemoteDeleted { file_name: String },
}

impl MapEvent {
    /// Object key this event concerns.
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Loaded { file_name, .. }
            | Self::Created { file_name }
            | Self::Saved { file_name, .. }
            | Self::SaveSkipped { file_name }
            | Self::RemoteDeleted { file_name } => file_name,
        }
    }
}

/// Trait for receiving map events.
///
/// Implement this trait to feed map activity into metrics or audit logs.
/// Calls happen inline on the task performing the operation, so keep
/// them cheap.
pub trait MapObserver: Send + Sync {
    /// Called once per event, after the remote step it describes succeeded.
    fn on_event(&self, event: &MapEvent);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone)]
pub struct NoopObserver;

impl MapObserver for NoopObserver {
    fn on_event(&self, _event: &MapEvent) {}
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_file_name() {
        let event = MapEvent::Saved {
            file_name: "state.json".into(),
            bytes: 2,
            elapsed: Duration::from_millis(3),
        };
        assert_eq!(event.file_name(), "state.json");
    }

    #[test]
    fn test_noop_observer_as_trait_object() {
        let observer: Arc<dyn MapObserver> = Arc::new(NoopObserver);
        observer.on_event(&MapEvent::RemoteDeleted {
            file_name: "gone.json".into(),
        });
    }
}
