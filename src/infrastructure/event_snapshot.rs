use crate::domain::models::{Event, Interval, event_order};
use crate::infrastructure::error::EngineError;
use std::collections::HashMap;
use std::sync::Mutex;

/// Caller-owned snapshot of events used for local conflict checks.
pub trait EventSnapshotRepository: Send + Sync {
    fn get_by_id(&self, event_id: &str) -> Result<Option<Event>, EngineError>;
    fn upsert(&self, event: &Event) -> Result<(), EngineError>;
    fn remove(&self, event_id: &str) -> Result<(), EngineError>;
    fn list_all(&self) -> Result<Vec<Event>, EngineError>;
    /// Events overlapping or touching `interval`, ordered by start then id.
    fn list_intersecting(&self, interval: &Interval) -> Result<Vec<Event>, EngineError>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventSnapshotRepository {
    events: Mutex<HashMap<String, Event>>,
}

impl InMemoryEventSnapshotRepository {
    pub fn from_events(events: &[Event]) -> Result<Self, EngineError> {
        let repository = Self::default();
        for event in events {
            repository.upsert(event)?;
        }
        Ok(repository)
    }

    fn normalized_id(event_id: &str) -> Option<String> {
        let normalized = event_id.trim();
        if normalized.is_empty() {
            return None;
        }
        Some(normalized.to_string())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Event>>, EngineError> {
        self.events
            .lock()
            .map_err(|error| EngineError::SnapshotUnavailable(format!("event snapshot lock poisoned: {error}")))
    }
}

impl EventSnapshotRepository for InMemoryEventSnapshotRepository {
    fn get_by_id(&self, event_id: &str) -> Result<Option<Event>, EngineError> {
        let Some(event_id) = Self::normalized_id(event_id) else {
            return Ok(None);
        };
        Ok(self.lock()?.get(&event_id).cloned())
    }

    fn upsert(&self, event: &Event) -> Result<(), EngineError> {
        let event_id = Self::normalized_id(&event.id).ok_or_else(|| {
            EngineError::InvalidEventRecord("event id is required for snapshot upsert".to_string())
        })?;
        event.validate()?;
        let mut stored = event.clone();
        stored.id = event_id.clone();
        self.lock()?.insert(event_id, stored);
        Ok(())
    }

    fn remove(&self, event_id: &str) -> Result<(), EngineError> {
        let Some(event_id) = Self::normalized_id(event_id) else {
            return Ok(());
        };
        self.lock()?.remove(&event_id);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Event>, EngineError> {
        let mut events: Vec<Event> = self.lock()?.values().cloned().collect();
        events.sort_by(event_order);
        Ok(events)
    }

    fn list_intersecting(&self, interval: &Interval) -> Result<Vec<Event>, EngineError> {
        let mut events: Vec<Event> = self
            .lock()?
            .values()
            .filter(|event| event.interval.touches_or_overlaps(interval))
            .cloned()
            .collect();
        events.sort_by(event_order);
        Ok(events)
    }
}
