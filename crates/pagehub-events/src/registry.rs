//! Event registry — registrations stored per event name in priority order.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::registration::{EventRegistration, RegistrationInfo};
use crate::sorter::sort_by_priority;

/// Registry of listener registrations organized by event name.
///
/// The lock only guards the map. Readers get a snapshot of `Arc`s and
/// invoke listeners after the lock is released.
#[derive(Debug)]
pub struct EventRegistry {
    /// Event name → registrations sorted by priority.
    events: RwLock<HashMap<String, Vec<Arc<EventRegistration>>>>,
}

impl EventRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Appends a registration and re-sorts that event's sequence.
    pub async fn insert(&self, registration: EventRegistration) {
        let registration = Arc::new(registration);

        let mut events = self.events.write().await;
        let entries = events.entry(registration.event.clone()).or_default();
        entries.push(registration.clone());
        sort_by_priority(entries);

        info!(
            event = %registration.event,
            kind = %registration.kind,
            target = %registration.target.describe(),
            priority = registration.priority,
            registration_id = %registration.id,
            "Event listener registered"
        );
    }

    /// Returns a snapshot of the registrations for an event, in priority order.
    pub async fn listeners(&self, event: &str) -> Vec<Arc<EventRegistration>> {
        let events = self.events.read().await;
        events.get(event).cloned().unwrap_or_default()
    }

    /// Returns whether any registrations exist for an event.
    pub async fn has_listeners(&self, event: &str) -> bool {
        let events = self.events.read().await;
        events
            .get(event)
            .map(|entries| !entries.is_empty())
            .unwrap_or(false)
    }

    /// Returns the number of registrations for an event.
    pub async fn listener_count(&self, event: &str) -> usize {
        let events = self.events.read().await;
        events.get(event).map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns all event names with at least one registration, sorted.
    pub async fn registered_events(&self) -> Vec<String> {
        let events = self.events.read().await;
        let mut names: Vec<String> = events.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns snapshots of an event's registrations.
    pub async fn registrations(&self, event: &str) -> Vec<RegistrationInfo> {
        self.listeners(event)
            .await
            .iter()
            .map(|r| r.info())
            .collect()
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}
