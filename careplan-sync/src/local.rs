//! The local store boundary.
//!
//! The sync engine treats the device-local care plan store as an opaque
//! collaborator: it can query activities and events, apply batched
//! activity changes, apply single event updates, and subscribe to a change
//! notification stream. Mutations performed on behalf of the cloud carry
//! `from_cloud = true`, which is echoed on the resulting notification so
//! the sync trigger can ignore its own writes.

use async_trait::async_trait;
use careplan_types::{
    Activity, ActivityId, ActivityKind, CompletionState, Event, EventKey, EventResult,
};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use tokio::sync::broadcast;

/// Result type for local store operations.
pub type StoreResult<T> = Result<T, LocalStoreError>;

/// Errors the local store can report.
#[derive(Debug, Clone, Error)]
pub enum LocalStoreError {
    /// The underlying storage engine failed.
    #[error("store failure: {0}")]
    Failure(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// What part of the store a change notification concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChangeKind {
    /// The activity list changed.
    Activities,
    /// An event was updated.
    Events,
}

/// A change notification emitted by the local store.
#[derive(Debug, Clone)]
pub struct StoreChange {
    /// What changed.
    pub kind: StoreChangeKind,
    /// Whether the mutation originated from a cloud pull.
    pub from_cloud: bool,
}

/// The opaque local store seam.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Queries activities, optionally filtered by kind.
    async fn activities(&self, kind: Option<ActivityKind>) -> StoreResult<Vec<Activity>>;

    /// Queries events, optionally filtered by the owning activity's kind.
    async fn events(&self, kind: Option<ActivityKind>) -> StoreResult<Vec<Event>>;

    /// Applies adds, updates and removals of activities as one batched
    /// mutation, emitting a single change notification.
    async fn apply_activity_changes(
        &self,
        add: Vec<Activity>,
        update: Vec<Activity>,
        remove: Vec<Activity>,
        from_cloud: bool,
    ) -> StoreResult<()>;

    /// Updates one event's result and completion state.
    async fn apply_event_update(
        &self,
        event: &Event,
        result: Option<EventResult>,
        state: CompletionState,
        from_cloud: bool,
    ) -> StoreResult<()>;

    /// Subscribes to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// An in-memory [`LocalStore`] for tests and embedding.
pub struct MemoryLocalStore {
    activities: RwLock<HashMap<ActivityId, Activity>>,
    events: RwLock<HashMap<EventKey, Event>>,
    changes: broadcast::Sender<StoreChange>,
}

impl Default for MemoryLocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLocalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            activities: RwLock::new(HashMap::new()),
            events: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Number of stored activities.
    #[must_use]
    pub fn activity_count(&self) -> usize {
        self.activities.read().expect("activity lock poisoned").len()
    }

    /// Fetches one activity by identifier.
    #[must_use]
    pub fn activity(&self, id: &ActivityId) -> Option<Activity> {
        self.activities
            .read()
            .expect("activity lock poisoned")
            .get(id)
            .cloned()
    }

    /// Fetches one event by key.
    #[must_use]
    pub fn event(&self, key: &EventKey) -> Option<Event> {
        self.events.read().expect("event lock poisoned").get(key).cloned()
    }

    fn notify(&self, kind: StoreChangeKind, from_cloud: bool) {
        // Nobody listening is fine.
        let _ = self.changes.send(StoreChange { kind, from_cloud });
    }

    fn kinds(&self) -> HashMap<ActivityId, ActivityKind> {
        self.activities
            .read()
            .expect("activity lock poisoned")
            .iter()
            .map(|(id, activity)| (id.clone(), activity.kind))
            .collect()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn activities(&self, kind: Option<ActivityKind>) -> StoreResult<Vec<Activity>> {
        let activities = self.activities.read().expect("activity lock poisoned");
        let mut result: Vec<Activity> = activities
            .values()
            .filter(|a| kind.is_none() || kind == Some(a.kind))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(result)
    }

    async fn events(&self, kind: Option<ActivityKind>) -> StoreResult<Vec<Event>> {
        let kinds = self.kinds();
        let events = self.events.read().expect("event lock poisoned");
        let mut result: Vec<Event> = events
            .values()
            .filter(|e| match kind {
                None => true,
                Some(k) => kinds.get(&e.key.activity) == Some(&k),
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            (&a.key.activity, a.key.days_since_start, a.key.occurrence_index).cmp(&(
                &b.key.activity,
                b.key.days_since_start,
                b.key.occurrence_index,
            ))
        });
        Ok(result)
    }

    async fn apply_activity_changes(
        &self,
        add: Vec<Activity>,
        update: Vec<Activity>,
        remove: Vec<Activity>,
        from_cloud: bool,
    ) -> StoreResult<()> {
        {
            let mut activities = self.activities.write().expect("activity lock poisoned");
            for activity in add.into_iter().chain(update) {
                activities.insert(activity.identifier.clone(), activity);
            }
            for activity in remove {
                activities.remove(&activity.identifier);
            }
        }
        self.notify(StoreChangeKind::Activities, from_cloud);
        Ok(())
    }

    async fn apply_event_update(
        &self,
        event: &Event,
        result: Option<EventResult>,
        state: CompletionState,
        from_cloud: bool,
    ) -> StoreResult<()> {
        {
            let mut events = self.events.write().expect("event lock poisoned");
            let mut updated = event.clone();
            updated.result = result;
            updated.state = state;
            events.insert(updated.key.clone(), updated);
        }
        self.notify(StoreChangeKind::Events, from_cloud);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
