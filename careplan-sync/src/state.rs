//! Pass-local diff state and merge classification.
//!
//! One reconciliation pass fetches the full local and cloud sets for an
//! entity kind and classifies every record into push/pull buckets using
//! last-writer-wins on modification timestamps. Classification is pure;
//! all I/O stays in the engine.

use crate::error::{SyncError, SyncResult};
use careplan_cloud::{CloudActivity, CloudEvent};
use careplan_types::{Activity, ActivityId, ActivityKind, Event};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Classified outcome of diffing the activity sets.
#[derive(Debug, Default)]
pub struct ActivityDelta {
    /// Entities to push to the cloud (batched remote save).
    pub push: Vec<CloudActivity>,
    /// Cloud-only entities to insert locally.
    pub add: Vec<Activity>,
    /// Cloud-newer entities to update locally.
    pub update: Vec<Activity>,
    /// Tombstoned entities to remove locally.
    pub remove: Vec<Activity>,
}

impl ActivityDelta {
    /// Whether the pass has nothing to do for activities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.push.is_empty() && !self.has_local_changes()
    }

    /// Whether any local mutation is scheduled.
    #[must_use]
    pub fn has_local_changes(&self) -> bool {
        !(self.add.is_empty() && self.update.is_empty() && self.remove.is_empty())
    }
}

/// Classified outcome of diffing the event sets.
#[derive(Debug, Default)]
pub struct EventDelta {
    /// Events to push to the cloud (batched remote save).
    pub push: Vec<CloudEvent>,
    /// Cloud events to apply locally, one at a time.
    pub pull: Vec<Event>,
}

impl EventDelta {
    /// Whether the pass has nothing to do for events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.push.is_empty() && self.pull.is_empty()
    }
}

/// Whether the local side wins last-writer-wins.
///
/// Equal timestamps (including both absent) are handled by the callers as
/// "already consistent" before this is consulted.
fn local_is_later(local: Option<DateTime<Utc>>, cloud: Option<DateTime<Utc>>) -> bool {
    match (local, cloud) {
        (Some(local), Some(cloud)) => local > cloud,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Classifies the activity sets.
///
/// Each cloud record is matched to at most one local activity (by
/// identifier) and consumed. Matched pairs compare modification
/// timestamps; unmatched local activities push as brand-new envelopes;
/// unmatched cloud records are added locally unless tombstoned, in which
/// case they are dropped (already deleted everywhere).
#[must_use]
pub fn diff_activities(local: &[Activity], mut cloud: Vec<CloudActivity>) -> ActivityDelta {
    let mut delta = ActivityDelta::default();

    for local_activity in local {
        let matched = cloud
            .iter()
            .position(|c| c.activity.identifier == local_activity.identifier);

        let Some(index) = matched else {
            // New locally; push under a fresh record name.
            delta
                .push
                .push(CloudActivity::new(local_activity.clone(), false, None));
            continue;
        };
        let cloud_activity = cloud.remove(index);

        if local_activity.modified_at() == cloud_activity.activity.modified_at() {
            // Same or modified at the same instant; already consistent.
            continue;
        }

        if local_is_later(
            local_activity.modified_at(),
            cloud_activity.activity.modified_at(),
        ) {
            // Overwrite the cloud copy at its existing record name.
            delta.push.push(CloudActivity::new(
                local_activity.clone(),
                false,
                Some(cloud_activity.record_name),
            ));
        } else if cloud_activity.tombstoned {
            delta.remove.push(cloud_activity.activity);
        } else {
            delta.update.push(cloud_activity.activity);
        }
    }

    // Whatever is left has no local pair.
    for cloud_activity in cloud {
        if !cloud_activity.tombstoned {
            delta.add.push(cloud_activity.activity);
        }
    }

    delta
}

/// Classifies the event sets.
///
/// Matching is by the composite event key; events have no tombstones.
/// Pushing an event new to the cloud needs its owning activity's kind for
/// vault selection, looked up in `kind_of`; a missing entry fails the diff
/// with [`SyncError::ActivityNotFound`].
pub fn diff_events(
    local: &[Event],
    mut cloud: Vec<CloudEvent>,
    kind_of: &HashMap<ActivityId, ActivityKind>,
) -> SyncResult<EventDelta> {
    let mut delta = EventDelta::default();

    for local_event in local {
        let matched = cloud.iter().position(|c| c.event.key == local_event.key);

        let Some(index) = matched else {
            let kind = kind_of
                .get(&local_event.key.activity)
                .copied()
                .ok_or_else(|| SyncError::ActivityNotFound(local_event.key.activity.clone()))?;
            delta.push.push(CloudEvent::new(local_event.clone(), kind, None));
            continue;
        };
        let cloud_event = cloud.remove(index);

        if local_event.modified_at == cloud_event.event.modified_at {
            continue;
        }

        if local_is_later(local_event.modified_at, cloud_event.event.modified_at) {
            delta.push.push(CloudEvent::new(
                local_event.clone(),
                cloud_event.kind,
                Some(cloud_event.record_name),
            ));
        } else {
            delta.pull.push(cloud_event.event);
        }
    }

    for cloud_event in cloud {
        delta.pull.push(cloud_event.event);
    }

    Ok(delta)
}
