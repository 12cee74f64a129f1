//! Care plan events.
//!
//! An [`Event`] is one scheduled occurrence of an activity. Events have no
//! identifier of their own; identity is the composite [`EventKey`] of
//! owning activity, day offset and intra-day occurrence index, which is
//! unique within a user's event set.

use crate::ActivityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Completion state of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionState {
    /// Not yet acted on.
    Initial,
    /// Explicitly marked as not completed.
    NotCompleted,
    /// Completed, optionally with a result.
    Completed,
}

/// A value the user reported when completing an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResult {
    /// The reported value, e.g. `"118"`.
    pub value: String,
    /// Unit for the value, e.g. `"mmHg"`.
    pub unit: Option<String>,
    /// When the result was recorded.
    pub created_at: DateTime<Utc>,
}

impl EventResult {
    /// Creates a result recorded now.
    pub fn new(value: impl Into<String>, unit: Option<String>) -> Self {
        Self {
            value: value.into(),
            unit,
            created_at: Utc::now(),
        }
    }
}

/// Composite identity of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey {
    /// Identifier of the owning activity.
    pub activity: ActivityId,
    /// Days elapsed since the activity schedule's start date.
    pub days_since_start: u32,
    /// Index of this occurrence within its day.
    pub occurrence_index: u32,
}

impl EventKey {
    /// Creates an event key.
    pub fn new(activity: impl Into<ActivityId>, days_since_start: u32, occurrence_index: u32) -> Self {
        Self {
            activity: activity.into(),
            days_since_start,
            occurrence_index,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.activity, self.days_since_start, self.occurrence_index
        )
    }
}

/// One scheduled occurrence of an activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Composite identity.
    pub key: EventKey,
    /// Completion state.
    pub state: CompletionState,
    /// Result recorded on completion, if any.
    pub result: Option<EventResult>,
    /// Last-modification timestamp.
    pub modified_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Creates an event in the initial state.
    pub fn new(key: EventKey) -> Self {
        Self {
            key,
            state: CompletionState::Initial,
            result: None,
            modified_at: None,
        }
    }

    /// Returns a copy with the given state, result and modification time.
    #[must_use]
    pub fn completed(
        &self,
        state: CompletionState,
        result: Option<EventResult>,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: self.key.clone(),
            state,
            result,
            modified_at: Some(modified_at),
        }
    }
}
