//! Care plan activities.
//!
//! An [`Activity`] is a recurring care plan entry (a medication to take, a
//! survey to fill in). Its descriptive content is an opaque JSON payload to
//! the sync layer; only identity, kind and schedule are structural.

use crate::ActivityId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Key in [`Activity::user_info`] under which the last-modification
/// timestamp is stored (RFC 3339).
pub const MODIFIED_AT_KEY: &str = "modifiedAt";

/// The closed set of activity classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    /// A treatment the user performs (medication, exercise).
    Intervention,
    /// A measurement the user reports (survey, vitals).
    Assessment,
}

impl ActivityKind {
    /// Numeric tag stored in the clear on remote records.
    #[must_use]
    pub const fn as_tag(self) -> i64 {
        match self {
            ActivityKind::Intervention => 0,
            ActivityKind::Assessment => 1,
        }
    }

    /// Inverse of [`as_tag`](Self::as_tag).
    #[must_use]
    pub const fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(ActivityKind::Intervention),
            1 => Some(ActivityKind::Assessment),
            _ => None,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityKind::Intervention => f.write_str("intervention"),
            ActivityKind::Assessment => f.write_str("assessment"),
        }
    }
}

/// When and how often an activity occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// First day the activity occurs.
    pub start_date: NaiveDate,
    /// Number of occurrences per day.
    pub occurrences_per_day: u32,
}

impl Schedule {
    /// Creates a daily schedule.
    pub fn daily(start_date: NaiveDate, occurrences_per_day: u32) -> Self {
        Self {
            start_date,
            occurrences_per_day,
        }
    }
}

/// A care plan activity.
///
/// `payload` carries the descriptive content (title, instructions, …) and is
/// opaque to the sync layer. `user_info` is an extensible metadata map; the
/// last-modification timestamp lives there under [`MODIFIED_AT_KEY`] rather
/// than as a first-class field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Stable identifier, unique within the owning user's plan.
    pub identifier: ActivityId,
    /// Classification of the activity.
    pub kind: ActivityKind,
    /// Occurrence schedule.
    pub schedule: Schedule,
    /// Opaque descriptive content.
    pub payload: Value,
    /// Extensible metadata.
    #[serde(default)]
    pub user_info: BTreeMap<String, Value>,
}

impl Activity {
    /// Creates an activity with an empty metadata map.
    pub fn new(
        identifier: impl Into<ActivityId>,
        kind: ActivityKind,
        schedule: Schedule,
        payload: Value,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            schedule,
            payload,
            user_info: BTreeMap::new(),
        }
    }

    /// Last-modification timestamp, if the metadata map carries one.
    #[must_use]
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        let value = self.user_info.get(MODIFIED_AT_KEY)?;
        let raw = value.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Returns a copy of this activity with its modification timestamp set.
    #[must_use]
    pub fn with_modified_at(&self, modified_at: DateTime<Utc>) -> Self {
        let mut updated = self.clone();
        updated
            .user_info
            .insert(MODIFIED_AT_KEY.to_string(), Value::from(modified_at.to_rfc3339()));
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> Activity {
        Activity::new(
            "act-1",
            ActivityKind::Intervention,
            Schedule::daily(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 2),
            json!({"title": "Take ibuprofen"}),
        )
    }

    #[test]
    fn modified_at_absent_by_default() {
        assert_eq!(sample().modified_at(), None);
    }

    #[test]
    fn modified_at_round_trips_through_user_info() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let activity = sample().with_modified_at(ts);
        assert_eq!(activity.modified_at(), Some(ts));
        assert!(activity.user_info.contains_key(MODIFIED_AT_KEY));
    }

    #[test]
    fn with_modified_at_does_not_touch_the_original() {
        let original = sample();
        let _updated = original.with_modified_at(Utc::now());
        assert_eq!(original.modified_at(), None);
    }

    #[test]
    fn kind_tag_round_trip() {
        for kind in [ActivityKind::Intervention, ActivityKind::Assessment] {
            assert_eq!(ActivityKind::from_tag(kind.as_tag()), Some(kind));
        }
        assert_eq!(ActivityKind::from_tag(7), None);
    }
}
