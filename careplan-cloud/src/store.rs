//! Typed fetch/save façade over the remote database.

use crate::codec::{
    fields, CloudActivity, CloudEvent, RecordCodec, UserVaults, ACTIVITY_RECORD_TYPE,
    EVENT_RECORD_TYPE,
};
use crate::error::CloudResult;
use crate::record::{FieldValue, RecordQuery, RemoteDatabase, SavePolicy};
use careplan_types::{ActivityKind, UserId};
use careplan_vault::Vault;
use std::sync::Arc;
use tracing::debug;

/// Fetches and saves a user's encrypted care plan records.
///
/// Fetches are atomic with respect to decoding: if any returned record
/// fails to decode, the whole fetch fails and no partial result is
/// returned. Saves encode every entity first (same fail-fast rule) and
/// then write the batch atomically with the full-replace save policy.
pub struct RemoteStore {
    db: Arc<dyn RemoteDatabase>,
    codec: RecordCodec,
    user_id: UserId,
}

impl RemoteStore {
    /// Creates a store for `user_id`'s records.
    pub fn new(
        db: Arc<dyn RemoteDatabase>,
        vault: Arc<dyn Vault>,
        vaults: UserVaults,
        user_id: UserId,
    ) -> Self {
        Self {
            db,
            codec: RecordCodec::new(vault, vaults),
            user_id,
        }
    }

    /// The user whose records this store addresses.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn query(&self, record_type: &str, kind: Option<ActivityKind>) -> RecordQuery {
        let mut query = RecordQuery::new(record_type)
            .filter_eq(fields::USER_ID, FieldValue::Text(self.user_id.to_string()));
        if let Some(kind) = kind {
            query = query.filter_eq(fields::ACTIVITY_KIND, FieldValue::Integer(kind.as_tag()));
        }
        query
    }

    // ── Activities ───────────────────────────────────────────────

    /// Fetches and decodes the user's activity records, optionally
    /// filtered by kind.
    pub async fn fetch_activities(
        &self,
        kind: Option<ActivityKind>,
    ) -> CloudResult<Vec<CloudActivity>> {
        let records = self.db.query(&self.query(ACTIVITY_RECORD_TYPE, kind)).await?;
        debug!(count = records.len(), "fetched activity records");

        let mut activities = Vec::with_capacity(records.len());
        for record in &records {
            activities.push(self.codec.activity_from_record(record, &self.user_id).await?);
        }
        Ok(activities)
    }

    /// Encodes and saves activity records as one atomic batch.
    pub async fn save_activities(&self, activities: &[CloudActivity]) -> CloudResult<()> {
        if activities.is_empty() {
            return Ok(());
        }
        let mut records = Vec::with_capacity(activities.len());
        for activity in activities {
            records.push(self.codec.activity_to_record(activity, &self.user_id).await?);
        }
        debug!(count = records.len(), "saving activity records");
        self.db.save_records(records, SavePolicy::ReplaceAllFields).await
    }

    // ── Events ───────────────────────────────────────────────────

    /// Fetches and decodes the user's event records, optionally filtered
    /// by owning-activity kind.
    pub async fn fetch_events(&self, kind: Option<ActivityKind>) -> CloudResult<Vec<CloudEvent>> {
        let records = self.db.query(&self.query(EVENT_RECORD_TYPE, kind)).await?;
        debug!(count = records.len(), "fetched event records");

        let mut events = Vec::with_capacity(records.len());
        for record in &records {
            events.push(self.codec.event_from_record(record, &self.user_id).await?);
        }
        Ok(events)
    }

    /// Encodes and saves event records as one atomic batch.
    pub async fn save_events(&self, events: &[CloudEvent]) -> CloudResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        let mut records = Vec::with_capacity(events.len());
        for event in events {
            records.push(self.codec.event_to_record(event, &self.user_id).await?);
        }
        debug!(count = records.len(), "saving event records");
        self.db.save_records(records, SavePolicy::ReplaceAllFields).await
    }
}
