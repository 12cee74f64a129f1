//! Entity ↔ envelope codec.
//!
//! Remote records keep the owning user, the activity-kind tag and the
//! record name in the clear for querying; everything else rides in one
//! encrypted `data` field holding a serialized payload bundle. Decoding
//! cross-checks the decrypted bundle against the clear index fields and
//! the expected user — any mismatch is reported as
//! [`CloudError::Inconsistency`] and no entity is produced.

use crate::error::{CloudError, CloudResult};
use crate::record::{FieldValue, RemoteRecord};
use careplan_types::{Activity, ActivityKind, Event, RecordName, UserId};
use careplan_vault::{Vault, VaultId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Remote record type for activities.
pub const ACTIVITY_RECORD_TYPE: &str = "CarePlanActivity";

/// Remote record type for events.
pub const EVENT_RECORD_TYPE: &str = "CarePlanEvent";

/// Clear index field names on activity and event records.
pub mod fields {
    /// Owning user (clear, queryable).
    pub const USER_ID: &str = "userId";
    /// Activity-kind tag (clear, queryable).
    pub const ACTIVITY_KIND: &str = "activityKind";
    /// Encrypted payload bundle.
    pub const DATA: &str = "data";
}

/// The fields that are encrypted on activity and event records.
const ENCRYPTED_FIELDS: &[&str] = &[fields::DATA];

/// The two vaults a user's care plan data is encrypted under.
///
/// Vault selection is a pure function of the activity kind.
#[derive(Debug, Clone)]
pub struct UserVaults {
    /// Vault for intervention-kind data.
    pub interventions: VaultId,
    /// Vault for assessment-kind data.
    pub assessments: VaultId,
}

impl UserVaults {
    /// Creates the vault pair.
    pub fn new(interventions: VaultId, assessments: VaultId) -> Self {
        Self {
            interventions,
            assessments,
        }
    }

    /// The vault that encrypts data of the given kind.
    #[must_use]
    pub fn for_kind(&self, kind: ActivityKind) -> &VaultId {
        match kind {
            ActivityKind::Intervention => &self.interventions,
            ActivityKind::Assessment => &self.assessments,
        }
    }
}

/// An activity as stored in the cloud: the entity plus its remote
/// bookkeeping (record name and soft-deletion tombstone).
#[derive(Debug, Clone, PartialEq)]
pub struct CloudActivity {
    /// The decoded activity.
    pub activity: Activity,
    /// Whether the activity is soft-deleted.
    pub tombstoned: bool,
    /// Stable remote record name.
    pub record_name: RecordName,
}

impl CloudActivity {
    /// Wraps an activity for the cloud, generating a fresh record name if
    /// none is supplied.
    pub fn new(activity: Activity, tombstoned: bool, record_name: Option<RecordName>) -> Self {
        Self {
            activity,
            tombstoned,
            record_name: record_name.unwrap_or_else(RecordName::generate),
        }
    }

    /// Wraps an activity as a tombstone at an existing record name.
    pub fn tombstone(activity: Activity, record_name: RecordName) -> Self {
        Self {
            activity,
            tombstoned: true,
            record_name,
        }
    }
}

/// An event as stored in the cloud.
///
/// Events carry their owning activity's kind so the codec can select the
/// vault without consulting the local store.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudEvent {
    /// The decoded event.
    pub event: Event,
    /// Kind of the owning activity.
    pub kind: ActivityKind,
    /// Stable remote record name.
    pub record_name: RecordName,
}

impl CloudEvent {
    /// Wraps an event for the cloud, generating a fresh record name if
    /// none is supplied.
    pub fn new(event: Event, kind: ActivityKind, record_name: Option<RecordName>) -> Self {
        Self {
            event,
            kind,
            record_name: record_name.unwrap_or_else(RecordName::generate),
        }
    }
}

/// Serialized bundle inside an activity record's encrypted `data` field.
#[derive(Serialize, Deserialize)]
struct ActivityPayload {
    activity: Activity,
    user_id: UserId,
    record_name: RecordName,
    tombstoned: bool,
}

/// Serialized bundle inside an event record's encrypted `data` field.
#[derive(Serialize, Deserialize)]
struct EventPayload {
    event: Event,
    kind: ActivityKind,
    user_id: UserId,
    record_name: RecordName,
}

/// Converts between domain entities and encrypted remote records.
pub struct RecordCodec {
    vault: Arc<dyn Vault>,
    vaults: UserVaults,
}

impl RecordCodec {
    /// Creates a codec encrypting under the given vault pair.
    pub fn new(vault: Arc<dyn Vault>, vaults: UserVaults) -> Self {
        Self { vault, vaults }
    }

    // ── Activities ───────────────────────────────────────────────

    /// Encodes a cloud activity into an encrypted remote record owned by
    /// `user_id`.
    pub async fn activity_to_record(
        &self,
        cloud: &CloudActivity,
        user_id: &UserId,
    ) -> CloudResult<RemoteRecord> {
        let payload = ActivityPayload {
            activity: cloud.activity.clone(),
            user_id: user_id.clone(),
            record_name: cloud.record_name.clone(),
            tombstoned: cloud.tombstoned,
        };
        let record = RemoteRecord::new(ACTIVITY_RECORD_TYPE, cloud.record_name.clone())
            .with_field(fields::USER_ID, FieldValue::Text(user_id.to_string()))
            .with_field(
                fields::ACTIVITY_KIND,
                FieldValue::Integer(cloud.activity.kind.as_tag()),
            )
            .with_field(fields::DATA, FieldValue::Bytes(serde_json::to_vec(&payload)?));

        let vault_id = self.vaults.for_kind(cloud.activity.kind);
        Ok(record
            .encrypted(self.vault.as_ref(), vault_id, ENCRYPTED_FIELDS)
            .await?)
    }

    /// Decodes an activity record fetched for `expected_user`, enforcing
    /// the integrity cross-check.
    pub async fn activity_from_record(
        &self,
        record: &RemoteRecord,
        expected_user: &UserId,
    ) -> CloudResult<CloudActivity> {
        let decrypted = record
            .decrypted(self.vault.as_ref(), ENCRYPTED_FIELDS)
            .await?;
        let payload: ActivityPayload = serde_json::from_slice(Self::data_field(&decrypted)?)?;

        Self::check_index_fields(
            &decrypted,
            expected_user,
            &payload.user_id,
            &payload.record_name,
            payload.activity.kind,
        )?;

        Ok(CloudActivity {
            activity: payload.activity,
            tombstoned: payload.tombstoned,
            record_name: payload.record_name,
        })
    }

    // ── Events ───────────────────────────────────────────────────

    /// Encodes a cloud event into an encrypted remote record owned by
    /// `user_id`.
    pub async fn event_to_record(
        &self,
        cloud: &CloudEvent,
        user_id: &UserId,
    ) -> CloudResult<RemoteRecord> {
        let payload = EventPayload {
            event: cloud.event.clone(),
            kind: cloud.kind,
            user_id: user_id.clone(),
            record_name: cloud.record_name.clone(),
        };
        let record = RemoteRecord::new(EVENT_RECORD_TYPE, cloud.record_name.clone())
            .with_field(fields::USER_ID, FieldValue::Text(user_id.to_string()))
            .with_field(fields::ACTIVITY_KIND, FieldValue::Integer(cloud.kind.as_tag()))
            .with_field(fields::DATA, FieldValue::Bytes(serde_json::to_vec(&payload)?));

        let vault_id = self.vaults.for_kind(cloud.kind);
        Ok(record
            .encrypted(self.vault.as_ref(), vault_id, ENCRYPTED_FIELDS)
            .await?)
    }

    /// Decodes an event record fetched for `expected_user`, enforcing the
    /// integrity cross-check.
    pub async fn event_from_record(
        &self,
        record: &RemoteRecord,
        expected_user: &UserId,
    ) -> CloudResult<CloudEvent> {
        let decrypted = record
            .decrypted(self.vault.as_ref(), ENCRYPTED_FIELDS)
            .await?;
        let payload: EventPayload = serde_json::from_slice(Self::data_field(&decrypted)?)?;

        Self::check_index_fields(
            &decrypted,
            expected_user,
            &payload.user_id,
            &payload.record_name,
            payload.kind,
        )?;

        Ok(CloudEvent {
            event: payload.event,
            kind: payload.kind,
            record_name: payload.record_name,
        })
    }

    // ── Shared decoding helpers ──────────────────────────────────

    fn data_field(decrypted: &RemoteRecord) -> CloudResult<&[u8]> {
        decrypted
            .get(fields::DATA)
            .and_then(FieldValue::as_bytes)
            .ok_or_else(|| {
                CloudError::Inconsistency(format!(
                    "record {} carries no byte data field",
                    decrypted.record_name()
                ))
            })
    }

    /// Enforces the invariant that the decrypted payload agrees with the
    /// clear index fields it was fetched alongside.
    fn check_index_fields(
        decrypted: &RemoteRecord,
        expected_user: &UserId,
        payload_user: &UserId,
        payload_record_name: &RecordName,
        payload_kind: ActivityKind,
    ) -> CloudResult<()> {
        let name = decrypted.record_name();

        let clear_user = decrypted
            .get(fields::USER_ID)
            .and_then(FieldValue::as_text)
            .ok_or_else(|| {
                CloudError::Inconsistency(format!("record {name} carries no user field"))
            })?;
        if payload_user.as_str() != clear_user || payload_user != expected_user {
            return Err(CloudError::Inconsistency(format!(
                "record {name} user does not match its payload"
            )));
        }

        if payload_record_name != name {
            return Err(CloudError::Inconsistency(format!(
                "record {name} name does not match its payload"
            )));
        }

        let clear_kind = decrypted
            .get(fields::ACTIVITY_KIND)
            .and_then(FieldValue::as_integer)
            .ok_or_else(|| {
                CloudError::Inconsistency(format!("record {name} carries no kind field"))
            })?;
        if clear_kind != payload_kind.as_tag() {
            return Err(CloudError::Inconsistency(format!(
                "record {name} kind tag does not match its payload"
            )));
        }

        Ok(())
    }
}
