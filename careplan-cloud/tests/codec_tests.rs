//! Entity ↔ envelope round trips and integrity rejection.

use careplan_cloud::codec::fields;
use careplan_cloud::{CloudActivity, CloudEvent, CloudError, FieldValue, RecordCodec, UserVaults};
use careplan_types::{
    Activity, ActivityKind, CompletionState, Event, EventKey, EventResult, RecordName, Schedule,
    UserId,
};
use careplan_vault::LocalVault;
use chrono::{NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn codec() -> RecordCodec {
    let vault = LocalVault::new();
    let interventions = vault.create_vault("interventions");
    let assessments = vault.create_vault("assessments");
    RecordCodec::new(Arc::new(vault), UserVaults::new(interventions, assessments))
}

fn patient() -> UserId {
    UserId::new("patient@example.com")
}

fn activity(kind: ActivityKind) -> Activity {
    Activity::new(
        "act-1",
        kind,
        Schedule::daily(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 2),
        json!({"title": "Take ibuprofen", "instructions": "with food"}),
    )
    .with_modified_at(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
}

fn event() -> Event {
    Event::new(EventKey::new("act-1", 3, 0)).completed(
        CompletionState::Completed,
        Some(EventResult::new("118", Some("mmHg".into()))),
        Utc.timestamp_opt(1_700_000_100, 0).unwrap(),
    )
}

// ── Round trips ──────────────────────────────────────────────────

#[tokio::test]
async fn activity_round_trip() {
    let codec = codec();
    let user = patient();
    let cloud = CloudActivity::new(activity(ActivityKind::Intervention), false, None);

    let record = codec.activity_to_record(&cloud, &user).await.unwrap();
    let decoded = codec.activity_from_record(&record, &user).await.unwrap();

    assert_eq!(decoded, cloud);
}

#[tokio::test]
async fn event_round_trip() {
    let codec = codec();
    let user = patient();
    let cloud = CloudEvent::new(event(), ActivityKind::Assessment, None);

    let record = codec.event_to_record(&cloud, &user).await.unwrap();
    let decoded = codec.event_from_record(&record, &user).await.unwrap();

    assert_eq!(decoded, cloud);
}

#[tokio::test]
async fn tombstone_flag_survives_the_trip() {
    let codec = codec();
    let user = patient();
    let cloud = CloudActivity::tombstone(activity(ActivityKind::Assessment), RecordName::generate());

    let record = codec.activity_to_record(&cloud, &user).await.unwrap();
    let decoded = codec.activity_from_record(&record, &user).await.unwrap();

    assert!(decoded.tombstoned);
    assert_eq!(decoded.record_name, cloud.record_name);
}

#[tokio::test]
async fn payload_stays_encrypted_on_the_wire() {
    let codec = codec();
    let user = patient();
    let cloud = CloudActivity::new(activity(ActivityKind::Intervention), false, None);

    let record = codec.activity_to_record(&cloud, &user).await.unwrap();
    let data = record.get(fields::DATA).and_then(FieldValue::as_bytes).unwrap();

    // The serialized bundle must not appear in the clear.
    assert!(!data.windows(9).any(|w| w == b"ibuprofen"));
    // Index fields stay queryable.
    assert_eq!(
        record.get(fields::USER_ID).and_then(FieldValue::as_text),
        Some("patient@example.com")
    );
    assert_eq!(
        record.get(fields::ACTIVITY_KIND).and_then(FieldValue::as_integer),
        Some(ActivityKind::Intervention.as_tag())
    );
}

#[tokio::test]
async fn record_names_are_reused_when_given_and_generated_when_not() {
    let name = RecordName::new("existing");
    let kept = CloudActivity::new(activity(ActivityKind::Intervention), false, Some(name.clone()));
    assert_eq!(kept.record_name, name);

    let fresh_a = CloudActivity::new(activity(ActivityKind::Intervention), false, None);
    let fresh_b = CloudActivity::new(activity(ActivityKind::Intervention), false, None);
    assert_ne!(fresh_a.record_name, fresh_b.record_name);
}

// ── Integrity rejection ──────────────────────────────────────────

#[tokio::test]
async fn altered_clear_user_id_is_rejected() {
    let codec = codec();
    let user = patient();
    let cloud = CloudActivity::new(activity(ActivityKind::Intervention), false, None);

    let mut record = codec.activity_to_record(&cloud, &user).await.unwrap();
    record.set(fields::USER_ID, FieldValue::Text("attacker@example.com".into()));

    let err = codec.activity_from_record(&record, &user).await.unwrap_err();
    assert!(matches!(err, CloudError::Inconsistency(_)));
}

#[tokio::test]
async fn mismatched_expected_user_is_rejected() {
    let codec = codec();
    let cloud = CloudActivity::new(activity(ActivityKind::Intervention), false, None);

    let record = codec.activity_to_record(&cloud, &patient()).await.unwrap();
    let err = codec
        .activity_from_record(&record, &UserId::new("other@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Inconsistency(_)));
}

#[tokio::test]
async fn altered_kind_tag_is_rejected() {
    let codec = codec();
    let user = patient();
    let cloud = CloudEvent::new(event(), ActivityKind::Assessment, None);

    let mut record = codec.event_to_record(&cloud, &user).await.unwrap();
    record.set(
        fields::ACTIVITY_KIND,
        FieldValue::Integer(ActivityKind::Intervention.as_tag()),
    );

    let err = codec.event_from_record(&record, &user).await.unwrap_err();
    assert!(matches!(err, CloudError::Inconsistency(_)));
}

#[tokio::test]
async fn record_copied_under_a_different_name_is_rejected() {
    let codec = codec();
    let user = patient();
    let cloud = CloudActivity::new(activity(ActivityKind::Intervention), false, None);

    let record = codec.activity_to_record(&cloud, &user).await.unwrap();

    // Replay the encrypted fields under a different record name.
    let mut copy = careplan_cloud::RemoteRecord::new(
        record.record_type(),
        RecordName::new("hijacked"),
    );
    for (field, value) in record.fields() {
        copy.set(field, value.clone());
    }

    let err = codec.activity_from_record(&copy, &user).await.unwrap_err();
    assert!(matches!(err, CloudError::Inconsistency(_)));
}
