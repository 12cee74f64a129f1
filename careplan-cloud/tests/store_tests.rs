//! RemoteStore fetch/save behavior over the in-memory database.

use careplan_cloud::codec::fields;
use careplan_cloud::{
    CloudActivity, CloudError, CloudEvent, FieldValue, MemoryRemoteDatabase, RemoteStore,
    SavePolicy, UserVaults,
};
use careplan_cloud::record::RemoteDatabase;
use careplan_types::{Activity, ActivityKind, Event, EventKey, Schedule, UserId};
use careplan_vault::LocalVault;
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;

struct Fixture {
    db: Arc<MemoryRemoteDatabase>,
    store: RemoteStore,
}

fn fixture() -> Fixture {
    let vault = Arc::new(LocalVault::new());
    let vaults = UserVaults::new(
        vault.create_vault("interventions"),
        vault.create_vault("assessments"),
    );
    let db = Arc::new(MemoryRemoteDatabase::new());
    let store = RemoteStore::new(
        db.clone(),
        vault,
        vaults,
        UserId::new("patient@example.com"),
    );
    Fixture { db, store }
}

fn activity(id: &str, kind: ActivityKind) -> Activity {
    Activity::new(
        id,
        kind,
        Schedule::daily(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 1),
        json!({"title": id}),
    )
}

#[tokio::test]
async fn save_then_fetch_round_trips() {
    let f = fixture();
    let activities = vec![
        CloudActivity::new(activity("act-1", ActivityKind::Intervention), false, None),
        CloudActivity::new(activity("act-2", ActivityKind::Assessment), false, None),
    ];

    f.store.save_activities(&activities).await.unwrap();
    assert_eq!(f.db.len(), 2);

    let mut fetched = f.store.fetch_activities(None).await.unwrap();
    fetched.sort_by(|a, b| a.activity.identifier.cmp(&b.activity.identifier));
    assert_eq!(fetched, activities);
}

#[tokio::test]
async fn kind_filter_narrows_the_query() {
    let f = fixture();
    f.store
        .save_activities(&[
            CloudActivity::new(activity("act-1", ActivityKind::Intervention), false, None),
            CloudActivity::new(activity("act-2", ActivityKind::Assessment), false, None),
        ])
        .await
        .unwrap();

    let fetched = f
        .store
        .fetch_activities(Some(ActivityKind::Assessment))
        .await
        .unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].activity.identifier.as_str(), "act-2");
}

#[tokio::test]
async fn records_of_other_users_are_not_fetched() {
    let f = fixture();
    f.store
        .save_activities(&[CloudActivity::new(
            activity("act-1", ActivityKind::Intervention),
            false,
            None,
        )])
        .await
        .unwrap();

    // A second store for a different user over the same database.
    let vault = Arc::new(LocalVault::new());
    let vaults = UserVaults::new(
        vault.create_vault("interventions"),
        vault.create_vault("assessments"),
    );
    let other = RemoteStore::new(f.db.clone(), vault, vaults, UserId::new("other@example.com"));

    assert!(other.fetch_activities(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn fetch_fails_wholesale_when_any_record_is_bad() {
    let f = fixture();
    f.store
        .save_activities(&[
            CloudActivity::new(activity("act-1", ActivityKind::Intervention), false, None),
            CloudActivity::new(activity("act-2", ActivityKind::Intervention), false, None),
        ])
        .await
        .unwrap();

    // Corrupt one record's clear user field after the fact.
    let query = careplan_cloud::RecordQuery::new("CarePlanActivity");
    let mut records = f.db.query(&query).await.unwrap();
    let mut victim = records.pop().unwrap();
    victim.set(fields::USER_ID, FieldValue::Text("attacker".into()));
    f.db
        .save_records(vec![victim], SavePolicy::ReplaceAllFields)
        .await
        .unwrap();

    let err = f.store.fetch_activities(None).await.unwrap_err();
    assert!(matches!(err, CloudError::Inconsistency(_)));
}

#[tokio::test]
async fn save_replaces_all_fields_at_the_same_record_name() {
    let f = fixture();
    let first = CloudActivity::new(activity("act-1", ActivityKind::Intervention), false, None);
    f.store.save_activities(&[first.clone()]).await.unwrap();

    // Push different content at the same record name.
    let updated = CloudActivity::new(
        activity("act-1", ActivityKind::Intervention),
        false,
        Some(first.record_name.clone()),
    );
    f.store.save_activities(&[updated]).await.unwrap();

    assert_eq!(f.db.len(), 1);
}

#[tokio::test]
async fn empty_save_is_a_no_op() {
    let f = fixture();
    f.store.save_activities(&[]).await.unwrap();
    f.store.save_events(&[]).await.unwrap();
    assert!(f.db.is_empty());
}

#[tokio::test]
async fn events_round_trip_with_kind_filter() {
    let f = fixture();
    let events = vec![
        CloudEvent::new(
            Event::new(EventKey::new("act-1", 0, 0)),
            ActivityKind::Intervention,
            None,
        ),
        CloudEvent::new(
            Event::new(EventKey::new("act-2", 1, 0)),
            ActivityKind::Assessment,
            None,
        ),
    ];
    f.store.save_events(&events).await.unwrap();

    let all = f.store.fetch_events(None).await.unwrap();
    assert_eq!(all.len(), 2);

    let assessments = f
        .store
        .fetch_events(Some(ActivityKind::Assessment))
        .await
        .unwrap();
    assert_eq!(assessments.len(), 1);
    assert_eq!(assessments[0].event.key, EventKey::new("act-2", 1, 0));
}
