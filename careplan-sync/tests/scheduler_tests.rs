//! Coalescing, timers and change-notification triggering.
//!
//! All tests run with a paused clock; [`common::settle`] lets spawned
//! tasks progress without advancing time, and `tokio::time::advance`
//! moves the clock deterministically.

mod common;

use careplan_cloud::CloudActivity;
use careplan_sync::{LocalStore, SyncConfig, SyncScheduler};
use careplan_types::ActivityKind;
use common::{activity, harness, settle, PassCounter};
use std::sync::Arc;
use std::time::Duration;

const INTERVAL: Duration = Duration::from_secs(15);
const EPSILON: Duration = Duration::from_millis(10);

#[tokio::test(start_paused = true)]
async fn three_triggers_during_a_pass_coalesce_into_one_rerun() {
    let h = harness();
    let counter = Arc::new(PassCounter::default());
    h.engine.set_observer(counter.clone());
    let scheduler = SyncScheduler::new(h.engine.clone(), SyncConfig::default());

    // The first call marks a pass in flight before its task even runs, so
    // the two extra calls below land while it is active.
    scheduler.request_sync_now();
    scheduler.request_sync_now();
    scheduler.request_sync_now();
    settle().await;

    // In-flight pass done; the coalesced rerun waits on the timer.
    assert_eq!(counter.completed(), 1);

    tokio::time::advance(INTERVAL + EPSILON).await;
    settle().await;
    assert_eq!(counter.completed(), 2);

    // No further reruns: the flag was consumed and periodic is off.
    tokio::time::advance(INTERVAL * 4).await;
    settle().await;
    assert_eq!(counter.completed(), 2);
}

#[tokio::test(start_paused = true)]
async fn scheduled_timer_fires_one_pass() {
    let h = harness();
    let counter = Arc::new(PassCounter::default());
    h.engine.set_observer(counter.clone());
    let scheduler = SyncScheduler::new(h.engine.clone(), SyncConfig::default());

    scheduler.schedule();
    settle().await;
    assert_eq!(counter.completed(), 0);

    tokio::time::advance(INTERVAL + EPSILON).await;
    settle().await;
    assert_eq!(counter.completed(), 1);
}

#[tokio::test(start_paused = true)]
async fn schedule_replaces_the_pending_timer() {
    let h = harness();
    let counter = Arc::new(PassCounter::default());
    h.engine.set_observer(counter.clone());
    let scheduler = SyncScheduler::new(h.engine.clone(), SyncConfig::default());

    scheduler.schedule();
    tokio::time::advance(INTERVAL / 2).await;
    settle().await;

    // Re-arming resets the delay; the original deadline passes silently.
    scheduler.schedule();
    tokio::time::advance(INTERVAL / 2 + EPSILON).await;
    settle().await;
    assert_eq!(counter.completed(), 0);

    tokio::time::advance(INTERVAL).await;
    settle().await;
    assert_eq!(counter.completed(), 1);
}

#[tokio::test(start_paused = true)]
async fn unschedule_cancels_the_timer() {
    let h = harness();
    let counter = Arc::new(PassCounter::default());
    h.engine.set_observer(counter.clone());
    let scheduler = SyncScheduler::new(h.engine.clone(), SyncConfig::default());

    scheduler.schedule();
    scheduler.unschedule();

    tokio::time::advance(INTERVAL * 4).await;
    settle().await;
    assert_eq!(counter.completed(), 0);
}

#[tokio::test(start_paused = true)]
async fn enable_sync_runs_immediately_then_periodically() {
    let h = harness();
    let counter = Arc::new(PassCounter::default());
    h.engine.set_observer(counter.clone());
    let scheduler = SyncScheduler::new(h.engine.clone(), SyncConfig::default());

    scheduler.enable_sync();
    settle().await;
    assert_eq!(counter.completed(), 1);

    tokio::time::advance(INTERVAL + EPSILON).await;
    settle().await;
    assert_eq!(counter.completed(), 2);

    tokio::time::advance(INTERVAL + EPSILON).await;
    settle().await;
    assert_eq!(counter.completed(), 3);

    scheduler.disable_sync();
    tokio::time::advance(INTERVAL * 4).await;
    settle().await;
    assert_eq!(counter.completed(), 3);
}

#[tokio::test(start_paused = true)]
async fn local_changes_trigger_a_pass_without_waiting_for_the_timer() {
    let h = harness();
    let counter = Arc::new(PassCounter::default());
    h.engine.set_observer(counter.clone());
    let scheduler = SyncScheduler::new(h.engine.clone(), SyncConfig::default());

    scheduler.enable_sync();
    settle().await;
    assert_eq!(counter.completed(), 1);

    h.local
        .apply_activity_changes(
            vec![activity("act-1", ActivityKind::Intervention, Some(10))],
            vec![],
            vec![],
            false,
        )
        .await
        .unwrap();
    settle().await;

    // No clock movement needed.
    assert_eq!(counter.completed(), 2);
    scheduler.disable_sync();
}

#[tokio::test(start_paused = true)]
async fn cloud_origin_writes_do_not_retrigger_a_pass() {
    let h = harness();
    // Something to pull, so the first pass mutates the local store with
    // the cloud-origin flag set.
    h.remote
        .save_activities(&[CloudActivity::new(
            activity("act-1", ActivityKind::Intervention, Some(10)),
            false,
            None,
        )])
        .await
        .unwrap();

    let counter = Arc::new(PassCounter::default());
    h.engine.set_observer(counter.clone());
    let scheduler = SyncScheduler::new(h.engine.clone(), SyncConfig::default());

    scheduler.enable_sync();
    settle().await;

    // The pull happened...
    assert_eq!(h.local.activity_count(), 1);
    // ...but its notification did not spawn a second pass.
    assert_eq!(counter.completed(), 1);
    scheduler.disable_sync();
}

#[tokio::test(start_paused = true)]
async fn failed_passes_still_rearm_the_timer() {
    let h = harness();
    let counter = Arc::new(PassCounter::default());
    h.engine.set_observer(counter.clone());
    let scheduler = SyncScheduler::new(h.engine.clone(), SyncConfig::default());

    // An event without its activity makes every pass fail.
    h.local
        .apply_event_update(
            &common::event("orphan", 0, 0, Some(5)),
            None,
            careplan_types::CompletionState::Initial,
            false,
        )
        .await
        .unwrap();

    scheduler.enable_sync();
    settle().await;
    assert_eq!(counter.failed(), 1);

    // Transient-failure self-healing: the next tick tries again.
    tokio::time::advance(INTERVAL + EPSILON).await;
    settle().await;
    assert_eq!(counter.failed(), 2);

    scheduler.disable_sync();
}
