use std::time::Duration;

use chrono::{DateTime, Utc};

use ruckus_core::event::EventBus;
use ruckus_core::reconcile::{Reconciler, ReconcilerSettings, ReconcileOutcome};
use ruckus_types::error::{ReconcileError, ScheduleDefinitionError};
use ruckus_types::event::EventKind;
use ruckus_types::meta::ResourceKey;
use ruckus_types::schedule::{ChaosSchedule, SchedulePhase, ScheduleSpec, ScheduleState};
use chrono::TimeZone;
use ruckus_infra::memory::InMemoryCluster;
use ruckus_types::engine::EnginePhase;
use ruckus_types::event::ScheduleEvent;
use ruckus_types::meta::ObjectMeta;
use ruckus_types::schedule::{
    ChaosScheduleSpec, ChaosScheduleStatus, ConcurrencyPolicy, RepeatProperties,
    ScheduleOnce, ScheduleRepeat, TimeRange, WorkDays, WorkHours,
};
use tokio::sync::broadcast;

fn harness() -> (
    InMemoryCluster,
    Reconciler<InMemoryCluster>,
    broadcast::Receiver<ScheduleEvent>,
) {
    let cluster = InMemoryCluster::new();
    let events = EventBus::new(64);
    let rx = events.subscribe();
    let reconciler =
        Reconciler::with_settings(cluster.clone(), events, ReconcilerSettings::immediate());
    (cluster, reconciler, rx)
}

/// 2026-03-02 is a Monday.
fn monday(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, second).unwrap()
}

fn schedule_named(
    name: &str,
    spec: ScheduleSpec,
    created: DateTime<Utc>,
) -> ChaosSchedule {
    let mut metadata = ObjectMeta::new("litmus", name);
    metadata.creation_timestamp = created;
    ChaosSchedule {
        metadata,
        spec: ChaosScheduleSpec {
            chaos_service_account: "chaos-sa".to_string(),
            schedule: spec,
            schedule_state: ScheduleState::Active,
            concurrency_policy: ConcurrencyPolicy::Forbid,
            engine_template_spec: serde_json::Map::new(),
        },
        status: ChaosScheduleStatus::default(),
    }
}

fn repeat_spec(
    interval: &str,
    hours: Option<&str>,
    days: Option<&str>,
    range: Option<TimeRange>,
) -> ScheduleSpec {
    ScheduleSpec::Repeat(ScheduleRepeat {
        time_range: range,
        properties: RepeatProperties {
            min_chaos_interval: interval.to_string(),
            random: false,
        },
        work_hours: hours.map(|h| WorkHours {
            included_hours: h.to_string(),
        }),
        work_days: days.map(|d| WorkDays {
            included_days: d.to_string(),
        }),
    })
}

fn drain_kinds(rx: &mut broadcast::Receiver<ScheduleEvent>) -> Vec<EventKind> {
    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(event.kind);
    }
    kinds
}

fn hashed(name: &str, t: DateTime<Utc>) -> ResourceKey {
    ResourceKey::new("litmus", format!("{name}-{}", t.timestamp()))
}

// -------------------------------------------------------------------
// now
// -------------------------------------------------------------------

#[tokio::test]
async fn now_creates_engine_named_after_schedule() {
    let (cluster, reconciler, mut rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named("pod-killer", ScheduleSpec::Now(true), t0))
        .key();

    let outcome = reconciler.reconcile(&key, t0).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::done());

    let engine = cluster
        .engine(&ResourceKey::new("litmus", "pod-killer"))
        .expect("engine named exactly after the schedule");
    assert!(!engine.metadata.uid.is_nil());

    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.status.schedule.status, Some(SchedulePhase::Running));
    assert_eq!(stored.status.last_schedule_time, Some(t0));
    assert_eq!(stored.status.schedule.run_instances, 1);
    assert_eq!(stored.status.active.len(), 1);
    assert_eq!(stored.status.active[0].uid, engine.metadata.uid);

    assert_eq!(drain_kinds(&mut rx), vec![EventKind::SuccessfulCreate]);
}

#[tokio::test]
async fn now_schedule_completes_after_engine_finishes() {
    let (cluster, reconciler, mut rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named("pod-killer", ScheduleSpec::Now(true), t0))
        .key();
    reconciler.reconcile(&key, t0).await.unwrap();

    let engine_key = ResourceKey::new("litmus", "pod-killer");
    cluster.complete_engine(&engine_key);

    // Engine finished: the schedule flips itself to complete.
    let t1 = t0 + chrono::Duration::minutes(5);
    reconciler.reconcile(&key, t1).await.unwrap();
    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.spec.schedule_state, ScheduleState::Complete);
    assert_eq!(stored.status.schedule.end_time, Some(t1));

    // The follow-up pass drains the active list, then settles the
    // completed phase.
    reconciler.reconcile(&key, t1).await.unwrap();
    reconciler.reconcile(&key, t1).await.unwrap();
    let stored = cluster.schedule(&key).unwrap();
    assert!(stored.status.active.is_empty());
    assert_eq!(
        stored.status.schedule.status,
        Some(SchedulePhase::Completed)
    );

    let kinds = drain_kinds(&mut rx);
    assert!(kinds.contains(&EventKind::SawCompletedEngine));
    assert!(kinds.contains(&EventKind::ScheduleCompleted));

    // Terminal: a further pass does nothing.
    let version = cluster.schedule(&key).unwrap().metadata.resource_version;
    reconciler.reconcile(&key, t1).await.unwrap();
    assert_eq!(
        cluster.schedule(&key).unwrap().metadata.resource_version,
        version
    );
}

// -------------------------------------------------------------------
// once
// -------------------------------------------------------------------

#[tokio::test]
async fn once_waits_then_fires() {
    let (cluster, reconciler, _rx) = harness();
    let t0 = monday(10, 0, 0);
    let execution = t0 + chrono::Duration::seconds(60);
    let key = cluster
        .put_schedule(schedule_named(
            "one-shot",
            ScheduleSpec::Once(ScheduleOnce {
                execution_time: execution,
            }),
            t0,
        ))
        .key();

    let outcome = reconciler.reconcile(&key, t0).await.unwrap();
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(60)));
    assert_eq!(cluster.engine_count(), 0);

    let t1 = t0 + chrono::Duration::seconds(61);
    reconciler.reconcile(&key, t1).await.unwrap();
    assert!(cluster.engine(&ResourceKey::new("litmus", "one-shot")).is_some());
    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.status.schedule.status, Some(SchedulePhase::Running));
}

// -------------------------------------------------------------------
// repeat: firing and catch-up
// -------------------------------------------------------------------

#[tokio::test]
async fn repeat_first_fire_inside_window() {
    let (cluster, reconciler, _rx) = harness();
    let created = monday(9, 59, 0);
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec("10m", Some("9-17"), Some("mon-fri"), None),
            created,
        ))
        .key();

    let outcome = reconciler.reconcile(&key, t0).await.unwrap();
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(600)));

    assert!(cluster.engine(&hashed("pod-killer", t0)).is_some());
    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.status.schedule.run_instances, 1);
    assert_eq!(stored.status.last_schedule_time, Some(t0));
    assert_eq!(
        stored.status.schedule.expected_next_run_time,
        Some(t0 + chrono::Duration::minutes(10))
    );
    assert_eq!(stored.status.schedule.start_time, Some(created));
}

#[tokio::test]
async fn repeat_catches_missed_fire_after_dormancy() {
    let (cluster, reconciler, mut rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec("10m", Some("9-17"), Some("mon-fri"), None),
            monday(9, 59, 0),
        ))
        .key();
    reconciler.reconcile(&key, t0).await.unwrap();

    // The first engine finishes before the next slot.
    cluster.complete_engine(&hashed("pod-killer", t0));
    let t1 = monday(10, 9, 0);
    let outcome = reconciler.reconcile(&key, t1).await.unwrap();
    // Completed child leaves the active list within one reconcile.
    let stored = cluster.schedule(&key).unwrap();
    assert!(stored.status.active.is_empty());
    assert_eq!(stored.status.last_schedule_completion_time, Some(t1));
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(60)));

    // The process sleeps through the 10:10 slot and wakes at 10:10:30:
    // the missed fire is attributed to the slot, not to the wake-up.
    let t2 = monday(10, 10, 30);
    let slot = monday(10, 10, 0);
    reconciler.reconcile(&key, t2).await.unwrap();
    assert!(cluster.engine(&hashed("pod-killer", slot)).is_some());

    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.status.schedule.run_instances, 2);
    assert_eq!(stored.status.last_schedule_time, Some(slot));
    assert_eq!(stored.status.active.len(), 1);

    let kinds = drain_kinds(&mut rx);
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == EventKind::SuccessfulCreate)
            .count(),
        2
    );
    assert!(kinds.contains(&EventKind::SawCompletedEngine));
}

#[tokio::test]
async fn repeat_end_time_finalizes_schedule() {
    let (cluster, reconciler, mut rx) = harness();
    let t0 = monday(10, 0, 0);
    let end = t0 + chrono::Duration::minutes(5);
    let key = cluster
        .put_schedule(schedule_named(
            "short-lived",
            repeat_spec(
                "2m",
                None,
                None,
                Some(TimeRange {
                    start_time: None,
                    end_time: Some(end),
                }),
            ),
            t0 - chrono::Duration::minutes(1),
        ))
        .key();

    reconciler.reconcile(&key, t0).await.unwrap();
    assert_eq!(cluster.engine_count(), 1);

    cluster.complete_engine(&hashed("short-lived", t0));
    let slot = monday(10, 2, 0);
    reconciler
        .reconcile(&key, monday(10, 1, 0))
        .await
        .unwrap();
    reconciler
        .reconcile(&key, monday(10, 2, 30))
        .await
        .unwrap();
    assert!(cluster.engine(&hashed("short-lived", slot)).is_some());
    assert_eq!(cluster.engine_count(), 2);

    // Past the end bound: finalize, never fire again.
    let after_end = end + chrono::Duration::seconds(1);
    let outcome = reconciler.reconcile(&key, after_end).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::done());

    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.spec.schedule_state, ScheduleState::Complete);
    assert_eq!(
        stored.status.schedule.status,
        Some(SchedulePhase::Completed)
    );
    assert_eq!(stored.status.schedule.end_time, Some(after_end));
    assert!(stored.status.active.is_empty());
    assert!(drain_kinds(&mut rx).contains(&EventKind::ScheduleCompleted));

    reconciler
        .reconcile(&key, after_end + chrono::Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!(cluster.engine_count(), 2);
}

// -------------------------------------------------------------------
// repeat: crash window between create and status update
// -------------------------------------------------------------------

#[tokio::test]
async fn orphaned_engine_is_adopted_without_duplicate() {
    let (cluster, reconciler, _rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec("10m", None, None, None),
            monday(9, 59, 0),
        ))
        .key();

    // The status write after the create is dropped, as if the process
    // died in between.
    cluster.fail_updates(1);
    let err = reconciler.reconcile(&key, t0).await;
    assert!(err.is_err());
    assert_eq!(cluster.engine_count(), 1);
    let stored = cluster.schedule(&key).unwrap();
    assert!(stored.status.active.is_empty());
    assert!(stored.status.last_schedule_time.is_none());

    // Next wake-up: the orphan is found by the label list, adopted into
    // the active list, and no duplicate is created for the same slot.
    let orphan_uid = cluster.engine(&hashed("pod-killer", t0)).unwrap().metadata.uid;
    reconciler.reconcile(&key, t0).await.unwrap();
    assert_eq!(cluster.engine_count(), 1);
    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.status.active.len(), 1);
    assert_eq!(stored.status.active[0].uid, orphan_uid);
    assert_eq!(stored.status.schedule.run_instances, 1);
    assert_eq!(stored.status.last_schedule_time, Some(t0));
}

// -------------------------------------------------------------------
// halt / resume
// -------------------------------------------------------------------

#[tokio::test]
async fn halt_stops_firing_and_resume_waits_for_next_slot() {
    let (cluster, reconciler, mut rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec("10m", None, None, None),
            monday(9, 59, 0),
        ))
        .key();
    reconciler.reconcile(&key, t0).await.unwrap();

    cluster.edit_schedule(&key, |s| s.spec.schedule_state = ScheduleState::Halt);
    reconciler
        .reconcile(&key, t0 + chrono::Duration::minutes(1))
        .await
        .unwrap();
    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.status.schedule.status, Some(SchedulePhase::Halted));
    assert!(drain_kinds(&mut rx).contains(&EventKind::ScheduleHalted));

    // Halted is terminal until a user edit: further passes write nothing.
    let version = cluster.schedule(&key).unwrap().metadata.resource_version;
    reconciler
        .reconcile(&key, t0 + chrono::Duration::minutes(15))
        .await
        .unwrap();
    assert_eq!(
        cluster.schedule(&key).unwrap().metadata.resource_version,
        version
    );
    assert_eq!(cluster.engine_count(), 1);

    // The child drains while halted; on resume the tracker catches up
    // and the catch-up stamp pushes firing to the next slot.
    cluster.complete_engine(&hashed("pod-killer", t0));
    cluster.edit_schedule(&key, |s| s.spec.schedule_state = ScheduleState::Active);
    let resume = monday(10, 25, 0);
    let outcome = reconciler.reconcile(&key, resume).await.unwrap();
    assert_eq!(cluster.engine_count(), 1);
    let stored = cluster.schedule(&key).unwrap();
    assert!(stored.status.active.is_empty());
    // lastScheduleTime survives the halt unchanged.
    assert_eq!(stored.status.last_schedule_time, Some(t0));
    assert_eq!(
        stored.status.schedule.expected_next_run_time,
        Some(monday(10, 30, 0))
    );
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(300)));
}

#[tokio::test]
async fn resume_fires_missed_slot_seen_before_halt() {
    let (cluster, reconciler, _rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec("10m", None, None, None),
            monday(9, 59, 0),
        ))
        .key();
    reconciler.reconcile(&key, t0).await.unwrap();

    // Child completes and the completion is observed *before* the halt,
    // so the completion stamp predates the missed slots.
    cluster.complete_engine(&hashed("pod-killer", t0));
    reconciler
        .reconcile(&key, monday(10, 1, 0))
        .await
        .unwrap();

    cluster.edit_schedule(&key, |s| s.spec.schedule_state = ScheduleState::Halt);
    reconciler
        .reconcile(&key, monday(10, 2, 0))
        .await
        .unwrap();

    cluster.edit_schedule(&key, |s| s.spec.schedule_state = ScheduleState::Active);
    let resume = monday(10, 25, 0);
    reconciler.reconcile(&key, resume).await.unwrap();

    // The most recent missed slot (10:20) fires on resume.
    let slot = monday(10, 20, 0);
    assert!(cluster.engine(&hashed("pod-killer", slot)).is_some());
    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.status.last_schedule_time, Some(slot));
    assert_eq!(stored.status.schedule.run_instances, 2);
}

// -------------------------------------------------------------------
// concurrency policies
// -------------------------------------------------------------------

#[tokio::test]
async fn forbid_skips_fire_while_child_active() {
    let (cluster, reconciler, mut rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec("10m", None, None, None),
            monday(9, 59, 0),
        ))
        .key();
    reconciler.reconcile(&key, t0).await.unwrap();

    // Slot passes while the first engine is still running.
    let outcome = reconciler
        .reconcile(&key, monday(10, 10, 30))
        .await
        .unwrap();
    assert_eq!(cluster.engine_count(), 1);
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(600)));
    assert!(drain_kinds(&mut rx).contains(&EventKind::MissEngine));
    // The skipped slot is not recorded as fired.
    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.status.last_schedule_time, Some(t0));
    assert_eq!(stored.status.schedule.run_instances, 1);
}

#[tokio::test]
async fn allow_fires_alongside_active_child() {
    let (cluster, reconciler, _rx) = harness();
    let t0 = monday(10, 0, 0);
    let mut schedule = schedule_named(
        "pod-killer",
        repeat_spec("10m", None, None, None),
        monday(9, 59, 0),
    );
    schedule.spec.concurrency_policy = ConcurrencyPolicy::Allow;
    let key = cluster.put_schedule(schedule).key();

    reconciler.reconcile(&key, t0).await.unwrap();
    reconciler
        .reconcile(&key, monday(10, 10, 30))
        .await
        .unwrap();

    assert_eq!(cluster.engine_count(), 2);
    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.status.active.len(), 2);
}

#[tokio::test]
async fn replace_deletes_active_child_before_firing() {
    let (cluster, reconciler, mut rx) = harness();
    let t0 = monday(10, 0, 0);
    let mut schedule = schedule_named(
        "pod-killer",
        repeat_spec("10m", None, None, None),
        monday(9, 59, 0),
    );
    schedule.spec.concurrency_policy = ConcurrencyPolicy::Replace;
    let key = cluster.put_schedule(schedule).key();

    reconciler.reconcile(&key, t0).await.unwrap();
    let first = cluster.engine(&hashed("pod-killer", t0)).unwrap();

    let slot = monday(10, 10, 0);
    reconciler
        .reconcile(&key, monday(10, 10, 30))
        .await
        .unwrap();

    assert!(cluster.engine(&hashed("pod-killer", t0)).is_none());
    assert!(cluster.engine(&hashed("pod-killer", slot)).is_some());
    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.status.active.len(), 1);
    assert_ne!(stored.status.active[0].uid, first.metadata.uid);
    assert!(drain_kinds(&mut rx).contains(&EventKind::SuccessfulDelete));
}

// -------------------------------------------------------------------
// status-write discipline
// -------------------------------------------------------------------

#[tokio::test]
async fn status_conflict_is_retried() {
    let (cluster, reconciler, _rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec("10m", None, None, None),
            monday(9, 59, 0),
        ))
        .key();

    cluster.inject_conflicts(2);
    reconciler.reconcile(&key, t0).await.unwrap();
    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.status.schedule.run_instances, 1);
    assert_eq!(stored.status.active.len(), 1);
}

#[tokio::test]
async fn status_conflict_exhausts_attempt_budget() {
    let cluster = InMemoryCluster::new();
    let mut settings = ReconcilerSettings::immediate();
    settings.status_retry_attempts = 3;
    let reconciler =
        Reconciler::with_settings(cluster.clone(), EventBus::new(16), settings);

    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec("10m", None, None, None),
            monday(9, 59, 0),
        ))
        .key();

    cluster.inject_conflicts(10);
    let err = reconciler.reconcile(&key, t0).await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::StatusExhausted { attempts: 3, .. }
    ));
}

#[tokio::test]
async fn reconcile_is_idempotent_without_time_progression() {
    let (cluster, reconciler, _rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec("10m", None, None, None),
            monday(9, 59, 0),
        ))
        .key();
    reconciler.reconcile(&key, t0).await.unwrap();

    let before = cluster.schedule(&key).unwrap();
    reconciler.reconcile(&key, t0).await.unwrap();
    let after = cluster.schedule(&key).unwrap();

    assert_eq!(cluster.engine_count(), 1);
    assert_eq!(before.metadata.resource_version, after.metadata.resource_version);
    assert_eq!(before.status.active, after.status.active);
    assert_eq!(
        before.status.schedule.run_instances,
        after.status.schedule.run_instances
    );
}

// -------------------------------------------------------------------
// tracker: vanished children
// -------------------------------------------------------------------

#[tokio::test]
async fn force_deleted_child_is_dropped_from_active() {
    let (cluster, reconciler, mut rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec("10m", None, None, None),
            monday(9, 59, 0),
        ))
        .key();
    reconciler.reconcile(&key, t0).await.unwrap();

    cluster.remove_engine(&hashed("pod-killer", t0));
    let t1 = monday(10, 5, 0);
    reconciler.reconcile(&key, t1).await.unwrap();

    let stored = cluster.schedule(&key).unwrap();
    assert!(stored.status.active.is_empty());
    assert_eq!(stored.status.last_schedule_completion_time, Some(t1));
    assert!(drain_kinds(&mut rx).contains(&EventKind::MissingEngine));
}

// -------------------------------------------------------------------
// complete state with draining children
// -------------------------------------------------------------------

#[tokio::test]
async fn complete_state_drains_children_then_completes() {
    let (cluster, reconciler, mut rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec("10m", None, None, None),
            monday(9, 59, 0),
        ))
        .key();
    reconciler.reconcile(&key, t0).await.unwrap();

    cluster.edit_schedule(&key, |s| s.spec.schedule_state = ScheduleState::Complete);

    // Child still active: refresh only, come back shortly.
    let t1 = monday(10, 1, 0);
    let outcome = reconciler.reconcile(&key, t1).await.unwrap();
    assert!(outcome.requeue_after.is_some());
    let stored = cluster.schedule(&key).unwrap();
    assert_ne!(
        stored.status.schedule.status,
        Some(SchedulePhase::Completed)
    );

    // Child drains: the schedule completes with an end time.
    cluster.complete_engine(&hashed("pod-killer", t0));
    let t2 = monday(10, 2, 0);
    reconciler.reconcile(&key, t2).await.unwrap();
    reconciler.reconcile(&key, t2).await.unwrap();
    let stored = cluster.schedule(&key).unwrap();
    assert!(stored.status.active.is_empty());
    assert_eq!(
        stored.status.schedule.status,
        Some(SchedulePhase::Completed)
    );
    assert_eq!(stored.status.schedule.end_time, Some(t2));
    assert!(drain_kinds(&mut rx).contains(&EventKind::ScheduleCompleted));
}

// -------------------------------------------------------------------
// edge cases
// -------------------------------------------------------------------

#[tokio::test]
async fn missing_schedule_reconciles_to_noop() {
    let (_cluster, reconciler, _rx) = harness();
    let outcome = reconciler
        .reconcile(&ResourceKey::new("litmus", "gone"), monday(10, 0, 0))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::done());
}

#[tokio::test]
async fn deletion_timestamp_blocks_firing() {
    let (cluster, reconciler, _rx) = harness();
    let t0 = monday(10, 0, 0);
    let mut schedule = schedule_named(
        "pod-killer",
        repeat_spec("10m", None, None, None),
        monday(9, 59, 0),
    );
    schedule.metadata.deletion_timestamp = Some(t0);
    let key = cluster.put_schedule(schedule).key();

    let outcome = reconciler.reconcile(&key, t0).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::done());
    assert_eq!(cluster.engine_count(), 0);
}

#[tokio::test]
async fn now_false_is_a_definition_error() {
    let (cluster, reconciler, _rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named("pod-killer", ScheduleSpec::Now(false), t0))
        .key();
    let err = reconciler.reconcile(&key, t0).await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Definition(ScheduleDefinitionError::NowDisabled)
    ));
}

#[tokio::test]
async fn bad_interval_surfaces_definition_error() {
    let (cluster, reconciler, mut rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec("10x", None, None, None),
            monday(9, 59, 0),
        ))
        .key();
    let err = reconciler.reconcile(&key, t0).await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Definition(ScheduleDefinitionError::InvalidInterval(_))
    ));
    assert_eq!(cluster.engine_count(), 0);
    assert!(drain_kinds(&mut rx).contains(&EventKind::FailedNeedsStart));
}

#[tokio::test]
async fn stop_state_is_a_noop() {
    let (cluster, reconciler, _rx) = harness();
    let t0 = monday(10, 0, 0);
    let mut schedule = schedule_named(
        "pod-killer",
        repeat_spec("10m", None, None, None),
        monday(9, 59, 0),
    );
    schedule.spec.schedule_state = ScheduleState::Stop;
    let key = cluster.put_schedule(schedule).key();

    let outcome = reconciler.reconcile(&key, t0).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::done());
    assert_eq!(cluster.engine_count(), 0);
}

#[tokio::test]
async fn future_start_time_requeues_until_window_opens() {
    let (cluster, reconciler, _rx) = harness();
    let t0 = monday(10, 0, 0);
    let start = t0 + chrono::Duration::hours(2);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec(
                "10m",
                None,
                None,
                Some(TimeRange {
                    start_time: Some(start),
                    end_time: None,
                }),
            ),
            monday(9, 59, 0),
        ))
        .key();

    let outcome = reconciler.reconcile(&key, t0).await.unwrap();
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(7_200)));
    assert_eq!(cluster.engine_count(), 0);
}

#[tokio::test]
async fn completed_engine_status_check_marks_phase_running_until_done() {
    // A repeat child completing does not complete the schedule; only
    // the time range does.
    let (cluster, reconciler, _rx) = harness();
    let t0 = monday(10, 0, 0);
    let key = cluster
        .put_schedule(schedule_named(
            "pod-killer",
            repeat_spec("10m", None, None, None),
            monday(9, 59, 0),
        ))
        .key();
    reconciler.reconcile(&key, t0).await.unwrap();
    cluster.complete_engine(&hashed("pod-killer", t0));
    reconciler
        .reconcile(&key, monday(10, 1, 0))
        .await
        .unwrap();
    let stored = cluster.schedule(&key).unwrap();
    assert_eq!(stored.status.schedule.status, Some(SchedulePhase::Running));
    assert_eq!(stored.spec.schedule_state, ScheduleState::Active);
}

#[tokio::test]
async fn engine_template_and_labels_flow_into_child() {
    let (cluster, reconciler, _rx) = harness();
    let t0 = monday(10, 0, 0);
    let mut schedule =
        schedule_named("pod-killer", ScheduleSpec::Now(true), t0);
    schedule
        .metadata
        .labels
        .insert("team".to_string(), "platform".to_string());
    schedule.spec.engine_template_spec.insert(
        "appinfo".to_string(),
        serde_json::json!({ "appns": "default" }),
    );
    let key = cluster.put_schedule(schedule).key();
    reconciler.reconcile(&key, t0).await.unwrap();

    let engine = cluster
        .engine(&ResourceKey::new("litmus", "pod-killer"))
        .unwrap();
    assert_eq!(engine.metadata.labels.get("team").unwrap(), "platform");
    assert_eq!(
        engine.metadata.labels.get("app").unwrap(),
        "chaos-engine"
    );
    assert_eq!(
        engine.spec.template.get("chaosServiceAccount").unwrap(),
        &serde_json::json!("chaos-sa")
    );
    assert_eq!(engine.status.engine_status, EnginePhase::Initialized);
    let owner = engine.metadata.controller_owner().unwrap();
    assert_eq!(owner.uid, cluster.schedule(&key).unwrap().metadata.uid);
}
