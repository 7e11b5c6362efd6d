use time::{Duration, OffsetDateTime};

use thermosync_server::models::EventStatus;

mod common;
use common::mock_app::MockApp;

#[tokio::test]
async fn start_phase_starts_events_inside_the_trailing_window() {
    let app = MockApp::new().await;
    let device = app.create_test_device("AC-500").await;
    let now = OffsetDateTime::now_utc();

    let due = app
        .insert_event(&app.scheduled_event(device.id, now - Duration::seconds(2), now + Duration::hours(1)))
        .await;
    let not_yet_due = app
        .insert_event(&app.scheduled_event(device.id, now + Duration::minutes(5), now + Duration::hours(1)))
        .await;

    app.scheduler.run_start_phase(now).await.unwrap();

    let started = app.events.find_by_id(due).await.unwrap().unwrap();
    assert_eq!(started.status, EventStatus::Active);
    assert!(started.started_at.is_some());

    let waiting = app.events.find_by_id(not_yet_due).await.unwrap().unwrap();
    assert_eq!(waiting.status, EventStatus::Scheduled);

    let device = app.devices.find_by_id(device.id).await.unwrap().unwrap();
    assert!(device.is_on);
}

#[tokio::test]
async fn start_phase_skips_templates_and_disabled_events() {
    let app = MockApp::new().await;
    let device = app.create_test_device("AC-501").await;
    let now = OffsetDateTime::now_utc();

    let mut template = app.scheduled_event(device.id, now - Duration::seconds(2), now + Duration::hours(1));
    template.is_recurring = true;
    let template_id = app.insert_event(&template).await;

    let mut disabled = app.scheduled_event(device.id, now - Duration::seconds(2), now + Duration::hours(1));
    disabled.is_disabled = true;
    disabled.disabled_at = Some(now - Duration::seconds(1));
    let disabled_id = app.insert_event(&disabled).await;

    app.scheduler.run_start_phase(now).await.unwrap();

    for id in [template_id, disabled_id] {
        let event = app.events.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(event.status, EventStatus::Scheduled);
    }
}

#[tokio::test]
async fn end_phase_completes_expired_active_events() {
    let app = MockApp::new().await;
    let device = app.create_test_device("AC-502").await;
    let now = OffsetDateTime::now_utc();

    let mut event = app.scheduled_event(device.id, now - Duration::hours(1), now - Duration::seconds(1));
    event.status = EventStatus::Active;
    event.started_at = Some(now - Duration::hours(1));
    let id = app.insert_event(&event).await;

    app.scheduler.run_end_phase(now).await.unwrap();

    let completed = app.events.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(completed.status, EventStatus::Completed);
    assert!(completed.completed_at.is_some());
    assert!(completed.delete_after.is_some());

    let device = app.devices.find_by_id(device.id).await.unwrap().unwrap();
    assert!(!device.is_on);
}

#[tokio::test]
async fn end_phase_applies_the_end_temperature() {
    let app = MockApp::new().await;
    let device = app.create_test_device("AC-503").await;
    let now = OffsetDateTime::now_utc();

    let mut event = app.scheduled_event(device.id, now - Duration::hours(1), now - Duration::seconds(1));
    event.status = EventStatus::Active;
    event.end_temperature = Some(18);
    let id = app.insert_event(&event).await;

    app.scheduler.run_end_phase(now).await.unwrap();

    assert_eq!(
        app.events.find_by_id(id).await.unwrap().unwrap().status,
        EventStatus::Completed
    );
    let device = app.devices.find_by_id(device.id).await.unwrap().unwrap();
    assert_eq!(device.temperature, 18);
}

#[tokio::test]
async fn end_phase_force_completes_expired_disabled_events() {
    let app = MockApp::new().await;
    let device = app.create_test_device("AC-504").await;
    let now = OffsetDateTime::now_utc();

    // Disabled and extended, but the pre-extension deadline has passed.
    let mut event = app.scheduled_event(device.id, now - Duration::hours(2), now + Duration::hours(1));
    event.is_disabled = true;
    event.disabled_at = Some(now - Duration::hours(1));
    event.original_end_time = Some(now - Duration::minutes(1));
    let id = app.insert_event(&event).await;

    app.scheduler.run_end_phase(now).await.unwrap();

    assert!(app.events.find_by_id(id).await.unwrap().is_none());
}

#[tokio::test]
async fn cleanup_phase_sweeps_durable_deletion_deadlines() {
    let app = MockApp::new().await;
    let device = app.create_test_device("AC-505").await;
    let now = OffsetDateTime::now_utc();

    let mut stopped = app.scheduled_event(device.id, now - Duration::hours(1), now - Duration::minutes(30));
    stopped.status = EventStatus::Stopped;
    stopped.stopped_at = Some(now - Duration::minutes(30));
    stopped.delete_after = Some(now - Duration::seconds(1));
    let swept = app.insert_event(&stopped).await;

    let mut pending = app.scheduled_event(device.id, now - Duration::hours(1), now - Duration::minutes(30));
    pending.status = EventStatus::Stopped;
    pending.delete_after = Some(now + Duration::seconds(30));
    let kept = app.insert_event(&pending).await;

    app.scheduler.run_cleanup_phase(now).await.unwrap();

    assert!(app.events.find_by_id(swept).await.unwrap().is_none());
    assert!(app.events.find_by_id(kept).await.unwrap().is_some());
}

#[tokio::test]
async fn cleanup_phase_safety_net_catches_orphaned_rows() {
    let app = MockApp::new().await;
    let device = app.create_test_device("AC-506").await;
    let now = OffsetDateTime::now_utc();

    // A completed row that lost its deletion deadline, stale for a minute.
    let mut orphan = app.scheduled_event(device.id, now - Duration::hours(1), now - Duration::minutes(30));
    orphan.status = EventStatus::Completed;
    orphan.completed_at = Some(now - Duration::minutes(1));
    orphan.updated_at = now - Duration::minutes(1);
    let orphan_id = app.insert_event(&orphan).await;

    // A scheduled row whose window passed without the loop catching it.
    let mut missed = app.scheduled_event(device.id, now - Duration::hours(2), now - Duration::hours(1));
    missed.updated_at = now - Duration::hours(2);
    let missed_id = app.insert_event(&missed).await;

    // A scheduled row still waiting for its window: untouched.
    let mut waiting = app.scheduled_event(device.id, now + Duration::hours(1), now + Duration::hours(2));
    waiting.updated_at = now - Duration::hours(2);
    let waiting_id = app.insert_event(&waiting).await;

    app.scheduler.run_cleanup_phase(now).await.unwrap();

    assert!(app.events.find_by_id(orphan_id).await.unwrap().is_none());
    assert!(app.events.find_by_id(missed_id).await.unwrap().is_none());
    assert!(app.events.find_by_id(waiting_id).await.unwrap().is_some());
}

#[tokio::test]
async fn minute_phase_sweeps_stray_completed_events() {
    let app = MockApp::new().await;
    let device = app.create_test_device("AC-507").await;
    let now = OffsetDateTime::now_utc();

    let mut stray = app.scheduled_event(device.id, now - Duration::hours(1), now - Duration::minutes(30));
    stray.status = EventStatus::Completed;
    let stray_id = app.insert_event(&stray).await;

    app.scheduler.run_minute_phase(now).await;

    assert!(app.events.find_by_id(stray_id).await.unwrap().is_none());
}

#[tokio::test]
async fn full_lifecycle_from_start_to_swept_row() {
    let app = MockApp::new().await;
    let device = app.create_test_device("AC-508").await;
    let now = OffsetDateTime::now_utc();

    let id = app
        .insert_event(&app.scheduled_event(device.id, now - Duration::seconds(1), now + Duration::seconds(2)))
        .await;

    app.scheduler.run_start_phase(now).await.unwrap();
    assert_eq!(
        app.events.find_by_id(id).await.unwrap().unwrap().status,
        EventStatus::Active
    );

    // Tick past the end of the window.
    let later = now + Duration::seconds(3);
    app.scheduler.run_end_phase(later).await.unwrap();
    let completed = app.events.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(completed.status, EventStatus::Completed);

    let device_row = app.devices.find_by_id(device.id).await.unwrap().unwrap();
    assert!(!device_row.is_on);

    // Past the deletion grace, the row is gone.
    let sweep_time = completed.delete_after.unwrap() + Duration::seconds(1);
    app.scheduler.run_cleanup_phase(sweep_time).await.unwrap();
    assert!(app.events.find_by_id(id).await.unwrap().is_none());
}
