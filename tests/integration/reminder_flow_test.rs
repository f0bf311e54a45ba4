//! End-to-end reminder flow: event creation through delivery, retry,
//! permanent failure, and cancellation, against in-memory collaborators.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use reminder_entity::job::JobState;
use reminder_service::{CreateEventRequest, Identity, ReminderStatus};
use reminder_worker::{Clock, JobEvent, JobHandle, ScheduleStore};
use tokio::sync::broadcast;

use helpers::{ScriptedMailer, TestApp};

fn request(time: &str, lead: Option<u32>) -> CreateEventRequest {
    CreateEventRequest {
        name: "Design review".into(),
        venue: "Room 4".into(),
        duration: 60,
        should_notify: true,
        notify_before_minutes: lead,
        event_date: "2025-03-10".into(),
        event_time: time.into(),
    }
}

async fn schedule(app: &TestApp, identity: &Identity, time: &str) -> JobHandle {
    let created = app
        .service
        .create_event(identity, request(time, None))
        .await
        .unwrap();
    match created.reminder {
        ReminderStatus::Scheduled(handle) => handle,
        other => panic!("expected a scheduled reminder, got {other:?}"),
    }
}

/// Collect lifecycle events until the job reaches a terminal one.
async fn until_terminal(rx: &mut broadcast::Receiver<JobEvent>) -> Vec<JobEvent> {
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(120), rx.recv())
            .await
            .expect("job never finished")
            .expect("event channel closed");
        let done = matches!(event, JobEvent::Delivered { .. } | JobEvent::Failed { .. });
        seen.push(event);
        if done {
            return seen;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_reminder_is_sent_once_at_fire_time() {
    let app = TestApp::new();
    let mut rx = app.job_events.subscribe();
    let mailer = Arc::new(ScriptedMailer::reliable());
    let (cancel, worker) = app.spawn_worker(mailer.clone());

    let ada = TestApp::user("ada@example.com");
    let handle = schedule(&app, &ada, "09:00").await;
    assert_eq!(handle.fire_at, app.clock.now() + chrono::Duration::minutes(30));

    // Not due yet: several idle polls go by without a send.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(mailer.attempts(), 0);

    app.clock.advance(chrono::Duration::minutes(30));
    app.wakeup.notify_one();
    let seen = until_terminal(&mut rx).await;
    assert!(matches!(seen.last(), Some(JobEvent::Delivered { attempt: 1, .. })));

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@example.com");
    assert_eq!(sent[0].subject, "Reminder: Design review is coming up!");
    assert_eq!(
        sent[0].text,
        "Your event \"Design review\" is starting in 30 minutes."
    );

    let job = app.jobs.get(handle.job_id).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Delivered);
    assert_eq!(job.attempt, 1);

    // A delivered job is never picked up again.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(mailer.attempts(), 1);

    cancel.send(true).unwrap();
    worker.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried_until_delivered() {
    let app = TestApp::new();
    let mut rx = app.job_events.subscribe();
    let mailer = Arc::new(ScriptedMailer::failing_first(2));
    let (cancel, worker) = app.spawn_worker(mailer.clone());

    let handle = schedule(&app, &TestApp::user("ada@example.com"), "09:00").await;
    app.clock.advance(chrono::Duration::minutes(30));
    app.wakeup.notify_one();

    let seen = until_terminal(&mut rx).await;
    let retries = seen
        .iter()
        .filter(|e| matches!(e, JobEvent::Retrying { .. }))
        .count();
    assert_eq!(retries, 2);
    assert!(matches!(seen.last(), Some(JobEvent::Delivered { attempt: 3, .. })));

    assert_eq!(mailer.attempts(), 3);
    assert_eq!(mailer.sent().len(), 1);
    let job = app.jobs.get(handle.job_id).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Delivered);

    cancel.send(true).unwrap();
    worker.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_attempts_fail_permanently() {
    let app = TestApp::new();
    let mut rx = app.job_events.subscribe();
    let mailer = Arc::new(ScriptedMailer::broken());
    let (cancel, worker) = app.spawn_worker(mailer.clone());

    let handle = schedule(&app, &TestApp::user("ada@example.com"), "09:00").await;
    app.clock.advance(chrono::Duration::minutes(30));
    app.wakeup.notify_one();

    let seen = until_terminal(&mut rx).await;
    assert!(matches!(seen.last(), Some(JobEvent::Failed { attempt: 3, .. })));

    let job = app.jobs.get(handle.job_id).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert!(job.last_error.unwrap().contains("connection reset"));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(mailer.attempts(), 3);
    assert!(mailer.sent().is_empty());

    cancel.send(true).unwrap();
    worker.await.unwrap();
}

#[tokio::test]
async fn test_past_notify_window_is_skipped() {
    let app = TestApp::new();

    // 08:20 with a 30 minute lead fired at 07:50; the clock says 08:00.
    let created = app
        .service
        .create_event(&TestApp::user("ada@example.com"), request("08:20", None))
        .await
        .unwrap();

    assert_eq!(created.reminder, ReminderStatus::Skipped);
    assert_eq!(created.event.reminder_job_id, None);
    assert_eq!(app.jobs.stats().await.unwrap().total(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deleted_event_is_never_reminded() {
    let app = TestApp::new();
    let mailer = Arc::new(ScriptedMailer::reliable());
    let (cancel, worker) = app.spawn_worker(mailer.clone());

    let ada = TestApp::user("ada@example.com");
    let created = app
        .service
        .create_event(&ada, request("09:00", Some(15)))
        .await
        .unwrap();
    let job_id = created.event.reminder_job_id.expect("reminder scheduled");

    app.service.delete_event(&ada, created.event.id).await.unwrap();

    app.clock.advance(chrono::Duration::hours(2));
    app.wakeup.notify_one();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(mailer.attempts(), 0);
    let job = app.jobs.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Cancelled);

    cancel.send(true).unwrap();
    worker.await.unwrap();
}
