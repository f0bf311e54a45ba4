//! Worker runner: claims due jobs and dispatches them until shut down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, Semaphore, watch};
use tokio::time;

use reminder_core::config::WorkerConfig;

use crate::clock::Clock;
use crate::dispatcher::Dispatcher;
use crate::store::ScheduleStore;

/// How long shutdown waits for in-flight dispatches.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Main worker loop.
///
/// Runs up to `concurrency` dispatches at once. When nothing is due it
/// sleeps until the next fire time, the poll interval, or a wake-up from the
/// scheduler, whichever comes first.
pub struct WorkerRunner {
    store: Arc<dyn ScheduleStore>,
    dispatcher: Arc<Dispatcher>,
    clock: Arc<dyn Clock>,
    config: WorkerConfig,
    worker_id: String,
    wakeup: Arc<Notify>,
}

impl std::fmt::Debug for WorkerRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRunner")
            .field("worker_id", &self.worker_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorkerRunner {
    /// Create a worker runner.
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        dispatcher: Arc<Dispatcher>,
        clock: Arc<dyn Clock>,
        config: WorkerConfig,
        worker_id: String,
    ) -> Self {
        Self {
            store,
            dispatcher,
            clock,
            config,
            worker_id,
            wakeup: Arc::new(Notify::new()),
        }
    }

    /// Share a wake-up handle with the scheduler.
    pub fn with_wakeup(mut self, wakeup: Arc<Notify>) -> Self {
        self.wakeup = wakeup;
        self
    }

    /// Run until `cancel` turns true (or its sender is dropped).
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let concurrency = self.config.concurrency.max(1);
        tracing::info!(
            worker_id = %self.worker_id,
            concurrency,
            poll_interval_secs = self.config.poll_interval_seconds,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));

        loop {
            if *cancel.borrow() {
                break;
            }

            let permit = tokio::select! {
                _ = shutdown_requested(&mut cancel) => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let idle = match self.store.take_next_due(&self.worker_id, self.clock.now()).await {
                Ok(Some(job)) => {
                    let dispatcher = Arc::clone(&self.dispatcher);
                    tokio::spawn(async move {
                        let _permit = permit;
                        dispatcher.dispatch(&job).await;
                    });
                    continue;
                }
                Ok(None) => {
                    drop(permit);
                    self.idle_wait().await
                }
                Err(e) => {
                    drop(permit);
                    tracing::error!(worker_id = %self.worker_id, error = %e, "Failed to claim job");
                    self.poll_interval()
                }
            };

            tracing::trace!(worker_id = %self.worker_id, ?idle, "No job due");
            tokio::select! {
                _ = shutdown_requested(&mut cancel) => break,
                _ = time::sleep(idle) => {}
                _ = self.wakeup.notified() => {}
            }
        }

        tracing::info!(worker_id = %self.worker_id, "Worker waiting for in-flight reminders...");
        let _ = time::timeout(
            SHUTDOWN_GRACE,
            semaphore.acquire_many(concurrency as u32),
        )
        .await;
        tracing::info!(worker_id = %self.worker_id, "Worker shut down complete");
    }

    /// How long to sleep when nothing is due right now.
    async fn idle_wait(&self) -> Duration {
        let poll = self.poll_interval();
        match self.store.next_fire_at().await {
            Ok(Some(fire_at)) => (fire_at - self.clock.now())
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(poll),
            Ok(None) => poll,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read next fire time");
                poll
            }
        }
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.config.poll_interval_seconds.max(1))
    }
}

/// Resolves once shutdown is signalled or the sender is gone.
async fn shutdown_requested(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use reminder_core::types::JobId;
    use reminder_entity::job::{CreateJob, JobState, ReminderPayload};
    use reminder_mail::{MailError, MailMessage, MailTransport};

    use crate::backoff::RetryPolicy;
    use crate::clock::ManualClock;
    use crate::events::{JobEvent, JobEvents};
    use crate::store::InMemoryScheduleStore;

    #[derive(Default)]
    struct CountingMailer {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MailTransport for CountingMailer {
        async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(message.to.clone());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn create(recipient: &str) -> CreateJob {
        CreateJob {
            id: JobId::new(),
            event_id: None,
            payload: ReminderPayload {
                recipient_email: recipient.into(),
                event_name: "Launch".into(),
                lead_minutes: 30,
            },
            fire_at: Utc::now() - chrono::Duration::minutes(1),
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn test_runner_delivers_due_jobs_and_stops() {
        let store = Arc::new(InMemoryScheduleStore::new());
        let mailer = Arc::new(CountingMailer::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let events = JobEvents::new();
        let mut rx = events.subscribe();

        let dispatcher = Arc::new(
            Dispatcher::new(
                store.clone(),
                mailer.clone(),
                clock.clone(),
                RetryPolicy::default(),
                Duration::from_secs(5),
            )
            .with_events(events),
        );
        let config = WorkerConfig {
            concurrency: 2,
            ..WorkerConfig::default()
        };
        let runner = Arc::new(WorkerRunner::new(
            store.clone(),
            dispatcher,
            clock,
            config,
            "test-worker".into(),
        ));

        let a = store.enqueue(create("a@example.com")).await.unwrap().id;
        let b = store.enqueue(create("b@example.com")).await.unwrap().id;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn({
            let runner = Arc::clone(&runner);
            async move { runner.run(cancel_rx).await }
        });

        let mut delivered = 0;
        while delivered < 2 {
            if let JobEvent::Delivered { .. } = rx.recv().await.unwrap() {
                delivered += 1;
            }
        }

        cancel_tx.send(true).unwrap();
        handle.await.unwrap();

        for id in [a, b] {
            assert_eq!(store.get(id).await.unwrap().unwrap().state, JobState::Delivered);
        }
        assert_eq!(mailer.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_cancel_sender_stops_idle_runner() {
        let store = Arc::new(InMemoryScheduleStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            Arc::new(CountingMailer::default()),
            clock.clone(),
            RetryPolicy::default(),
            Duration::from_secs(5),
        ));
        let runner = WorkerRunner::new(store, dispatcher, clock, WorkerConfig::default(), "w".into());

        let (cancel_tx, cancel_rx) = watch::channel(false);
        drop(cancel_tx);
        time::timeout(Duration::from_secs(60), runner.run(cancel_rx))
            .await
            .expect("runner should stop once the cancel sender is dropped");
    }
}
