//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use tokio::sync::{Notify, watch};
use tower::ServiceExt;

use reminder_api::session::{SessionClaims, sign};
use reminder_api::{AppState, build_app};
use reminder_core::config::{AuthConfig, NotifyConfig, ServerConfig, WorkerConfig};
use reminder_core::types::UserId;
use reminder_mail::{MailError, MailMessage, MailTransport};
use reminder_service::{EventService, Identity, InMemoryEventStore};
use reminder_worker::{
    Dispatcher, InMemoryScheduleStore, JobEvents, ManualClock, ReminderScheduler, RetryPolicy,
    WorkerRunner,
};

pub const JWT_SECRET: &str = "integration-secret";

/// 2025-03-10 08:00 in the server's local frame.
pub fn morning() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 10)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .expect("valid fixture time")
}

/// Mail transport that follows a script of results, then succeeds.
#[derive(Default)]
pub struct ScriptedMailer {
    script: Mutex<VecDeque<Result<(), String>>>,
    always_fail: bool,
    pub sent: Mutex<Vec<MailMessage>>,
    pub attempts: Mutex<u32>,
}

impl ScriptedMailer {
    pub fn reliable() -> Self {
        Self::default()
    }

    pub fn failing_first(failures: usize) -> Self {
        Self {
            script: Mutex::new((0..failures).map(|_| Err("relay refused".to_string())).collect()),
            ..Self::default()
        }
    }

    pub fn broken() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> u32 {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl MailTransport for ScriptedMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        *self.attempts.lock().unwrap() += 1;
        if self.always_fail {
            return Err(MailError::Transport("connection reset".into()));
        }
        let step = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
        match step {
            Ok(()) => {
                self.sent.lock().unwrap().push(message.clone());
                Ok(())
            }
            Err(e) => Err(MailError::Transport(e)),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// In-memory wiring of the whole service.
pub struct TestApp {
    pub router: Router,
    pub events: Arc<InMemoryEventStore>,
    pub jobs: Arc<InMemoryScheduleStore>,
    pub clock: Arc<ManualClock>,
    pub job_events: JobEvents,
    pub wakeup: Arc<Notify>,
    pub service: Arc<EventService>,
    pub notify: NotifyConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_notify(NotifyConfig {
            backoff_base_seconds: 0,
            ..NotifyConfig::default()
        })
    }

    pub fn with_notify(notify: NotifyConfig) -> Self {
        let events = Arc::new(InMemoryEventStore::new());
        let jobs = Arc::new(InMemoryScheduleStore::new());
        let clock = Arc::new(ManualClock::at_local(morning()));
        let job_events = JobEvents::new();
        let wakeup = Arc::new(Notify::new());

        let scheduler = Arc::new(
            ReminderScheduler::new(jobs.clone(), clock.clone(), notify.clone())
                .with_events(job_events.clone())
                .with_wakeup(Arc::clone(&wakeup)),
        );
        let service = Arc::new(EventService::new(events.clone(), scheduler));

        let auth = AuthConfig {
            jwt_secret: JWT_SECRET.to_string(),
            ..AuthConfig::default()
        };
        let state = AppState::new(Arc::clone(&service), jobs.clone(), &auth);
        let router = build_app(state, &ServerConfig::default());

        Self {
            router,
            events,
            jobs,
            clock,
            job_events,
            wakeup,
            service,
            notify,
        }
    }

    /// Start a dispatcher runner over the in-memory queue.
    pub fn spawn_worker(
        &self,
        mailer: Arc<ScriptedMailer>,
    ) -> (watch::Sender<bool>, tokio::task::JoinHandle<()>) {
        let dispatcher = Arc::new(
            Dispatcher::new(
                self.jobs.clone(),
                mailer,
                self.clock.clone(),
                RetryPolicy::from_config(&self.notify),
                Duration::from_secs(5),
            )
            .with_events(self.job_events.clone()),
        );
        let config = WorkerConfig {
            poll_interval_seconds: 1,
            ..WorkerConfig::default()
        };
        let runner = WorkerRunner::new(
            self.jobs.clone(),
            dispatcher,
            self.clock.clone(),
            config,
            "test-worker-0".into(),
        )
        .with_wakeup(Arc::clone(&self.wakeup));

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(cancel_rx).await });
        (cancel_tx, handle)
    }

    /// A session token for `identity`, valid for an hour.
    pub fn token_for(identity: &Identity) -> String {
        let claims = SessionClaims {
            user_id: identity.user_id,
            email: identity.email.clone(),
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp(),
        };
        sign(&claims, JWT_SECRET).expect("sign test token")
    }

    pub fn user(email: &str) -> Identity {
        Identity::new(UserId::new(), email)
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        auth: Auth<'_>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");

        req = match auth {
            Auth::None => req,
            Auth::Bearer(token) => req.header(header::AUTHORIZATION, format!("Bearer {token}")),
            Auth::Cookie(token) => req.header(header::COOKIE, format!("theme=dark; auth-token={token}")),
        };

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// How a test request authenticates.
#[derive(Debug, Clone, Copy)]
pub enum Auth<'a> {
    None,
    Bearer(&'a str),
    Cookie(&'a str),
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}
