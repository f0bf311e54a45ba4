//! Event reminder server.
//!
//! Main entry point that wires all crates together: the HTTP API, the
//! dispatcher worker, and the queue maintenance cron.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tracing_subscriber::{EnvFilter, fmt};

use reminder_api::AppState;
use reminder_core::config::{AppConfig, LogFormat};
use reminder_core::error::AppError;
use reminder_database::DatabasePool;
use reminder_database::repositories::{EventRepository, JobRepository};
use reminder_service::{EventService, PgEventStore};
use reminder_worker::{
    Clock, Dispatcher, JobEvents, MaintenanceScheduler, MaintenanceTasks, PgScheduleStore,
    ReminderScheduler, RetryPolicy, ScheduleStore, SystemClock, WorkerRunner,
};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from file, environment overlay, and variables.
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("REMINDER_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let env = std::env::var("REMINDER_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load(&config_path, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting event reminder v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db = DatabasePool::connect(&config.database).await?;
    reminder_database::migration::run_migrations(db.pool()).await?;
    let db_pool = db.pool().clone();

    // ── Step 2: Stores and collaborators ─────────────────────────
    let job_repo = Arc::new(JobRepository::new(db_pool.clone()));
    let event_repo = Arc::new(EventRepository::new(db_pool.clone()));

    let schedule_store: Arc<dyn ScheduleStore> = Arc::new(PgScheduleStore::new(job_repo));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let job_events = JobEvents::new();
    let wakeup = Arc::new(Notify::new());

    let mailer = reminder_mail::build_transport(&config.mail)?;
    tracing::info!(transport = mailer.name(), "Mail transport ready");

    // ── Step 3: Scheduler + services ─────────────────────────────
    let scheduler = Arc::new(
        ReminderScheduler::new(
            Arc::clone(&schedule_store),
            Arc::clone(&clock),
            config.notify.clone(),
        )
        .with_events(job_events.clone())
        .with_wakeup(Arc::clone(&wakeup)),
    );
    let event_service = Arc::new(EventService::new(
        Arc::new(PgEventStore::new(event_repo)),
        Arc::clone(&scheduler),
    ));

    // ── Step 4: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 5: Dispatcher worker ────────────────────────────────
    let worker_handle = if config.worker.enabled {
        let dispatcher = Arc::new(
            Dispatcher::new(
                Arc::clone(&schedule_store),
                mailer,
                Arc::clone(&clock),
                RetryPolicy::from_config(&config.notify),
                Duration::from_secs(config.notify.send_timeout_seconds.max(1)),
            )
            .with_events(job_events.clone()),
        );

        let worker_id = format!("{}-{}-0", config.worker.id_prefix, std::process::id());
        let runner = WorkerRunner::new(
            Arc::clone(&schedule_store),
            dispatcher,
            Arc::clone(&clock),
            config.worker.clone(),
            worker_id,
        )
        .with_wakeup(Arc::clone(&wakeup));

        let worker_cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            runner.run(worker_cancel).await;
        }))
    } else {
        tracing::info!("Dispatcher worker disabled");
        None
    };

    // ── Step 6: Maintenance cron ─────────────────────────────────
    let mut maintenance = if config.worker.maintenance {
        let tasks = MaintenanceTasks::new(
            Arc::clone(&schedule_store),
            Arc::clone(&clock),
            &config.notify,
        );
        // Recover anything a previous process left in flight
        if let Err(e) = tasks.requeue_stale().await {
            tracing::warn!(error = %e, "Startup stale recovery failed");
        }

        let scheduler = MaintenanceScheduler::new(tasks).await?;
        scheduler.register_default_tasks().await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        None
    };

    // ── Step 7: HTTP server ──────────────────────────────────────
    let server_handle = if config.server.enabled {
        let state = AppState::new(event_service, Arc::clone(&schedule_store), &config.auth);
        let app = reminder_api::build_app(state, &config.server);
        let listener = reminder_api::bind(&config.server).await?;
        let server_cancel = shutdown_rx.clone();
        Some(tokio::spawn(reminder_api::serve(listener, app, server_cancel)))
    } else {
        tracing::info!("HTTP server disabled");
        None
    };

    // ── Step 8: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    if let Some(handle) = server_handle {
        match tokio::time::timeout(grace, handle).await {
            Ok(Ok(Err(e))) => tracing::error!(error = %e, "HTTP server stopped with error"),
            Ok(Err(e)) => tracing::error!(error = %e, "HTTP server task panicked"),
            Err(_) => tracing::warn!("HTTP server did not drain in time"),
            Ok(Ok(Ok(()))) => {}
        }
    }
    if let Some(handle) = worker_handle {
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Worker did not stop in time; in-flight reminders will be recovered");
        }
    }
    if let Some(scheduler) = maintenance.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Maintenance scheduler shutdown failed");
        }
    }

    db.close().await;
    tracing::info!("Event reminder server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
