//! carbon-tracker server entry point.
//!
//! Loads configuration, wires the store, services, and notification worker,
//! and serves the REST API until Ctrl+C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

use carbon_tracker::api;
use carbon_tracker::app_state::AppState;
use carbon_tracker::config::{LogFormat, StoreBackend, TrackerConfig};
use carbon_tracker::domain::{EmissionFactorTable, EventBus, TipCatalog};
use carbon_tracker::persistence::{MemoryStore, PostgresStore, Store};
use carbon_tracker::service::{
    EmissionService, LogMailer, NotificationDispatcher, NotificationWorker, SubscriptionService,
    tally_outcomes,
};

/// How long the notification worker may take to drain after the server stops.
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = TrackerConfig::from_env().context("loading configuration")?;
    init_logging(config.log_format);
    tracing::info!(addr = %config.listen_addr, backend = ?config.store_backend, "starting carbon-tracker");

    // Build domain layer
    let factors = EmissionFactorTable::from_path(&config.emission_factors_path)
        .with_context(|| format!("loading {}", config.emission_factors_path.display()))?;
    let event_bus = EventBus::new(config.event_bus_capacity);

    // Build persistence layer
    let store = build_store(&config).await?;

    // Start notification worker
    let (dispatcher, worker) = if config.notifications_enabled {
        let monitor = tokio::spawn(tally_outcomes(event_bus.subscribe()));
        let mailer = Arc::new(LogMailer::new(config.mail_api_key.as_deref()));
        let worker = NotificationWorker::new(
            mailer,
            TipCatalog::default(),
            config.from_email.clone(),
            event_bus,
        );
        let (dispatcher, handle) =
            NotificationDispatcher::start(worker, config.notification_queue_capacity);
        (dispatcher, Some((handle, monitor)))
    } else {
        tracing::warn!("notifications disabled");
        (NotificationDispatcher::disabled(), None)
    };

    // Build service layer
    let emission_service = EmissionService::new(Arc::new(factors), Arc::clone(&store));
    let subscription_service = SubscriptionService::new(store, dispatcher);
    let app_state = AppState::new(emission_service, subscription_service);

    // Build router
    let app = api::build_app(app_state, &config)?;

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and with it every dispatcher clone) is gone; let the
    // worker finish what is queued. The monitor ends once the worker's bus
    // handle is dropped.
    if let Some((handle, monitor)) = worker {
        match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, handle).await {
            Ok(Ok(())) => {
                tracing::info!("notification worker drained");
                if let Err(e) = monitor.await {
                    tracing::error!(error = %e, "notification monitor failed");
                }
            }
            Ok(Err(e)) => tracing::error!(error = %e, "notification worker failed"),
            Err(_) => tracing::warn!("notification worker did not drain in time"),
        }
    }

    tracing::info!("server stopped");
    Ok(())
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn build_store(config: &TrackerConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let store = PostgresStore::connect(config)
                .await
                .context("connecting to PostgreSQL")?;
            if config.run_migrations {
                store.migrate().await.context("running migrations")?;
            }
            tracing::info!("using PostgreSQL store");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
