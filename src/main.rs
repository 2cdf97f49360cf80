//! account-lifecycle server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints and, when
//! enabled, the background scheduler that applies time-based transitions.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use account_lifecycle::api;
use account_lifecycle::app_state::AppState;
use account_lifecycle::config::{LifecycleConfig, LogFormat};
use account_lifecycle::domain::{Clock, EventBus, SystemClock};
use account_lifecycle::persistence::{
    AccountStore, AuditLogReader, EventLedger, InMemoryStore, PostgresStore,
};
use account_lifecycle::service::{
    AdminCommands, AllowListAuthorizer, EventRecorder, ReportingService, Scheduler,
    TransitionEngine,
};
use account_lifecycle::ws::handler::ws_handler;

/// The three storage handles every service is built from.
struct Stores {
    accounts: Arc<dyn AccountStore>,
    audit: Arc<dyn AuditLogReader>,
    ledger: Arc<dyn EventLedger>,
}

async fn open_stores(config: &LifecycleConfig) -> anyhow::Result<Stores> {
    if config.persistence_enabled {
        let store = Arc::new(
            PostgresStore::connect(config)
                .await
                .context("connecting to PostgreSQL")?,
        );
        tracing::info!("using PostgreSQL persistence");
        Ok(Stores {
            accounts: Arc::clone(&store) as Arc<dyn AccountStore>,
            audit: Arc::clone(&store) as Arc<dyn AuditLogReader>,
            ledger: store,
        })
    } else {
        tracing::warn!("persistence disabled, state is lost on restart");
        let store = Arc::new(InMemoryStore::new());
        Ok(Stores {
            accounts: Arc::clone(&store) as Arc<dyn AccountStore>,
            audit: Arc::clone(&store) as Arc<dyn AuditLogReader>,
            ledger: store,
        })
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal(stop_scheduler: watch::Sender<bool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
    }
    tracing::info!("shutdown requested");
    let _ = stop_scheduler.send(true);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LifecycleConfig::from_env().context("loading configuration")?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting account-lifecycle");

    // Storage and shared infrastructure
    let stores = open_stores(&config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let event_bus = EventBus::new(config.event_bus_capacity);

    // Service layer
    let engine = Arc::new(TransitionEngine::new(
        Arc::clone(&stores.accounts),
        Arc::clone(&clock),
        config.policy(),
        event_bus.clone(),
    ));
    let authorizer = Arc::new(AllowListAuthorizer::new(config.admin_ids.iter()));
    if authorizer.is_empty() {
        tracing::warn!("ADMIN_IDS is empty, every administrative command will be rejected");
    }
    let commands = Arc::new(AdminCommands::new(Arc::clone(&engine), authorizer));
    let reporting = Arc::new(ReportingService::new(
        Arc::clone(&stores.accounts),
        stores.audit,
        Arc::clone(&stores.ledger),
        Arc::clone(&clock),
    ));
    let recorder = Arc::new(EventRecorder::new(
        stores.accounts,
        stores.ledger,
        clock,
    ));

    // Scheduler
    let (stop_tx, stop_rx) = watch::channel(false);
    let scheduler_task = if config.scheduler_enabled {
        let scheduler = Scheduler::new(Arc::clone(&engine), config.scheduler_settings());
        Some(tokio::spawn(scheduler.run(stop_rx)))
    } else {
        tracing::info!("scheduler disabled");
        None
    };

    let app_state = AppState {
        engine,
        commands,
        reporting,
        recorder,
        event_bus,
    };

    // Router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler));
    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::openapi::ApiDoc::openapi()),
        )
    };
    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(stop_tx))
        .await?;

    if let Some(task) = scheduler_task
        && let Err(err) = task.await
    {
        tracing::error!(error = %err, "scheduler task failed");
    }
    tracing::info!("stopped");
    Ok(())
}
