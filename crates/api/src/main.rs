use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailivo_api::config::ServerConfig;
use mailivo_api::router::build_app_router;
use mailivo_api::state::AppState;
use mailivo_clients::{LandivoClient, MailivoApiClient};
use mailivo_db::{PgAutomationStore, PgExecutionLog};
use mailivo_engine::{AutomationListener, Collaborators, Dispatcher};
use mailivo_events::{EventBus, ScheduleTicker};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailivo_api=debug,mailivo_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid configuration");
    tracing::info!(
        host = %config.host,
        port = config.port,
        scheduler_enabled = config.scheduler_enabled,
        max_concurrency = config.engine.max_concurrency,
        "Loaded server configuration"
    );

    // --- Database ---
    let pool = mailivo_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    mailivo_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    mailivo_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Collaborators ---
    let http = mailivo_clients::build_http_client(Duration::from_secs(config.upstream_timeout_secs))
        .expect("Failed to build HTTP client");
    let landivo = Arc::new(LandivoClient::with_client(http.clone(), &config.landivo_api_url));
    let mailivo = Arc::new(MailivoApiClient::with_client(
        http,
        &config.mailivo_api_url,
        config.mailivo_api_token.clone(),
    ));
    let automations = Arc::new(PgAutomationStore::new(pool.clone()));
    let executions = Arc::new(PgExecutionLog::new(pool.clone()));

    let dispatcher = Arc::new(Dispatcher::new(
        Collaborators {
            automations: automations.clone(),
            properties: landivo.clone(),
            buyers: landivo,
            templates: mailivo.clone(),
            campaigns: mailivo,
            executions: executions.clone(),
        },
        &config.engine,
    ));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let listener_handle = tokio::spawn(AutomationListener::run(
        Arc::clone(&dispatcher),
        event_bus.subscribe(),
    ));

    let ticker_cancel = tokio_util::sync::CancellationToken::new();
    let ticker_handle = config.scheduler_enabled.then(|| {
        let ticker = ScheduleTicker::new(Arc::clone(&event_bus));
        let cancel = ticker_cancel.clone();
        tokio::spawn(async move {
            ticker.run(cancel).await;
        })
    });
    tracing::info!("Event services started (automation listener, schedule ticker)");

    // --- App state ---
    let state = AppState {
        automations,
        executions,
        dispatcher,
        pool: Some(pool),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse().expect("Invalid HOST address"), config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    ticker_cancel.cancel();
    if let Some(handle) = ticker_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    // Dropping the last bus handle closes the channel and stops the listener.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), listener_handle).await;
    tracing::info!("Event services shut down");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
