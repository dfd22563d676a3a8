use std::{net::SocketAddr, sync::Arc};

use reqwest::Client;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epayment::api::{self, AppState};
use epayment::config::Config;
use epayment::db::{self, PgCodeStore, PgTransactionStore};
use epayment::jobs::{self, Collaborators, ExpiredTransactionReconciler, LastRun, TickRunner};
use epayment::services::{
    HttpContactImportService, HttpCourseService, HttpMarketplaceService, HttpSyncContactService,
    TracingErrorTracker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "epayment=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting epayment reconciler...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Wire collaborators
    let client = Client::builder().build()?;
    let deps = Collaborators {
        transactions: Arc::new(PgTransactionStore::new(pool.clone())),
        codes: Arc::new(PgCodeStore::new(pool.clone())),
        courses: Arc::new(HttpCourseService::new(
            client.clone(),
            config.cancel_course_url.clone(),
        )),
        sync_contacts: Arc::new(HttpSyncContactService::new(
            client.clone(),
            &config.bifrost_api_url,
            &config.marol_api_url,
            config.marol_api_key.clone(),
        )),
        marketplace: Arc::new(HttpMarketplaceService::new(
            client.clone(),
            &config.magento_api_url,
            config.magento_access_token.clone(),
        )),
        contacts: Arc::new(HttpContactImportService::new(
            client,
            &config.marol_api_url,
            config.marol_api_key.clone(),
        )),
        error_tracker: Arc::new(TracingErrorTracker),
    };

    let reconciler = ExpiredTransactionReconciler::new(
        deps,
        config.transaction_timeout(),
        config.lookback(),
    );

    // Start the reconciliation schedule
    let last_run = LastRun::default();
    let runner = TickRunner::new(Arc::new(reconciler), last_run.clone());
    let mut scheduler = jobs::start_scheduler(runner, config.reconcile_interval()).await?;

    // Build router
    let app = api::router(AppState {
        pool: pool.clone(),
        last_run,
    });

    let host: std::net::IpAddr = config.host.parse()?;
    let addr = SocketAddr::from((host, config.port));
    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await?;
    tracing::info!("Reconciliation scheduler stopped");

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("Shutdown signal received, cleaning up...");
}
