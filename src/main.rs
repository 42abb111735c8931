use axum::{
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use salon_queue::app_state::AppState;
use salon_queue::config::AppConfig;
use salon_queue::db::{self, queries::PgQueueHistory};
use salon_queue::directory::PgSalonDirectory;
use salon_queue::routes;
use salon_queue::services::fanout::EventBus;
use salon_queue::services::store::QueueStore;
use salon_queue::services::sweeper;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing salon-queue server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("queue_joins_total", "Customers who joined a queue");
    metrics::describe_counter!("queue_leaves_total", "Customers who left voluntarily");
    metrics::describe_counter!(
        "queue_notifications_total",
        "Turn-approaching notifications sent"
    );
    metrics::describe_counter!(
        "check_ins_auto_approved_total",
        "Check-ins auto-approved by the verification engine"
    );
    metrics::describe_counter!(
        "check_ins_review_total",
        "Check-ins routed to manual staff review"
    );
    metrics::describe_counter!("queue_services_started_total", "Services started");
    metrics::describe_counter!("queue_services_completed_total", "Services completed");
    metrics::describe_counter!(
        "queue_no_shows_total",
        "Entries expired after the post-notification grace period"
    );
    metrics::describe_gauge!("queue_depth", "Live entries per salon queue");

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Wire the queue core: write-ahead history, fanout bus, per-salon store
    let history = Arc::new(PgQueueHistory::new(db_pool.clone()));
    let bus = Arc::new(EventBus::default());
    let directory = Arc::new(PgSalonDirectory::new(db_pool.clone()));
    let store = Arc::new(QueueStore::new(history, bus, config.queue_policy()));

    // Rebuild live queues from the durable history
    tracing::info!("Restoring live queues from history");
    let restored = store
        .restore(directory.as_ref())
        .await
        .expect("Failed to restore queues from history");
    tracing::info!(entries = restored, "queue restore complete");

    // Start the grace-period no-show sweeper
    let sweep_interval = Duration::from_secs(config.sweep_interval_seconds);
    tokio::spawn(sweeper::run(Arc::clone(&store), sweep_interval));

    // Create shared application state
    let state = AppState::new(db_pool, store, directory, &config.jwt_secret);

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/api/v1/salons/{salon_id}/queue",
            post(routes::queue::join_queue).get(routes::queue::salon_snapshot),
        )
        .route(
            "/api/v1/queue/{entry_id}",
            delete(routes::queue::leave_queue),
        )
        .route(
            "/api/v1/queue/{entry_id}/check-in",
            post(routes::queue::submit_check_in),
        )
        .route(
            "/api/v1/salons/{salon_id}/advance",
            post(routes::queue::staff_advance),
        )
        .route(
            "/api/v1/queue/{entry_id}/complete",
            post(routes::queue::staff_complete),
        )
        .route(
            "/api/v1/queue/{entry_id}/arrival",
            post(routes::queue::staff_confirm_arrival),
        )
        .route(
            "/api/v1/queue/{entry_id}/review",
            post(routes::queue::submit_review),
        )
        .route(
            "/api/v1/salons/{salon_id}/stream",
            get(routes::stream::salon_stream),
        )
        .route("/api/v1/me/stream", get(routes::stream::user_stream))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // 64 KB limit

    tracing::info!("Starting salon-queue on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
