//! Fleet Document-Expiry Notification Service
//!
//! REST backend with SQLite persistence that reminds subscribed users about
//! vehicle, driver and user documents nearing or past their expiry date.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod jobs;
mod models;
mod notify;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use jobs::{ExpiryJob, ExpiryScheduler};
use notify::{LogMailer, Mailer, NotificationDispatcher, SmtpMailer, SubscriberResolver};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
    pub expiry_job: ExpiryJob,
}

impl AppState {
    /// Wire the notification engine on top of a repository and mail transport.
    pub fn new(repo: Arc<Repository>, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        let resolver = SubscriberResolver::new(repo.clone());
        let dispatcher =
            NotificationDispatcher::new(repo.clone(), mailer, config.app_base_url.clone());
        let expiry_job = ExpiryJob::new(repo.clone(), resolver, dispatcher);

        Self {
            repo,
            config: Arc::new(config),
            expiry_job,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!("Starting fleet document-expiry service");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.job_secret.is_none() {
        tracing::warn!(
            "No job secret configured (FLEET_JOB_SECRET). Job endpoints accept staff sessions only"
        );
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Using SMTP mail transport");
            Arc::new(SmtpMailer::new(smtp, &config.mail_from)?)
        }
        None => {
            tracing::warn!("No SMTP relay configured (FLEET_SMTP_HOST). Emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    // Create application state
    let state = AppState::new(repo, config.clone(), mailer);

    if let Some(secs) = config.expiry_schedule_secs {
        let scheduler = ExpiryScheduler::new(state.expiry_job.clone(), secs);
        tokio::spawn(scheduler.run());
    }

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Scheduler-triggered jobs
    let job_routes = Router::new()
        .route(
            "/check-expiring-vehicle-documents",
            get(api::check_expiring_vehicle_documents).post(api::check_expiring_vehicle_documents),
        )
        .route(
            "/check-expiring-driver-documents",
            get(api::check_expiring_driver_documents).post(api::check_expiring_driver_documents),
        )
        .route(
            "/check-expiring-user-documents",
            get(api::check_expiring_user_documents).post(api::check_expiring_user_documents),
        )
        .route(
            "/check-expiring-documents",
            get(api::check_expiring_documents).post(api::check_expiring_documents),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::privileged_auth_layer,
        ));

    // Notification admin
    let admin_routes = Router::new()
        // Topics
        .route("/topics", get(api::list_topics))
        .route("/topics", post(api::create_topic))
        .route("/topics/{id}", put(api::update_topic))
        .route("/topics/{id}", delete(api::delete_topic))
        // Groups
        .route("/groups", get(api::list_groups))
        .route("/groups", post(api::create_group))
        .route("/groups/{id}", delete(api::delete_group))
        .route("/groups/{id}/members", post(api::add_group_member))
        .route(
            "/groups/{id}/members/{user_id}",
            delete(api::remove_group_member),
        )
        .route("/groups/{id}/topics", post(api::subscribe_group))
        .route(
            "/groups/{id}/topics/{topic_id}",
            delete(api::unsubscribe_group),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::privileged_auth_layer,
        ));

    // Inbox
    let inbox_routes = Router::new()
        .route("/notifications", get(api::list_notifications))
        .route(
            "/notifications/{id}/read",
            put(api::mark_notification_read),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_auth_layer,
        ));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/jobs", job_routes)
        .nest("/api", admin_routes.merge(inbox_routes))
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
