use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;

use config::Config;
use services::push::PushClient;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub push: Arc<PushClient>,
    pub ws_tx: Option<broadcast::Sender<String>>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liftlog_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env();
    let config = Arc::new(config);

    // Database
    let db = db::create_pool(&config.database_url).await;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    let push = Arc::new(PushClient::new(&config).expect("Failed to build push client"));

    // WebSocket broadcast channel
    let (ws_tx, _) = broadcast::channel::<String>(256);

    let state = AppState {
        db,
        config: config.clone(),
        push,
        ws_tx: Some(ws_tx),
    };

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route(
            "/api/cron/supplement-reminders",
            post(handlers::cron::supplement_reminder_sweep),
        )
        .route("/ws", get(handlers::ws::ws_handler));

    let protected_routes = Router::new()
        // Exercise logs
        .route("/api/logs", post(handlers::logs::upsert_log))
        .route("/api/logs", get(handlers::logs::list_logs))
        // Personal records
        .route(
            "/api/records/leaderboard",
            get(handlers::records::get_leaderboard),
        )
        .route(
            "/api/records/:exercise_id",
            get(handlers::records::get_rep_buckets),
        )
        // Supplement schedule & daily state
        .route(
            "/api/supplements/schedule",
            get(handlers::supplements::list_schedules),
        )
        .route(
            "/api/supplements/schedule",
            put(handlers::supplements::upsert_schedule),
        )
        .route(
            "/api/supplements/schedule/:day_of_week",
            delete(handlers::supplements::delete_schedule),
        )
        .route(
            "/api/supplements/today",
            get(handlers::supplements::today_status),
        )
        .route("/api/supplements/log", post(handlers::supplements::mark_log))
        .route(
            "/api/supplements/log",
            delete(handlers::supplements::unmark_log),
        )
        // Push subscriptions
        .route(
            "/api/notifications/vapid",
            get(handlers::notifications::vapid_public_key),
        )
        .route(
            "/api/notifications/subscribe",
            post(handlers::notifications::subscribe),
        )
        .route(
            "/api/notifications/subscribe",
            delete(handlers::notifications::unsubscribe),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .unwrap()];
        // In dev, also allow LAN access (e.g. testing from another device)
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for o in extra.split(',') {
                if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    // In-process sweep for deployments without an external cron
    if config.reminder_worker_enabled {
        services::reminders::spawn_reminder_worker(state.clone());
    }

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
