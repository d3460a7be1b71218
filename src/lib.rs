//! Giftlist Backend - library for app logic and testing
//!
//! Owners keep wishlists of items and hand out share links. Anyone holding a
//! live link can view the list; signed-in viewers can reserve items, and a
//! reservation race always has exactly one winner.

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod logging;
pub mod projection;
pub mod reservation;
pub mod routes;
pub mod share;
pub mod store;
pub mod validation;

use axum::{
    body::Body,
    http::{HeaderValue, Method, Request},
    middleware,
    routing::get,
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::identity::IdentityProvider;
use crate::store::{MemoryStore, PgStore, Store};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Arc<IdentityProvider>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, identity: IdentityProvider) -> Self {
        Self {
            store,
            identity: Arc::new(identity),
        }
    }
}

/// Configure CORS from the configured origins, falling back to the local
/// frontend dev servers.
pub fn configure_cors(config: &AppConfig) -> CorsLayer {
    let mut allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed_origins.is_empty() {
        allowed_origins = vec![
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ];
    }

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState, config: &AppConfig) -> Router {
    let cors = configure_cors(config);

    let api = Router::new()
        .route(
            "/profile",
            get(routes::profile::get_profile)
                .post(routes::profile::create_profile)
                .patch(routes::profile::update_profile),
        )
        .route(
            "/wishlists",
            get(routes::wishlists::list_wishlists).post(routes::wishlists::create_wishlist),
        )
        .route(
            "/wishlists/{id}",
            get(routes::wishlists::get_wishlist)
                .patch(routes::wishlists::update_wishlist)
                .delete(routes::wishlists::delete_wishlist),
        )
        .route(
            "/wishlists/{id}/items",
            get(routes::items::list_items)
                .post(routes::items::create_item)
                .patch(routes::items::update_item)
                .delete(routes::items::delete_item),
        )
        .route(
            "/categories",
            get(routes::categories::list_categories).post(routes::categories::create_category),
        )
        .route(
            "/categories/{id}",
            axum::routing::patch(routes::categories::update_category)
                .delete(routes::categories::delete_category),
        )
        .route(
            "/shares",
            axum::routing::post(routes::shares::create_share)
                .delete(routes::shares::revoke_share),
        )
        .route(
            "/shares/{token}",
            get(routes::shares::view_shared).patch(routes::shares::reserve_item),
        );

    Router::new()
        .nest("/api", api)
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/ready", get(routes::health::health_ready))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::debug_span!(
                    "http",
                    method = %req.method(),
                    path = %logging::middleware::redact_share_token(req.uri().path()),
                )
            }),
        )
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        // Global 2 MB request body cap
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .layer(cors)
}

/// Pick the store: Postgres when `DATABASE_URL` is configured, otherwise
/// the in-memory store.
async fn build_store(config: &AppConfig) -> Result<Arc<dyn Store>, sqlx::Error> {
    match &config.database {
        Some(db_config) => {
            let pool = db::init_pool(db_config).await?;
            db::run_migrations(&pool).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set. Using the in-memory store; data is lost on restart."
            );
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Run the server (used by main).
pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    // Held for the programme's lifetime; dropping them stops the log writers.
    let _log_guards = logging::init(&logging::LogConfig::from_env());

    routes::health::init_start_time();

    let config = AppConfig::from_env();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "refusing to start");
        return Err(e.into());
    }
    let addr: SocketAddr = config.socket_addr()?;

    let store = build_store(&config).await.map_err(|e| {
        tracing::error!(error = %e, "failed to initialize the database");
        e
    })?;
    let identity = IdentityProvider::new(&config.jwt_secret, config.jwt_audience.clone());
    let app = create_app(AppState::new(store, identity), &config);

    tracing::info!(%addr, environment = %config.environment, "starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
