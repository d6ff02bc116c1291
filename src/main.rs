use axum::{routing::get, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod auth;
mod config;
mod content;
mod database;
mod entitlement;
mod error;
mod handlers;
mod permissions;
mod storage;

use content::{AccessResolver, ContentLocator};
use database::{DatabaseManager, PgMediaStore, PgProductStore};
use entitlement::EntitlementClient;
use handlers::AppState;
use permissions::PgAccessPolicyStore;
use storage::{HttpObjectStore, UrlSigner};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting Folio API in {:?} mode", config.environment);

    let pool = DatabaseManager::pool()
        .await
        .unwrap_or_else(|e| panic!("failed to connect to database: {}", e));

    let locator = ContentLocator::new(
        Arc::new(PgProductStore::new(pool.clone())),
        Arc::new(PgMediaStore::new(pool.clone())),
    );
    let resolver = AccessResolver::new(
        locator,
        Arc::new(EntitlementClient::new(config.entitlement.clone())),
        Arc::new(PgAccessPolicyStore::new(pool)),
        Arc::new(UrlSigner::new(
            Arc::new(HttpObjectStore::new(config.signing.clone())),
            config.signing.clone(),
        )),
    );

    let state = AppState {
        resolver: Arc::new(resolver),
    };

    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("FOLIO_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Folio API listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server");
}

fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Anonymous open-access flow
        .route("/content/:product_id/open", get(handlers::content::get_open_content))
        // Entitlement-gated content
        .route(
            "/api/content/external/:external_id",
            get(handlers::content::get_content_by_external_id),
        )
        .route("/api/content/:product_id", get(handlers::content::get_content))
        .with_state(state)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Folio API",
            "version": version,
            "description": "Content-delivery and product-metadata API for digital publishing",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "open_content": "/content/:product_id/open (public - open-access and before-paywall content)",
                "content": "/api/content/:product_id (bearer token - entitlement-gated content)",
                "content_by_external_id": "/api/content/external/:external_id (bearer token - DOI-addressed content)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
