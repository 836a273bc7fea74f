//! API — Axum web server exposing the engine's operation surface.
//!
//! The engine is transport-agnostic; this module is one binding of the
//! logical operations (create/recommend/place/settle/status/list) to
//! JSON-over-HTTP for the page-rendering layer and the reporting
//! dashboard. CORS enabled for local development.

pub mod routes;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use routes::AppState;

/// Start the API server.
///
/// This spawns a background task — it doesn't block.
pub fn spawn_server(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "API server starting on http://localhost:{port}");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind API port");

        axum::serve(listener, app).await.expect("API server error");
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(
            "/api/accounts",
            post(routes::create_account).get(routes::list_accounts),
        )
        .route("/api/accounts/:id/recommend", post(routes::recommend_stake))
        .route(
            "/api/accounts/:id/wagers",
            post(routes::place_wager).get(routes::list_wagers),
        )
        .route("/api/accounts/:id/status", get(routes::get_status))
        .route("/api/wagers/:id/settle", post(routes::settle_wager))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
