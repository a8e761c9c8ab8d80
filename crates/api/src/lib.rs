//! HTTP and WebSocket front end for the restaurant order engine.
//!
//! Every request carries the caller's identity in trusted headers; handlers
//! call into the [`engine::Engine`] and map its errors to HTTP statuses.
//! Live updates go through the [`realtime::RealtimeGateway`] at `/ws`.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;
pub mod seed;
pub mod state;

use axum::Router;
use axum::routing::{get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create).get(routes::orders::list))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/status", patch(routes::orders::update_status))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .route("/orders/{id}/items", post(routes::orders::add_item))
        .route(
            "/orders/{id}/items/{index}",
            patch(routes::orders::update_item).delete(routes::orders::remove_item),
        )
        .route("/orders/{id}/discount", post(routes::orders::discount))
        .route("/orders/{id}/checkout", post(routes::orders::checkout))
        .route("/payments/settled", post(routes::payments::settled))
        .route("/kot", get(routes::kitchen::list))
        .route("/kot/{id}", get(routes::kitchen::get))
        .route(
            "/kot/{id}/items/{index}/status",
            patch(routes::kitchen::update_line_status),
        )
        .route("/kot/{id}/complete", patch(routes::kitchen::complete))
        .route("/tables", get(routes::tables::list).post(routes::tables::create))
        .route("/tables/{id}/status", patch(routes::tables::update_status))
        .route(
            "/tables/{id}/reservations",
            post(routes::tables::add_reservation),
        )
        .route("/stock", get(routes::stock::list).post(routes::stock::create))
        .route("/stock/{sku}/restock", post(routes::stock::restock))
        .route("/stats", get(routes::live::stats))
        .route("/snapshot", get(routes::live::snapshot))
        .route("/events", get(routes::live::events))
        .route("/ws", get(routes::ws::handle))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
