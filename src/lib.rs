use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub mod client_ip;
pub mod config;
pub mod error;
pub mod geo;
pub mod record;
pub mod routes;
pub mod store;

use geo::GeoProvider;
use store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub tera: tera::Tera,
    pub geo: Arc<dyn GeoProvider>,
    pub store: Arc<dyn RecordStore>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::visitor::index))
        .route("/api/visitor-info", get(routes::visitor::visitor_info))
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
