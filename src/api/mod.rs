//! API module for shop activity reports
//!
//! Exposes the report builder as a request/response service over REST.

pub mod handlers;
pub mod service;

pub use service::ReportService;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(service: Arc<ReportService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/stats", get(handlers::get_stats))
        .route("/api/v1/employees", get(handlers::get_employees))
        .route("/api/v1/reports/:employee", get(handlers::get_report))
        .route("/api/v1/refresh", post(handlers::refresh))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
