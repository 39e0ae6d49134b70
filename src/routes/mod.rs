pub mod query_routes;

use std::path::Path;

use axum::{Router, routing::post};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::service::query_service::QueryService;
use query_routes::query_handler;

/// `POST /query` plus the built widget served as static files.
pub fn app(service: QueryService, static_dir: &Path) -> Router {
    let index = ServeFile::new(static_dir.join("index.html"));

    Router::new()
        .route("/query", post(query_handler))
        .fallback_service(ServeDir::new(static_dir).fallback(index))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
