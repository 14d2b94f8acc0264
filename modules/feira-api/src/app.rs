use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use feira_search::SearchService;

use crate::auth::attach_identity;
use crate::db::{LogRepository, ProductCatalog};
use crate::jwt::JwtService;
use crate::request_log::record_request;
use crate::rest;

#[derive(Clone)]
pub struct AppState {
    pub search: SearchService,
    pub products: Arc<dyn ProductCatalog>,
    pub logs: Arc<dyn LogRepository>,
    pub jwt: JwtService,
}

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/", get(rest::index))
        .route("/health", get(rest::health))
        // Search
        .route("/api/search/intelligent", get(rest::search::intelligent_search))
        .route("/api/search/products", get(rest::search::product_search))
        // Request log (admin)
        .route("/api/logs", get(rest::logs::list_logs))
        .route("/api/logs/stats", get(rest::logs::log_stats))
        // Outermost runs first: identity, then the request log that reads it.
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .layer(middleware::from_fn_with_state(state.clone(), attach_identity))
        .with_state(state)
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}
