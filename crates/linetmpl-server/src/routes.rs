// SPDX-License-Identifier: Apache-2.0 OR MIT
//! HTTP routing configuration.
//!
//! - GET /health         - Health check
//! - GET /:name          - Parsed tree of `<name>.tpl` as `{"data": tree}`
//! - GET /:name/editor   - Inline editor page for `<name>.tpl`

use axum::{http::Method, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{handlers, AppState};

/// Create the router with all routes and middleware configured.
pub fn create_router(state: AppState) -> Router {
    // Editors may be served from another origin during development.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new())
        .on_response(DefaultOnResponse::new());

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/:name", get(handlers::get_tree))
        .route("/:name/editor", get(handlers::get_editor))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
