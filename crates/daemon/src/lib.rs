//! Pre-production daemon: project, script and storyboard CRUD over SQLite,
//! generative provider calls, and the timeline editor API.
//!
//! The router is built here so the binary and the integration tests share it.

use axum::{extract::State, response::Json, routing::get, Router};
use engine::pricing::Provider;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod providers;
pub mod state;

use state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
    providers: Vec<Provider>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
        providers: state.providers.configured(),
    })
}

pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/health", get(health))
        .with_state(state.clone())
        .nest("/api", api::router(state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
}
