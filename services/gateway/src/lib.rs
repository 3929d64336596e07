pub mod config;
pub mod error;
pub mod mirror;
pub mod provider;
pub mod provider_eas;
pub mod push;
pub mod routes_build;
pub mod routes_health;
pub mod routes_push;
pub mod state;
pub mod store;
pub mod submitter;

#[cfg(test)]
mod testing;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    routes_build::{
        create_build, get_build, get_build_download, get_build_logs, method_not_allowed,
        missing_id, preflight,
    },
    routes_health::get_health,
    routes_push::send_push,
    state::SharedState,
};

const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/build", post(create_build).options(preflight).fallback(method_not_allowed))
        .route("/api/build/", get(missing_id).options(preflight).fallback(method_not_allowed))
        .route("/api/build/:id", get(get_build).options(preflight).fallback(method_not_allowed))
        .route(
            "/api/build/:id/logs",
            get(get_build_logs).options(preflight).fallback(method_not_allowed),
        )
        .route(
            "/api/build/:id/download",
            get(get_build_download).options(preflight).fallback(method_not_allowed),
        )
        .route("/api/push", post(send_push).options(preflight).fallback(method_not_allowed))
        .route("/api/push/send", post(send_push).options(preflight).fallback(method_not_allowed))
        .route("/api/health", get(get_health).options(preflight).fallback(method_not_allowed))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
