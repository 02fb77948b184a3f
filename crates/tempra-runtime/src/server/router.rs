//! Route table

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let api = Router::new()
        .route("/token", post(handlers::create_token))
        .route("/token/:token", delete(handlers::delete_token))
        .route("/data/:token", post(handlers::push).get(handlers::poll))
        .route("/ack/:token", post(handlers::ack))
        .route("/status", get(handlers::status));

    let router = Router::new()
        .nest("/api", api)
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
