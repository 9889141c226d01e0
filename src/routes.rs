use crate::{handlers, startup::AppState};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/memes", get(handlers::list_memes).post(handlers::create_meme))
        .route("/api/memes/{id}/vote", post(handlers::vote_meme))
        .route("/api/memes/{id}/bid", post(handlers::bid_meme))
        .route("/api/memes/{id}/caption", post(handlers::regenerate_caption))
        .route("/api/leaderboard", get(handlers::leaderboard))
        .route("/api/events", get(handlers::subscribe_events))
        .route("/api/health", get(handlers::health))
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
