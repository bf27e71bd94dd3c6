use axum::{routing::delete, routing::get, routing::patch, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new().route("/auth/login", post(handlers::login))
}

pub fn users() -> Router<AppState> {
    Router::new().route("/users", post(handlers::create_user))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", post(handlers::create_post))
        .route("/posts/:id", get(handlers::get_post))
        .route("/posts/:id", patch(handlers::update_post))
        .route("/posts/:id", delete(handlers::delete_post))
        .route("/posts/:id/like", post(handlers::toggle_like))
        .route("/posts/:id/likes", get(handlers::list_post_likes))
}

pub fn feed() -> Router<AppState> {
    Router::new().route("/feed", get(handlers::feed))
}

pub fn live() -> Router<AppState> {
    Router::new().route("/live", get(handlers::live))
}
