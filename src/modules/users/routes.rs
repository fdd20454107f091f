use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

use super::handlers;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/token", post(handlers::login))
        .route("/auth/token/refresh", post(handlers::refresh_token))
        .route("/users/me", get(handlers::me).put(handlers::update_me))
        .route("/users/me/change-password", post(handlers::change_password))
        .route("/users/me/dashboard", get(handlers::dashboard))
}
