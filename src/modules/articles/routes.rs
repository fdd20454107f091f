use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

use super::handlers;

pub fn article_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/articles",
            get(handlers::list_articles).post(handlers::create_article),
        )
        .route(
            "/articles/{slug}",
            get(handlers::article_detail)
                .put(handlers::update_article)
                .delete(handlers::delete_article),
        )
        .route("/articles/{slug}/like", post(handlers::toggle_like))
}
