use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

use super::handlers;

pub fn webinar_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/webinars",
            get(handlers::list_webinars).post(handlers::create_webinar),
        )
        .route(
            "/webinars/{slug}",
            get(handlers::webinar_detail)
                .put(handlers::update_webinar)
                .delete(handlers::delete_webinar),
        )
        .route(
            "/webinars/{slug}/register",
            post(handlers::register).delete(handlers::unregister),
        )
}
