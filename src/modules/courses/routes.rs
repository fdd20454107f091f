use axum::routing::{get, post, put};
use axum::Router;

use crate::app_state::AppState;

use super::handlers;

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/courses",
            get(handlers::list_courses).post(handlers::create_course),
        )
        .route(
            "/courses/{course_id}",
            get(handlers::course_detail)
                .put(handlers::update_course)
                .delete(handlers::delete_course),
        )
        .route("/courses/{course_id}/students", get(handlers::course_students))
        .route("/courses/{course_id}/lessons", post(handlers::create_lesson))
        .route(
            "/lessons/{lesson_id}",
            put(handlers::update_lesson).delete(handlers::delete_lesson),
        )
}
