use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

use super::handlers;

pub fn learning_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/courses/{course_id}/enroll",
            post(handlers::enroll).delete(handlers::unenroll),
        )
        .route(
            "/courses/{course_id}/progress",
            get(handlers::get_progress).put(handlers::mark_lesson),
        )
        .route("/my/courses", get(handlers::my_courses))
        .route("/my/certificates", get(handlers::my_certificates))
        .route("/certificates/{certificate_id}", get(handlers::get_certificate))
}
