use axum::routing::{get, post, put};
use axum::Router;

use crate::app_state::AppState;

use super::handlers;

pub fn assignment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/courses/{course_id}/assignments",
            get(handlers::list_assignments).post(handlers::create_assignment),
        )
        .route(
            "/assignments/{assignment_id}",
            get(handlers::get_assignment)
                .put(handlers::update_assignment)
                .delete(handlers::delete_assignment),
        )
        .route(
            "/assignments/{assignment_id}/submissions",
            post(handlers::submit).get(handlers::list_submissions),
        )
        .route(
            "/submissions/{submission_id}/grade",
            put(handlers::grade_submission),
        )
        .route("/my/submissions", get(handlers::my_submissions))
}
