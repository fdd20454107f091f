use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

use super::handlers;

pub fn quiz_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/courses/{course_id}/quizzes",
            get(handlers::list_quizzes).post(handlers::create_quiz),
        )
        .route(
            "/quizzes/{quiz_id}",
            get(handlers::get_quiz)
                .put(handlers::update_quiz)
                .delete(handlers::delete_quiz),
        )
        .route("/quizzes/{quiz_id}/results", post(handlers::submit_result))
        .route("/my/quiz-results", get(handlers::my_results))
}
