use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::models::{NewQuiz, NewQuizResult, Quiz, QuizResult, UpdateQuiz, User};
use crate::db::Store;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

async fn require_course_owner(store: &Store, course_id: Uuid, user: &User) -> AppResult<()> {
    let course = store.courses.get(course_id).await?;
    if course.instructor_id == user.id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Only the course instructor may do this".to_string(),
        ))
    }
}

pub async fn list_quizzes(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Vec<Quiz>>> {
    // 404 for unknown courses rather than an empty list
    state.store.courses.get(course_id).await?;
    let quizzes = state.store.assessments.list_quizzes(course_id).await?;
    Ok(Json(quizzes))
}

pub async fn create_quiz(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<NewQuiz>,
) -> AppResult<(StatusCode, Json<Quiz>)> {
    payload.validate()?;
    require_course_owner(&state.store, course_id, &user).await?;

    let quiz = state
        .store
        .assessments
        .create_quiz(Quiz::new(payload, course_id))
        .await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

pub async fn get_quiz(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(quiz_id): Path<Uuid>,
) -> AppResult<Json<Quiz>> {
    let quiz = state.store.assessments.get_quiz(quiz_id).await?;
    Ok(Json(quiz))
}

pub async fn update_quiz(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(quiz_id): Path<Uuid>,
    Json(payload): Json<UpdateQuiz>,
) -> AppResult<Json<Quiz>> {
    payload.validate()?;
    let mut quiz = state.store.assessments.get_quiz(quiz_id).await?;
    require_course_owner(&state.store, quiz.course_id, &user).await?;

    quiz.apply_update(payload);
    state.store.assessments.update_quiz(&quiz).await?;
    Ok(Json(quiz))
}

pub async fn delete_quiz(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(quiz_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let quiz = state.store.assessments.get_quiz(quiz_id).await?;
    require_course_owner(&state.store, quiz.course_id, &user).await?;

    state.store.assessments.delete_quiz(quiz.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_result(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(quiz_id): Path<Uuid>,
    Json(payload): Json<NewQuizResult>,
) -> AppResult<(StatusCode, Json<QuizResult>)> {
    payload.validate()?;
    let quiz = state.store.assessments.get_quiz(quiz_id).await?;

    let result = QuizResult::new(payload, quiz.id, user.id, OffsetDateTime::now_utc());
    let result = state.store.assessments.create_quiz_result(result).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub async fn my_results(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<QuizResult>>> {
    let results = state
        .store
        .assessments
        .list_quiz_results_for_user(user.id)
        .await?;
    Ok(Json(results))
}
