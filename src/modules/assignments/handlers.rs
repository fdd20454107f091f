use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::models::{
    Assignment, AssignmentSubmission, GradeSubmission, NewAssignment, NewSubmission,
    UpdateAssignment, User,
};
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

pub async fn list_assignments(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Vec<Assignment>>> {
    state.store.courses.get(course_id).await?;
    let assignments = state.store.assessments.list_assignments(course_id).await?;
    Ok(Json(assignments))
}

pub async fn create_assignment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<NewAssignment>,
) -> AppResult<(StatusCode, Json<Assignment>)> {
    payload.validate()?;
    require_course_owner(&state.store, course_id, &user).await?;

    let assignment = Assignment::new(payload, course_id, OffsetDateTime::now_utc());
    let assignment = state.store.assessments.create_assignment(assignment).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn get_assignment(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(assignment_id): Path<Uuid>,
) -> AppResult<Json<Assignment>> {
    let assignment = state.store.assessments.get_assignment(assignment_id).await?;
    Ok(Json(assignment))
}

pub async fn update_assignment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<UpdateAssignment>,
) -> AppResult<Json<Assignment>> {
    payload.validate()?;
    let mut assignment = state.store.assessments.get_assignment(assignment_id).await?;
    require_course_owner(&state.store, assignment.course_id, &user).await?;

    assignment.apply_update(payload);
    state.store.assessments.update_assignment(&assignment).await?;
    Ok(Json(assignment))
}

pub async fn delete_assignment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(assignment_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let assignment = state.store.assessments.get_assignment(assignment_id).await?;
    require_course_owner(&state.store, assignment.course_id, &user).await?;

    state.store.assessments.delete_assignment(assignment.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<NewSubmission>,
) -> AppResult<(StatusCode, Json<AssignmentSubmission>)> {
    payload.validate()?;
    let assignment = state.store.assessments.get_assignment(assignment_id).await?;

    let submission =
        AssignmentSubmission::new(payload, assignment.id, user.id, OffsetDateTime::now_utc());
    let submission = state.store.assessments.create_submission(submission).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

pub async fn list_submissions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(assignment_id): Path<Uuid>,
) -> AppResult<Json<Vec<AssignmentSubmission>>> {
    let assignment = state.store.assessments.get_assignment(assignment_id).await?;
    require_course_owner(&state.store, assignment.course_id, &user).await?;

    let submissions = state
        .store
        .assessments
        .list_submissions_for_assignment(assignment.id)
        .await?;
    Ok(Json(submissions))
}

pub async fn grade_submission(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(submission_id): Path<Uuid>,
    Json(payload): Json<GradeSubmission>,
) -> AppResult<Json<AssignmentSubmission>> {
    payload.validate()?;
    let mut submission = state.store.assessments.get_submission(submission_id).await?;
    let assignment = state
        .store
        .assessments
        .get_assignment(submission.assignment_id)
        .await?;
    require_course_owner(&state.store, assignment.course_id, &user).await?;

    submission.grade = Some(payload.grade);
    submission.feedback = payload.feedback;
    state.store.assessments.update_submission(&submission).await?;
    Ok(Json(submission))
}

pub async fn my_submissions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<AssignmentSubmission>>> {
    let submissions = state
        .store
        .assessments
        .list_submissions_for_user(user.id)
        .await?;
    Ok(Json(submissions))
}
