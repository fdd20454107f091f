use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::models::{completion_percentage, Certificate, Course};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;

use super::service::LearningService;

#[derive(Debug, Deserialize)]
pub struct MarkLessonRequest {
    pub lesson_id: Uuid,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct EnrolledCourseView {
    #[serde(flatten)]
    pub course: Course,
    pub progress: f64,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub enrolled_at: time::OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_accessed: time::OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct MyCoursesResponse {
    pub enrolled: Vec<EnrolledCourseView>,
    pub completed: Vec<EnrolledCourseView>,
}

pub async fn enroll(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let service = LearningService::new(state.store.clone());
    let enrollment = service.enroll(user.id, course_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "enrollment": enrollment,
            "progress": 0.0,
        })),
    ))
}

pub async fn unenroll(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = LearningService::new(state.store.clone());
    service.unenroll(user.id, course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let service = LearningService::new(state.store.clone());
    let progress = service.course_progress(user.id, course_id).await?;
    Ok(Json(json!({
        "progress": progress.percentage,
        "completed_lessons": progress.completed_lessons,
        "total_lessons": progress.total_lessons,
    })))
}

pub async fn mark_lesson(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<MarkLessonRequest>,
) -> AppResult<Json<Value>> {
    let service = LearningService::new(state.store.clone());
    let outcome = service
        .mark_lesson(user.id, course_id, payload.lesson_id, payload.completed)
        .await?;
    Ok(Json(json!({
        "progress": outcome.percentage,
        "completed": outcome.completed,
        "changed": outcome.changed,
        "certificate_issued": outcome.certificate_issued,
    })))
}

pub async fn my_courses(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<MyCoursesResponse>> {
    let enrollments = state.store.learning.list_enrollments_for_user(user.id).await?;

    let mut enrolled = Vec::new();
    let mut completed = Vec::new();
    for enrollment in enrollments {
        let course = state.store.courses.get(enrollment.course_id).await?;
        let total = state.store.courses.count_lessons(course.id).await?;
        let done = state.store.learning.count_completed(enrollment.id).await?;

        let view = EnrolledCourseView {
            course,
            progress: completion_percentage(done, total),
            completed_lessons: done,
            total_lessons: total,
            enrolled_at: enrollment.enrolled_at,
            last_accessed: enrollment.last_accessed,
        };
        if total > 0 && done == total {
            completed.push(view);
        } else {
            enrolled.push(view);
        }
    }

    Ok(Json(MyCoursesResponse { enrolled, completed }))
}

pub async fn my_certificates(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<Certificate>>> {
    let certificates = state.store.learning.list_certificates(user.id).await?;
    Ok(Json(certificates))
}

pub async fn get_certificate(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(certificate_id): Path<Uuid>,
) -> AppResult<Json<Certificate>> {
    let certificate = state.store.learning.get_certificate(certificate_id).await?;
    if certificate.user_id != user.id {
        return Err(crate::error::AppError::NotFound(
            "Certificate not found".to_string(),
        ));
    }
    Ok(Json(certificate))
}
