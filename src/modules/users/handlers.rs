use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::{self, TokenKind};
use crate::db::models::{
    completion_percentage, Course, NewUser, PasswordChange, PublicUser, UpdateProfile, UserLogin,
};
use crate::db::{Store, StoreError};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: PublicUser,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub enrolled_courses: i64,
    pub completed_courses: i64,
    pub in_progress_courses: i64,
    pub certificates_earned: i64,
}

#[derive(Debug, Serialize)]
pub struct RecentCourseView {
    #[serde(flatten)]
    pub course: Course,
    pub progress: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_accessed: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_courses: Vec<RecentCourseView>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    payload.validate()?;

    let password_hash = auth::hash_password(payload.password.expose_secret())
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let user = crate::db::models::User::new(payload, password_hash, OffsetDateTime::now_utc());

    let created = match state.store.users.create(user).await {
        Ok(created) => created,
        Err(StoreError::Duplicate) => {
            return Err(AppError::Conflict(
                "Email or username already taken".to_string(),
            ))
        }
        Err(err) => return Err(err.into()),
    };
    Ok((StatusCode::CREATED, Json(PublicUser::from(&created))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> AppResult<Json<LoginResponse>> {
    payload.validate()?;

    let user = state
        .store
        .users
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

    auth::verify_password(payload.password.expose_secret(), &user.password_hash)
        .map_err(|_| AppError::Authentication("Invalid credentials".to_string()))?;

    if !user.is_active {
        return Err(AppError::Authentication(
            "Account is deactivated".to_string(),
        ));
    }

    let pair = auth::issue_token_pair(user.id, user.role, &state.env.auth)?;
    Ok(Json(LoginResponse {
        access: pair.access,
        refresh: pair.refresh,
        user: PublicUser::from(&user),
    }))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let claims = auth::verify_token(
        &payload.refresh,
        &state.env.auth.jwt_secret,
        TokenKind::Refresh,
    )?;

    let user = state.store.users.get(claims.sub).await.map_err(|e| match e {
        StoreError::NotFound => AppError::Authentication("Unknown user".to_string()),
        other => AppError::from(other),
    })?;
    if !user.is_active {
        return Err(AppError::Authentication(
            "Account is deactivated".to_string(),
        ));
    }

    let access = auth::issue_access_token(user.id, user.role, &state.env.auth)?;
    Ok(Json(RefreshResponse { access }))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}

pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    Json(payload): Json<UpdateProfile>,
) -> AppResult<Json<PublicUser>> {
    payload.validate()?;

    if let Some(username) = payload.username {
        user.username = username;
    }
    if let Some(first_name) = payload.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = payload.last_name {
        user.last_name = last_name;
    }

    match state.store.users.update(&user).await {
        Ok(()) => Ok(Json(PublicUser::from(&user))),
        Err(StoreError::Duplicate) => {
            Err(AppError::Conflict("Username already taken".to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    Json(payload): Json<PasswordChange>,
) -> AppResult<StatusCode> {
    payload.validate()?;

    auth::verify_password(payload.old_password.expose_secret(), &user.password_hash)
        .map_err(|_| AppError::BadRequest("Old password is incorrect".to_string()))?;

    user.password_hash = auth::hash_password(payload.new_password.expose_secret())
        .map_err(|e| AppError::Internal(e.to_string()))?;
    state.store.users.update(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Dashboard>> {
    Ok(Json(build_dashboard(&state.store, user.id).await?))
}

/// Aggregates the caller's enrollments into the dashboard buckets: a course
/// counts as completed when all of its (nonzero) lessons are done, as
/// in-progress when at least one is.
pub async fn build_dashboard(store: &Store, user_id: Uuid) -> AppResult<Dashboard> {
    let mut enrollments = store.learning.list_enrollments_for_user(user_id).await?;
    enrollments.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));

    let mut completed = 0i64;
    let mut in_progress = 0i64;
    let mut recent = Vec::new();

    for enrollment in &enrollments {
        let total = store.courses.count_lessons(enrollment.course_id).await?;
        let done = store.learning.count_completed(enrollment.id).await?;

        if total > 0 && done == total {
            completed += 1;
        } else if done > 0 {
            in_progress += 1;
        }

        if recent.len() < 5 {
            let course = store.courses.get(enrollment.course_id).await?;
            recent.push(RecentCourseView {
                course,
                progress: completion_percentage(done, total),
                last_accessed: enrollment.last_accessed,
            });
        }
    }

    let certificates = store.learning.list_certificates(user_id).await?;

    Ok(Dashboard {
        stats: DashboardStats {
            enrolled_courses: enrollments.len() as i64,
            completed_courses: completed,
            in_progress_courses: in_progress,
            certificates_earned: certificates.len() as i64,
        },
        recent_courses: recent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CourseLevel, Lesson, NewLesson, User, UserRole};
    use crate::modules::learning::service::LearningService;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4().simple()),
            username: Uuid::new_v4().simple().to_string(),
            password_hash: "hash".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            role,
            is_active: true,
            date_joined: OffsetDateTime::now_utc(),
        }
    }

    async fn course_with_lessons(store: &Store, instructor: &User, count: usize) -> (Uuid, Vec<Uuid>) {
        let course = store
            .courses
            .create(Course {
                id: Uuid::new_v4(),
                title: "Course".into(),
                slug: Uuid::new_v4().simple().to_string(),
                description: "d".into(),
                instructor_id: instructor.id,
                instructor_name: instructor.full_name(),
                price: 0.0,
                duration: "1 week".into(),
                category: "other".into(),
                level: CourseLevel::Beginner,
                published: true,
                rating: 0.0,
                students_count: 0,
                thumbnail_url: None,
                preview_video_url: None,
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();

        let mut lesson_ids = Vec::new();
        for i in 0..count {
            let lesson = store
                .courses
                .create_lesson(Lesson::new(
                    NewLesson {
                        title: format!("L{}", i),
                        content: "...".into(),
                        duration: None,
                        position: Some(i as i32),
                    },
                    course.id,
                    OffsetDateTime::now_utc(),
                ))
                .await
                .unwrap();
            lesson_ids.push(lesson.id);
        }
        (course.id, lesson_ids)
    }

    #[tokio::test]
    async fn dashboard_buckets_completed_and_in_progress() {
        let store = Store::in_memory();
        let instructor = store.users.create(user(UserRole::Instructor)).await.unwrap();
        let student = store.users.create(user(UserRole::Student)).await.unwrap();
        let service = LearningService::new(store.clone());

        // one completed, one half done, one untouched
        let (done_course, done_lessons) = course_with_lessons(&store, &instructor, 1).await;
        let (half_course, half_lessons) = course_with_lessons(&store, &instructor, 2).await;
        let (fresh_course, _) = course_with_lessons(&store, &instructor, 1).await;

        service.enroll(student.id, done_course).await.unwrap();
        service.enroll(student.id, half_course).await.unwrap();
        service.enroll(student.id, fresh_course).await.unwrap();
        service
            .mark_lesson(student.id, done_course, done_lessons[0], true)
            .await
            .unwrap();
        service
            .mark_lesson(student.id, half_course, half_lessons[0], true)
            .await
            .unwrap();

        let dashboard = build_dashboard(&store, student.id).await.unwrap();
        assert_eq!(dashboard.stats.enrolled_courses, 3);
        assert_eq!(dashboard.stats.completed_courses, 1);
        assert_eq!(dashboard.stats.in_progress_courses, 1);
        assert_eq!(dashboard.stats.certificates_earned, 1);
        assert_eq!(dashboard.recent_courses.len(), 3);
    }

    #[tokio::test]
    async fn dashboard_recent_courses_cap_at_five() {
        let store = Store::in_memory();
        let instructor = store.users.create(user(UserRole::Instructor)).await.unwrap();
        let student = store.users.create(user(UserRole::Student)).await.unwrap();
        let service = LearningService::new(store.clone());

        for _ in 0..7 {
            let (course_id, _) = course_with_lessons(&store, &instructor, 0).await;
            service.enroll(student.id, course_id).await.unwrap();
        }

        let dashboard = build_dashboard(&store, student.id).await.unwrap();
        assert_eq!(dashboard.stats.enrolled_courses, 7);
        assert_eq!(dashboard.recent_courses.len(), 5);
    }
}
