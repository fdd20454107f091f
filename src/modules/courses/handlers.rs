use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::models::{
    completion_percentage, dedupe_slug, slugify_title, Course, CourseFilter, CourseLevel, Lesson,
    NewCourse, NewLesson, PublicUser, UpdateCourse, UpdateLesson, User,
};
use crate::db::{Store, StoreError};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};

#[derive(Debug, Deserialize)]
pub struct CourseListQuery {
    pub search: Option<String>,
    pub level: Option<CourseLevel>,
    pub instructor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CourseSummaryView {
    #[serde(flatten)]
    pub course: Course,
    pub lessons_count: i64,
    pub is_enrolled: bool,
}

#[derive(Debug, Serialize)]
pub struct LessonView {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub is_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct CourseDetailView {
    #[serde(flatten)]
    pub course: Course,
    pub lessons_count: i64,
    pub is_enrolled: bool,
    pub progress: f64,
    pub lessons: Vec<LessonView>,
}

fn require_course_owner(course: &Course, user: &User) -> AppResult<()> {
    if course.instructor_id == user.id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Only the course instructor may do this".to_string(),
        ))
    }
}

async fn published_course(store: &Store, course_id: Uuid) -> AppResult<Course> {
    match store.courses.get(course_id).await {
        Ok(course) if course.published => Ok(course),
        Ok(_) | Err(StoreError::NotFound) => {
            Err(AppError::NotFound("Course not found".to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn list_courses(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<CourseListQuery>,
) -> AppResult<Json<Vec<CourseSummaryView>>> {
    let filter = CourseFilter {
        search: query.search,
        level: query.level,
        instructor: query.instructor,
    };
    let courses = state.store.courses.list_published(&filter).await?;

    let enrolled: HashSet<Uuid> = match &viewer {
        Some(user) => state
            .store
            .learning
            .list_enrollments_for_user(user.id)
            .await?
            .into_iter()
            .map(|e| e.course_id)
            .collect(),
        None => HashSet::new(),
    };

    let mut views = Vec::with_capacity(courses.len());
    for course in courses {
        let lessons_count = state.store.courses.count_lessons(course.id).await?;
        let is_enrolled = enrolled.contains(&course.id);
        views.push(CourseSummaryView {
            course,
            lessons_count,
            is_enrolled,
        });
    }
    Ok(Json(views))
}

pub async fn create_course(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<NewCourse>,
) -> AppResult<(StatusCode, Json<Course>)> {
    if !user.is_instructor() {
        return Err(AppError::Authorization(
            "Only instructors may create courses".to_string(),
        ));
    }
    payload.validate()?;

    let now = OffsetDateTime::now_utc();
    let slug = slugify_title(&payload.title);
    let course = Course::new(payload, &user, slug.clone(), now);

    // slug collision: retry once with a unique suffix
    let created = match state.store.courses.create(course.clone()).await {
        Ok(created) => created,
        Err(StoreError::Duplicate) => {
            let mut retry = course;
            retry.slug = dedupe_slug(&slug);
            state.store.courses.create(retry).await?
        }
        Err(err) => return Err(err.into()),
    };
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn course_detail(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<CourseDetailView>> {
    let course = published_course(&state.store, course_id).await?;
    let lessons = state.store.courses.list_lessons(course.id).await?;

    let enrollment = match &viewer {
        Some(user) => {
            state
                .store
                .learning
                .find_enrollment(user.id, course.id)
                .await?
        }
        None => None,
    };

    let mut completed_ids = HashSet::new();
    if let Some(enrollment) = &enrollment {
        for lesson in &lessons {
            if let Some(progress) = state
                .store
                .learning
                .find_progress(enrollment.id, lesson.id)
                .await?
            {
                if progress.completed {
                    completed_ids.insert(lesson.id);
                }
            }
        }
    }

    let total = lessons.len() as i64;
    let done = completed_ids.len() as i64;
    let lessons = lessons
        .into_iter()
        .map(|lesson| {
            let is_completed = completed_ids.contains(&lesson.id);
            LessonView {
                lesson,
                is_completed,
            }
        })
        .collect();

    Ok(Json(CourseDetailView {
        lessons_count: total,
        is_enrolled: enrollment.is_some(),
        progress: completion_percentage(done, total),
        lessons,
        course,
    }))
}

pub async fn update_course(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<UpdateCourse>,
) -> AppResult<Json<Course>> {
    payload.validate()?;
    let mut course = state.store.courses.get(course_id).await?;
    require_course_owner(&course, &user)?;

    course.apply_update(payload);
    state.store.courses.update(&course).await?;
    Ok(Json(course))
}

pub async fn delete_course(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let course = state.store.courses.get(course_id).await?;
    require_course_owner(&course, &user)?;
    state.store.courses.delete(course.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn course_students(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Vec<PublicUser>>> {
    let course = state.store.courses.get(course_id).await?;
    require_course_owner(&course, &user)?;

    let enrollments = state
        .store
        .learning
        .list_enrollments_for_course(course.id)
        .await?;
    let ids: Vec<Uuid> = enrollments.iter().map(|e| e.user_id).collect();
    let users = state.store.users.list_by_ids(&ids).await?;
    Ok(Json(users.iter().map(PublicUser::from).collect()))
}

pub async fn create_lesson(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<NewLesson>,
) -> AppResult<(StatusCode, Json<Lesson>)> {
    payload.validate()?;
    let course = state.store.courses.get(course_id).await?;
    require_course_owner(&course, &user)?;

    let lesson = Lesson::new(payload, course.id, OffsetDateTime::now_utc());
    let created = state.store.courses.create_lesson(lesson).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_lesson(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(lesson_id): Path<Uuid>,
    Json(payload): Json<UpdateLesson>,
) -> AppResult<Json<Lesson>> {
    payload.validate()?;
    let mut lesson = state.store.courses.get_lesson(lesson_id).await?;
    let course = state.store.courses.get(lesson.course_id).await?;
    require_course_owner(&course, &user)?;

    lesson.apply_update(payload);
    state.store.courses.update_lesson(&lesson).await?;
    Ok(Json(lesson))
}

pub async fn delete_lesson(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(lesson_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let lesson = state.store.courses.get_lesson(lesson_id).await?;
    let course = state.store.courses.get(lesson.course_id).await?;
    require_course_owner(&course, &user)?;

    state.store.courses.delete_lesson(lesson.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
