use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::StoreError;
use super::memory::MemoryStore;
use super::models::{
    Article, ArticleFilter, ArticleLike, Assignment, AssignmentSubmission, Certificate, Course,
    CourseFilter, Enrollment, Lesson, Progress, Quiz, QuizResult, User, Webinar, WebinarFilter,
    WebinarRegistration,
};
use super::repositories::PgStore;

type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `Duplicate` when the email or username is already taken.
    async fn create(&self, user: User) -> Result<User>;
    async fn get(&self, id: Uuid) -> Result<User>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn update(&self, user: &User) -> Result<()>;
    async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>>;
}

#[async_trait]
pub trait CourseRepo: Send + Sync {
    /// Fails with `Duplicate` when the slug is already taken.
    async fn create(&self, course: Course) -> Result<Course>;
    async fn get(&self, id: Uuid) -> Result<Course>;
    async fn list_published(&self, filter: &CourseFilter) -> Result<Vec<Course>>;
    async fn update(&self, course: &Course) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    /// Atomic `students_count + 1`; never recomputed from enrollments.
    async fn increment_students(&self, id: Uuid) -> Result<()>;

    async fn create_lesson(&self, lesson: Lesson) -> Result<Lesson>;
    async fn get_lesson(&self, id: Uuid) -> Result<Lesson>;
    async fn update_lesson(&self, lesson: &Lesson) -> Result<()>;
    async fn delete_lesson(&self, id: Uuid) -> Result<()>;
    /// Lessons in (position, insertion) order.
    async fn list_lessons(&self, course_id: Uuid) -> Result<Vec<Lesson>>;
    async fn count_lessons(&self, course_id: Uuid) -> Result<i64>;
}

#[async_trait]
pub trait LearningRepo: Send + Sync {
    /// Fails with `Duplicate` when the (user, course) pair is already
    /// enrolled; the uniqueness constraint is the arbiter under races.
    async fn create_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment>;
    async fn find_enrollment(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<Enrollment>>;
    /// Deletes the enrollment and all of its progress rows.
    async fn delete_enrollment(&self, id: Uuid) -> Result<()>;
    async fn list_enrollments_for_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>>;
    async fn list_enrollments_for_course(&self, course_id: Uuid) -> Result<Vec<Enrollment>>;
    async fn touch_enrollment(&self, id: Uuid, now: OffsetDateTime) -> Result<()>;

    async fn find_progress(&self, enrollment_id: Uuid, lesson_id: Uuid) -> Result<Option<Progress>>;
    /// Upsert keyed on (enrollment, lesson); never creates a second row for
    /// the same pair.
    async fn save_progress(&self, progress: &Progress) -> Result<()>;
    async fn count_completed(&self, enrollment_id: Uuid) -> Result<i64>;

    /// Idempotent create keyed on the (user, course) uniqueness constraint:
    /// the losing racer gets the winner's row back, never an error. The flag
    /// is true only for the caller whose insert won.
    async fn create_or_fetch_certificate(
        &self,
        certificate: Certificate,
    ) -> Result<(Certificate, bool)>;
    async fn find_certificate(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<Certificate>>;
    async fn get_certificate(&self, id: Uuid) -> Result<Certificate>;
    async fn list_certificates(&self, user_id: Uuid) -> Result<Vec<Certificate>>;
}

#[async_trait]
pub trait AssessmentRepo: Send + Sync {
    async fn create_quiz(&self, quiz: Quiz) -> Result<Quiz>;
    async fn get_quiz(&self, id: Uuid) -> Result<Quiz>;
    async fn update_quiz(&self, quiz: &Quiz) -> Result<()>;
    async fn delete_quiz(&self, id: Uuid) -> Result<()>;
    async fn list_quizzes(&self, course_id: Uuid) -> Result<Vec<Quiz>>;

    async fn create_quiz_result(&self, result: QuizResult) -> Result<QuizResult>;
    async fn list_quiz_results_for_user(&self, user_id: Uuid) -> Result<Vec<QuizResult>>;

    async fn create_assignment(&self, assignment: Assignment) -> Result<Assignment>;
    async fn get_assignment(&self, id: Uuid) -> Result<Assignment>;
    async fn update_assignment(&self, assignment: &Assignment) -> Result<()>;
    async fn delete_assignment(&self, id: Uuid) -> Result<()>;
    async fn list_assignments(&self, course_id: Uuid) -> Result<Vec<Assignment>>;

    async fn create_submission(&self, submission: AssignmentSubmission)
        -> Result<AssignmentSubmission>;
    async fn get_submission(&self, id: Uuid) -> Result<AssignmentSubmission>;
    async fn update_submission(&self, submission: &AssignmentSubmission) -> Result<()>;
    async fn list_submissions_for_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Vec<AssignmentSubmission>>;
    async fn list_submissions_for_user(&self, user_id: Uuid) -> Result<Vec<AssignmentSubmission>>;
}

#[async_trait]
pub trait ArticleRepo: Send + Sync {
    /// Fails with `Duplicate` when the slug is already taken.
    async fn create(&self, article: Article) -> Result<Article>;
    async fn get_by_slug(&self, slug: &str) -> Result<Article>;
    async fn list_published(&self, filter: &ArticleFilter) -> Result<Vec<Article>>;
    async fn update(&self, article: &Article) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    /// Atomic `views_count + 1`; returns the new count.
    async fn increment_views(&self, id: Uuid) -> Result<i32>;
    /// Atomic `likes_count + delta`; returns the new count.
    async fn adjust_likes(&self, id: Uuid, delta: i32) -> Result<i32>;

    /// Fails with `Duplicate` when the user already likes the article.
    async fn insert_like(&self, like: ArticleLike) -> Result<()>;
    async fn delete_like(&self, article_id: Uuid, user_id: Uuid) -> Result<()>;
    async fn find_like(&self, article_id: Uuid, user_id: Uuid) -> Result<Option<ArticleLike>>;
    async fn liked_article_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
}

#[async_trait]
pub trait WebinarRepo: Send + Sync {
    /// Fails with `Duplicate` when the slug is already taken.
    async fn create(&self, webinar: Webinar) -> Result<Webinar>;
    async fn get_by_slug(&self, slug: &str) -> Result<Webinar>;
    async fn list(&self, filter: &WebinarFilter) -> Result<Vec<Webinar>>;
    async fn update(&self, webinar: &Webinar) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Fails with `Duplicate` when the user is already registered.
    async fn create_registration(
        &self,
        registration: WebinarRegistration,
    ) -> Result<WebinarRegistration>;
    async fn delete_registration(&self, webinar_id: Uuid, user_id: Uuid) -> Result<()>;
    async fn find_registration(
        &self,
        webinar_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<WebinarRegistration>>;
    async fn registered_webinar_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
    /// Atomic `registered_count + delta`; returns the new count.
    async fn adjust_registered(&self, id: Uuid, delta: i32) -> Result<i32>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<()>;
}

/// Aggregates the per-entity repositories behind trait objects so the same
/// handlers and services run against Postgres or the in-memory backend.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepo>,
    pub courses: Arc<dyn CourseRepo>,
    pub learning: Arc<dyn LearningRepo>,
    pub assessments: Arc<dyn AssessmentRepo>,
    pub articles: Arc<dyn ArticleRepo>,
    pub webinars: Arc<dyn WebinarRepo>,
    health: Arc<dyn StoreHealth>,
}

impl Store {
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            users: store.clone(),
            courses: store.clone(),
            learning: store.clone(),
            assessments: store.clone(),
            articles: store.clone(),
            webinars: store.clone(),
            health: store,
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            courses: store.clone(),
            learning: store.clone(),
            assessments: store.clone(),
            articles: store.clone(),
            webinars: store.clone(),
            health: store,
        }
    }

    pub async fn ping(&self) -> Result<()> {
        self.health.ping().await
    }
}
