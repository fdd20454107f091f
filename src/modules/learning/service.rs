use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::{completion_percentage, Certificate, Course, Enrollment, Progress};
use crate::db::{Store, StoreError};
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum LearningError {
    #[error("Course not found")]
    CourseNotFound,

    #[error("Not enrolled in this course")]
    NotEnrolled,

    #[error("Already enrolled in this course")]
    AlreadyEnrolled,

    #[error("Lesson does not belong to this course")]
    LessonNotInCourse,

    #[error("Certificate not found")]
    CertificateNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LearningError> for AppError {
    fn from(err: LearningError) -> Self {
        match err {
            LearningError::CourseNotFound => AppError::NotFound("Course not found".to_string()),
            LearningError::NotEnrolled => {
                AppError::NotFound("Not enrolled in this course".to_string())
            }
            LearningError::AlreadyEnrolled => {
                AppError::Conflict("Already enrolled in this course".to_string())
            }
            LearningError::LessonNotInCourse => {
                AppError::BadRequest("Lesson does not belong to this course".to_string())
            }
            LearningError::CertificateNotFound => {
                AppError::NotFound("Certificate not found".to_string())
            }
            LearningError::Store(err) => AppError::Store(err),
        }
    }
}

type Result<T> = std::result::Result<T, LearningError>;

/// Outcome of marking a lesson: the recomputed course percentage, the stored
/// completion flag, and whether this call actually changed the row.
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    pub percentage: f64,
    pub completed: bool,
    pub changed: bool,
    pub certificate_issued: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct CourseProgress {
    pub percentage: f64,
    pub completed_lessons: i64,
    pub total_lessons: i64,
}

/// The enrollment/progress/certificate workflow. Every operation is a
/// request-scoped unit of work; races on enroll and certificate issuance are
/// settled by the store's uniqueness constraints.
#[derive(Clone)]
pub struct LearningService {
    store: Store,
}

impl LearningService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn published_course(&self, course_id: Uuid) -> Result<Course> {
        match self.store.courses.get(course_id).await {
            Ok(course) if course.published => Ok(course),
            Ok(_) | Err(StoreError::NotFound) => Err(LearningError::CourseNotFound),
            Err(err) => Err(err.into()),
        }
    }

    async fn required_enrollment(&self, user_id: Uuid, course_id: Uuid) -> Result<Enrollment> {
        self.store
            .learning
            .find_enrollment(user_id, course_id)
            .await?
            .ok_or(LearningError::NotEnrolled)
    }

    pub async fn enroll(&self, user_id: Uuid, course_id: Uuid) -> Result<Enrollment> {
        let course = self.published_course(course_id).await?;

        let enrollment = Enrollment::new(user_id, course.id, OffsetDateTime::now_utc());
        let enrollment = match self.store.learning.create_enrollment(enrollment).await {
            Ok(enrollment) => enrollment,
            Err(StoreError::Duplicate) => return Err(LearningError::AlreadyEnrolled),
            Err(err) => return Err(err.into()),
        };

        self.store.courses.increment_students(course.id).await?;
        Ok(enrollment)
    }

    /// Removes the enrollment and its progress rows. The course's
    /// students_count is a high-water mark and is not decremented.
    pub async fn unenroll(&self, user_id: Uuid, course_id: Uuid) -> Result<()> {
        let enrollment = self.required_enrollment(user_id, course_id).await?;
        self.store.learning.delete_enrollment(enrollment.id).await?;
        Ok(())
    }

    pub async fn mark_lesson(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        lesson_id: Uuid,
        completed: bool,
    ) -> Result<ProgressUpdate> {
        let course = self.published_course(course_id).await?;
        let enrollment = self.required_enrollment(user_id, course.id).await?;

        let lesson = match self.store.courses.get_lesson(lesson_id).await {
            Ok(lesson) => lesson,
            Err(StoreError::NotFound) => return Err(LearningError::LessonNotInCourse),
            Err(err) => return Err(err.into()),
        };
        if lesson.course_id != course.id {
            return Err(LearningError::LessonNotInCourse);
        }

        let now = OffsetDateTime::now_utc();
        let existing = self
            .store
            .learning
            .find_progress(enrollment.id, lesson.id)
            .await?;
        let changed = existing.as_ref().map(|p| p.completed).unwrap_or(false) != completed;

        let progress = match existing {
            Some(mut progress) => {
                progress.set_completed(completed, now);
                progress
            }
            None => Progress::new(enrollment.id, lesson.id, completed, now),
        };
        self.store.learning.save_progress(&progress).await?;
        self.store.learning.touch_enrollment(enrollment.id, now).await?;

        let total = self.store.courses.count_lessons(course.id).await?;
        let done = self.store.learning.count_completed(enrollment.id).await?;

        let mut certificate_issued = false;
        if total > 0 && done == total {
            // only the caller whose insert won reports the issuance
            let (_, issued) = self.ensure_certificate(user_id, course.id).await?;
            certificate_issued = issued;
        }

        Ok(ProgressUpdate {
            percentage: completion_percentage(done, total),
            completed: progress.completed,
            changed,
            certificate_issued,
        })
    }

    pub async fn course_progress(&self, user_id: Uuid, course_id: Uuid) -> Result<CourseProgress> {
        let course = self.published_course(course_id).await?;
        let enrollment = self.required_enrollment(user_id, course.id).await?;

        let total = self.store.courses.count_lessons(course.id).await?;
        let done = self.store.learning.count_completed(enrollment.id).await?;
        Ok(CourseProgress {
            percentage: completion_percentage(done, total),
            completed_lessons: done,
            total_lessons: total,
        })
    }

    /// Idempotent: the first caller creates the certificate, everyone after
    /// (including a concurrent loser) gets that same row back with a false
    /// issued flag.
    pub async fn ensure_certificate(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<(Certificate, bool)> {
        let certificate = Certificate::new(user_id, course_id, OffsetDateTime::now_utc());
        Ok(self
            .store
            .learning
            .create_or_fetch_certificate(certificate)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CourseLevel, Lesson, NewLesson, User, UserRole};

    fn instructor() -> User {
        User {
            id: Uuid::new_v4(),
            email: "teach@example.com".into(),
            username: "teach".into(),
            password_hash: "hash".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            role: UserRole::Instructor,
            is_active: true,
            date_joined: OffsetDateTime::now_utc(),
        }
    }

    fn course(instructor: &User, published: bool) -> Course {
        Course {
            id: Uuid::new_v4(),
            title: "Rust 101".into(),
            slug: format!("rust-101-{}", Uuid::new_v4().simple()),
            description: "intro".into(),
            instructor_id: instructor.id,
            instructor_name: instructor.full_name(),
            price: 0.0,
            duration: "4 weeks".into(),
            category: "programming".into(),
            level: CourseLevel::Beginner,
            published,
            rating: 0.0,
            students_count: 0,
            thumbnail_url: None,
            preview_video_url: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn lesson(course_id: Uuid, title: &str, position: i32) -> Lesson {
        Lesson::new(
            NewLesson {
                title: title.into(),
                content: "...".into(),
                duration: None,
                position: Some(position),
            },
            course_id,
            OffsetDateTime::now_utc(),
        )
    }

    struct Fixture {
        service: LearningService,
        store: Store,
        user_id: Uuid,
        course_id: Uuid,
        lessons: Vec<Lesson>,
    }

    async fn fixture(lesson_count: usize) -> Fixture {
        let store = Store::in_memory();
        let owner = store.users.create(instructor()).await.unwrap();
        let course = store.courses.create(course(&owner, true)).await.unwrap();

        let mut lessons = Vec::new();
        for i in 0..lesson_count {
            let row = store
                .courses
                .create_lesson(lesson(course.id, &format!("Lesson {}", i + 1), i as i32))
                .await
                .unwrap();
            lessons.push(row);
        }

        Fixture {
            service: LearningService::new(store.clone()),
            store,
            user_id: Uuid::new_v4(),
            course_id: course.id,
            lessons,
        }
    }

    #[tokio::test]
    async fn enroll_starts_at_zero_percent() {
        let fx = fixture(2).await;
        fx.service.enroll(fx.user_id, fx.course_id).await.unwrap();
        let progress = fx
            .service
            .course_progress(fx.user_id, fx.course_id)
            .await
            .unwrap();
        assert_eq!(progress.percentage, 0.0);
        assert_eq!(progress.total_lessons, 2);
    }

    #[tokio::test]
    async fn double_enroll_is_rejected() {
        let fx = fixture(1).await;
        fx.service.enroll(fx.user_id, fx.course_id).await.unwrap();
        let err = fx.service.enroll(fx.user_id, fx.course_id).await.unwrap_err();
        assert!(matches!(err, LearningError::AlreadyEnrolled));

        let rows = fx
            .store
            .learning
            .list_enrollments_for_user(fx.user_id)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn enrolling_in_unpublished_course_is_not_found() {
        let store = Store::in_memory();
        let owner = store.users.create(instructor()).await.unwrap();
        let hidden = store.courses.create(course(&owner, false)).await.unwrap();
        let service = LearningService::new(store);

        let err = service.enroll(Uuid::new_v4(), hidden.id).await.unwrap_err();
        assert!(matches!(err, LearningError::CourseNotFound));
    }

    #[tokio::test]
    async fn students_count_is_a_high_water_mark() {
        let fx = fixture(1).await;
        fx.service.enroll(fx.user_id, fx.course_id).await.unwrap();
        assert_eq!(fx.store.courses.get(fx.course_id).await.unwrap().students_count, 1);

        fx.service.unenroll(fx.user_id, fx.course_id).await.unwrap();
        assert_eq!(fx.store.courses.get(fx.course_id).await.unwrap().students_count, 1);
    }

    #[tokio::test]
    async fn unenroll_without_enrollment_is_not_enrolled() {
        let fx = fixture(1).await;
        let err = fx.service.unenroll(fx.user_id, fx.course_id).await.unwrap_err();
        assert!(matches!(err, LearningError::NotEnrolled));
    }

    #[tokio::test]
    async fn unenroll_cascades_progress() {
        let fx = fixture(1).await;
        fx.service.enroll(fx.user_id, fx.course_id).await.unwrap();
        fx.service
            .mark_lesson(fx.user_id, fx.course_id, fx.lessons[0].id, true)
            .await
            .unwrap();
        fx.service.unenroll(fx.user_id, fx.course_id).await.unwrap();

        // a fresh enrollment starts clean
        fx.service.enroll(fx.user_id, fx.course_id).await.unwrap();
        let progress = fx
            .service
            .course_progress(fx.user_id, fx.course_id)
            .await
            .unwrap();
        assert_eq!(progress.completed_lessons, 0);
    }

    #[tokio::test]
    async fn marking_requires_enrollment() {
        let fx = fixture(1).await;
        let err = fx
            .service
            .mark_lesson(fx.user_id, fx.course_id, fx.lessons[0].id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, LearningError::NotEnrolled));
    }

    #[tokio::test]
    async fn marking_foreign_lesson_is_rejected() {
        let fx = fixture(1).await;
        let other = fixture(1).await;
        fx.service.enroll(fx.user_id, fx.course_id).await.unwrap();

        let err = fx
            .service
            .mark_lesson(fx.user_id, fx.course_id, other.lessons[0].id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, LearningError::LessonNotInCourse));

        let err = fx
            .service
            .mark_lesson(fx.user_id, fx.course_id, Uuid::new_v4(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, LearningError::LessonNotInCourse));
    }

    #[tokio::test]
    async fn completing_twice_is_idempotent() {
        let fx = fixture(2).await;
        fx.service.enroll(fx.user_id, fx.course_id).await.unwrap();

        let first = fx
            .service
            .mark_lesson(fx.user_id, fx.course_id, fx.lessons[0].id, true)
            .await
            .unwrap();
        assert!(first.changed);
        assert_eq!(first.percentage, 50.0);

        let second = fx
            .service
            .mark_lesson(fx.user_id, fx.course_id, fx.lessons[0].id, true)
            .await
            .unwrap();
        assert!(!second.changed);
        assert_eq!(second.percentage, 50.0);
    }

    #[tokio::test]
    async fn two_lesson_walkthrough_issues_one_permanent_certificate() {
        let fx = fixture(2).await;
        fx.service.enroll(fx.user_id, fx.course_id).await.unwrap();

        let step = fx
            .service
            .mark_lesson(fx.user_id, fx.course_id, fx.lessons[0].id, true)
            .await
            .unwrap();
        assert_eq!(step.percentage, 50.0);
        assert!(!step.certificate_issued);

        let step = fx
            .service
            .mark_lesson(fx.user_id, fx.course_id, fx.lessons[1].id, true)
            .await
            .unwrap();
        assert_eq!(step.percentage, 100.0);
        assert!(step.certificate_issued);
        let cert = fx
            .store
            .learning
            .find_certificate(fx.user_id, fx.course_id)
            .await
            .unwrap()
            .expect("certificate issued at 100%");

        // un-completing lowers the percentage but keeps the certificate
        let step = fx
            .service
            .mark_lesson(fx.user_id, fx.course_id, fx.lessons[1].id, false)
            .await
            .unwrap();
        assert_eq!(step.percentage, 50.0);
        let kept = fx
            .store
            .learning
            .find_certificate(fx.user_id, fx.course_id)
            .await
            .unwrap()
            .expect("certificate survives un-completion");
        assert_eq!(kept.id, cert.id);

        // re-completing does not issue a second one
        let step = fx
            .service
            .mark_lesson(fx.user_id, fx.course_id, fx.lessons[1].id, true)
            .await
            .unwrap();
        assert_eq!(step.percentage, 100.0);
        assert!(!step.certificate_issued);
        let again = fx
            .store
            .learning
            .find_certificate(fx.user_id, fx.course_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.id, cert.id);
        assert_eq!(again.verification_id, cert.verification_id);
    }

    #[tokio::test]
    async fn lessonless_course_reports_zero_percent() {
        let fx = fixture(0).await;
        fx.service.enroll(fx.user_id, fx.course_id).await.unwrap();
        let progress = fx
            .service
            .course_progress(fx.user_id, fx.course_id)
            .await
            .unwrap();
        assert_eq!(progress.percentage, 0.0);

        // and never earns a certificate
        let cert = fx
            .store
            .learning
            .find_certificate(fx.user_id, fx.course_id)
            .await
            .unwrap();
        assert!(cert.is_none());
    }

    #[tokio::test]
    async fn ensure_certificate_is_idempotent() {
        let fx = fixture(1).await;
        let (a, issued) = fx
            .service
            .ensure_certificate(fx.user_id, fx.course_id)
            .await
            .unwrap();
        assert!(issued);
        let (b, issued) = fx
            .service
            .ensure_certificate(fx.user_id, fx.course_id)
            .await
            .unwrap();
        assert!(!issued);
        assert_eq!(a.id, b.id);
        assert_eq!(a.verification_id, b.verification_id);
    }
}
