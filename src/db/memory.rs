use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::StoreError;
use super::models::{
    Article, ArticleFilter, ArticleLike, ArticleOrdering, ArticleStatus, Assignment,
    AssignmentSubmission, Certificate, Course, CourseFilter, Enrollment, Lesson, Progress, Quiz,
    QuizResult, User, Webinar, WebinarFilter, WebinarOrdering, WebinarRegistration,
};
use super::repository::{
    ArticleRepo, AssessmentRepo, CourseRepo, LearningRepo, StoreHealth, UserRepo, WebinarRepo,
};

type Result<T> = std::result::Result<T, StoreError>;

/// In-memory backend for tests and prototyping. Enforces the same uniqueness
/// rules as the SQL schema: (user, course) enrollments, (enrollment, lesson)
/// progress, (user, course) certificates, (article, user) likes,
/// (webinar, user) registrations, and unique slugs/emails.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
    courses: Arc<Mutex<HashMap<Uuid, Course>>>,
    lessons: Arc<Mutex<Vec<Lesson>>>,
    enrollments: Arc<Mutex<HashMap<Uuid, Enrollment>>>,
    progress: Arc<Mutex<HashMap<(Uuid, Uuid), Progress>>>,
    certificates: Arc<Mutex<HashMap<Uuid, Certificate>>>,
    quizzes: Arc<Mutex<Vec<Quiz>>>,
    quiz_results: Arc<Mutex<Vec<QuizResult>>>,
    assignments: Arc<Mutex<HashMap<Uuid, Assignment>>>,
    submissions: Arc<Mutex<HashMap<Uuid, AssignmentSubmission>>>,
    articles: Arc<Mutex<HashMap<Uuid, Article>>>,
    likes: Arc<Mutex<Vec<ArticleLike>>>,
    webinars: Arc<Mutex<HashMap<Uuid, Webinar>>>,
    registrations: Arc<Mutex<Vec<WebinarRegistration>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(table: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    table.lock().map_err(|e| StoreError::Backend(e.to_string()))
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, user: User) -> Result<User> {
        let mut users = lock(&self.users)?;
        if users
            .values()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(StoreError::Duplicate);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: Uuid) -> Result<User> {
        lock(&self.users)?.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(lock(&self.users)?
            .values()
            .find(|u| u.email == email.to_lowercase())
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut users = lock(&self.users)?;
        if users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(StoreError::Duplicate);
        }
        match users.get_mut(&user.id) {
            Some(entry) => {
                *entry = user.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        let users = lock(&self.users)?;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}

#[async_trait]
impl CourseRepo for MemoryStore {
    async fn create(&self, course: Course) -> Result<Course> {
        let mut courses = lock(&self.courses)?;
        if courses.values().any(|c| c.slug == course.slug) {
            return Err(StoreError::Duplicate);
        }
        courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn get(&self, id: Uuid) -> Result<Course> {
        lock(&self.courses)?.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list_published(&self, filter: &CourseFilter) -> Result<Vec<Course>> {
        let courses = lock(&self.courses)?;
        let mut found: Vec<Course> = courses
            .values()
            .filter(|c| c.published)
            .filter(|c| filter.level.is_none_or(|level| c.level == level))
            .filter(|c| {
                filter
                    .instructor
                    .as_deref()
                    .is_none_or(|name| contains(&c.instructor_name, name))
            })
            .filter(|c| {
                filter.search.as_deref().is_none_or(|term| {
                    contains(&c.title, term)
                        || contains(&c.description, term)
                        || contains(&c.instructor_name, term)
                })
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn update(&self, course: &Course) -> Result<()> {
        let mut courses = lock(&self.courses)?;
        match courses.get_mut(&course.id) {
            Some(entry) => {
                *entry = course.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        lock(&self.courses)?.remove(&id).ok_or(StoreError::NotFound)?;
        lock(&self.lessons)?.retain(|l| l.course_id != id);
        Ok(())
    }

    async fn increment_students(&self, id: Uuid) -> Result<()> {
        let mut courses = lock(&self.courses)?;
        let course = courses.get_mut(&id).ok_or(StoreError::NotFound)?;
        course.students_count += 1;
        Ok(())
    }

    async fn create_lesson(&self, lesson: Lesson) -> Result<Lesson> {
        lock(&self.lessons)?.push(lesson.clone());
        Ok(lesson)
    }

    async fn get_lesson(&self, id: Uuid) -> Result<Lesson> {
        lock(&self.lessons)?
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_lesson(&self, lesson: &Lesson) -> Result<()> {
        let mut lessons = lock(&self.lessons)?;
        match lessons.iter_mut().find(|l| l.id == lesson.id) {
            Some(entry) => {
                *entry = lesson.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_lesson(&self, id: Uuid) -> Result<()> {
        let mut lessons = lock(&self.lessons)?;
        let before = lessons.len();
        lessons.retain(|l| l.id != id);
        if lessons.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_lessons(&self, course_id: Uuid) -> Result<Vec<Lesson>> {
        let lessons = lock(&self.lessons)?;
        let mut found: Vec<Lesson> = lessons
            .iter()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect();
        // stable sort keeps insertion order for equal positions
        found.sort_by_key(|l| l.position);
        Ok(found)
    }

    async fn count_lessons(&self, course_id: Uuid) -> Result<i64> {
        Ok(lock(&self.lessons)?
            .iter()
            .filter(|l| l.course_id == course_id)
            .count() as i64)
    }
}

#[async_trait]
impl LearningRepo for MemoryStore {
    async fn create_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment> {
        let mut enrollments = lock(&self.enrollments)?;
        if enrollments
            .values()
            .any(|e| e.user_id == enrollment.user_id && e.course_id == enrollment.course_id)
        {
            return Err(StoreError::Duplicate);
        }
        enrollments.insert(enrollment.id, enrollment.clone());
        Ok(enrollment)
    }

    async fn find_enrollment(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<Enrollment>> {
        Ok(lock(&self.enrollments)?
            .values()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .cloned())
    }

    async fn delete_enrollment(&self, id: Uuid) -> Result<()> {
        lock(&self.enrollments)?.remove(&id).ok_or(StoreError::NotFound)?;
        lock(&self.progress)?.retain(|_, p| p.enrollment_id != id);
        Ok(())
    }

    async fn list_enrollments_for_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>> {
        Ok(lock(&self.enrollments)?
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_enrollments_for_course(&self, course_id: Uuid) -> Result<Vec<Enrollment>> {
        Ok(lock(&self.enrollments)?
            .values()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn touch_enrollment(&self, id: Uuid, now: OffsetDateTime) -> Result<()> {
        let mut enrollments = lock(&self.enrollments)?;
        let enrollment = enrollments.get_mut(&id).ok_or(StoreError::NotFound)?;
        enrollment.last_accessed = now;
        Ok(())
    }

    async fn find_progress(&self, enrollment_id: Uuid, lesson_id: Uuid) -> Result<Option<Progress>> {
        Ok(lock(&self.progress)?
            .get(&(enrollment_id, lesson_id))
            .cloned())
    }

    async fn save_progress(&self, progress: &Progress) -> Result<()> {
        lock(&self.progress)?.insert(
            (progress.enrollment_id, progress.lesson_id),
            progress.clone(),
        );
        Ok(())
    }

    async fn count_completed(&self, enrollment_id: Uuid) -> Result<i64> {
        Ok(lock(&self.progress)?
            .values()
            .filter(|p| p.enrollment_id == enrollment_id && p.completed)
            .count() as i64)
    }

    async fn create_or_fetch_certificate(
        &self,
        certificate: Certificate,
    ) -> Result<(Certificate, bool)> {
        let mut certificates = lock(&self.certificates)?;
        if let Some(existing) = certificates
            .values()
            .find(|c| c.user_id == certificate.user_id && c.course_id == certificate.course_id)
        {
            return Ok((existing.clone(), false));
        }
        certificates.insert(certificate.id, certificate.clone());
        Ok((certificate, true))
    }

    async fn find_certificate(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<Certificate>> {
        Ok(lock(&self.certificates)?
            .values()
            .find(|c| c.user_id == user_id && c.course_id == course_id)
            .cloned())
    }

    async fn get_certificate(&self, id: Uuid) -> Result<Certificate> {
        lock(&self.certificates)?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_certificates(&self, user_id: Uuid) -> Result<Vec<Certificate>> {
        let mut found: Vec<Certificate> = lock(&self.certificates)?
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(found)
    }
}

#[async_trait]
impl AssessmentRepo for MemoryStore {
    async fn create_quiz(&self, quiz: Quiz) -> Result<Quiz> {
        lock(&self.quizzes)?.push(quiz.clone());
        Ok(quiz)
    }

    async fn get_quiz(&self, id: Uuid) -> Result<Quiz> {
        lock(&self.quizzes)?
            .iter()
            .find(|q| q.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<()> {
        let mut quizzes = lock(&self.quizzes)?;
        match quizzes.iter_mut().find(|q| q.id == quiz.id) {
            Some(entry) => {
                *entry = quiz.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<()> {
        let mut quizzes = lock(&self.quizzes)?;
        let before = quizzes.len();
        quizzes.retain(|q| q.id != id);
        if quizzes.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_quizzes(&self, course_id: Uuid) -> Result<Vec<Quiz>> {
        let quizzes = lock(&self.quizzes)?;
        let mut found: Vec<Quiz> = quizzes
            .iter()
            .filter(|q| q.course_id == course_id)
            .cloned()
            .collect();
        found.sort_by_key(|q| q.position);
        Ok(found)
    }

    async fn create_quiz_result(&self, result: QuizResult) -> Result<QuizResult> {
        lock(&self.quiz_results)?.push(result.clone());
        Ok(result)
    }

    async fn list_quiz_results_for_user(&self, user_id: Uuid) -> Result<Vec<QuizResult>> {
        let mut found: Vec<QuizResult> = lock(&self.quiz_results)?
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
        Ok(found)
    }

    async fn create_assignment(&self, assignment: Assignment) -> Result<Assignment> {
        lock(&self.assignments)?.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn get_assignment(&self, id: Uuid) -> Result<Assignment> {
        lock(&self.assignments)?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_assignment(&self, assignment: &Assignment) -> Result<()> {
        let mut assignments = lock(&self.assignments)?;
        match assignments.get_mut(&assignment.id) {
            Some(entry) => {
                *entry = assignment.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_assignment(&self, id: Uuid) -> Result<()> {
        lock(&self.assignments)?.remove(&id).ok_or(StoreError::NotFound)?;
        lock(&self.submissions)?.retain(|_, s| s.assignment_id != id);
        Ok(())
    }

    async fn list_assignments(&self, course_id: Uuid) -> Result<Vec<Assignment>> {
        let mut found: Vec<Assignment> = lock(&self.assignments)?
            .values()
            .filter(|a| a.course_id == course_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn create_submission(
        &self,
        submission: AssignmentSubmission,
    ) -> Result<AssignmentSubmission> {
        lock(&self.submissions)?.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn get_submission(&self, id: Uuid) -> Result<AssignmentSubmission> {
        lock(&self.submissions)?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_submission(&self, submission: &AssignmentSubmission) -> Result<()> {
        let mut submissions = lock(&self.submissions)?;
        match submissions.get_mut(&submission.id) {
            Some(entry) => {
                *entry = submission.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn list_submissions_for_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Vec<AssignmentSubmission>> {
        let mut found: Vec<AssignmentSubmission> = lock(&self.submissions)?
            .values()
            .filter(|s| s.assignment_id == assignment_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(found)
    }

    async fn list_submissions_for_user(&self, user_id: Uuid) -> Result<Vec<AssignmentSubmission>> {
        let mut found: Vec<AssignmentSubmission> = lock(&self.submissions)?
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(found)
    }
}

#[async_trait]
impl ArticleRepo for MemoryStore {
    async fn create(&self, article: Article) -> Result<Article> {
        let mut articles = lock(&self.articles)?;
        if articles.values().any(|a| a.slug == article.slug) {
            return Err(StoreError::Duplicate);
        }
        articles.insert(article.id, article.clone());
        Ok(article)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Article> {
        lock(&self.articles)?
            .values()
            .find(|a| a.slug == slug)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_published(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        let articles = lock(&self.articles)?;
        let mut found: Vec<Article> = articles
            .values()
            .filter(|a| a.status == ArticleStatus::Published)
            .filter(|a| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|category| a.category == category)
            })
            .filter(|a| filter.author_id.is_none_or(|author| a.author_id == author))
            .filter(|a| {
                filter.search.as_deref().is_none_or(|term| {
                    contains(&a.title, term)
                        || contains(&a.excerpt, term)
                        || contains(&a.content, term)
                        || contains(&a.tags, term)
                })
            })
            .cloned()
            .collect();
        let (ordering, descending) = ArticleOrdering::parse(filter.ordering.as_deref());
        match ordering {
            ArticleOrdering::CreatedAt => found.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            ArticleOrdering::ViewsCount => found.sort_by_key(|a| a.views_count),
            ArticleOrdering::LikesCount => found.sort_by_key(|a| a.likes_count),
        }
        if descending {
            found.reverse();
        }
        Ok(found)
    }

    async fn update(&self, article: &Article) -> Result<()> {
        let mut articles = lock(&self.articles)?;
        match articles.get_mut(&article.id) {
            Some(entry) => {
                *entry = article.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        lock(&self.articles)?.remove(&id).ok_or(StoreError::NotFound)?;
        lock(&self.likes)?.retain(|l| l.article_id != id);
        Ok(())
    }

    async fn increment_views(&self, id: Uuid) -> Result<i32> {
        let mut articles = lock(&self.articles)?;
        let article = articles.get_mut(&id).ok_or(StoreError::NotFound)?;
        article.views_count += 1;
        Ok(article.views_count)
    }

    async fn adjust_likes(&self, id: Uuid, delta: i32) -> Result<i32> {
        let mut articles = lock(&self.articles)?;
        let article = articles.get_mut(&id).ok_or(StoreError::NotFound)?;
        article.likes_count += delta;
        Ok(article.likes_count)
    }

    async fn insert_like(&self, like: ArticleLike) -> Result<()> {
        let mut likes = lock(&self.likes)?;
        if likes
            .iter()
            .any(|l| l.article_id == like.article_id && l.user_id == like.user_id)
        {
            return Err(StoreError::Duplicate);
        }
        likes.push(like);
        Ok(())
    }

    async fn delete_like(&self, article_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut likes = lock(&self.likes)?;
        let before = likes.len();
        likes.retain(|l| !(l.article_id == article_id && l.user_id == user_id));
        if likes.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_like(&self, article_id: Uuid, user_id: Uuid) -> Result<Option<ArticleLike>> {
        Ok(lock(&self.likes)?
            .iter()
            .find(|l| l.article_id == article_id && l.user_id == user_id)
            .cloned())
    }

    async fn liked_article_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(lock(&self.likes)?
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.article_id)
            .collect())
    }
}

#[async_trait]
impl WebinarRepo for MemoryStore {
    async fn create(&self, webinar: Webinar) -> Result<Webinar> {
        let mut webinars = lock(&self.webinars)?;
        if webinars.values().any(|w| w.slug == webinar.slug) {
            return Err(StoreError::Duplicate);
        }
        webinars.insert(webinar.id, webinar.clone());
        Ok(webinar)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Webinar> {
        lock(&self.webinars)?
            .values()
            .find(|w| w.slug == slug)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, filter: &WebinarFilter) -> Result<Vec<Webinar>> {
        let webinars = lock(&self.webinars)?;
        let mut found: Vec<Webinar> = webinars
            .values()
            .filter(|w| filter.status.is_none_or(|status| w.status == status))
            .filter(|w| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|category| w.category == category)
            })
            .filter(|w| {
                filter
                    .presenter_id
                    .is_none_or(|presenter| w.presenter_id == presenter)
            })
            .filter(|w| {
                filter.search.as_deref().is_none_or(|term| {
                    contains(&w.title, term)
                        || contains(&w.description, term)
                        || contains(&w.tags, term)
                })
            })
            .cloned()
            .collect();
        let (ordering, descending) = WebinarOrdering::parse(filter.ordering.as_deref());
        match ordering {
            WebinarOrdering::ScheduledDate => {
                found.sort_by(|a, b| a.scheduled_date.cmp(&b.scheduled_date))
            }
            WebinarOrdering::CreatedAt => found.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }
        if descending {
            found.reverse();
        }
        Ok(found)
    }

    async fn update(&self, webinar: &Webinar) -> Result<()> {
        let mut webinars = lock(&self.webinars)?;
        match webinars.get_mut(&webinar.id) {
            Some(entry) => {
                *entry = webinar.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        lock(&self.webinars)?.remove(&id).ok_or(StoreError::NotFound)?;
        lock(&self.registrations)?.retain(|r| r.webinar_id != id);
        Ok(())
    }

    async fn create_registration(
        &self,
        registration: WebinarRegistration,
    ) -> Result<WebinarRegistration> {
        let mut registrations = lock(&self.registrations)?;
        if registrations
            .iter()
            .any(|r| r.webinar_id == registration.webinar_id && r.user_id == registration.user_id)
        {
            return Err(StoreError::Duplicate);
        }
        registrations.push(registration.clone());
        Ok(registration)
    }

    async fn delete_registration(&self, webinar_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut registrations = lock(&self.registrations)?;
        let before = registrations.len();
        registrations.retain(|r| !(r.webinar_id == webinar_id && r.user_id == user_id));
        if registrations.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_registration(
        &self,
        webinar_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<WebinarRegistration>> {
        Ok(lock(&self.registrations)?
            .iter()
            .find(|r| r.webinar_id == webinar_id && r.user_id == user_id)
            .cloned())
    }

    async fn registered_webinar_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(lock(&self.registrations)?
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.webinar_id)
            .collect())
    }

    async fn adjust_registered(&self, id: Uuid, delta: i32) -> Result<i32> {
        let mut webinars = lock(&self.webinars)?;
        let webinar = webinars.get_mut(&id).ok_or(StoreError::NotFound)?;
        webinar.registered_count += delta;
        Ok(webinar.registered_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_enrollment_is_rejected() {
        let store = MemoryStore::new();
        let now = OffsetDateTime::now_utc();
        let user = Uuid::new_v4();
        let course = Uuid::new_v4();

        store
            .create_enrollment(Enrollment::new(user, course, now))
            .await
            .unwrap();
        let err = store
            .create_enrollment(Enrollment::new(user, course, now))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn delete_enrollment_cascades_progress() {
        let store = MemoryStore::new();
        let now = OffsetDateTime::now_utc();
        let enrollment = Enrollment::new(Uuid::new_v4(), Uuid::new_v4(), now);
        store.create_enrollment(enrollment.clone()).await.unwrap();
        store
            .save_progress(&Progress::new(enrollment.id, Uuid::new_v4(), true, now))
            .await
            .unwrap();
        assert_eq!(store.count_completed(enrollment.id).await.unwrap(), 1);

        store.delete_enrollment(enrollment.id).await.unwrap();
        assert_eq!(store.count_completed(enrollment.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn certificate_create_is_idempotent() {
        let store = MemoryStore::new();
        let now = OffsetDateTime::now_utc();
        let user = Uuid::new_v4();
        let course = Uuid::new_v4();

        let (first, issued) = store
            .create_or_fetch_certificate(Certificate::new(user, course, now))
            .await
            .unwrap();
        assert!(issued);
        let (second, issued) = store
            .create_or_fetch_certificate(Certificate::new(user, course, now))
            .await
            .unwrap();
        assert!(!issued);
        assert_eq!(first.id, second.id);
        assert_eq!(first.verification_id, second.verification_id);
        assert_eq!(store.list_certificates(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_like_loses_against_the_constraint() {
        let store = MemoryStore::new();
        let now = OffsetDateTime::now_utc();
        let article = Uuid::new_v4();
        let user = Uuid::new_v4();

        store
            .insert_like(ArticleLike::new(article, user, now))
            .await
            .unwrap();
        let err = store
            .insert_like(ArticleLike::new(article, user, now))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn lesson_order_breaks_position_ties_by_insertion() {
        let store = MemoryStore::new();
        let now = OffsetDateTime::now_utc();
        let course = Uuid::new_v4();

        let payload = |title: &str, position: i32| crate::db::models::NewLesson {
            title: title.into(),
            content: String::new(),
            duration: None,
            position: Some(position),
        };
        store
            .create_lesson(Lesson::new(payload("b", 1), course, now))
            .await
            .unwrap();
        store
            .create_lesson(Lesson::new(payload("a", 0), course, now))
            .await
            .unwrap();
        store
            .create_lesson(Lesson::new(payload("c", 1), course, now))
            .await
            .unwrap();

        let titles: Vec<String> = store
            .list_lessons(course)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.title)
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }
}
