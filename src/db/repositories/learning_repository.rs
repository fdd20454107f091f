use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::error::StoreError;
use crate::db::models::{Certificate, Enrollment, Progress};
use crate::db::repository::LearningRepo;

use super::PgStore;

type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
impl LearningRepo for PgStore {
    async fn create_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment> {
        sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (id, user_id, course_id, enrolled_at, last_accessed)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(enrollment.id)
        .bind(enrollment.user_id)
        .bind(enrollment.course_id)
        .bind(enrollment.enrolled_at)
        .bind(enrollment.last_accessed)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn find_enrollment(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<Enrollment>> {
        sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn delete_enrollment(&self, id: Uuid) -> Result<()> {
        // progress rows go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_enrollments_for_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>> {
        sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn list_enrollments_for_course(&self, course_id: Uuid) -> Result<Vec<Enrollment>> {
        sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE course_id = $1")
            .bind(course_id)
            .fetch_all(self.pool())
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn touch_enrollment(&self, id: Uuid, now: OffsetDateTime) -> Result<()> {
        let result = sqlx::query("UPDATE enrollments SET last_accessed = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_progress(&self, enrollment_id: Uuid, lesson_id: Uuid) -> Result<Option<Progress>> {
        sqlx::query_as::<_, Progress>(
            "SELECT * FROM progress WHERE enrollment_id = $1 AND lesson_id = $2",
        )
        .bind(enrollment_id)
        .bind(lesson_id)
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn save_progress(&self, progress: &Progress) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO progress (id, enrollment_id, lesson_id, completed, completed_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (enrollment_id, lesson_id)
            DO UPDATE SET completed = EXCLUDED.completed, completed_at = EXCLUDED.completed_at
            "#,
        )
        .bind(progress.id)
        .bind(progress.enrollment_id)
        .bind(progress.lesson_id)
        .bind(progress.completed)
        .bind(progress.completed_at)
        .execute(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn count_completed(&self, enrollment_id: Uuid) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM progress WHERE enrollment_id = $1 AND completed = TRUE",
        )
        .bind(enrollment_id)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn create_or_fetch_certificate(
        &self,
        certificate: Certificate,
    ) -> Result<(Certificate, bool)> {
        // ON CONFLICT DO NOTHING keeps this race-safe: the loser's insert
        // returns no row and the reselect picks up the winner's certificate.
        let inserted = sqlx::query_as::<_, Certificate>(
            r#"
            INSERT INTO certificates (id, user_id, course_id, issued_at, verification_id, certificate_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, course_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(certificate.id)
        .bind(certificate.user_id)
        .bind(certificate.course_id)
        .bind(certificate.issued_at)
        .bind(&certificate.verification_id)
        .bind(&certificate.certificate_url)
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;

        match inserted {
            Some(row) => Ok((row, true)),
            None => self
                .find_certificate(certificate.user_id, certificate.course_id)
                .await?
                .map(|row| (row, false))
                .ok_or(StoreError::NotFound),
        }
    }

    async fn find_certificate(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<Certificate>> {
        sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn get_certificate(&self, id: Uuid) -> Result<Certificate> {
        sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?
            .ok_or(StoreError::NotFound)
    }

    async fn list_certificates(&self, user_id: Uuid) -> Result<Vec<Certificate>> {
        sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE user_id = $1 ORDER BY issued_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }
}
