use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::db::error::StoreError;
use crate::db::models::{Course, CourseFilter, Lesson};
use crate::db::repository::CourseRepo;

use super::PgStore;

type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
impl CourseRepo for PgStore {
    async fn create(&self, course: Course) -> Result<Course> {
        sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (id, title, slug, description, instructor_id, instructor_name,
                                 price, duration, category, level, published, rating,
                                 students_count, thumbnail_url, preview_video_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.slug)
        .bind(&course.description)
        .bind(course.instructor_id)
        .bind(&course.instructor_name)
        .bind(course.price)
        .bind(&course.duration)
        .bind(&course.category)
        .bind(course.level)
        .bind(course.published)
        .bind(course.rating)
        .bind(course.students_count)
        .bind(&course.thumbnail_url)
        .bind(&course.preview_video_url)
        .bind(course.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn get(&self, id: Uuid) -> Result<Course> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?
            .ok_or(StoreError::NotFound)
    }

    async fn list_published(&self, filter: &CourseFilter) -> Result<Vec<Course>> {
        let mut query = QueryBuilder::new("SELECT * FROM courses WHERE published = TRUE");
        if let Some(level) = filter.level {
            query.push(" AND level = ").push_bind(level);
        }
        if let Some(instructor) = &filter.instructor {
            query
                .push(" AND instructor_name ILIKE ")
                .push_bind(format!("%{}%", instructor));
        }
        if let Some(term) = &filter.search {
            let pattern = format!("%{}%", term);
            query
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR instructor_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        query.push(" ORDER BY created_at DESC");

        query
            .build_query_as::<Course>()
            .fetch_all(self.pool())
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn update(&self, course: &Course) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET title = $2, description = $3, price = $4, duration = $5, category = $6,
                level = $7, published = $8, rating = $9, thumbnail_url = $10,
                preview_video_url = $11
            WHERE id = $1
            "#,
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(course.price)
        .bind(&course.duration)
        .bind(&course.category)
        .bind(course.level)
        .bind(course.published)
        .bind(course.rating)
        .bind(&course.thumbnail_url)
        .bind(&course.preview_video_url)
        .execute(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn increment_students(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE courses SET students_count = students_count + 1 WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_lesson(&self, lesson: Lesson) -> Result<Lesson> {
        sqlx::query_as::<_, Lesson>(
            r#"
            INSERT INTO lessons (id, course_id, title, content, duration, position, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(lesson.id)
        .bind(lesson.course_id)
        .bind(&lesson.title)
        .bind(&lesson.content)
        .bind(&lesson.duration)
        .bind(lesson.position)
        .bind(lesson.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn get_lesson(&self, id: Uuid) -> Result<Lesson> {
        sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?
            .ok_or(StoreError::NotFound)
    }

    async fn update_lesson(&self, lesson: &Lesson) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE lessons
            SET title = $2, content = $3, duration = $4, position = $5
            WHERE id = $1
            "#,
        )
        .bind(lesson.id)
        .bind(&lesson.title)
        .bind(&lesson.content)
        .bind(&lesson.duration)
        .bind(lesson.position)
        .execute(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_lesson(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_lessons(&self, course_id: Uuid) -> Result<Vec<Lesson>> {
        sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE course_id = $1 ORDER BY position, created_at, id",
        )
        .bind(course_id)
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn count_lessons(&self, course_id: Uuid) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lessons WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(self.pool())
            .await
            .map_err(StoreError::from_sqlx)
    }
}
