use async_trait::async_trait;
use uuid::Uuid;

use crate::db::error::StoreError;
use crate::db::models::{Assignment, AssignmentSubmission, Quiz, QuizResult};
use crate::db::repository::AssessmentRepo;

use super::PgStore;

type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
impl AssessmentRepo for PgStore {
    async fn create_quiz(&self, quiz: Quiz) -> Result<Quiz> {
        sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (id, course_id, title, description, position)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(quiz.id)
        .bind(quiz.course_id)
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(quiz.position)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn get_quiz(&self, id: Uuid) -> Result<Quiz> {
        sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?
            .ok_or(StoreError::NotFound)
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<()> {
        let result = sqlx::query(
            "UPDATE quizzes SET title = $2, description = $3, position = $4 WHERE id = $1",
        )
        .bind(quiz.id)
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(quiz.position)
        .execute(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_quizzes(&self, course_id: Uuid) -> Result<Vec<Quiz>> {
        sqlx::query_as::<_, Quiz>(
            "SELECT * FROM quizzes WHERE course_id = $1 ORDER BY position, id",
        )
        .bind(course_id)
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn create_quiz_result(&self, result: QuizResult) -> Result<QuizResult> {
        sqlx::query_as::<_, QuizResult>(
            r#"
            INSERT INTO quiz_results (id, quiz_id, user_id, score, passed, taken_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(result.id)
        .bind(result.quiz_id)
        .bind(result.user_id)
        .bind(result.score)
        .bind(result.passed)
        .bind(result.taken_at)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn list_quiz_results_for_user(&self, user_id: Uuid) -> Result<Vec<QuizResult>> {
        sqlx::query_as::<_, QuizResult>(
            "SELECT * FROM quiz_results WHERE user_id = $1 ORDER BY taken_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn create_assignment(&self, assignment: Assignment) -> Result<Assignment> {
        sqlx::query_as::<_, Assignment>(
            r#"
            INSERT INTO assignments (id, course_id, title, description, due_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.course_id)
        .bind(&assignment.title)
        .bind(&assignment.description)
        .bind(assignment.due_date)
        .bind(assignment.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn get_assignment(&self, id: Uuid) -> Result<Assignment> {
        sqlx::query_as::<_, Assignment>("SELECT * FROM assignments WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?
            .ok_or(StoreError::NotFound)
    }

    async fn update_assignment(&self, assignment: &Assignment) -> Result<()> {
        let result = sqlx::query(
            "UPDATE assignments SET title = $2, description = $3, due_date = $4 WHERE id = $1",
        )
        .bind(assignment.id)
        .bind(&assignment.title)
        .bind(&assignment.description)
        .bind(assignment.due_date)
        .execute(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_assignment(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM assignments WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_assignments(&self, course_id: Uuid) -> Result<Vec<Assignment>> {
        sqlx::query_as::<_, Assignment>(
            "SELECT * FROM assignments WHERE course_id = $1 ORDER BY created_at",
        )
        .bind(course_id)
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn create_submission(
        &self,
        submission: AssignmentSubmission,
    ) -> Result<AssignmentSubmission> {
        sqlx::query_as::<_, AssignmentSubmission>(
            r#"
            INSERT INTO assignment_submissions (id, assignment_id, user_id, submitted_at, file_url, grade, feedback)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(submission.id)
        .bind(submission.assignment_id)
        .bind(submission.user_id)
        .bind(submission.submitted_at)
        .bind(&submission.file_url)
        .bind(submission.grade)
        .bind(&submission.feedback)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn get_submission(&self, id: Uuid) -> Result<AssignmentSubmission> {
        sqlx::query_as::<_, AssignmentSubmission>(
            "SELECT * FROM assignment_submissions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?
        .ok_or(StoreError::NotFound)
    }

    async fn update_submission(&self, submission: &AssignmentSubmission) -> Result<()> {
        let result = sqlx::query(
            "UPDATE assignment_submissions SET grade = $2, feedback = $3 WHERE id = $1",
        )
        .bind(submission.id)
        .bind(submission.grade)
        .bind(&submission.feedback)
        .execute(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_submissions_for_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Vec<AssignmentSubmission>> {
        sqlx::query_as::<_, AssignmentSubmission>(
            "SELECT * FROM assignment_submissions WHERE assignment_id = $1 ORDER BY submitted_at",
        )
        .bind(assignment_id)
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn list_submissions_for_user(&self, user_id: Uuid) -> Result<Vec<AssignmentSubmission>> {
        sqlx::query_as::<_, AssignmentSubmission>(
            "SELECT * FROM assignment_submissions WHERE user_id = $1 ORDER BY submitted_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }
}
