use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
}

impl Quiz {
    pub fn new(payload: NewQuiz, course_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id,
            title: payload.title,
            description: payload.description,
            position: payload.position.unwrap_or(0),
        }
    }

    pub fn apply_update(&mut self, update: UpdateQuiz) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(position) = update.position {
            self.position = position;
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub score: f64,
    pub passed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub taken_at: OffsetDateTime,
}

impl QuizResult {
    pub fn new(payload: NewQuizResult, quiz_id: Uuid, user_id: Uuid, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            quiz_id,
            user_id,
            score: payload.score,
            passed: payload.passed,
            taken_at: now,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewQuiz {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuiz {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewQuizResult {
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
    pub passed: bool,
}
