use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Assignment {
    pub fn new(payload: NewAssignment, course_id: Uuid, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id,
            title: payload.title,
            description: payload.description,
            due_date: payload.due_date,
            created_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateAssignment) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(due_date) = update.due_date {
            self.due_date = Some(due_date);
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AssignmentSubmission {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    pub file_url: Option<String>,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
}

impl AssignmentSubmission {
    pub fn new(
        payload: NewSubmission,
        assignment_id: Uuid,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            assignment_id,
            user_id,
            submitted_at: now,
            file_url: payload.file_url,
            grade: None,
            feedback: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewAssignment {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAssignment {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewSubmission {
    #[validate(url)]
    pub file_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GradeSubmission {
    #[validate(range(min = 0.0, max = 100.0))]
    pub grade: f64,
    pub feedback: Option<String>,
}
