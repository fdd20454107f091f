use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

use super::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "course_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub instructor_id: Uuid,
    pub instructor_name: String,
    pub price: f64,
    pub duration: String,
    pub category: String,
    pub level: CourseLevel,
    pub published: bool,
    pub rating: f64,
    pub students_count: i32,
    pub thumbnail_url: Option<String>,
    pub preview_video_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Course {
    pub fn new(payload: NewCourse, instructor: &User, slug: String, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: payload.title,
            slug,
            description: payload.description,
            instructor_id: instructor.id,
            instructor_name: instructor.full_name(),
            price: payload.price,
            duration: payload.duration,
            category: payload.category.unwrap_or_else(|| "other".to_string()),
            level: payload.level.unwrap_or(CourseLevel::Beginner),
            published: payload.published.unwrap_or(true),
            rating: 0.0,
            students_count: 0,
            thumbnail_url: payload.thumbnail_url,
            preview_video_url: payload.preview_video_url,
            created_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateCourse) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(duration) = update.duration {
            self.duration = duration;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(level) = update.level {
            self.level = level;
        }
        if let Some(published) = update.published {
            self.published = published;
        }
        if let Some(thumbnail_url) = update.thumbnail_url {
            self.thumbnail_url = Some(thumbnail_url);
        }
        if let Some(preview_video_url) = update.preview_video_url {
            self.preview_video_url = Some(preview_video_url);
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub content: String,
    pub duration: String,
    pub position: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Lesson {
    pub fn new(payload: NewLesson, course_id: Uuid, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id,
            title: payload.title,
            content: payload.content,
            duration: payload.duration.unwrap_or_default(),
            position: payload.position.unwrap_or(0),
            created_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateLesson) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(duration) = update.duration {
            self.duration = duration;
        }
        if let Some(position) = update.position {
            self.position = position;
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewCourse {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(range(min = 0.0))]
    pub price: f64,
    pub duration: String,
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    pub published: Option<bool>,
    pub thumbnail_url: Option<String>,
    pub preview_video_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCourse {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    pub duration: Option<String>,
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    pub published: Option<bool>,
    pub thumbnail_url: Option<String>,
    pub preview_video_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewLesson {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub content: String,
    pub duration: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLesson {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub content: Option<String>,
    pub duration: Option<String>,
    pub position: Option<i32>,
}

/// Catalog filters; only published courses are ever listed.
#[derive(Debug, Default, Clone)]
pub struct CourseFilter {
    pub search: Option<String>,
    pub level: Option<CourseLevel>,
    pub instructor: Option<String>,
}
