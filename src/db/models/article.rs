use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

use super::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "article_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub category: String,
    pub excerpt: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub status: ArticleStatus,
    pub tags: String,
    pub read_time: i32,
    pub views_count: i32,
    pub likes_count: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}

impl Article {
    pub fn new(payload: NewArticle, author: &User, slug: String, now: OffsetDateTime) -> Self {
        let status = payload.status.unwrap_or(ArticleStatus::Draft);
        Self {
            id: Uuid::new_v4(),
            title: payload.title,
            slug,
            author_id: author.id,
            author_name: author.full_name(),
            category: payload.category.unwrap_or_else(|| "other".to_string()),
            excerpt: payload.excerpt,
            content: payload.content,
            featured_image: payload.featured_image,
            status,
            tags: payload.tags.unwrap_or_default(),
            read_time: payload.read_time.unwrap_or(5),
            views_count: 0,
            likes_count: 0,
            created_at: now,
            updated_at: now,
            published_at: (status == ArticleStatus::Published).then_some(now),
        }
    }

    /// `published_at` is stamped the first time the article becomes
    /// published and never moves afterwards, even across later
    /// draft/published flips.
    pub fn apply_update(&mut self, update: UpdateArticle, now: OffsetDateTime) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(excerpt) = update.excerpt {
            self.excerpt = excerpt;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(featured_image) = update.featured_image {
            self.featured_image = Some(featured_image);
        }
        if let Some(status) = update.status {
            self.status = status;
            if status == ArticleStatus::Published && self.published_at.is_none() {
                self.published_at = Some(now);
            }
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(read_time) = update.read_time {
            self.read_time = read_time;
        }
        self.updated_at = now;
    }

    pub fn tags_list(&self) -> Vec<String> {
        super::tags_list(&self.tags)
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ArticleLike {
    pub id: Uuid,
    pub article_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ArticleLike {
    pub fn new(article_id: Uuid, user_id: Uuid, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            article_id,
            user_id,
            created_at: now,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewArticle {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub category: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub excerpt: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub status: Option<ArticleStatus>,
    pub tags: Option<String>,
    #[validate(range(min = 1))]
    pub read_time: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateArticle {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub category: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub status: Option<ArticleStatus>,
    pub tags: Option<String>,
    #[validate(range(min = 1))]
    pub read_time: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleOrdering {
    CreatedAt,
    ViewsCount,
    LikesCount,
}

impl ArticleOrdering {
    /// Parses an `ordering` query value; a `-` prefix means descending.
    /// Unknown fields fall back to the default of newest first.
    pub fn parse(value: Option<&str>) -> (Self, bool) {
        let Some(value) = value else {
            return (Self::CreatedAt, true);
        };
        let (field, descending) = match value.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (value, false),
        };
        match field {
            "created_at" => (Self::CreatedAt, descending),
            "views_count" => (Self::ViewsCount, descending),
            "likes_count" => (Self::LikesCount, descending),
            _ => (Self::CreatedAt, true),
        }
    }
}

/// Feed filters; the listing only ever shows published articles.
#[derive(Debug, Default, Clone)]
pub struct ArticleFilter {
    pub category: Option<String>,
    pub author_id: Option<Uuid>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewUser;
    use secrecy::SecretBox;

    fn author() -> User {
        let payload = NewUser {
            email: "ada@example.com".into(),
            username: "ada".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            password: SecretBox::new(Box::new("pw".to_string())),
        };
        User::new(payload, "hash".into(), OffsetDateTime::now_utc())
    }

    fn new_article(status: Option<ArticleStatus>) -> NewArticle {
        NewArticle {
            title: "On Engines".into(),
            category: None,
            excerpt: "A short note".into(),
            content: "Body".into(),
            featured_image: None,
            status,
            tags: Some("math, engines".into()),
            read_time: None,
        }
    }

    #[test]
    fn published_at_is_stamped_exactly_once() {
        let now = OffsetDateTime::now_utc();
        let later = now + time::Duration::days(1);
        let author = author();

        let mut article = Article::new(new_article(None), &author, "on-engines".into(), now);
        assert!(article.published_at.is_none());

        article.apply_update(
            UpdateArticle {
                status: Some(ArticleStatus::Published),
                title: None,
                category: None,
                excerpt: None,
                content: None,
                featured_image: None,
                tags: None,
                read_time: None,
            },
            now,
        );
        assert_eq!(article.published_at, Some(now));

        // back to draft and published again: the original stamp survives
        article.apply_update(
            UpdateArticle {
                status: Some(ArticleStatus::Draft),
                title: None,
                category: None,
                excerpt: None,
                content: None,
                featured_image: None,
                tags: None,
                read_time: None,
            },
            later,
        );
        article.apply_update(
            UpdateArticle {
                status: Some(ArticleStatus::Published),
                title: None,
                category: None,
                excerpt: None,
                content: None,
                featured_image: None,
                tags: None,
                read_time: None,
            },
            later,
        );
        assert_eq!(article.published_at, Some(now));
    }

    #[test]
    fn created_already_published_gets_stamp_immediately() {
        let now = OffsetDateTime::now_utc();
        let article = Article::new(
            new_article(Some(ArticleStatus::Published)),
            &author(),
            "on-engines".into(),
            now,
        );
        assert_eq!(article.published_at, Some(now));
    }

    #[test]
    fn ordering_parse_handles_prefix_and_unknowns() {
        assert_eq!(ArticleOrdering::parse(None), (ArticleOrdering::CreatedAt, true));
        assert_eq!(
            ArticleOrdering::parse(Some("views_count")),
            (ArticleOrdering::ViewsCount, false)
        );
        assert_eq!(
            ArticleOrdering::parse(Some("-likes_count")),
            (ArticleOrdering::LikesCount, true)
        );
        assert_eq!(
            ArticleOrdering::parse(Some("bogus")),
            (ArticleOrdering::CreatedAt, true)
        );
    }
}
