use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::db::error::StoreError;
use crate::db::models::{Article, ArticleFilter, ArticleLike, ArticleOrdering, ArticleStatus};
use crate::db::repository::ArticleRepo;

use super::PgStore;

type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
impl ArticleRepo for PgStore {
    async fn create(&self, article: Article) -> Result<Article> {
        sqlx::query_as::<_, Article>(
            r#"
            INSERT INTO articles (id, title, slug, author_id, author_name, category, excerpt,
                                  content, featured_image, status, tags, read_time, views_count,
                                  likes_count, created_at, updated_at, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.slug)
        .bind(article.author_id)
        .bind(&article.author_name)
        .bind(&article.category)
        .bind(&article.excerpt)
        .bind(&article.content)
        .bind(&article.featured_image)
        .bind(article.status)
        .bind(&article.tags)
        .bind(article.read_time)
        .bind(article.views_count)
        .bind(article.likes_count)
        .bind(article.created_at)
        .bind(article.updated_at)
        .bind(article.published_at)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Article> {
        sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE slug = $1")
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?
            .ok_or(StoreError::NotFound)
    }

    async fn list_published(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        let mut query = QueryBuilder::new("SELECT * FROM articles WHERE status = ");
        query.push_bind(ArticleStatus::Published);
        if let Some(category) = &filter.category {
            query.push(" AND category = ").push_bind(category);
        }
        if let Some(author_id) = filter.author_id {
            query.push(" AND author_id = ").push_bind(author_id);
        }
        if let Some(term) = &filter.search {
            let pattern = format!("%{}%", term);
            query
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR excerpt ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR content ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR tags ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        let (ordering, descending) = ArticleOrdering::parse(filter.ordering.as_deref());
        let column = match ordering {
            ArticleOrdering::CreatedAt => "created_at",
            ArticleOrdering::ViewsCount => "views_count",
            ArticleOrdering::LikesCount => "likes_count",
        };
        query.push(format!(
            " ORDER BY {} {}",
            column,
            if descending { "DESC" } else { "ASC" }
        ));

        query
            .build_query_as::<Article>()
            .fetch_all(self.pool())
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn update(&self, article: &Article) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE articles
            SET title = $2, category = $3, excerpt = $4, content = $5, featured_image = $6,
                status = $7, tags = $8, read_time = $9, updated_at = $10, published_at = $11
            WHERE id = $1
            "#,
        )
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.category)
        .bind(&article.excerpt)
        .bind(&article.content)
        .bind(&article.featured_image)
        .bind(article.status)
        .bind(&article.tags)
        .bind(article.read_time)
        .bind(article.updated_at)
        .bind(article.published_at)
        .execute(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn increment_views(&self, id: Uuid) -> Result<i32> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE articles SET views_count = views_count + 1 WHERE id = $1 RETURNING views_count",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?
        .ok_or(StoreError::NotFound)
    }

    async fn adjust_likes(&self, id: Uuid, delta: i32) -> Result<i32> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE articles SET likes_count = likes_count + $2 WHERE id = $1 RETURNING likes_count",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?
        .ok_or(StoreError::NotFound)
    }

    async fn insert_like(&self, like: ArticleLike) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO article_likes (id, article_id, user_id, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(like.id)
        .bind(like.article_id)
        .bind(like.user_id)
        .bind(like.created_at)
        .execute(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn delete_like(&self, article_id: Uuid, user_id: Uuid) -> Result<()> {
        let result =
            sqlx::query("DELETE FROM article_likes WHERE article_id = $1 AND user_id = $2")
                .bind(article_id)
                .bind(user_id)
                .execute(self.pool())
                .await
                .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_like(&self, article_id: Uuid, user_id: Uuid) -> Result<Option<ArticleLike>> {
        sqlx::query_as::<_, ArticleLike>(
            "SELECT * FROM article_likes WHERE article_id = $1 AND user_id = $2",
        )
        .bind(article_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn liked_article_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>("SELECT article_id FROM article_likes WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .map_err(StoreError::from_sqlx)
    }
}
