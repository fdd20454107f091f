use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::models::{
    dedupe_slug, slugify_title, Article, ArticleFilter, ArticleLike, NewArticle, UpdateArticle,
    User,
};
use crate::db::StoreError;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};

#[derive(Debug, Deserialize)]
pub struct ArticleListQuery {
    pub category: Option<String>,
    pub author: Option<Uuid>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: Article,
    pub tags_list: Vec<String>,
    pub is_liked: bool,
}

impl ArticleView {
    fn new(article: Article, is_liked: bool) -> Self {
        let tags_list = article.tags_list();
        Self {
            article,
            tags_list,
            is_liked,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: i32,
}

fn require_author(article: &Article, user: &User) -> AppResult<()> {
    if article.author_id == user.id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Only the author may do this".to_string(),
        ))
    }
}

pub async fn list_articles(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<ArticleListQuery>,
) -> AppResult<Json<Vec<ArticleView>>> {
    let filter = ArticleFilter {
        category: query.category,
        author_id: query.author,
        search: query.search,
        ordering: query.ordering,
    };
    let articles = state.store.articles.list_published(&filter).await?;

    let liked: HashSet<Uuid> = match &viewer {
        Some(user) => state
            .store
            .articles
            .liked_article_ids(user.id)
            .await?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };

    Ok(Json(
        articles
            .into_iter()
            .map(|article| {
                let is_liked = liked.contains(&article.id);
                ArticleView::new(article, is_liked)
            })
            .collect(),
    ))
}

pub async fn create_article(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<NewArticle>,
) -> AppResult<(StatusCode, Json<ArticleView>)> {
    payload.validate()?;

    let now = OffsetDateTime::now_utc();
    let slug = slugify_title(&payload.title);
    let article = Article::new(payload, &user, slug.clone(), now);

    let created = match state.store.articles.create(article.clone()).await {
        Ok(created) => created,
        Err(StoreError::Duplicate) => {
            let mut retry = article;
            retry.slug = dedupe_slug(&slug);
            state.store.articles.create(retry).await?
        }
        Err(err) => return Err(err.into()),
    };
    Ok((StatusCode::CREATED, Json(ArticleView::new(created, false))))
}

pub async fn article_detail(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<ArticleView>> {
    let mut article = state.store.articles.get_by_slug(&slug).await?;
    article.views_count = state.store.articles.increment_views(article.id).await?;

    let is_liked = match &viewer {
        Some(user) => state
            .store
            .articles
            .find_like(article.id, user.id)
            .await?
            .is_some(),
        None => false,
    };
    Ok(Json(ArticleView::new(article, is_liked)))
}

pub async fn update_article(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<UpdateArticle>,
) -> AppResult<Json<ArticleView>> {
    payload.validate()?;
    let mut article = state.store.articles.get_by_slug(&slug).await?;
    require_author(&article, &user)?;

    article.apply_update(payload, OffsetDateTime::now_utc());
    state.store.articles.update(&article).await?;

    let is_liked = state
        .store
        .articles
        .find_like(article.id, user.id)
        .await?
        .is_some();
    Ok(Json(ArticleView::new(article, is_liked)))
}

pub async fn delete_article(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    let article = state.store.articles.get_by_slug(&slug).await?;
    require_author(&article, &user)?;
    state.store.articles.delete(article.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Toggles the caller's like. A duplicate insert racing the uniqueness
/// constraint is reported as already-liked without a second increment.
pub async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<LikeResponse>> {
    let article = state.store.articles.get_by_slug(&slug).await?;

    let existing = state.store.articles.find_like(article.id, user.id).await?;
    let (liked, likes_count) = match existing {
        Some(_) => {
            state.store.articles.delete_like(article.id, user.id).await?;
            (false, state.store.articles.adjust_likes(article.id, -1).await?)
        }
        None => {
            let like = ArticleLike::new(article.id, user.id, OffsetDateTime::now_utc());
            match state.store.articles.insert_like(like).await {
                Ok(()) => (true, state.store.articles.adjust_likes(article.id, 1).await?),
                // a zero delta reads the count as adjusted by the race winner
                Err(StoreError::Duplicate) => {
                    (true, state.store.articles.adjust_likes(article.id, 0).await?)
                }
                Err(err) => return Err(err.into()),
            }
        }
    };

    Ok(Json(LikeResponse { liked, likes_count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::AppState;
    use crate::config;
    use crate::db::models::{ArticleStatus, UserRole};
    use crate::db::Store;

    fn account(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: format!("{name}@example.com"),
            username: name.to_string(),
            password_hash: "hash".into(),
            first_name: String::new(),
            last_name: String::new(),
            role: UserRole::Student,
            is_active: true,
            date_joined: OffsetDateTime::now_utc(),
        }
    }

    async fn published_article(state: &AppState, author: &User) -> Article {
        let payload = NewArticle {
            title: "On Engines".into(),
            category: None,
            excerpt: "A short note".into(),
            content: "Body".into(),
            featured_image: None,
            status: Some(ArticleStatus::Published),
            tags: None,
            read_time: None,
        };
        let article = Article::new(
            payload,
            author,
            format!("on-engines-{}", Uuid::new_v4().simple()),
            OffsetDateTime::now_utc(),
        );
        state.store.articles.create(article).await.unwrap()
    }

    async fn toggle(state: &AppState, user: &User, slug: &str) -> LikeResponse {
        let Json(response) = toggle_like(
            State(state.clone()),
            AuthUser(user.clone()),
            Path(slug.to_string()),
        )
        .await
        .unwrap();
        response
    }

    #[tokio::test]
    async fn toggle_like_flips_and_moves_the_count_by_one() {
        let state = AppState::new(Store::in_memory(), config::for_tests());
        let author = state.store.users.create(account("author")).await.unwrap();
        let article = published_article(&state, &author).await;
        let fan = state.store.users.create(account("fan")).await.unwrap();

        let liked = toggle(&state, &fan, &article.slug).await;
        assert!(liked.liked);
        assert_eq!(liked.likes_count, 1);

        let unliked = toggle(&state, &fan, &article.slug).await;
        assert!(!unliked.liked);
        assert_eq!(unliked.likes_count, 0);

        let stored = state.store.articles.get_by_slug(&article.slug).await.unwrap();
        assert_eq!(stored.likes_count, 0);
    }

    #[tokio::test]
    async fn likes_from_different_users_accumulate() {
        let state = AppState::new(Store::in_memory(), config::for_tests());
        let author = state.store.users.create(account("author")).await.unwrap();
        let article = published_article(&state, &author).await;
        let first = state.store.users.create(account("first")).await.unwrap();
        let second = state.store.users.create(account("second")).await.unwrap();

        assert_eq!(toggle(&state, &first, &article.slug).await.likes_count, 1);
        assert_eq!(toggle(&state, &second, &article.slug).await.likes_count, 2);

        // one user's unlike leaves the other's like in place
        let response = toggle(&state, &first, &article.slug).await;
        assert!(!response.liked);
        assert_eq!(response.likes_count, 1);
    }

    #[tokio::test]
    async fn zero_delta_reports_the_current_count() {
        let state = AppState::new(Store::in_memory(), config::for_tests());
        let author = state.store.users.create(account("author")).await.unwrap();
        let article = published_article(&state, &author).await;

        state.store.articles.adjust_likes(article.id, 1).await.unwrap();
        assert_eq!(state.store.articles.adjust_likes(article.id, 0).await.unwrap(), 1);
    }
}
