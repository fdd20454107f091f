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
    dedupe_slug, slugify_title, NewWebinar, UpdateWebinar, User, Webinar, WebinarFilter,
    WebinarRegistration, WebinarStatus,
};
use crate::db::StoreError;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};

#[derive(Debug, Deserialize)]
pub struct WebinarListQuery {
    pub status: Option<WebinarStatus>,
    pub category: Option<String>,
    pub presenter: Option<Uuid>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebinarView {
    #[serde(flatten)]
    pub webinar: Webinar,
    pub tags_list: Vec<String>,
    pub is_registered: bool,
    pub can_register: bool,
}

impl WebinarView {
    fn new(webinar: Webinar, is_registered: bool, now: OffsetDateTime) -> Self {
        let tags_list = webinar.tags_list();
        let can_register = !is_registered && webinar.is_registration_open(now);
        Self {
            webinar,
            tags_list,
            is_registered,
            can_register,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub registration: WebinarRegistration,
    pub registered_count: i32,
}

fn require_presenter(webinar: &Webinar, user: &User) -> AppResult<()> {
    if webinar.presenter_id == user.id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Only the presenter may do this".to_string(),
        ))
    }
}

pub async fn list_webinars(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<WebinarListQuery>,
) -> AppResult<Json<Vec<WebinarView>>> {
    let filter = WebinarFilter {
        status: query.status,
        category: query.category,
        presenter_id: query.presenter,
        search: query.search,
        ordering: query.ordering,
    };
    let webinars = state.store.webinars.list(&filter).await?;

    let registered: HashSet<Uuid> = match &viewer {
        Some(user) => state
            .store
            .webinars
            .registered_webinar_ids(user.id)
            .await?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };

    let now = OffsetDateTime::now_utc();
    Ok(Json(
        webinars
            .into_iter()
            .map(|webinar| {
                let is_registered = registered.contains(&webinar.id);
                WebinarView::new(webinar, is_registered, now)
            })
            .collect(),
    ))
}

pub async fn create_webinar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<NewWebinar>,
) -> AppResult<(StatusCode, Json<WebinarView>)> {
    payload.validate()?;

    let now = OffsetDateTime::now_utc();
    let slug = slugify_title(&payload.title);
    let webinar = Webinar::new(payload, &user, slug.clone(), now);

    let created = match state.store.webinars.create(webinar.clone()).await {
        Ok(created) => created,
        Err(StoreError::Duplicate) => {
            let mut retry = webinar;
            retry.slug = dedupe_slug(&slug);
            state.store.webinars.create(retry).await?
        }
        Err(err) => return Err(err.into()),
    };
    Ok((StatusCode::CREATED, Json(WebinarView::new(created, false, now))))
}

pub async fn webinar_detail(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<WebinarView>> {
    let webinar = state.store.webinars.get_by_slug(&slug).await?;

    let is_registered = match &viewer {
        Some(user) => state
            .store
            .webinars
            .find_registration(webinar.id, user.id)
            .await?
            .is_some(),
        None => false,
    };
    Ok(Json(WebinarView::new(
        webinar,
        is_registered,
        OffsetDateTime::now_utc(),
    )))
}

pub async fn update_webinar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<UpdateWebinar>,
) -> AppResult<Json<WebinarView>> {
    payload.validate()?;
    let mut webinar = state.store.webinars.get_by_slug(&slug).await?;
    require_presenter(&webinar, &user)?;

    let now = OffsetDateTime::now_utc();
    webinar.apply_update(payload, now);
    state.store.webinars.update(&webinar).await?;

    let is_registered = state
        .store
        .webinars
        .find_registration(webinar.id, user.id)
        .await?
        .is_some();
    Ok(Json(WebinarView::new(webinar, is_registered, now)))
}

pub async fn delete_webinar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    let webinar = state.store.webinars.get_by_slug(&slug).await?;
    require_presenter(&webinar, &user)?;
    state.store.webinars.delete(webinar.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn register(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(slug): Path<String>,
) -> AppResult<(StatusCode, Json<RegistrationResponse>)> {
    let webinar = state.store.webinars.get_by_slug(&slug).await?;

    let now = OffsetDateTime::now_utc();
    if !webinar.is_registration_open(now) {
        return Err(AppError::BadRequest("Registration is closed".to_string()));
    }

    let registration = WebinarRegistration::new(webinar.id, user.id, now);
    let registration = match state.store.webinars.create_registration(registration).await {
        Ok(registration) => registration,
        Err(StoreError::Duplicate) => {
            return Err(AppError::Conflict(
                "Already registered for this webinar".to_string(),
            ))
        }
        Err(err) => return Err(err.into()),
    };
    let registered_count = state.store.webinars.adjust_registered(webinar.id, 1).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            registration,
            registered_count,
        }),
    ))
}

/// Unlike the course student counter, registered_count is compensated on
/// unregister so the attendee cap frees up again.
pub async fn unregister(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    let webinar = state.store.webinars.get_by_slug(&slug).await?;

    match state
        .store
        .webinars
        .delete_registration(webinar.id, user.id)
        .await
    {
        Ok(()) => {
            state.store.webinars.adjust_registered(webinar.id, -1).await?;
            Ok(StatusCode::NO_CONTENT)
        }
        Err(StoreError::NotFound) => Err(AppError::NotFound(
            "Not registered for this webinar".to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::AppState;
    use crate::config;
    use crate::db::models::UserRole;
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

    async fn seeded_webinar(state: &AppState, payload: NewWebinar) -> Webinar {
        let presenter = state
            .store
            .users
            .create(account(&format!("host-{}", Uuid::new_v4().simple())))
            .await
            .unwrap();
        let slug = format!("{}-{}", slugify_title(&payload.title), Uuid::new_v4().simple());
        let webinar = Webinar::new(payload, &presenter, slug, OffsetDateTime::now_utc());
        state.store.webinars.create(webinar).await.unwrap()
    }

    fn upcoming(title: &str) -> NewWebinar {
        NewWebinar {
            title: title.into(),
            description: "desc".into(),
            agenda: None,
            thumbnail_image: None,
            scheduled_date: OffsetDateTime::now_utc() + time::Duration::days(7),
            duration_minutes: None,
            timezone: None,
            registration_status: None,
            max_attendees: None,
            registration_deadline: None,
            meeting_link: None,
            meeting_id: None,
            meeting_passcode: None,
            category: None,
            tags: None,
        }
    }

    async fn sign_up(
        state: &AppState,
        user: &User,
        slug: &str,
    ) -> AppResult<(StatusCode, Json<RegistrationResponse>)> {
        register(
            State(state.clone()),
            AuthUser(user.clone()),
            Path(slug.to_string()),
        )
        .await
    }

    #[tokio::test]
    async fn register_then_unregister_compensates_the_count() {
        let state = AppState::new(Store::in_memory(), config::for_tests());
        let webinar = seeded_webinar(&state, upcoming("Rust for LMS")).await;
        let attendee = state.store.users.create(account("attendee")).await.unwrap();

        let (status, Json(response)) = sign_up(&state, &attendee, &webinar.slug).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.registered_count, 1);
        assert_eq!(response.registration.webinar_id, webinar.id);

        let status = unregister(
            State(state.clone()),
            AuthUser(attendee.clone()),
            Path(webinar.slug.clone()),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let stored = state.store.webinars.get_by_slug(&webinar.slug).await.unwrap();
        assert_eq!(stored.registered_count, 0);
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_conflict() {
        let state = AppState::new(Store::in_memory(), config::for_tests());
        let webinar = seeded_webinar(&state, upcoming("Rust for LMS")).await;
        let attendee = state.store.users.create(account("attendee")).await.unwrap();

        sign_up(&state, &attendee, &webinar.slug).await.unwrap();
        let err = sign_up(&state, &attendee, &webinar.slug).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // the count only moved for the first registration
        let stored = state.store.webinars.get_by_slug(&webinar.slug).await.unwrap();
        assert_eq!(stored.registered_count, 1);
    }

    #[tokio::test]
    async fn expired_deadline_rejects_registration() {
        let state = AppState::new(Store::in_memory(), config::for_tests());
        let mut payload = upcoming("Rust for LMS");
        payload.registration_deadline = Some(OffsetDateTime::now_utc() - time::Duration::hours(1));
        let webinar = seeded_webinar(&state, payload).await;
        let attendee = state.store.users.create(account("attendee")).await.unwrap();

        let err = sign_up(&state, &attendee, &webinar.slug).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn full_webinar_rejects_registration() {
        let state = AppState::new(Store::in_memory(), config::for_tests());
        let mut payload = upcoming("Rust for LMS");
        payload.max_attendees = Some(1);
        let webinar = seeded_webinar(&state, payload).await;
        let first = state.store.users.create(account("first")).await.unwrap();
        let second = state.store.users.create(account("second")).await.unwrap();

        sign_up(&state, &first, &webinar.slug).await.unwrap();
        let err = sign_up(&state, &second, &webinar.slug).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        // unregistering frees the seat again
        unregister(
            State(state.clone()),
            AuthUser(first.clone()),
            Path(webinar.slug.clone()),
        )
        .await
        .unwrap();
        let (status, _) = sign_up(&state, &second, &webinar.slug).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn unregister_without_registration_is_not_found() {
        let state = AppState::new(Store::in_memory(), config::for_tests());
        let webinar = seeded_webinar(&state, upcoming("Rust for LMS")).await;
        let attendee = state.store.users.create(account("attendee")).await.unwrap();

        let err = unregister(
            State(state.clone()),
            AuthUser(attendee.clone()),
            Path(webinar.slug.clone()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
