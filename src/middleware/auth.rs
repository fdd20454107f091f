use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;

use crate::app_state::AppState;
use crate::auth::{self, TokenKind};
use crate::db::models::User;
use crate::db::StoreError;
use crate::error::AppError;

/// An authenticated request. Extraction fails with 401 when the bearer token
/// is missing, invalid, expired, of the wrong kind, or names a deactivated
/// account.
pub struct AuthUser(pub User);

/// Like [`AuthUser`] but optional: `None` when no Authorization header was
/// sent. A header that is present but invalid is still an error, so a broken
/// client is told instead of silently downgraded to anonymous.
pub struct MaybeAuthUser(pub Option<User>);

async fn load_user(parts: &mut Parts, state: &AppState) -> Result<User, AppError> {
    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| AppError::Authentication("Missing bearer token".to_string()))?;

    let claims = auth::verify_token(
        bearer.token(),
        &state.env.auth.jwt_secret,
        TokenKind::Access,
    )?;

    let user = state.store.users.get(claims.sub).await.map_err(|e| match e {
        StoreError::NotFound => AppError::Authentication("Unknown user".to_string()),
        other => AppError::from(other),
    })?;

    if !user.is_active {
        return Err(AppError::Authentication("Account is deactivated".to_string()));
    }
    Ok(user)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        load_user(parts, state).await.map(AuthUser)
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(axum::http::header::AUTHORIZATION) {
            return Ok(MaybeAuthUser(None));
        }
        load_user(parts, state).await.map(|user| MaybeAuthUser(Some(user)))
    }
}
