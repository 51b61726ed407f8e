use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::services::access::Viewer;
use crate::state::AppState;
use crate::utils::jwt::{self, TokenError};

use super::client::ClientIp;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication.
pub struct AuthUser {
    pub user_id: i32,
}

/// Like [`AuthUser`] but lets requests without an `Authorization` header through.
///
/// A header that is present but invalid is still rejected.
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    /// The caller as seen by the access policy.
    pub fn viewer(&self, ip: ClientIp) -> Viewer {
        match &self.0 {
            Some(user) => Viewer::User(user.user_id),
            None => Viewer::Anonymous(ip.0),
        }
    }
}

fn authenticate(header: &str, secret: &str) -> Result<AuthUser, AppError> {
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::InvalidToken)?;

    let claims = jwt::verify(token, secret).map_err(|e| match e {
        TokenError::Expired => AppError::TokenExpired,
        TokenError::Invalid => AppError::InvalidToken,
    })?;

    let user_id = claims.user_id().ok_or(AppError::InvalidToken)?;
    Ok(AuthUser { user_id })
}

fn authorization_header(parts: &Parts) -> Result<Option<&str>, AppError> {
    match parts.headers.get(AUTHORIZATION) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| AppError::InvalidToken),
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = authorization_header(parts)?.ok_or(AppError::Unauthorized)?;
        authenticate(header, &state.config.auth.jwt_secret)
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match authorization_header(parts)? {
            None => Ok(MaybeAuthUser(None)),
            Some(header) => authenticate(header, &state.config.auth.jwt_secret)
                .map(|user| MaybeAuthUser(Some(user))),
        }
    }
}
