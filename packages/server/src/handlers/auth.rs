use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::{
    LoginRequest, LoginResponse, RegisterRequest, UserResponse, validate_login_request,
    validate_register_request,
};
use crate::response::ApiResponse;
use crate::services::auth::AuthService;
use crate::state::AppState;
use crate::utils::jwt;

#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Register a new account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Validation error (1002)", body = ErrorBody),
        (status = 409, description = "Email already registered (2001)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let user = AuthService::new(&state.db).register(&payload).await?;

    Ok((StatusCode::CREATED, ApiResponse::ok(UserResponse::from(user))))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in and obtain a bearer token",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Validation error (1002)", body = ErrorBody),
        (status = 401, description = "Wrong email or password (2002)", body = ErrorBody),
        (status = 403, description = "Account disabled (2015)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_login_request(&payload)?;

    let user = AuthService::new(&state.db)
        .authenticate(&payload.email, &payload.password)
        .await?;

    let auth = &state.config.auth;
    let (token, expires_at) = jwt::sign(user.id, &auth.jwt_secret, auth.token_ttl_hours)
        .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(ApiResponse::ok(LoginResponse {
        token,
        expires_at,
        user: user.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "getMe",
    summary = "Current user's profile",
    responses(
        (status = 200, description = "Profile", body = ApiResponse<UserResponse>),
        (status = 401, description = "Unauthorized (1003, 2004, 2005)", body = ErrorBody),
        (status = 404, description = "Account no longer exists (2000)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let user = AuthService::new(&state.db)
        .find_user(auth_user.user_id)
        .await?;
    Ok(ApiResponse::ok(UserResponse::from(user)))
}
