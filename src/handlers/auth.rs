use crate::{
    auth::{user, AuthUser, TokenResponse},
    errors::ApiError,
    handlers::common::{created_response, success_response, validate_input},
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

/// Registration payload
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "admin")]
    pub username: String,
    #[validate(email)]
    #[schema(example = "admin@example.com")]
    pub email: String,
    #[validate(length(min = 1))]
    #[schema(example = "admin123")]
    pub password: String,
}

/// Login payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "admin")]
    pub username: String,
    #[schema(example = "admin123")]
    pub password: String,
}

/// Public view of an account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            created_at: model.created_at,
        }
    }
}

/// Creates the router for account endpoints
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Routes that need an authenticated caller; the caller layers `with_auth`
pub fn current_user_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid payload or duplicate account", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .auth
        .register(
            payload.username.trim(),
            payload.email.trim(),
            &payload.password,
        )
        .await?;

    Ok(created_response(UserResponse::from(created)))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Incorrect username or password")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, crate::auth::AuthError> {
    let token = state.auth.login(&payload.username, &payload.password).await?;
    info!(username = %payload.username, "User logged in");
    Ok(Json(token))
}

/// Current account
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Authenticated account", body = UserResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User not found")
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.auth.get_user(user.id).await?;
    Ok(success_response(UserResponse::from(account)))
}
