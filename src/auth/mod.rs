/*!
 * # Authentication Module
 *
 * Account registration, password login and bearer-token authentication.
 *
 * - Passwords are stored as argon2 PHC strings
 * - Access tokens are HS256 JWTs carrying the username and user id
 * - `auth_middleware` resolves the bearer token to a live user record and
 *   makes it available to handlers through the `AuthUser` extractor
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{config::AppConfig, errors::ServiceError};

pub mod user;

use user::Entity as User;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub uid: i32,    // User id
    pub jti: String, // JWT ID
    pub iat: i64,    // Issued at time
    pub exp: i64,    // Expiration time
    pub nbf: i64,    // Not valid before time
    pub iss: String, // Issuer
    pub aud: String, // Audience
}

/// Authenticated user resolved from a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub email: String,
}

impl From<&user::Model> for AuthUser {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username.clone(),
            email: model.email.clone(),
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            access_token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.jwt_issuer.clone(),
            cfg.jwt_audience.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
        )
    }
}

/// Access token returned by a successful login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
    /// Lifetime of the token in seconds
    #[schema(example = 1800)]
    pub expires_in: i64,
}

/// Authentication service
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Hashes a password into an argon2 PHC string with a random salt
    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswordHash(e.to_string()))
    }

    /// Checks a password against a stored PHC string.
    /// A malformed stored hash never verifies.
    pub fn verify_password(password: &str, password_hash: &str) -> bool {
        match PasswordHash::new(password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                warn!(error = %e, "Stored password hash is malformed");
                false
            }
        }
    }

    /// Creates a new account
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<user::Model, AuthError> {
        if self.find_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let email_taken = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .is_some();
        if email_taken {
            return Err(AuthError::EmailTaken);
        }

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || Self::hash_password(&password))
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))??;

        let created = user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(user_id = created.id, username = %created.username, "User registered");
        Ok(created)
    }

    /// Verifies credentials and issues an access token
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, AuthError> {
        let Some(account) = self.find_by_username(username).await? else {
            debug!("Login attempted for unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        let password = password.to_string();
        let stored = account.password_hash.clone();
        let verified =
            tokio::task::spawn_blocking(move || Self::verify_password(&password, &stored))
                .await
                .map_err(|e| AuthError::InternalError(e.to_string()))?;
        if !verified {
            debug!(user_id = account.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_token(&account)
    }

    /// Signs an access token for a user
    pub fn issue_token(&self, account: &user::Model) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();
        let ttl = ChronoDuration::from_std(self.config.access_token_expiration)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        let claims = Claims {
            sub: account.username.clone(),
            uid: account.id,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| {
            error!(error = %e, "Failed to sign access token");
            AuthError::TokenCreation(e.to_string())
        })?;

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: ttl.num_seconds(),
        })
    }

    /// Validates a JWT token and returns its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => {
                debug!(error = %e, "Token validation failed");
                AuthError::InvalidToken
            }
        })
    }

    /// Resolves the `Authorization: Bearer` header to an existing user
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingAuth)?;
        let claims = self.validate_token(token)?;

        let account = self
            .find_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(AuthUser::from(&account))
    }

    /// Loads a user by id
    pub async fn get_user(&self, id: i32) -> Result<user::Model, AuthError> {
        User::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>, AuthError> {
        Ok(User::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    MissingAuth,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("User not found")]
    UserNotFound,

    #[error("Username already registered")]
    UsernameTaken,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingAuth | Self::InvalidCredentials | Self::InvalidToken | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::UsernameTaken | Self::EmailTaken => StatusCode::BAD_REQUEST,
            Self::TokenCreation(_)
            | Self::PasswordHash(_)
            | Self::DatabaseError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::MissingAuth => "AUTH_MISSING",
            Self::InvalidCredentials => "AUTH_INVALID_CREDENTIALS",
            Self::InvalidToken => "AUTH_INVALID_TOKEN",
            Self::TokenExpired => "AUTH_TOKEN_EXPIRED",
            Self::UserNotFound => "AUTH_USER_NOT_FOUND",
            Self::UsernameTaken => "AUTH_USERNAME_TAKEN",
            Self::EmailTaken => "AUTH_EMAIL_TAKEN",
            Self::TokenCreation(_) => "AUTH_TOKEN_CREATION_FAILED",
            Self::PasswordHash(_) => "AUTH_PASSWORD_HASH_FAILED",
            Self::DatabaseError(_) => "AUTH_DATABASE_ERROR",
            Self::InternalError(_) => "AUTH_INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!(error = %self, "Authentication failure");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        }));

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingAuth
            | AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::TokenExpired => ServiceError::Unauthorized(err.to_string()),
            AuthError::UserNotFound => ServiceError::NotFound(err.to_string()),
            AuthError::UsernameTaken | AuthError::EmailTaken => {
                ServiceError::BadRequest(err.to_string())
            }
            AuthError::PasswordHash(msg) => ServiceError::HashError(msg),
            AuthError::DatabaseError(e) => ServiceError::DatabaseError(e),
            AuthError::TokenCreation(msg) | AuthError::InternalError(msg) => {
                ServiceError::InternalError(msg)
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Authentication middleware that extracts and validates bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".to_string())
                .into_response();
        }
    };

    match auth_service.authenticate(request.headers()).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }
}
