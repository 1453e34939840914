use std::sync::Arc;

use axum::{
    extract::{Extension, State, Json},
    http::HeaderMap,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{SessionTokens, TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::jwt;

use crate::models::{AuthError, LoginRequest, RefreshRequest};
use crate::services::SessionService;

// Helper function to extract token
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    Ok(auth_value[7..].to_string())
}

fn map_auth_error(e: AuthError) -> AppError {
    match e {
        AuthError::InvalidCredentials => AppError::Auth("Invalid credentials".to_string()),
        AuthError::InvalidRefreshToken => AppError::Auth("Refresh token rejected".to_string()),
        AuthError::ValidationError(msg) => AppError::ValidationError(msg),
        AuthError::IdentityProvider(msg) => AppError::ExternalService(msg),
    }
}

#[axum::debug_handler]
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionTokens>, AppError> {
    debug!("Login requested for {}", request.email);

    let service = SessionService::new(&config);
    let tokens = service
        .login(&request.email, &request.password)
        .await
        .map_err(map_auth_error)?;

    Ok(Json(tokens))
}

#[axum::debug_handler]
pub async fn refresh_session(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<SessionTokens>, AppError> {
    debug!("Session refresh requested");

    let service = SessionService::new(&config);
    let tokens = service
        .refresh(&request.refresh_token)
        .await
        .map_err(map_auth_error)?;

    Ok(Json(tokens))
}

#[axum::debug_handler]
pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;

    match jwt::validate_token(&token, &config.supabase_jwt_secret) {
        Ok(user) => Ok(Json(TokenResponse {
            valid: true,
            user_id: user.id,
            email: user.email,
            role: user.role,
        })),
        Err(err) => Err(AppError::Auth(err)),
    }
}

/// The rehydration endpoint: who the bearer token belongs to, plus the
/// role profile the pages render from.
#[axum::debug_handler]
pub async fn get_session(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Rehydrating session for user {}", user.id);

    let service = SessionService::new(&config);
    let profile = service
        .profile_for(&user, auth.token())
        .await
        .map_err(map_auth_error)?;

    Ok(Json(json!({
        "user": user,
        "profile": profile,
        "expires_at": jwt::token_expiry(auth.token())
    })))
}

#[axum::debug_handler]
pub async fn logout(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Logout requested by user {}", user.id);

    let service = SessionService::new(&config);
    service.logout(auth.token()).await.map_err(map_auth_error)?;

    Ok(Json(json!({ "success": true })))
}
