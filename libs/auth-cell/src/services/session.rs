use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{SessionTokens, User};

use crate::models::AuthError;

/// Session lifecycle against the external identity provider. Token
/// issuance stays with the provider; this service only drives its grant
/// endpoints and parses what comes back into typed sessions.
pub struct SessionService {
    supabase: SupabaseClient,
}

impl SessionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Password grant. The provider does the credential check; a rejection
    /// of any kind surfaces as invalid credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionTokens, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::ValidationError(
                "Email and password are required".to_string(),
            ));
        }

        debug!("Requesting password grant for {}", email);

        let body = json!({
            "email": email,
            "password": password
        });

        let tokens: SessionTokens = self
            .supabase
            .request(
                Method::POST,
                "/auth/v1/token?grant_type=password",
                None,
                Some(body),
            )
            .await
            .map_err(|e| {
                warn!("Password grant rejected for {}: {}", email, e);
                AuthError::InvalidCredentials
            })?;

        info!(
            "Session issued for user {}",
            tokens.user.as_ref().map(|u| u.id.as_str()).unwrap_or("unknown")
        );
        Ok(tokens)
    }

    /// Exchange a refresh token for a fresh session. Explicit so callers
    /// decide when to refresh instead of hiding it in an init effect.
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, AuthError> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::ValidationError(
                "Refresh token is required".to_string(),
            ));
        }

        debug!("Exchanging refresh token");

        let body = json!({ "refresh_token": refresh_token });

        let tokens: SessionTokens = self
            .supabase
            .request(
                Method::POST,
                "/auth/v1/token?grant_type=refresh_token",
                None,
                Some(body),
            )
            .await
            .map_err(|e| {
                warn!("Refresh token rejected: {}", e);
                AuthError::InvalidRefreshToken
            })?;

        info!("Session refreshed");
        Ok(tokens)
    }

    /// Revoke the session behind a bearer token at the provider.
    pub async fn logout(&self, auth_token: &str) -> Result<(), AuthError> {
        debug!("Revoking session");

        let _: () = self
            .supabase
            .request(Method::POST, "/auth/v1/logout", Some(auth_token), None)
            .await
            .map_err(|e| AuthError::IdentityProvider(e.to_string()))?;

        info!("Session revoked");
        Ok(())
    }

    /// The role-specific profile row backing a session's user, if one
    /// exists. Roles without a profile table rehydrate with user data only.
    pub async fn profile_for(&self, user: &User, auth_token: &str) -> Result<Value, AuthError> {
        let table = match user.role.as_deref() {
            Some("patient") => "patients",
            Some("doctor") => "doctors",
            Some("care_provider") => "facilities",
            _ => return Ok(Value::Null),
        };

        let path = format!("/rest/v1/{}?id=eq.{}", table, user.id);

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AuthError::IdentityProvider(e.to_string()))?;

        Ok(rows.into_iter().next().unwrap_or(Value::Null))
    }
}
