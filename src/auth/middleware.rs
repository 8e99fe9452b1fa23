// Authentication extractors for protected routes

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{error::AuthError, token::TokenService};

/// Secret used to verify bearer tokens, pulled out of the application state
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Any authenticated caller, customer or staff
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub is_staff: bool,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let config = AuthConfig::from_ref(state);
        let claims = TokenService::new(config.jwt_secret).validate_access_token(token)?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
            is_staff: claims.is_staff,
        })
    }
}

/// CRM caller; rejects authenticated non-staff users with 403
#[derive(Debug, Clone)]
pub struct StaffUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            warn!(
                "Staff endpoint refused: user_id={}, endpoint={}",
                user.user_id,
                parts.uri.path()
            );
            return Err(AuthError::StaffOnly);
        }
        debug!("Staff access granted: user_id={}", user.user_id);
        Ok(StaffUser(user))
    }
}
