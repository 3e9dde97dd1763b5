//! Bearer-token authentication. Tokens are issued exclusively through OTP
//! verification (`otp::OtpService`); there is no password path.

pub mod otp;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::UserRole;
use crate::errors::{ApiError, ServiceError};

pub use otp::OtpService;

const TOKEN_USE_ACCESS: &str = "access";
const TOKEN_USE_REFRESH: &str = "refresh";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    /// "access" or "refresh"
    pub token_use: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl AuthService {
    pub fn new(secret: &str, access_ttl_secs: usize, refresh_ttl_secs: usize) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_secs: access_ttl_secs as i64,
            refresh_ttl_secs: refresh_ttl_secs as i64,
        }
    }

    pub fn issue_token_pair(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<TokenPair, ServiceError> {
        Ok(TokenPair {
            access: self.issue(user_id, email, role, TOKEN_USE_ACCESS, self.access_ttl_secs)?,
            refresh: self.issue(
                user_id,
                email,
                role,
                TOKEN_USE_REFRESH,
                self.refresh_ttl_secs,
            )?,
        })
    }

    fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
        token_use: &str,
        ttl_secs: i64,
    ) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            token_use: token_use.to_string(),
            exp: now + ttl_secs,
            iat: now,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("token encoding failed: {e}")))
    }

    /// Verifies an access token and returns its claims.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let claims = self.decode(token)?;
        if claims.token_use != TOKEN_USE_ACCESS {
            return Err(ServiceError::Unauthorized(
                "access token required".to_string(),
            ));
        }
        Ok(claims)
    }

    /// Exchanges a valid refresh token for a fresh pair.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ServiceError> {
        let claims = self.decode(refresh_token)?;
        if claims.token_use != TOKEN_USE_REFRESH {
            return Err(ServiceError::Unauthorized(
                "refresh token required".to_string(),
            ));
        }
        self.issue_token_pair(claims.sub, &claims.email, claims.role)
    }

    fn decode(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ServiceError::Unauthorized("invalid or expired token".to_string()))
    }
}

/// Authenticated caller extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn require_staff(&self) -> Result<(), ServiceError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "staff access required".to_string(),
            ))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .extensions
            .get::<Arc<AuthService>>()
            .cloned()
            .ok_or(ApiError::Unauthorized)?;

        let header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let claims = auth
            .verify_access_token(token)
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(AuthenticatedUser {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}
