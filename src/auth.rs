//! # Authentication and Authorization
//!
//! Issues and verifies HS256 bearer tokens and guards role-scoped routes.
//! The guard runs as middleware ahead of every protected handler; handlers then
//! read the verified identity back out of request extensions.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, forbidden, unauthorized};
use crate::server::AppState;

/// Role carried in the `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Vendor,
    Admin,
}

/// Verified token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Vendor UUID or admin email
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Missing => unauthorized("MISSING_TOKEN", "Missing bearer token"),
            AuthError::Invalid => unauthorized("INVALID_TOKEN", "Invalid token"),
            AuthError::Expired => unauthorized("TOKEN_EXPIRED", "Token has expired"),
            AuthError::Signing(err) => {
                tracing::error!(error = %err, "Failed to sign access token");
                anyhow::anyhow!("token signing failed").into()
            }
        }
    }
}

/// Signs and verifies access tokens with the configured HMAC secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_seconds: i64::try_from(ttl_seconds).unwrap_or(i64::MAX),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.token_ttl_seconds)
    }

    /// Issues a token for `sub` valid for the configured TTL.
    pub fn issue(&self, sub: &str, role: Role) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        self.sign(&Claims {
            sub: sub.to_string(),
            role,
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        })
    }

    pub(crate) fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(AuthError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            })
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.tokens)
    }
}

/// Fails with 403 unless `claims` carry `role`.
pub fn require_role(claims: &Claims, role: Role) -> Result<(), ApiError> {
    if claims.role == role {
        Ok(())
    } else {
        Err(forbidden(None))
    }
}

/// Verifies the bearer token and stores the [`Claims`] in request extensions.
pub async fn auth_middleware(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;
    let claims = tokens.verify(token)?;

    tracing::debug!(subject = %claims.sub, role = ?claims.role, "Authenticated request");

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Admits only admin tokens. Must be layered inside [`auth_middleware`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    guard_role(request, next, Role::Admin).await
}

/// Admits only vendor tokens. Must be layered inside [`auth_middleware`].
pub async fn require_vendor(request: Request, next: Next) -> Result<Response, ApiError> {
    guard_role(request, next, Role::Vendor).await
}

async fn guard_role(request: Request, next: Next, role: Role) -> Result<Response, ApiError> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or(AuthError::Missing)?;
    require_role(claims, role)?;
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::Missing)?
        .to_str()
        .map_err(|_| AuthError::Invalid)?;

    let token = header.strip_prefix("Bearer ").ok_or(AuthError::Missing)?;
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Missing);
    }
    Ok(token)
}

impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| AuthError::Missing.into())
    }
}

/// Vendor identity taken from verified claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorIdentity {
    pub vendor_id: Uuid,
}

impl<S> FromRequestParts<S> for VendorIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state).await?;
        require_role(&claims, Role::Vendor)?;

        let vendor_id = claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| ApiError::from(AuthError::Invalid))?;
        Ok(Self { vendor_id })
    }
}
