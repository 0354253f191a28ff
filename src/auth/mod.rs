/*!
 * # Authentication and Authorization Module
 *
 * Bearer-token authentication for the LearnHub API.
 *
 * - HS256 JWTs carrying the user id, role and a unique token id
 * - In-memory revocation list consulted on every request (logout)
 * - Every authenticated request re-loads the account, so deleted or
 *   deactivated users lose access immediately
 * - Role gating through router layers (`with_auth`, `with_roles`)
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::user::{self, UserRole};

pub mod password;

pub use password::{hash_password, verify_password, PasswordError};

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // Subject (user ID)
    pub email: String, // User's email
    pub role: UserRole,
    pub jti: String, // JWT ID (unique identifier for this token)
    pub iat: i64,    // Issued at time
    pub exp: i64,    // Expiration time
    pub nbf: i64,    // Not valid before time
    pub iss: String, // Issuer
    pub aud: String, // Audience
}

/// Authenticated account, loaded fresh from the database for each request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_approved: bool,
    pub token_id: String,
}

impl AuthUser {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    /// Admins act on every resource; everyone else only on their own.
    pub fn can_manage(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            jwt_audience: cfg.auth_audience.clone(),
            jwt_issuer: cfg.auth_issuer.clone(),
            access_token_expiration: Duration::from_secs(cfg.jwt_expiration as u64),
        }
    }
}

/// Token response returned by register and login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Token blacklist entry
#[derive(Clone, Debug)]
struct BlacklistedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    db: Arc<DatabaseConnection>,
    blacklisted_tokens: Arc<RwLock<Vec<BlacklistedToken>>>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self {
            config,
            db,
            blacklisted_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Generate an access token for a user
    pub fn generate_token(&self, user: &user::Model) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
        })
    }

    /// Validate a JWT token and extract the claims
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_blacklisted(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Validates the token and loads the account it names.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.validate_token(token).await?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let account = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!("Failed to load user {} during authentication: {}", user_id, e);
                AuthError::DatabaseError(e.to_string())
            })?
            .ok_or(AuthError::UserNotFound)?;

        if !account.is_active {
            warn!(%user_id, "rejected token for deactivated account");
            return Err(AuthError::AccountDisabled);
        }

        Ok(AuthUser {
            user_id: account.id,
            name: account.name,
            email: account.email,
            role: account.role,
            is_approved: account.is_approved,
            token_id: claims.jti,
        })
    }

    /// Revoke a token (add it to the blacklist)
    pub async fn revoke_token(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.validate_token(token).await?;

        let expiry = DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
        let mut blacklist = self.blacklisted_tokens.write().await;
        blacklist.push(BlacklistedToken {
            jti: claims.jti,
            expiry,
        });
        Self::clean_blacklist(&mut blacklist);
        debug!("Revoked token for user {}", claims.sub);

        Ok(())
    }

    async fn is_token_blacklisted(&self, token_id: &str) -> bool {
        let blacklist = self.blacklisted_tokens.read().await;
        blacklist.iter().any(|t| t.jti == token_id)
    }

    fn clean_blacklist(blacklist: &mut Vec<BlacklistedToken>) {
        let now = Utc::now();
        blacklist.retain(|t| t.expiry > now);
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Account is deactivated")]
    AccountDisabled,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Instructor account is not approved")]
    ApprovalRequired,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    fn parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required",
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token",
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired",
            ),
            Self::RevokedToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REVOKED_TOKEN",
                "Authentication token has been revoked",
            ),
            Self::UserNotFound => (
                StatusCode::UNAUTHORIZED,
                "AUTH_USER_NOT_FOUND",
                "Account no longer exists",
            ),
            Self::AccountDisabled => (
                StatusCode::FORBIDDEN,
                "AUTH_ACCOUNT_DISABLED",
                "Account is deactivated",
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions",
            ),
            Self::ApprovalRequired => (
                StatusCode::FORBIDDEN,
                "AUTH_APPROVAL_REQUIRED",
                "Instructor account is not approved",
            ),
            Self::TokenCreation(_) | Self::DatabaseError(_) | Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal server error",
            ),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message) = self.parts();
        if status.is_server_error() {
            error!("Authentication failure: {}", self);
        }

        let body = Json(serde_json::json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": error_message,
            },
            "request_id": crate::tracing::current_request_id().map(|r| r.0),
        }));

        (status, body).into_response()
    }
}

impl From<AuthError> for crate::errors::ServiceError {
    fn from(err: AuthError) -> Self {
        use crate::errors::ServiceError;
        match err.status_code() {
            StatusCode::FORBIDDEN => ServiceError::Forbidden(err.to_string()),
            StatusCode::UNAUTHORIZED => ServiceError::Unauthorized(err.to_string()),
            _ => ServiceError::InternalError(err.to_string()),
        }
    }
}

/// Raw bearer token of the current request, kept for logout.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware that extracts and validates bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            error!("AuthService extension missing from request");
            return AuthError::InternalError("Authentication service not available".into())
                .into_response();
        }
    };

    let token = match bearer_token(request.headers()) {
        Some(token) => token.to_string(),
        None => return AuthError::MissingAuth.into_response(),
    };

    match auth_service.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            request.extensions_mut().insert(BearerToken(token));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Role middleware to check if a user holds one of the allowed roles
pub async fn role_middleware(
    State(allowed): State<Arc<[UserRole]>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !allowed.contains(&user.role) {
        debug!(user_id = %user.user_id, role = %user.role, "role not permitted");
        return Err(AuthError::InsufficientPermissions);
    }

    // Instructors act only while approved.
    if user.role == UserRole::Instructor && !user.is_approved {
        debug!(user_id = %user.user_id, "instructor not approved");
        return Err(AuthError::ApprovalRequired);
    }

    Ok(next.run(request).await)
}

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

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_roles(self, roles: &[UserRole]) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    /// Role check runs after authentication (layers apply outside-in).
    fn with_roles(self, roles: &[UserRole]) -> Self {
        let allowed: Arc<[UserRole]> = roles.into();
        self.layer(axum::middleware::from_fn_with_state(allowed, role_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(
            AuthConfig {
                jwt_secret: "unit-test-secret-with-enough-entropy-0123456789-abcdefghijklmnop"
                    .to_string(),
                jwt_audience: "learnhub-clients".to_string(),
                jwt_issuer: "learnhub-api".to_string(),
                access_token_expiration: Duration::from_secs(3600),
            },
            Arc::new(DatabaseConnection::Disconnected),
        )
    }

    fn account(role: UserRole) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@learnhub.test".into(),
            password_hash: String::new(),
            role,
            avatar_url: None,
            bio: None,
            headline: None,
            is_active: true,
            is_approved: true,
            rejection_reason: None,
            total_students: 0,
            total_revenue: rust_decimal::Decimal::ZERO,
            total_courses: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn issued_token_round_trips_claims() {
        let svc = service();
        let user = account(UserRole::Instructor);
        let token = svc.generate_token(&user).unwrap();
        assert_eq!(token.token_type, "Bearer");

        let claims = svc.validate_token(&token.access_token).await.unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, UserRole::Instructor);
        assert_eq!(claims.iss, "learnhub-api");
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let svc = service();
        let token = svc.generate_token(&account(UserRole::Student)).unwrap();
        svc.revoke_token(&token.access_token).await.unwrap();
        assert!(matches!(
            svc.validate_token(&token.access_token).await,
            Err(AuthError::RevokedToken)
        ));
    }

    #[tokio::test]
    async fn token_from_other_issuer_is_invalid() {
        let svc = service();
        let mut other = service();
        other.config.jwt_issuer = "someone-else".into();
        let token = other.generate_token(&account(UserRole::Student)).unwrap();
        assert!(matches!(
            svc.validate_token(&token.access_token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Token abc".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
    }

    #[test]
    fn auth_errors_map_to_expected_statuses() {
        assert_eq!(AuthError::MissingAuth.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::AccountDisabled.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::InsufficientPermissions.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AuthError::ApprovalRequired.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn admins_manage_everything_owners_their_own() {
        let owner = Uuid::new_v4();
        let mut user = AuthUser {
            user_id: owner,
            name: "x".into(),
            email: "x@y.z".into(),
            role: UserRole::Instructor,
            is_approved: true,
            token_id: "t".into(),
        };
        assert!(user.can_manage(owner));
        assert!(!user.can_manage(Uuid::new_v4()));
        user.role = UserRole::Admin;
        assert!(user.can_manage(Uuid::new_v4()));
    }
}
