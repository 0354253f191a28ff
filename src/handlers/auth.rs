use super::common::{created, done, CreatedResult};
use crate::{
    auth::{AuthUser, BearerToken},
    errors::ServiceError,
    services::users::{AuthPayload, LoginRequest, RegisterRequest, UserProfile},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Extension, State},
    response::Json,
};
use tracing::info;

/// Register a student or instructor account
///
/// Students receive a token right away. Instructors get one only after an
/// administrator approves the account.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<AuthPayload>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Role cannot self-register", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> CreatedResult<AuthPayload> {
    let registered = state.services.users.register(payload).await?;
    let message = if registered.token.is_some() {
        "Registration successful"
    } else {
        "Registration successful. Your instructor account is awaiting approval"
    };
    Ok(created(registered, message))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<AuthPayload>),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
        (status = 403, description = "Account disabled or awaiting approval", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<AuthPayload> {
    let session = state.services.users.login(payload).await?;
    Ok(Json(ApiResponse::with_message(session, "Login successful")))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current account", body = ApiResponse<UserProfile>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn me(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<UserProfile> {
    let profile = state.services.users.me(&auth_user).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// Revoke the bearer token used for this request
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Token revoked"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Extension(token): Extension<BearerToken>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.auth.revoke_token(&token.0).await?;
    info!(user_id = %auth_user.user_id, "user logged out");
    Ok(done("Logged out"))
}
