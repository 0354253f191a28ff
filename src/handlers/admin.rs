use super::common::{done, paginated, paging};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::{
        admin::{DashboardStats, RejectRequest, UserListQuery, UserStatusRequest},
        courses::CourseCard,
        users::UserProfile,
    },
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;

// Accounts

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Accounts, newest first", body = ApiResponse<PaginatedResponse<UserProfile>>),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<PaginatedResponse<UserProfile>> {
    let limit = state.page_size(query.limit);
    let users = state.services.admin.list_users(query, limit).await?;
    Ok(paginated(users))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/approve",
    params(("id" = Uuid, Path, description = "Instructor ID")),
    responses(
        (status = 200, description = "Instructor approved", body = ApiResponse<UserProfile>),
        (status = 400, description = "Account is not an instructor", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn approve_instructor(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<UserProfile> {
    let profile = state.services.admin.approve_instructor(user_id).await?;
    Ok(Json(ApiResponse::with_message(profile, "Instructor approved")))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/reject",
    params(("id" = Uuid, Path, description = "Instructor ID")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Instructor rejected", body = ApiResponse<UserProfile>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn reject_instructor(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> ApiResult<UserProfile> {
    let profile = state
        .services
        .admin
        .reject_instructor(user_id, payload)
        .await?;
    Ok(Json(ApiResponse::with_message(profile, "Instructor rejected")))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/status",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UserStatusRequest,
    responses(
        (status = 200, description = "Account status changed", body = ApiResponse<UserProfile>),
        (status = 400, description = "Cannot deactivate yourself", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn set_user_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UserStatusRequest>,
) -> ApiResult<UserProfile> {
    let profile = state
        .services
        .admin
        .set_user_status(&auth_user, user_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 403, description = "Admin accounts cannot be deleted", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.admin.delete_user(user_id).await?;
    Ok(done("User deleted"))
}

// Course moderation

#[utoipa::path(
    get,
    path = "/api/v1/admin/courses/pending",
    params(ListQuery),
    responses(
        (status = 200, description = "Courses awaiting review, oldest first", body = ApiResponse<PaginatedResponse<CourseCard>>)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn pending_courses(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<CourseCard>> {
    let (page, limit) = paging(&state, &query);
    let courses = state.services.admin.pending_courses(page, limit).await?;
    Ok(paginated(courses))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/courses/{id}/approve",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course approved", body = ApiResponse<CourseCard>),
        (status = 400, description = "Course is not pending", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn approve_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> ApiResult<CourseCard> {
    let course = state.services.admin.approve_course(course_id).await?;
    Ok(Json(ApiResponse::with_message(course, "Course approved")))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/courses/{id}/reject",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Course rejected", body = ApiResponse<CourseCard>),
        (status = 400, description = "Course is not pending", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn reject_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> ApiResult<CourseCard> {
    let course = state
        .services
        .admin
        .reject_course(course_id, payload)
        .await?;
    Ok(Json(ApiResponse::with_message(course, "Course rejected")))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/courses/{id}/archive",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course archived", body = ApiResponse<CourseCard>),
        (status = 400, description = "Already archived", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn archive_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> ApiResult<CourseCard> {
    let course = state.services.admin.archive_course(course_id).await?;
    Ok(Json(ApiResponse::with_message(course, "Course archived")))
}

/// Removes a course and everything hanging off it, enrollments included
#[utoipa::path(
    delete,
    path = "/api/v1/admin/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 404, description = "Course not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn delete_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.admin.delete_course(course_id).await?;
    Ok(done("Course deleted"))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    responses(
        (status = 200, description = "Platform dashboard", body = ApiResponse<DashboardStats>)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn dashboard_stats(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let stats = state.services.admin.dashboard_stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}
