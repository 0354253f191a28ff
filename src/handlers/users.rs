use super::common::done;
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::{
        courses::CourseCard,
        users::{
            CartView, ChangePasswordRequest, InstructorProfile, UpdateProfileRequest, UserProfile,
        },
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use uuid::Uuid;

#[utoipa::path(
    put,
    path = "/api/v1/users/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<UserProfile> {
    let profile = state
        .services
        .users
        .update_profile(&auth_user, payload)
        .await?;
    Ok(Json(ApiResponse::with_message(profile, "Profile updated")))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password is wrong or new one is too weak", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state
        .services
        .users
        .change_password(&auth_user, payload)
        .await?;
    Ok(done("Password changed"))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/wishlist",
    responses(
        (status = 200, description = "Wishlisted courses", body = ApiResponse<Vec<CourseCard>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn wishlist(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Vec<CourseCard>> {
    let courses = state.services.users.wishlist(&auth_user).await?;
    Ok(Json(ApiResponse::success(courses)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/wishlist/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course added to wishlist", body = ApiResponse<Vec<CourseCard>>),
        (status = 404, description = "Course not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> ApiResult<Vec<CourseCard>> {
    let courses = state
        .services
        .users
        .add_to_wishlist(&auth_user, course_id)
        .await?;
    Ok(Json(ApiResponse::with_message(courses, "Added to wishlist")))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/wishlist/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course removed from wishlist", body = ApiResponse<Vec<CourseCard>>),
        (status = 404, description = "Course not in wishlist", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> ApiResult<Vec<CourseCard>> {
    let courses = state
        .services
        .users
        .remove_from_wishlist(&auth_user, course_id)
        .await?;
    Ok(Json(ApiResponse::with_message(courses, "Removed from wishlist")))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/cart",
    responses(
        (status = 200, description = "Cart contents and total", body = ApiResponse<CartView>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn cart(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<CartView> {
    let cart = state.services.users.cart(&auth_user).await?;
    Ok(Json(ApiResponse::success(cart)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/cart/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course added to cart", body = ApiResponse<CartView>),
        (status = 400, description = "Own course or already enrolled", body = crate::errors::ErrorResponse),
        (status = 404, description = "Course not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> ApiResult<CartView> {
    let cart = state.services.users.add_to_cart(&auth_user, course_id).await?;
    Ok(Json(ApiResponse::with_message(cart, "Added to cart")))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/cart/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course removed from cart", body = ApiResponse<CartView>),
        (status = 404, description = "Course not in cart", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> ApiResult<CartView> {
    let cart = state
        .services
        .users
        .remove_from_cart(&auth_user, course_id)
        .await?;
    Ok(Json(ApiResponse::with_message(cart, "Removed from cart")))
}

/// Public instructor page
#[utoipa::path(
    get,
    path = "/api/v1/users/instructors/{id}",
    params(("id" = Uuid, Path, description = "Instructor ID")),
    responses(
        (status = 200, description = "Instructor profile with published courses", body = ApiResponse<InstructorProfile>),
        (status = 404, description = "Instructor not found", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn instructor_profile(
    State(state): State<AppState>,
    Path(instructor_id): Path<Uuid>,
) -> ApiResult<InstructorProfile> {
    let profile = state
        .services
        .users
        .instructor_profile(instructor_id)
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}
