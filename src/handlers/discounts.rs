use super::common::{created, done, paginated, paging, CreatedResult};
use crate::{
    auth::AuthUser,
    entities::discount,
    errors::ServiceError,
    services::discounts::{
        CreateDiscountRequest, DiscountQuote, UpdateDiscountRequest, ValidateDiscountRequest,
    },
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;

/// Quote a coupon against a course without redeeming it
#[utoipa::path(
    post,
    path = "/api/v1/discounts/validate",
    request_body = ValidateDiscountRequest,
    responses(
        (status = 200, description = "Discount applies", body = ApiResponse<DiscountQuote>),
        (status = 400, description = "Expired, exhausted or below the minimum amount", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown code or course", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "discounts"
)]
pub async fn validate_discount(
    State(state): State<AppState>,
    Json(payload): Json<ValidateDiscountRequest>,
) -> ApiResult<DiscountQuote> {
    let quote = state.services.discounts.validate_code(payload).await?;
    Ok(Json(ApiResponse::success(quote)))
}

#[utoipa::path(
    get,
    path = "/api/v1/discounts",
    params(ListQuery),
    responses(
        (status = 200, description = "Coupons visible to the caller", body = ApiResponse<PaginatedResponse<serde_json::Value>>)
    ),
    security(("Bearer" = [])),
    tag = "discounts"
)]
pub async fn list_discounts(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<discount::Model>> {
    let (page, limit) = paging(&state, &query);
    let discounts = state
        .services
        .discounts
        .list_discounts(&auth_user, page, limit)
        .await?;
    Ok(paginated(discounts))
}

#[utoipa::path(
    post,
    path = "/api/v1/discounts",
    request_body = CreateDiscountRequest,
    responses(
        (status = 201, description = "Coupon created", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid terms", body = crate::errors::ErrorResponse),
        (status = 403, description = "Course not owned by caller", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already exists", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "discounts"
)]
pub async fn create_discount(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateDiscountRequest>,
) -> CreatedResult<discount::Model> {
    let discount = state
        .services
        .discounts
        .create_discount(&auth_user, payload)
        .await?;
    Ok(created(discount, "Discount created"))
}

#[utoipa::path(
    get,
    path = "/api/v1/discounts/{id}",
    params(("id" = Uuid, Path, description = "Discount ID")),
    responses(
        (status = 200, description = "Coupon", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "discounts"
)]
pub async fn get_discount(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<discount::Model> {
    let discount = state.services.discounts.get_discount(&auth_user, id).await?;
    Ok(Json(ApiResponse::success(discount)))
}

#[utoipa::path(
    put,
    path = "/api/v1/discounts/{id}",
    params(("id" = Uuid, Path, description = "Discount ID")),
    request_body = UpdateDiscountRequest,
    responses(
        (status = 200, description = "Coupon updated", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid terms", body = crate::errors::ErrorResponse),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "discounts"
)]
pub async fn update_discount(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDiscountRequest>,
) -> ApiResult<discount::Model> {
    let discount = state
        .services
        .discounts
        .update_discount(&auth_user, id, payload)
        .await?;
    Ok(Json(ApiResponse::with_message(discount, "Discount updated")))
}

#[utoipa::path(
    delete,
    path = "/api/v1/discounts/{id}",
    params(("id" = Uuid, Path, description = "Discount ID")),
    responses(
        (status = 200, description = "Coupon deleted"),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "discounts"
)]
pub async fn delete_discount(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state
        .services
        .discounts
        .delete_discount(&auth_user, id)
        .await?;
    Ok(done("Discount deleted"))
}
