use super::common::{paginated, paging};
use crate::{
    auth::AuthUser,
    services::payments::{InstructorEarnings, PaymentRecord, PlatformAnalytics, RefundRequest},
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/v1/payments/history",
    params(ListQuery),
    responses(
        (status = 200, description = "Caller's purchases and refunds", body = ApiResponse<PaginatedResponse<PaymentRecord>>)
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn payment_history(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<PaymentRecord>> {
    let (page, limit) = paging(&state, &query);
    let history = state
        .services
        .payments
        .payment_history(&auth_user, page, limit)
        .await?;
    Ok(paginated(history))
}

/// Refund an enrollment
///
/// Students may refund their own purchase inside the refund window; admins
/// may refund any completed payment.
#[utoipa::path(
    post,
    path = "/api/v1/payments/refund/{enrollment_id}",
    params(("enrollment_id" = Uuid, Path, description = "Enrollment ID")),
    request_body = RefundRequest,
    responses(
        (status = 200, description = "Payment refunded", body = ApiResponse<PaymentRecord>),
        (status = 400, description = "Not refundable", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the purchaser", body = crate::errors::ErrorResponse),
        (status = 404, description = "Enrollment not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn refund(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(enrollment_id): Path<Uuid>,
    Json(payload): Json<RefundRequest>,
) -> ApiResult<PaymentRecord> {
    let record = state
        .services
        .payments
        .refund(&auth_user, enrollment_id, payload)
        .await?;
    Ok(Json(ApiResponse::with_message(
        record,
        "Refund processed successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/instructor/earnings",
    responses(
        (status = 200, description = "Earnings per course", body = ApiResponse<InstructorEarnings>),
        (status = 403, description = "Instructors only", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn instructor_earnings(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<InstructorEarnings> {
    let earnings = state
        .services
        .payments
        .instructor_earnings(&auth_user)
        .await?;
    Ok(Json(ApiResponse::success(earnings)))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/admin/analytics",
    responses(
        (status = 200, description = "Platform revenue analytics", body = ApiResponse<PlatformAnalytics>),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn platform_analytics(State(state): State<AppState>) -> ApiResult<PlatformAnalytics> {
    let analytics = state.services.payments.platform_analytics().await?;
    Ok(Json(ApiResponse::success(analytics)))
}
