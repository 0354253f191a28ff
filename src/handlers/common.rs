use crate::{errors::ServiceError, ApiResponse, AppState, ListQuery, PaginatedResponse};
use axum::{http::StatusCode, Json};

/// Result of a handler that creates a resource.
pub type CreatedResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ServiceError>;

/// Standard created response
pub fn created<T>(data: T, message: &str) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::CREATED,
        Json(ApiResponse::with_message(data, message)),
    )
}

/// Resolves `(page, limit)` for a list request.
pub fn paging(state: &AppState, query: &ListQuery) -> (u64, u64) {
    (query.page(), state.page_size(query.limit))
}

pub fn paginated<T>(page: crate::services::Page<T>) -> Json<ApiResponse<PaginatedResponse<T>>> {
    Json(ApiResponse::success(page.into()))
}

/// Acknowledgement for operations that return no payload.
pub fn done(message: &str) -> Json<ApiResponse<()>> {
    Json(ApiResponse::with_message((), message))
}
