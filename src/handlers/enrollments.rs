use super::common::{created, paginated, paging, CreatedResult};
use crate::{
    auth::AuthUser,
    services::enrollments::{
        CompleteLessonRequest, CourseContent, CourseStudent, EnrollRequest, EnrollmentCheck,
        EnrollmentDetail, EnrollmentSummary, LessonProgress,
    },
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;

/// Purchase a course
///
/// Applies an optional coupon, records the payment and the revenue split,
/// and updates course and instructor counters in one transaction.
#[utoipa::path(
    post,
    path = "/api/v1/enrollments/enroll/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    request_body = EnrollRequest,
    responses(
        (status = 201, description = "Enrolled", body = ApiResponse<EnrollmentDetail>),
        (status = 400, description = "Own course or coupon rejected", body = crate::errors::ErrorResponse),
        (status = 404, description = "Course or coupon not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already enrolled", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "enrollments"
)]
pub async fn enroll(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<EnrollRequest>,
) -> CreatedResult<EnrollmentDetail> {
    let enrollment = state
        .services
        .enrollments
        .enroll(&auth_user, course_id, payload)
        .await?;
    Ok(created(enrollment, "Enrolled successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/enrollments/my",
    params(ListQuery),
    responses(
        (status = 200, description = "Caller's enrollments", body = ApiResponse<PaginatedResponse<EnrollmentSummary>>)
    ),
    security(("Bearer" = [])),
    tag = "enrollments"
)]
pub async fn my_enrollments(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<EnrollmentSummary>> {
    let (page, limit) = paging(&state, &query);
    let enrollments = state
        .services
        .enrollments
        .my_enrollments(&auth_user, page, limit)
        .await?;
    Ok(paginated(enrollments))
}

#[utoipa::path(
    get,
    path = "/api/v1/enrollments/check/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Whether the caller has access", body = ApiResponse<EnrollmentCheck>)
    ),
    security(("Bearer" = [])),
    tag = "enrollments"
)]
pub async fn check_enrollment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> ApiResult<EnrollmentCheck> {
    let check = state
        .services
        .enrollments
        .check_enrollment(&auth_user, course_id)
        .await?;
    Ok(Json(ApiResponse::success(check)))
}

#[utoipa::path(
    get,
    path = "/api/v1/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment with progress", body = ApiResponse<EnrollmentDetail>),
        (status = 404, description = "Enrollment not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "enrollments"
)]
pub async fn get_enrollment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(enrollment_id): Path<Uuid>,
) -> ApiResult<EnrollmentDetail> {
    let enrollment = state
        .services
        .enrollments
        .get_enrollment(&auth_user, enrollment_id)
        .await?;
    Ok(Json(ApiResponse::success(enrollment)))
}

/// Full curriculum with video URLs and per-lesson completion
#[utoipa::path(
    get,
    path = "/api/v1/enrollments/{id}/content",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Course content", body = ApiResponse<CourseContent>),
        (status = 403, description = "Enrollment was refunded", body = crate::errors::ErrorResponse),
        (status = 404, description = "Enrollment not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "enrollments"
)]
pub async fn course_content(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(enrollment_id): Path<Uuid>,
) -> ApiResult<CourseContent> {
    let content = state
        .services
        .enrollments
        .course_content(&auth_user, enrollment_id)
        .await?;
    Ok(Json(ApiResponse::success(content)))
}

#[utoipa::path(
    post,
    path = "/api/v1/enrollments/{id}/lessons/{lesson_id}/complete",
    params(
        ("id" = Uuid, Path, description = "Enrollment ID"),
        ("lesson_id" = Uuid, Path, description = "Lesson ID")
    ),
    request_body = CompleteLessonRequest,
    responses(
        (status = 200, description = "Updated progress", body = ApiResponse<LessonProgress>),
        (status = 403, description = "Enrollment was refunded", body = crate::errors::ErrorResponse),
        (status = 404, description = "Lesson is not part of this course", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "enrollments"
)]
pub async fn complete_lesson(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((enrollment_id, lesson_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CompleteLessonRequest>,
) -> ApiResult<LessonProgress> {
    let progress = state
        .services
        .enrollments
        .complete_lesson(&auth_user, enrollment_id, lesson_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(progress)))
}

#[utoipa::path(
    get,
    path = "/api/v1/enrollments/course/{course_id}/students",
    params(("course_id" = Uuid, Path, description = "Course ID"), ListQuery),
    responses(
        (status = 200, description = "Students of the course", body = ApiResponse<PaginatedResponse<CourseStudent>>),
        (status = 403, description = "Not the course owner", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "enrollments"
)]
pub async fn course_students(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<CourseStudent>> {
    let (page, limit) = paging(&state, &query);
    let students = state
        .services
        .enrollments
        .course_students(&auth_user, course_id, page, limit)
        .await?;
    Ok(paginated(students))
}
