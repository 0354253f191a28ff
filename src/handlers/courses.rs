use super::common::{created, done, paginated, paging, CreatedResult};
use crate::{
    auth::AuthUser,
    entities::{course::CourseStatus, course_chapter, course_lesson},
    errors::ServiceError,
    services::courses::{
        CatalogQuery, ChapterRequest, CourseCard, CourseDetail, CreateCourseRequest,
        LessonRequest, ReviewRequest, ReviewView, UpdateCourseRequest, UpdateLessonRequest,
    },
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MyCoursesQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Only courses in this review state
    pub status: Option<CourseStatus>,
}

// Public catalog

#[utoipa::path(
    get,
    path = "/api/v1/courses",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Published courses", body = ApiResponse<PaginatedResponse<CourseCard>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "courses"
)]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<PaginatedResponse<CourseCard>> {
    let limit = state.page_size(query.limit);
    let page = state.services.courses.list_catalog(query, limit).await?;
    Ok(paginated(page))
}

/// Public course page; only preview lessons expose their video
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course with curriculum", body = ApiResponse<CourseDetail>),
        (status = 404, description = "Course not found or not published", body = crate::errors::ErrorResponse)
    ),
    tag = "courses"
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> ApiResult<CourseDetail> {
    let course = state.services.courses.get_public_course(course_id).await?;
    Ok(Json(ApiResponse::success(course)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/reviews",
    params(("id" = Uuid, Path, description = "Course ID"), ListQuery),
    responses(
        (status = 200, description = "Reviews, newest first", body = ApiResponse<PaginatedResponse<ReviewView>>),
        (status = 404, description = "Course not found", body = crate::errors::ErrorResponse)
    ),
    tag = "courses"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<ReviewView>> {
    let (page, limit) = paging(&state, &query);
    let reviews = state
        .services
        .courses
        .list_reviews(course_id, page, limit)
        .await?;
    Ok(paginated(reviews))
}

/// Create or replace the caller's review
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/reviews",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review saved", body = ApiResponse<ReviewView>),
        (status = 400, description = "Rating out of range", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn submit_review(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> ApiResult<ReviewView> {
    let review = state
        .services
        .courses
        .upsert_review(&auth_user, course_id, payload)
        .await?;
    Ok(Json(ApiResponse::with_message(review, "Review saved")))
}

// Instructor course management

#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Draft course created", body = ApiResponse<CourseDetail>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Instructor not approved", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn create_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateCourseRequest>,
) -> CreatedResult<CourseDetail> {
    let course = state
        .services
        .courses
        .create_course(&auth_user, payload)
        .await?;
    Ok(created(course, "Course created"))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/instructor/mine",
    params(MyCoursesQuery),
    responses(
        (status = 200, description = "Courses owned by the caller", body = ApiResponse<PaginatedResponse<CourseCard>>)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn my_courses(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<MyCoursesQuery>,
) -> ApiResult<PaginatedResponse<CourseCard>> {
    let limit = state.page_size(query.limit);
    let courses = state
        .services
        .courses
        .list_instructor_courses(&auth_user, query.status, query.page.unwrap_or(1), limit)
        .await?;
    Ok(paginated(courses))
}

/// Full course view for its owner or an admin, including all video URLs
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/manage",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course with full curriculum", body = ApiResponse<CourseDetail>),
        (status = 403, description = "Not the course owner", body = crate::errors::ErrorResponse),
        (status = 404, description = "Course not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn get_managed_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> ApiResult<CourseDetail> {
    let course = state
        .services
        .courses
        .get_managed_course(&auth_user, course_id)
        .await?;
    Ok(Json(ApiResponse::success(course)))
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}/manage",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = ApiResponse<CourseDetail>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the course owner", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn update_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<UpdateCourseRequest>,
) -> ApiResult<CourseDetail> {
    let course = state
        .services
        .courses
        .update_course(&auth_user, course_id, payload)
        .await?;
    Ok(Json(ApiResponse::with_message(course, "Course updated")))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}/manage",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 403, description = "Not the course owner", body = crate::errors::ErrorResponse),
        (status = 409, description = "Course has enrollments", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn delete_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state
        .services
        .courses
        .delete_course(&auth_user, course_id)
        .await?;
    Ok(done("Course deleted"))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/submit",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course sent for review", body = ApiResponse<CourseDetail>),
        (status = 400, description = "Course is not a draft or has no lessons", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn submit_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> ApiResult<CourseDetail> {
    let course = state
        .services
        .courses
        .submit_for_review(&auth_user, course_id)
        .await?;
    Ok(Json(ApiResponse::with_message(
        course,
        "Course submitted for review",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/publish",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course published", body = ApiResponse<CourseDetail>),
        (status = 400, description = "Course is not approved", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn publish_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> ApiResult<CourseDetail> {
    let course = state
        .services
        .courses
        .set_published(&auth_user, course_id, true)
        .await?;
    Ok(Json(ApiResponse::with_message(course, "Course published")))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/unpublish",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course hidden from the catalog", body = ApiResponse<CourseDetail>)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn unpublish_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> ApiResult<CourseDetail> {
    let course = state
        .services
        .courses
        .set_published(&auth_user, course_id, false)
        .await?;
    Ok(Json(ApiResponse::with_message(course, "Course unpublished")))
}

// Curriculum

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/chapters",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = ChapterRequest,
    responses(
        (status = 201, description = "Chapter created", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Not the course owner", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn create_chapter(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<ChapterRequest>,
) -> CreatedResult<course_chapter::Model> {
    let chapter = state
        .services
        .courses
        .create_chapter(&auth_user, course_id, payload)
        .await?;
    Ok(created(chapter, "Chapter created"))
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}/chapters/{chapter_id}",
    params(
        ("id" = Uuid, Path, description = "Course ID"),
        ("chapter_id" = Uuid, Path, description = "Chapter ID")
    ),
    request_body = ChapterRequest,
    responses(
        (status = 200, description = "Chapter updated", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Chapter not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn update_chapter(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((course_id, chapter_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ChapterRequest>,
) -> ApiResult<course_chapter::Model> {
    let chapter = state
        .services
        .courses
        .update_chapter(&auth_user, course_id, chapter_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(chapter)))
}

/// Deletes the chapter together with its lessons
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}/chapters/{chapter_id}",
    params(
        ("id" = Uuid, Path, description = "Course ID"),
        ("chapter_id" = Uuid, Path, description = "Chapter ID")
    ),
    responses(
        (status = 200, description = "Chapter deleted"),
        (status = 404, description = "Chapter not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn delete_chapter(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((course_id, chapter_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state
        .services
        .courses
        .delete_chapter(&auth_user, course_id, chapter_id)
        .await?;
    Ok(done("Chapter deleted"))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/chapters/{chapter_id}/lessons",
    params(
        ("id" = Uuid, Path, description = "Course ID"),
        ("chapter_id" = Uuid, Path, description = "Chapter ID")
    ),
    request_body = LessonRequest,
    responses(
        (status = 201, description = "Lesson created", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Chapter not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn create_lesson(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((course_id, chapter_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<LessonRequest>,
) -> CreatedResult<course_lesson::Model> {
    let lesson = state
        .services
        .courses
        .create_lesson(&auth_user, course_id, chapter_id, payload)
        .await?;
    Ok(created(lesson, "Lesson created"))
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}/lessons/{lesson_id}",
    params(
        ("id" = Uuid, Path, description = "Course ID"),
        ("lesson_id" = Uuid, Path, description = "Lesson ID")
    ),
    request_body = UpdateLessonRequest,
    responses(
        (status = 200, description = "Lesson updated", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Lesson not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn update_lesson(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((course_id, lesson_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateLessonRequest>,
) -> ApiResult<course_lesson::Model> {
    let lesson = state
        .services
        .courses
        .update_lesson(&auth_user, course_id, lesson_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(lesson)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}/lessons/{lesson_id}",
    params(
        ("id" = Uuid, Path, description = "Course ID"),
        ("lesson_id" = Uuid, Path, description = "Lesson ID")
    ),
    responses(
        (status = 200, description = "Lesson deleted"),
        (status = 404, description = "Lesson not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "courses"
)]
pub async fn delete_lesson(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((course_id, lesson_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state
        .services
        .courses
        .delete_lesson(&auth_user, course_id, lesson_id)
        .await?;
    Ok(done("Lesson deleted"))
}
