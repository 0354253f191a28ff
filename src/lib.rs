//! LearnHub API Library
//!
//! Course marketplace backend: catalog, enrollments, payments and the
//! administration surface, served over axum with a sea-orm store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    middleware::Next,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{AuthRouterExt, AuthService};
use crate::entities::user::UserRole;
use crate::services::Page;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires every service over one pool and one event channel.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let event_sender = Arc::new(event_sender);
        let auth = Arc::new(AuthService::new(
            auth::AuthConfig::from(&config),
            db.clone(),
        ));
        let services =
            handlers::AppServices::new(db.clone(), event_sender.clone(), auth.clone(), &config);
        Self {
            db,
            config,
            event_sender,
            auth,
            services,
        }
    }

    /// Page size for a list request, clamped to the configured bounds.
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        self.config.page_size(requested)
    }
}

// Common query parameters for list endpoints
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size (capped by configuration)
    pub limit: Option<u64>,
}

impl ListQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> From<Page<T>> for PaginatedResponse<T> {
    fn from(page: Page<T>) -> Self {
        let total_pages = page.total_pages();
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    /// Success carrying a human-readable note, e.g. "Enrolled successfully".
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn message_response_keeps_data_and_note() {
        let response = ApiResponse::with_message(7, "Enrolled successfully");
        assert!(response.success);
        assert_eq!(response.data, Some(7));
        assert_eq!(response.message.as_deref(), Some("Enrolled successfully"));
        assert!(response.meta.is_some());
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!response.success);
    }

    #[test]
    fn paginated_response_reports_page_count() {
        let page = Page {
            items: vec!["a", "b"],
            total: 25,
            page: 2,
            limit: 12,
        };
        let body = PaginatedResponse::from(page);
        assert_eq!(body.total_pages, 3);
        assert_eq!(body.items, vec!["a", "b"]);
    }

    #[test]
    fn list_query_page_never_drops_below_one() {
        let query = ListQuery {
            page: Some(0),
            limit: None,
        };
        assert_eq!(query.page(), 1);
        assert_eq!(ListQuery::default().page(), 1);
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    use handlers::{admin, auth as auth_h, courses, discounts, enrollments, payments, users};

    let public = Router::new()
        .route("/auth/register", post(auth_h::register))
        .route("/auth/login", post(auth_h::login))
        .route("/courses", get(courses::list_courses))
        .route("/courses/{id}", get(courses::get_course))
        .route("/courses/{id}/reviews", get(courses::list_reviews))
        .route("/users/instructors/{id}", get(users::instructor_profile));

    // Any signed-in account
    let authenticated = Router::new()
        .route("/auth/me", get(auth_h::me))
        .route("/auth/logout", post(auth_h::logout))
        .route("/users/profile", put(users::update_profile))
        .route("/users/password", put(users::change_password))
        .route("/users/wishlist", get(users::wishlist))
        .route(
            "/users/wishlist/{course_id}",
            post(users::add_to_wishlist).delete(users::remove_from_wishlist),
        )
        .route("/users/cart", get(users::cart))
        .route(
            "/users/cart/{course_id}",
            post(users::add_to_cart).delete(users::remove_from_cart),
        )
        .route("/courses/{id}/reviews", post(courses::submit_review))
        .route("/enrollments/enroll/{course_id}", post(enrollments::enroll))
        .route("/enrollments/my", get(enrollments::my_enrollments))
        .route(
            "/enrollments/check/{course_id}",
            get(enrollments::check_enrollment),
        )
        .route("/enrollments/{id}", get(enrollments::get_enrollment))
        .route("/enrollments/{id}/content", get(enrollments::course_content))
        .route(
            "/enrollments/{id}/lessons/{lesson_id}/complete",
            post(enrollments::complete_lesson),
        )
        .route("/payments/history", get(payments::payment_history))
        .route("/payments/refund/{enrollment_id}", post(payments::refund))
        .route("/discounts/validate", post(discounts::validate_discount))
        .with_auth();

    let teaching = Router::new()
        .route("/courses", post(courses::create_course))
        .route("/courses/instructor/mine", get(courses::my_courses))
        .route(
            "/courses/{id}/manage",
            get(courses::get_managed_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        )
        .route("/courses/{id}/submit", post(courses::submit_course))
        .route("/courses/{id}/publish", post(courses::publish_course))
        .route("/courses/{id}/unpublish", post(courses::unpublish_course))
        .route("/courses/{id}/chapters", post(courses::create_chapter))
        .route(
            "/courses/{id}/chapters/{chapter_id}",
            put(courses::update_chapter).delete(courses::delete_chapter),
        )
        .route(
            "/courses/{id}/chapters/{chapter_id}/lessons",
            post(courses::create_lesson),
        )
        .route(
            "/courses/{id}/lessons/{lesson_id}",
            put(courses::update_lesson).delete(courses::delete_lesson),
        )
        .route(
            "/enrollments/course/{course_id}/students",
            get(enrollments::course_students),
        )
        .route(
            "/discounts",
            get(discounts::list_discounts).post(discounts::create_discount),
        )
        .route(
            "/discounts/{id}",
            get(discounts::get_discount)
                .put(discounts::update_discount)
                .delete(discounts::delete_discount),
        )
        .with_roles(&[UserRole::Instructor, UserRole::Admin]);

    let instructor_only = Router::new()
        .route("/payments/instructor/earnings", get(payments::instructor_earnings))
        .with_roles(&[UserRole::Instructor]);

    let admin_only = Router::new()
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}", delete(admin::delete_user))
        .route("/admin/users/{id}/approve", post(admin::approve_instructor))
        .route("/admin/users/{id}/reject", post(admin::reject_instructor))
        .route("/admin/users/{id}/status", put(admin::set_user_status))
        .route("/admin/courses/pending", get(admin::pending_courses))
        .route("/admin/courses/{id}", delete(admin::delete_course))
        .route("/admin/courses/{id}/approve", post(admin::approve_course))
        .route("/admin/courses/{id}/reject", post(admin::reject_course))
        .route("/admin/courses/{id}/archive", post(admin::archive_course))
        .route("/admin/stats", get(admin::dashboard_stats))
        .route("/payments/admin/analytics", get(payments::platform_analytics))
        .with_roles(&[UserRole::Admin]);

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(public)
        .merge(authenticated)
        .merge(teaching)
        .merge(instructor_only)
        .merge(admin_only)
}

/// Builds the CORS layer from configuration, or `None` when the
/// configuration neither lists origins nor permits the permissive fallback.
pub fn cors_layer(cfg: &config::AppConfig) -> Option<CorsLayer> {
    use axum::http::HeaderValue;
    use tower_http::cors::Any;

    let origins: Vec<HeaderValue> = cfg
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else if cfg.should_allow_permissive_cors() {
        Some(CorsLayer::permissive())
    } else {
        None
    }
}

/// Assembles the full application: versioned API, docs, probes and the
/// middleware stack.
pub fn build_app(state: AppState, cors: CorsLayer) -> Router {
    let auth_service = state.auth.clone();
    let body_limit = state.config.max_body_size;

    let api = api_v1_routes().layer(axum::middleware::from_fn(
        middleware_helpers::security_headers_middleware,
    ));

    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(api_status))
        .nest("/api/v1", api)
        .merge(openapi::swagger_ui())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(axum::middleware::from_fn(
            move |mut req: Request, next: Next| {
                let auth_service = auth_service.clone();
                async move {
                    req.extensions_mut().insert(auth_service);
                    next.run(req).await
                }
            },
        ))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/status",
    summary = "Service status",
    responses((status = 200, description = "Build and environment information", body = ApiResponse<serde_json::Value>)),
    tag = "health"
)]
pub async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git": option_env!("GIT_HASH").unwrap_or("unknown"),
        "service": "learnhub-api",
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

#[utoipa::path(
    get,
    path = "/health",
    summary = "Liveness and database check",
    responses((status = 200, description = "Health report", body = ApiResponse<serde_json::Value>)),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(e) => {
            ::tracing::warn!(error = %e, "database health check failed");
            "unhealthy"
        }
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

pub mod prelude {
    pub use crate::auth::{AuthService, AuthUser};
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::services::*;
    pub use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};
}
