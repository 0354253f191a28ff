use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LearnHub API",
        version = "1.0.0",
        description = r#"
# LearnHub Course Marketplace API

Instructors publish courses, students buy and take them, administrators
moderate both.

## Authentication

Protected endpoints expect a JWT obtained from `/auth/login`:

```
Authorization: Bearer <your-jwt-token>
```

## Responses

Successful calls are wrapped as `{ success, data, message, errors, meta }`.
Failures return `{ error, message, errors, request_id, timestamp }`.

## Pagination

List endpoints accept `page` (default 1) and `limit` (default and maximum
set by server configuration).
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and sessions"),
        (name = "users", description = "Profile, wishlist, cart and instructor pages"),
        (name = "courses", description = "Catalog, course authoring and reviews"),
        (name = "enrollments", description = "Purchases, content access and progress"),
        (name = "payments", description = "Payment history, refunds and revenue"),
        (name = "discounts", description = "Coupon management and validation"),
        (name = "admin", description = "Moderation and platform statistics"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::api_status,
        crate::health_check,

        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::auth::logout,

        // Users
        crate::handlers::users::update_profile,
        crate::handlers::users::change_password,
        crate::handlers::users::wishlist,
        crate::handlers::users::add_to_wishlist,
        crate::handlers::users::remove_from_wishlist,
        crate::handlers::users::cart,
        crate::handlers::users::add_to_cart,
        crate::handlers::users::remove_from_cart,
        crate::handlers::users::instructor_profile,

        // Courses
        crate::handlers::courses::list_courses,
        crate::handlers::courses::get_course,
        crate::handlers::courses::list_reviews,
        crate::handlers::courses::submit_review,
        crate::handlers::courses::create_course,
        crate::handlers::courses::my_courses,
        crate::handlers::courses::get_managed_course,
        crate::handlers::courses::update_course,
        crate::handlers::courses::delete_course,
        crate::handlers::courses::submit_course,
        crate::handlers::courses::publish_course,
        crate::handlers::courses::unpublish_course,
        crate::handlers::courses::create_chapter,
        crate::handlers::courses::update_chapter,
        crate::handlers::courses::delete_chapter,
        crate::handlers::courses::create_lesson,
        crate::handlers::courses::update_lesson,
        crate::handlers::courses::delete_lesson,

        // Enrollments
        crate::handlers::enrollments::enroll,
        crate::handlers::enrollments::my_enrollments,
        crate::handlers::enrollments::check_enrollment,
        crate::handlers::enrollments::get_enrollment,
        crate::handlers::enrollments::course_content,
        crate::handlers::enrollments::complete_lesson,
        crate::handlers::enrollments::course_students,

        // Payments
        crate::handlers::payments::payment_history,
        crate::handlers::payments::refund,
        crate::handlers::payments::instructor_earnings,
        crate::handlers::payments::platform_analytics,

        // Discounts
        crate::handlers::discounts::validate_discount,
        crate::handlers::discounts::list_discounts,
        crate::handlers::discounts::create_discount,
        crate::handlers::discounts::get_discount,
        crate::handlers::discounts::update_discount,
        crate::handlers::discounts::delete_discount,

        // Admin
        crate::handlers::admin::list_users,
        crate::handlers::admin::approve_instructor,
        crate::handlers::admin::reject_instructor,
        crate::handlers::admin::set_user_status,
        crate::handlers::admin::delete_user,
        crate::handlers::admin::pending_courses,
        crate::handlers::admin::approve_course,
        crate::handlers::admin::reject_course,
        crate::handlers::admin::archive_course,
        crate::handlers::admin::delete_course,
        crate::handlers::admin::dashboard_stats,
    ),
    components(
        schemas(
            crate::ListQuery,
            crate::auth::TokenResponse,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Registers the JWT bearer scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_marketplace_paths() {
        let doc = ApiDocV1::openapi();
        for path in [
            "/api/v1/auth/login",
            "/api/v1/courses/{id}",
            "/api/v1/enrollments/enroll/{course_id}",
            "/api/v1/payments/refund/{enrollment_id}",
            "/api/v1/admin/stats",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDocV1::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("Bearer"));
    }
}
