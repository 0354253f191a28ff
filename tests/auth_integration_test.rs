mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn student_registration_returns_token_and_profile() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            json!({
                "name": "Ada Lovelace",
                "email": "Ada@Example.com",
                "password": PASSWORD
            }),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], "ada@example.com");
    assert_eq!(body["data"]["user"]["role"], "student");
    assert!(body["data"]["user"].get("password_hash").is_none());
    let token = body["data"]["token"]["access_token"].as_str().unwrap();

    let (status, me) = app.get("/api/v1/auth/me", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["name"], "Ada Lovelace");
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = TestApp::new().await;
    let payload = json!({ "name": "Grace", "email": "grace@example.com", "password": PASSWORD });

    let (first, _) = app.post("/api/v1/auth/register", payload.clone(), None).await;
    let (second, body) = app.post("/api/v1/auth/register", payload, None).await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");
}

#[tokio::test]
async fn invalid_registration_reports_field_errors() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            json!({ "name": "X", "email": "not-an-email", "password": "short" }),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .expect("field errors")
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"name"));
}

#[tokio::test]
async fn admin_role_cannot_self_register() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post(
            "/api/v1/auth/register",
            json!({
                "name": "Mallory",
                "email": "mallory@example.com",
                "password": PASSWORD,
                "role": "admin"
            }),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unapproved_instructor_cannot_log_in_until_approved() {
    let app = TestApp::new().await;
    let admin = app.admin().await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            json!({
                "name": "Linus",
                "email": "linus@example.com",
                "password": PASSWORD,
                "role": "instructor"
            }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["token"].is_null());
    let instructor_id = body["data"]["user"]["id"].as_str().unwrap().to_string();

    let login = json!({ "email": "linus@example.com", "password": PASSWORD });
    let (status, _) = app.post("/api/v1/auth/login", login.clone(), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            &format!("/api/v1/admin/users/{instructor_id}/approve"),
            json!({}),
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/api/v1/auth/login", login, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["is_approved"], true);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    let student = app.student("Barbara").await;

    let (status, body) = app
        .post(
            "/api/v1/auth/login",
            json!({ "email": student.email, "password": "not-the-password" }),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() {
    let app = TestApp::new().await;

    let (missing, _) = app.get("/api/v1/auth/me", None).await;
    let (garbage, _) = app.get("/api/v1/auth/me", Some("not.a.jwt")).await;

    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = TestApp::new().await;
    let student = app.student("Dennis").await;

    let (status, _) = app
        .request(Method::POST, "/api/v1/auth/logout", None, Some(&student.token))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/v1/auth/me", Some(&student.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn students_are_kept_out_of_instructor_and_admin_routes() {
    let app = TestApp::new().await;
    let student = app.student("Ken").await;

    let (create, _) = app
        .post(
            "/api/v1/courses",
            json!({
                "title": "Sneaky course",
                "description": "Should never be created.",
                "category": "misc",
                "price": "10"
            }),
            Some(&student.token),
        )
        .await;
    let (stats, _) = app.get("/api/v1/admin/stats", Some(&student.token)).await;
    let (earnings, _) = app
        .get("/api/v1/payments/instructor/earnings", Some(&student.token))
        .await;

    assert_eq!(create, StatusCode::FORBIDDEN);
    assert_eq!(stats, StatusCode::FORBIDDEN);
    assert_eq!(earnings, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn password_change_requires_current_password() {
    let app = TestApp::new().await;
    let student = app.student("Margaret").await;

    let (status, _) = app
        .put(
            "/api/v1/users/password",
            json!({ "current_password": "wrong-password", "new_password": "brand-new-secret" }),
            &student.token,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(
            "/api/v1/users/password",
            json!({ "current_password": PASSWORD, "new_password": "brand-new-secret" }),
            &student.token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/api/v1/auth/login",
            json!({ "email": student.email, "password": "brand-new-secret" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_and_status_respond() {
    let app = TestApp::new().await;

    let (health, body) = app.get("/health", None).await;
    assert_eq!(health, StatusCode::OK);
    assert_eq!(body["data"]["checks"]["database"], "healthy");

    let (status, body) = app.get("/api/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["service"], "learnhub-api");
}
