#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use learnhub_api::{
    auth::hash_password,
    config::AppConfig,
    db,
    entities::user::{self, UserRole},
    events, AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";

/// Signed-in account used by a test.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

/// Helper harness for spinning up the full application over a throwaway
/// SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the test adjust configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("learnhub_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "Kq8vNz3tLw7yXb2mRf5pHs9dJc4gTe6uAo1iYk0lZx8nMv3bQw7rEt5yUi2oPa4s".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = learnhub_api::build_app(state.clone(), CorsLayer::permissive());

        Self {
            router,
            state,
            _dir: dir,
            _event_task: event_task,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None, token).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), token).await
    }

    pub async fn put(&self, uri: &str, body: Value, token: &str) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body), Some(token)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None, Some(token)).await
    }

    async fn login(&self, email: &str) -> Account {
        let (status, body) = self
            .post(
                "/api/v1/auth/login",
                json!({ "email": email, "password": PASSWORD }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        Account {
            id: body["data"]["user"]["id"]
                .as_str()
                .and_then(|id| Uuid::parse_str(id).ok())
                .expect("user id"),
            email: email.to_string(),
            token: body["data"]["token"]["access_token"]
                .as_str()
                .expect("access token")
                .to_string(),
        }
    }

    /// Registers and signs in a student through the API.
    pub async fn student(&self, name: &str) -> Account {
        let email = format!("{}@students.test", name.to_lowercase());
        let (status, body) = self
            .post(
                "/api/v1/auth/register",
                json!({ "name": name, "email": email, "password": PASSWORD }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        self.login(&email).await
    }

    /// Registers an instructor through the API, approves them in the
    /// database and signs them in.
    pub async fn instructor(&self, name: &str) -> Account {
        let email = format!("{}@teachers.test", name.to_lowercase());
        let (status, body) = self
            .post(
                "/api/v1/auth/register",
                json!({
                    "name": name,
                    "email": email,
                    "password": PASSWORD,
                    "role": "instructor"
                }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let id = Uuid::parse_str(body["data"]["user"]["id"].as_str().expect("id")).expect("uuid");

        let account = user::Entity::find_by_id(id)
            .one(&*self.state.db)
            .await
            .expect("query instructor")
            .expect("instructor exists");
        let mut active: user::ActiveModel = account.into();
        active.is_approved = Set(true);
        active.update(&*self.state.db).await.expect("approve");

        self.login(&email).await
    }

    /// Inserts an admin directly; admins cannot self-register.
    pub async fn admin(&self) -> Account {
        let email = format!("admin-{}@learnhub.test", Uuid::new_v4().simple());
        let now = Utc::now();
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Admin".to_string()),
            email: Set(email.clone()),
            password_hash: Set(hash_password(PASSWORD).expect("hash")),
            role: Set(UserRole::Admin),
            avatar_url: Set(None),
            bio: Set(None),
            headline: Set(None),
            is_active: Set(true),
            is_approved: Set(true),
            rejection_reason: Set(None),
            total_students: Set(0),
            total_revenue: Set(Decimal::ZERO),
            total_courses: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("insert admin");
        self.login(&email).await
    }

    /// Creates a draft course with one chapter and the given lessons
    /// (title, seconds, preview). Returns the course id.
    pub async fn draft_course(
        &self,
        instructor: &Account,
        price: &str,
        lessons: &[(&str, i32, bool)],
    ) -> Uuid {
        let (status, body) = self
            .post(
                "/api/v1/courses",
                json!({
                    "title": "Systems Programming in Rust",
                    "description": "Threads, sockets and the borrow checker.",
                    "category": "programming",
                    "level": "intermediate",
                    "price": price,
                    "tags": ["rust"]
                }),
                Some(&instructor.token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create course failed: {body}");
        let course_id = uuid_at(&body["data"]["id"]);

        let (status, body) = self
            .post(
                &format!("/api/v1/courses/{course_id}/chapters"),
                json!({ "title": "Foundations" }),
                Some(&instructor.token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create chapter failed: {body}");
        let chapter_id = uuid_at(&body["data"]["id"]);

        for (title, duration, preview) in lessons {
            let (status, body) = self
                .post(
                    &format!("/api/v1/courses/{course_id}/chapters/{chapter_id}/lessons"),
                    json!({
                        "title": title,
                        "duration": duration,
                        "video_url": "https://videos.learnhub.test/lesson.mp4",
                        "is_preview": preview
                    }),
                    Some(&instructor.token),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "create lesson failed: {body}");
        }
        course_id
    }

    /// Walks a course through submit, admin approval and publish.
    pub async fn publish(&self, instructor: &Account, admin: &Account, course_id: Uuid) {
        let (status, body) = self
            .post(
                &format!("/api/v1/courses/{course_id}/submit"),
                json!({}),
                Some(&instructor.token),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "submit failed: {body}");

        let (status, body) = self
            .post(
                &format!("/api/v1/admin/courses/{course_id}/approve"),
                json!({}),
                Some(&admin.token),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "approve failed: {body}");

        let (status, body) = self
            .post(
                &format!("/api/v1/courses/{course_id}/publish"),
                json!({}),
                Some(&instructor.token),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "publish failed: {body}");
    }

    /// Published two-lesson course owned by `instructor`.
    pub async fn listed_course(&self, instructor: &Account, admin: &Account, price: &str) -> Uuid {
        let course_id = self
            .draft_course(
                instructor,
                price,
                &[("Intro", 300, true), ("Ownership", 900, false)],
            )
            .await;
        self.publish(instructor, admin, course_id).await;
        course_id
    }

    pub async fn user_row(&self, id: Uuid) -> user::Model {
        user::Entity::find_by_id(id)
            .one(&*self.state.db)
            .await
            .expect("query user")
            .expect("user exists")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn uuid_at(value: &Value) -> Uuid {
    Uuid::parse_str(value.as_str().unwrap_or_else(|| panic!("expected uuid string, got {value}")))
        .expect("valid uuid")
}

/// Reads a decimal that may be serialized as a string or a number.
pub fn decimal_at(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected decimal, got {other}"),
    }
}
