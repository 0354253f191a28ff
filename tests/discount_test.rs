mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{decimal_at, uuid_at, Account, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

fn next_week() -> String {
    (Utc::now() + Duration::days(7)).to_rfc3339()
}

async fn create_coupon(app: &TestApp, owner: &Account, body: Value) -> (StatusCode, Value) {
    app.post("/api/v1/discounts", body, Some(&owner.token)).await
}

async fn quote(app: &TestApp, student: &Account, code: &str, course_id: Uuid) -> (StatusCode, Value) {
    app.post(
        "/api/v1/discounts/validate",
        json!({ "code": code, "course_id": course_id }),
        Some(&student.token),
    )
    .await
}

#[tokio::test]
async fn percentage_coupon_is_quoted_and_redeemed() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let instructor = app.instructor("Barbara").await;
    let student = app.student("Radia").await;
    let course_id = app.listed_course(&instructor, &admin, "100").await;

    let (status, body) = create_coupon(
        &app,
        &instructor,
        json!({
            "code": "launch10",
            "discount_type": "percentage",
            "value": "10",
            "valid_until": next_week(),
            "applicable_courses": [course_id]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    assert_eq!(body["data"]["code"], "LAUNCH10");

    let (status, quoted) = quote(&app, &student, "launch10", course_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal_at(&quoted["data"]["original_amount"]), dec!(100));
    assert_eq!(decimal_at(&quoted["data"]["discount_amount"]), dec!(10));
    assert_eq!(decimal_at(&quoted["data"]["final_amount"]), dec!(90));

    let (status, enrolled) = app
        .post(
            &format!("/api/v1/enrollments/enroll/{course_id}"),
            json!({ "discount_code": "LAUNCH10" }),
            Some(&student.token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "enroll failed: {enrolled}");
    assert_eq!(enrolled["data"]["discount_code"], "LAUNCH10");
    assert_eq!(decimal_at(&enrolled["data"]["discount_amount"]), dec!(10));
    assert_eq!(decimal_at(&enrolled["data"]["amount_paid"]), dec!(90));

    let discount_id = uuid_at(&body["data"]["id"]);
    let (_, coupon) = app
        .get(
            &format!("/api/v1/discounts/{discount_id}"),
            Some(&instructor.token),
        )
        .await;
    assert_eq!(coupon["data"]["used_count"], 1);
}

#[tokio::test]
async fn minimum_order_amount_is_enforced() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let instructor = app.instructor("Grace").await;
    let student = app.student("Ken").await;
    let course_id = app.listed_course(&instructor, &admin, "100").await;

    let (status, _) = create_coupon(
        &app,
        &admin,
        json!({
            "code": "BIGSPENDER",
            "discount_type": "fixed",
            "value": "20",
            "min_order_amount": "200",
            "valid_until": next_week()
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = quote(&app, &student, "BIGSPENDER", course_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Minimum order amount"));
}

#[tokio::test]
async fn usage_limit_stops_the_second_redemption() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let instructor = app.instructor("Frances").await;
    let first = app.student("Ada").await;
    let second = app.student("Hopper").await;
    let course_id = app.listed_course(&instructor, &admin, "100").await;

    let (status, _) = create_coupon(
        &app,
        &admin,
        json!({
            "code": "ONLYONE",
            "discount_type": "fixed",
            "value": "25",
            "usage_limit": 1,
            "valid_until": next_week()
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let enroll_uri = format!("/api/v1/enrollments/enroll/{course_id}");
    let (status, body) = app
        .post(&enroll_uri, json!({ "discount_code": "ONLYONE" }), Some(&first.token))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(decimal_at(&body["data"]["amount_paid"]), dec!(75));

    let (status, _) = app
        .post(&enroll_uri, json!({ "discount_code": "ONLYONE" }), Some(&second.token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The failed checkout left no enrollment behind.
    let (_, check) = app
        .get(
            &format!("/api/v1/enrollments/check/{course_id}"),
            Some(&second.token),
        )
        .await;
    assert_eq!(check["data"]["is_enrolled"], false);
}

#[tokio::test]
async fn unknown_codes_are_not_found() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let instructor = app.instructor("Katherine").await;
    let student = app.student("Dorothy").await;
    let course_id = app.listed_course(&instructor, &admin, "100").await;

    let (status, _) = quote(&app, &student, "NOPE", course_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn instructors_scope_coupons_to_their_own_courses() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let owner = app.instructor("Alan").await;
    let rival = app.instructor("Alonzo").await;
    let course_id = app.listed_course(&owner, &admin, "100").await;

    let (status, _) = create_coupon(
        &app,
        &rival,
        json!({
            "code": "POACH",
            "discount_type": "percentage",
            "value": "50",
            "valid_until": next_week(),
            "applicable_courses": [course_id]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = create_coupon(
        &app,
        &rival,
        json!({
            "code": "EVERYTHING",
            "discount_type": "percentage",
            "value": "50",
            "valid_until": next_week()
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_codes_conflict_and_bad_terms_are_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let coupon = json!({
        "code": "SPRING",
        "discount_type": "percentage",
        "value": "15",
        "valid_until": next_week()
    });

    let (first, _) = create_coupon(&app, &admin, coupon.clone()).await;
    let (second, _) = create_coupon(&app, &admin, coupon).await;
    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::CONFLICT);

    let (status, _) = create_coupon(
        &app,
        &admin,
        json!({
            "code": "TOOMUCH",
            "discount_type": "percentage",
            "value": "150",
            "valid_until": next_week()
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = create_coupon(
        &app,
        &admin,
        json!({
            "code": "EXPIRED",
            "discount_type": "fixed",
            "value": "5",
            "valid_until": (Utc::now() - Duration::days(1)).to_rfc3339()
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = create_coupon(
        &app,
        &admin,
        json!({
            "code": "FRACTION",
            "discount_type": "percentage",
            "value": "50",
            "max_discount_amount": "0.005",
            "valid_until": next_week()
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Amounts can have at most two decimal places");
}

#[tokio::test]
async fn deactivated_coupon_cannot_be_used() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let instructor = app.instructor("Mary").await;
    let student = app.student("Annie").await;
    let course_id = app.listed_course(&instructor, &admin, "100").await;

    let (_, created) = create_coupon(
        &app,
        &admin,
        json!({
            "code": "PAUSED",
            "discount_type": "fixed",
            "value": "10",
            "valid_until": next_week()
        }),
    )
    .await;
    let discount_id = uuid_at(&created["data"]["id"]);

    let (status, _) = app
        .put(
            &format!("/api/v1/discounts/{discount_id}"),
            json!({ "is_active": false }),
            &admin.token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = quote(&app, &student, "PAUSED", course_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
