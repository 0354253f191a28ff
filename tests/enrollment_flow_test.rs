mod common;

use axum::http::StatusCode;
use common::{decimal_at, uuid_at, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn paid_enrollment_updates_counters_and_earnings() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let instructor = app.instructor("Barbara").await;
    let student = app.student("Radia").await;
    let course_id = app.listed_course(&instructor, &admin, "100").await;

    let (status, body) = app
        .post(
            &format!("/api/v1/enrollments/enroll/{course_id}"),
            json!({ "payment_method": "card" }),
            Some(&student.token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "enroll failed: {body}");
    assert_eq!(body["data"]["payment_status"], "completed");
    assert_eq!(decimal_at(&body["data"]["amount_paid"]), dec!(100));
    assert_eq!(decimal_at(&body["data"]["discount_amount"]), dec!(0));
    assert_eq!(body["data"]["progress"], 0);

    let (_, detail) = app.get(&format!("/api/v1/courses/{course_id}"), None).await;
    assert_eq!(detail["data"]["total_enrollments"], 1);

    let (_, profile) = app
        .get(&format!("/api/v1/users/instructors/{}", instructor.id), None)
        .await;
    assert_eq!(profile["data"]["total_students"], 1);
    assert!(profile["data"].get("total_revenue").is_none());
    assert_eq!(app.user_row(instructor.id).await.total_revenue, dec!(90));

    let (status, earnings) = app
        .get("/api/v1/payments/instructor/earnings", Some(&instructor.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal_at(&earnings["data"]["total_sales"]), dec!(100));
    assert_eq!(decimal_at(&earnings["data"]["total_earnings"]), dec!(90));
    assert_eq!(earnings["data"]["total_students"], 1);
    assert_eq!(earnings["data"]["courses"][0]["students"], 1);

    let (status, students) = app
        .get(
            &format!("/api/v1/enrollments/course/{course_id}/students"),
            Some(&instructor.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(students["data"]["total"], 1);
    assert_eq!(students["data"]["items"][0]["email"], student.email);
}

#[tokio::test]
async fn duplicate_and_self_enrollment_are_refused() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let instructor = app.instructor("Grace").await;
    let student = app.student("Ken").await;
    let course_id = app.listed_course(&instructor, &admin, "100").await;
    let uri = format!("/api/v1/enrollments/enroll/{course_id}");

    let (first, _) = app.post(&uri, json!({}), Some(&student.token)).await;
    let (second, body) = app.post(&uri, json!({}), Some(&student.token)).await;
    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Already enrolled in this course");

    let (own, _) = app.post(&uri, json!({}), Some(&instructor.token)).await;
    assert_eq!(own, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unlisted_courses_cannot_be_bought() {
    let app = TestApp::new().await;
    let instructor = app.instructor("Leslie").await;
    let student = app.student("Butler").await;
    let course_id = app
        .draft_course(&instructor, "25", &[("Intro", 60, true)])
        .await;

    let (status, _) = app
        .post(
            &format!("/api/v1/enrollments/enroll/{course_id}"),
            json!({}),
            Some(&student.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn free_method_is_rejected_for_paid_courses() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let instructor = app.instructor("Adele").await;
    let student = app.student("Jean").await;
    let course_id = app.listed_course(&instructor, &admin, "100").await;

    let (status, _) = app
        .post(
            &format!("/api/v1/enrollments/enroll/{course_id}"),
            json!({ "payment_method": "free" }),
            Some(&student.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completing_lessons_drives_progress_to_completion() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let instructor = app.instructor("Hedy").await;
    let student = app.student("Mary").await;
    let course_id = app.listed_course(&instructor, &admin, "0").await;

    let (_, enrolled) = app
        .post(
            &format!("/api/v1/enrollments/enroll/{course_id}"),
            json!({}),
            Some(&student.token),
        )
        .await;
    assert_eq!(enrolled["data"]["payment_method"], "free");
    let enrollment_id = uuid_at(&enrolled["data"]["id"]);

    let (status, content) = app
        .get(
            &format!("/api/v1/enrollments/{enrollment_id}/content"),
            Some(&student.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let lessons: Vec<_> = content["data"]["chapters"][0]["lessons"]
        .as_array()
        .expect("lessons")
        .clone();
    assert_eq!(lessons.len(), 2);
    assert!(lessons.iter().all(|l| l["video_url"].is_string()));

    let first = uuid_at(&lessons[0]["id"]);
    let second = uuid_at(&lessons[1]["id"]);
    let complete = |lesson: uuid::Uuid| {
        format!("/api/v1/enrollments/{enrollment_id}/lessons/{lesson}/complete")
    };

    let (status, progress) = app
        .post(&complete(first), json!({ "watch_time": 280 }), Some(&student.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["data"]["progress"], 50);
    assert_eq!(progress["data"]["is_completed"], false);
    assert_eq!(progress["data"]["completed_lessons"], 1);
    assert_eq!(progress["data"]["total_lessons"], 2);

    // Completing the same lesson again does not double count it.
    let (_, progress) = app
        .post(&complete(first), json!({ "watch_time": 300 }), Some(&student.token))
        .await;
    assert_eq!(progress["data"]["progress"], 50);
    assert_eq!(progress["data"]["completed_lessons"], 1);

    let (_, progress) = app
        .post(&complete(second), json!({}), Some(&student.token))
        .await;
    assert_eq!(progress["data"]["progress"], 100);
    assert_eq!(progress["data"]["is_completed"], true);

    let (_, check) = app
        .get(
            &format!("/api/v1/enrollments/check/{course_id}"),
            Some(&student.token),
        )
        .await;
    assert_eq!(check["data"]["is_enrolled"], true);
    assert_eq!(check["data"]["progress"], 100);
    assert_eq!(uuid_at(&check["data"]["enrollment_id"]), enrollment_id);

    let (_, mine) = app.get("/api/v1/enrollments/my", Some(&student.token)).await;
    assert_eq!(mine["data"]["total"], 1);
    assert_eq!(mine["data"]["items"][0]["is_completed"], true);
}

#[tokio::test]
async fn other_students_cannot_read_an_enrollment() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let instructor = app.instructor("Sophie").await;
    let owner = app.student("Emmy").await;
    let snoop = app.student("Eve").await;
    let course_id = app.listed_course(&instructor, &admin, "0").await;

    let (_, enrolled) = app
        .post(
            &format!("/api/v1/enrollments/enroll/{course_id}"),
            json!({}),
            Some(&owner.token),
        )
        .await;
    let enrollment_id = uuid_at(&enrolled["data"]["id"]);

    let (status, _) = app
        .get(
            &format!("/api/v1/enrollments/{enrollment_id}/content"),
            Some(&snoop.token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, check) = app
        .get(
            &format!("/api/v1/enrollments/check/{course_id}"),
            Some(&snoop.token),
        )
        .await;
    assert_eq!(check["data"]["is_enrolled"], false);
    assert!(check["data"]["enrollment_id"].is_null());
}

#[tokio::test]
async fn refund_reverses_counters_and_blocks_content() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let instructor = app.instructor("Barbara").await;
    let student = app.student("Shafi").await;
    let course_id = app.listed_course(&instructor, &admin, "100").await;

    let (_, enrolled) = app
        .post(
            &format!("/api/v1/enrollments/enroll/{course_id}"),
            json!({}),
            Some(&student.token),
        )
        .await;
    let enrollment_id = uuid_at(&enrolled["data"]["id"]);
    let refund_uri = format!("/api/v1/payments/refund/{enrollment_id}");

    let (status, body) = app
        .post(&refund_uri, json!({ "reason": "Changed my mind" }), Some(&student.token))
        .await;
    assert_eq!(status, StatusCode::OK, "refund failed: {body}");
    assert_eq!(body["data"]["payment_status"], "refunded");
    assert_eq!(body["data"]["refund_reason"], "Changed my mind");
    assert!(body["data"]["refunded_at"].is_string());

    let instructor_row = app.user_row(instructor.id).await;
    assert_eq!(instructor_row.total_students, 0);
    assert_eq!(instructor_row.total_revenue, dec!(0));

    let (_, detail) = app.get(&format!("/api/v1/courses/{course_id}"), None).await;
    assert_eq!(detail["data"]["total_enrollments"], 0);

    let (again, _) = app
        .post(&refund_uri, json!({}), Some(&student.token))
        .await;
    assert_eq!(again, StatusCode::BAD_REQUEST);

    let (content, _) = app
        .get(
            &format!("/api/v1/enrollments/{enrollment_id}/content"),
            Some(&student.token),
        )
        .await;
    assert_eq!(content, StatusCode::FORBIDDEN);

    let (reenroll, _) = app
        .post(
            &format!("/api/v1/enrollments/enroll/{course_id}"),
            json!({}),
            Some(&student.token),
        )
        .await;
    assert_eq!(reenroll, StatusCode::CONFLICT);

    let (_, earnings) = app
        .get("/api/v1/payments/instructor/earnings", Some(&instructor.token))
        .await;
    assert_eq!(decimal_at(&earnings["data"]["total_earnings"]), dec!(0));
    assert_eq!(decimal_at(&earnings["data"]["refunded_amount"]), dec!(100));

    let (_, history) = app.get("/api/v1/payments/history", Some(&student.token)).await;
    assert_eq!(history["data"]["total"], 1);
    assert_eq!(history["data"]["items"][0]["payment_status"], "refunded");
}

#[tokio::test]
async fn refund_window_binds_students_but_not_admins() {
    let app = TestApp::with_config(|cfg| cfg.refund_window_days = 0).await;
    let admin = app.admin().await;
    let instructor = app.instructor("Anita").await;
    let student = app.student("Alan").await;
    let stranger = app.student("Mallory").await;
    let course_id = app.listed_course(&instructor, &admin, "100").await;

    let (_, enrolled) = app
        .post(
            &format!("/api/v1/enrollments/enroll/{course_id}"),
            json!({}),
            Some(&student.token),
        )
        .await;
    let refund_uri = format!(
        "/api/v1/payments/refund/{}",
        uuid_at(&enrolled["data"]["id"])
    );

    let (status, _) = app
        .post(&refund_uri, json!({}), Some(&stranger.token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(&refund_uri, json!({}), Some(&student.token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(&refund_uri, json!({ "reason": "Goodwill" }), Some(&admin.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment_status"], "refunded");
}

#[tokio::test]
async fn enrolling_clears_cart_and_wishlist_entries() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let instructor = app.instructor("Lynn").await;
    let student = app.student("Joan").await;
    let course_id = app.listed_course(&instructor, &admin, "100").await;

    let (status, _) = app
        .post(
            &format!("/api/v1/users/cart/{course_id}"),
            json!({}),
            Some(&student.token),
        )
        .await;
    assert!(status.is_success());
    let (status, _) = app
        .post(
            &format!("/api/v1/users/wishlist/{course_id}"),
            json!({}),
            Some(&student.token),
        )
        .await;
    assert!(status.is_success());

    let (_, cart) = app.get("/api/v1/users/cart", Some(&student.token)).await;
    assert_eq!(cart["data"]["items"].as_array().map(Vec::len), Some(1));

    app.post(
        &format!("/api/v1/enrollments/enroll/{course_id}"),
        json!({}),
        Some(&student.token),
    )
    .await;

    let (_, cart) = app.get("/api/v1/users/cart", Some(&student.token)).await;
    let (_, wishlist) = app.get("/api/v1/users/wishlist", Some(&student.token)).await;
    assert_eq!(cart["data"]["items"].as_array().map(Vec::len), Some(0));
    assert_eq!(wishlist["data"].as_array().map(Vec::len), Some(0));
}
