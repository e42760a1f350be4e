//! Request validation and authentication tests.
//!
//! Every request here is rejected before a query runs, so these tests use a
//! pool that never connects and need no database.

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

mod common;

use common::{access_token, lazy_app, send};

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/register",
        None,
        Some(json!({ "email": "not-an-email", "password": "Correct-Horse-42" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/register",
        None,
        Some(json!({ "email": "sam@example.com", "password": "alllowercase" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = lazy_app();

    let (status, body) = send(&app, Method::GET, "/v1/auth/me", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let app = lazy_app();

    let (status, _) = send(&app, Method::GET, "/v1/auth/me", Some("not.a.jwt"), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = lazy_app();
    let pair = hearth_shared::auth::jwt::issue_token_pair(Uuid::new_v4(), common::TEST_SECRET)
        .unwrap();

    let (status, _) = send(
        &app,
        Method::GET,
        "/v1/gym/bookings",
        Some(&pair.refresh_token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_booking_requires_token() {
    let app = lazy_app();
    let uri = format!("/v1/gym/classes/{}/book", Uuid::new_v4());

    let (status, _) = send(&app, Method::POST, &uri, None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_recipe_writes_require_token() {
    let app = lazy_app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/recipes",
        None,
        Some(json!({
            "title": "Toast",
            "ingredients": ["bread"],
            "instructions": "Toast it"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let uri = format!("/v1/recipes/{}/rating", Uuid::new_v4());
    let (status, _) = send(&app, Method::PUT, &uri, None, Some(json!({ "score": 4 }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rating_out_of_range() {
    let app = lazy_app();
    let token = access_token(Uuid::new_v4());
    let uri = format!("/v1/recipes/{}/rating", Uuid::new_v4());

    let (status, body) = send(&app, Method::PUT, &uri, Some(&token), Some(json!({ "score": 9 }))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "score");
}

#[tokio::test]
async fn test_zero_stock_adjustment_rejected() {
    let app = lazy_app();
    let uri = format!("/v1/inventory/items/{}/adjust", Uuid::new_v4());

    let (status, body) = send(&app, Method::POST, &uri, None, Some(json!({ "delta": 0 }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "delta must not be zero");
}

#[tokio::test]
async fn test_negative_price_rejected() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/inventory/items",
        None,
        Some(json!({ "sku": "SKU-1", "name": "Widget", "unit_price_cents": -5 })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "unit_price_cents");
}

#[tokio::test]
async fn test_page_limit_bounds() {
    let app = lazy_app();

    for uri in ["/v1/quiz/quizzes?limit=0", "/v1/inventory/items?limit=101"] {
        let (status, _) = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
    }
}

#[tokio::test]
async fn test_question_correct_option_out_of_range() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/quiz/questions",
        None,
        Some(json!({
            "prompt": "2 + 2?",
            "options": ["3", "4"],
            "correct_option": 2
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "options");
}

#[tokio::test]
async fn test_class_must_start_in_future() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/gym/classes",
        None,
        Some(json!({
            "name": "Spin",
            "instructor": "Alex",
            "starts_at": Utc::now() - Duration::hours(1),
            "duration_minutes": 45,
            "capacity": 10
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "starts_at");
}

#[tokio::test]
async fn test_behavior_score_out_of_range() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/cats/behaviors",
        None,
        Some(json!({ "name": "Stares at walls", "conspiracy_score": 11 })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "conspiracy_score");
}

#[tokio::test]
async fn test_conspiracy_range_inverted() {
    let app = lazy_app();
    let uri = format!(
        "/v1/cats/{}/conspiracy?from=2024-07-01&to=2024-06-01",
        Uuid::new_v4()
    );

    let (status, _) = send(&app, Method::GET, &uri, None, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_id_rejected() {
    let app = lazy_app();

    let (status, _) = send(&app, Method::GET, "/v1/inventory/items/not-a-uuid", None, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = lazy_app();

    let (status, _) = send(&app, Method::GET, "/v1/nothing-here", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
