//! Class booking and waitlist promotion against a real database.
//!
//! Skipped unless DATABASE_URL points at a PostgreSQL test database.

use axum::{
    http::{Method, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::json;

mod common;

use common::{db_app, register_user, send};

async fn schedule(app: &Router, capacity: i32, waitlist_enabled: bool) -> String {
    let (status, class) = send(
        app,
        Method::POST,
        "/v1/gym/classes",
        None,
        Some(json!({
            "name": "Morning Yoga",
            "instructor": "Robin",
            "starts_at": Utc::now() + Duration::days(2),
            "duration_minutes": 60,
            "capacity": capacity,
            "waitlist_enabled": waitlist_enabled
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", class);
    class["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_cancel_promotes_oldest_waitlisted() {
    let Some((app, _pool)) = db_app().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };

    let class_id = schedule(&app, 1, true).await;
    let book_uri = format!("/v1/gym/classes/{}/book", class_id);

    let (_, first_token) = register_user(&app).await;
    let (second_id, second_token) = register_user(&app).await;
    let (_, third_token) = register_user(&app).await;

    let (status, first) = send(&app, Method::POST, &book_uri, Some(&first_token), None).await;
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    assert_eq!(first["status"], "confirmed");

    let (_, second) = send(&app, Method::POST, &book_uri, Some(&second_token), None).await;
    assert_eq!(second["status"], "waitlisted");

    let (_, third) = send(&app, Method::POST, &book_uri, Some(&third_token), None).await;
    assert_eq!(third["status"], "waitlisted");

    let (status, _) = send(&app, Method::POST, &book_uri, Some(&second_token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let cancel_uri = format!("/v1/gym/bookings/{}/cancel", first["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::POST, &cancel_uri, Some(&third_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, cancelled) = send(&app, Method::POST, &cancel_uri, Some(&first_token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", cancelled);
    assert_eq!(cancelled["booking"]["status"], "cancelled");
    assert_eq!(cancelled["promoted"]["user_id"], second_id.to_string());
    assert_eq!(cancelled["promoted"]["status"], "confirmed");

    let (status, _) = send(&app, Method::POST, &cancel_uri, Some(&first_token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, detail) = send(&app, Method::GET, &format!("/v1/gym/classes/{}", class_id), None, None).await;
    assert_eq!(detail["confirmed_count"], 1);
    assert_eq!(detail["waitlisted_count"], 1);
    assert_eq!(detail["spots_left"], 0);

    let (_, roster) = send(
        &app,
        Method::GET,
        &format!("/v1/gym/classes/{}/bookings", class_id),
        None,
        None,
    )
    .await;
    let statuses: Vec<_> = roster
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, vec!["confirmed", "waitlisted"]);
}

#[tokio::test]
async fn test_full_class_without_waitlist() {
    let Some((app, _pool)) = db_app().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };

    let class_id = schedule(&app, 1, false).await;
    let book_uri = format!("/v1/gym/classes/{}/book", class_id);

    let (_, first_token) = register_user(&app).await;
    let (_, second_token) = register_user(&app).await;

    let (status, _) = send(&app, Method::POST, &book_uri, Some(&first_token), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::POST, &book_uri, Some(&second_token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Class is full");

    let (_, mine) = send(&app, Method::GET, "/v1/gym/bookings", Some(&first_token), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}
