//! Cat activity logging and daily conspiracy aggregation against a real
//! database.
//!
//! Skipped unless DATABASE_URL points at a PostgreSQL test database.

use axum::{
    http::{Method, StatusCode},
    Router,
};
use serde_json::json;

mod common;

use common::{db_app, send, unique};

async fn behavior(app: &Router, score: i32) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/v1/cats/behaviors",
        None,
        Some(json!({ "name": unique("behavior"), "conspiracy_score": score })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_daily_totals_follow_activity_changes() {
    let Some((app, _pool)) = db_app().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };

    let (status, cat) = send(
        &app,
        Method::POST,
        "/v1/cats",
        None,
        Some(json!({ "name": "Mittens", "breed": "Tabby" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", cat);
    let cat_uri = format!("/v1/cats/{}", cat["id"].as_str().unwrap());

    let plotting = behavior(&app, 8).await;
    let napping = behavior(&app, 1).await;

    let log = |behavior_type_id: &str, occurred_at: &str| {
        json!({ "behavior_type_id": behavior_type_id, "occurred_at": occurred_at })
    };

    let (status, first) = send(
        &app,
        Method::POST,
        &format!("{}/activities", cat_uri),
        None,
        Some(log(&plotting, "2024-03-10T08:00:00Z")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    assert_eq!(first["daily"][0]["total_score"], 8);
    assert_eq!(first["daily"][0]["level"], "suspicious");

    let (_, second) = send(
        &app,
        Method::POST,
        &format!("{}/activities", cat_uri),
        None,
        Some(log(&plotting, "2024-03-10T21:30:00Z")),
    )
    .await;
    assert_eq!(second["daily"][0]["total_score"], 16);
    assert_eq!(second["daily"][0]["activity_count"], 2);
    assert_eq!(second["daily"][0]["level"], "scheming");

    // Moving an activity to another day updates both days
    let moved_uri = format!("/v1/cats/activities/{}", second["activity"]["id"].as_str().unwrap());
    let (status, moved) = send(
        &app,
        Method::PATCH,
        &moved_uri,
        None,
        Some(json!({ "behavior_type_id": napping, "occurred_at": "2024-03-11T09:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", moved);

    let (status, range) = send(
        &app,
        Method::GET,
        &format!("{}/conspiracy?from=2024-03-01&to=2024-03-31", cat_uri),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let days = range.as_array().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0]["date"], "2024-03-10");
    assert_eq!(days[0]["total_score"], 8);
    assert_eq!(days[1]["date"], "2024-03-11");
    assert_eq!(days[1]["total_score"], 1);
    assert_eq!(days[1]["level"], "suspicious");

    let (status, deleted) = send(&app, Method::DELETE, &moved_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(deleted["daily"].is_null());

    let (_, activities) = send(
        &app,
        Method::GET,
        &format!("{}/activities?date=2024-03-10", cat_uri),
        None,
        None,
    )
    .await;
    assert_eq!(activities.as_array().unwrap().len(), 1);
    assert_eq!(activities[0]["conspiracy_score"], 8);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/v1/cats/behaviors/{}", plotting),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::DELETE, &cat_uri, None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/v1/cats/behaviors/{}", plotting),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_unknown_behavior_rejected() {
    let Some((app, _pool)) = db_app().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };

    let (_, cat) = send(&app, Method::POST, "/v1/cats", None, Some(json!({ "name": "Shadow" }))).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/v1/cats/{}/activities", cat["id"].as_str().unwrap()),
        None,
        Some(json!({ "behavior_type_id": uuid::Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Behavior type not found");
}
