/// Gym class and booking endpoints
///
/// # Endpoints
///
/// - `POST   /v1/gym/classes` - Schedule a class
/// - `GET    /v1/gym/classes` - Upcoming classes (`include_past`, `limit`, `offset`)
/// - `GET    /v1/gym/classes/:id` - Class with booking counts
/// - `DELETE /v1/gym/classes/:id` - Delete class and its bookings
/// - `GET    /v1/gym/classes/:id/bookings` - Roster: confirmed, then waitlist
/// - `POST   /v1/gym/classes/:id/book` - Book the caller in (JWT)
/// - `GET    /v1/gym/bookings` - Caller's bookings (JWT)
/// - `POST   /v1/gym/bookings/:id/cancel` - Cancel own booking (JWT)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use hearth_shared::{
    auth::middleware::AuthContext,
    models::{
        booking::{BookOutcome, Booking, CancelOutcome},
        gym_class::{CreateGymClass, GymClass, GymClassDetail},
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 255, message = "Instructor must be 1-255 characters"))]
    pub instructor: String,

    pub starts_at: DateTime<Utc>,

    #[validate(range(min = 1, max = 480, message = "Duration must be 1-480 minutes"))]
    pub duration_minutes: i32,

    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: i32,

    #[serde(default = "default_waitlist")]
    pub waitlist_enabled: bool,
}

fn default_waitlist() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListClassesQuery {
    #[serde(default)]
    pub include_past: bool,

    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i64>,

    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassResponse {
    #[serde(flatten)]
    pub detail: GymClassDetail,
    pub ends_at: DateTime<Utc>,
    pub started: bool,
    pub spots_left: i64,
}

impl From<GymClassDetail> for ClassResponse {
    fn from(detail: GymClassDetail) -> Self {
        Self {
            ends_at: detail.class.ends_at(),
            started: detail.class.has_started(Utc::now()),
            spots_left: detail.spots_left(),
            detail,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub booking: Booking,
    /// Booking moved off the waitlist into the freed seat
    pub promoted: Option<Booking>,
}

fn class_not_found() -> ApiError {
    ApiError::NotFound("Class not found".to_string())
}

pub async fn create_class(
    State(state): State<AppState>,
    Json(req): Json<CreateClassRequest>,
) -> ApiResult<(StatusCode, Json<GymClass>)> {
    req.validate()?;

    if req.starts_at <= Utc::now() {
        return Err(ApiError::invalid_field(
            "starts_at",
            "Class must start in the future",
        ));
    }

    let class = GymClass::create(
        &state.db,
        CreateGymClass {
            name: req.name,
            instructor: req.instructor,
            starts_at: req.starts_at,
            duration_minutes: req.duration_minutes,
            capacity: req.capacity,
            waitlist_enabled: req.waitlist_enabled,
        },
    )
    .await?;

    info!(class_id = %class.id, starts_at = %class.starts_at, "Class scheduled");
    Ok((StatusCode::CREATED, Json(class)))
}

pub async fn list_classes(
    State(state): State<AppState>,
    Query(query): Query<ListClassesQuery>,
) -> ApiResult<Json<Vec<ClassResponse>>> {
    query.validate()?;
    let limit = query.limit.unwrap_or(super::DEFAULT_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let classes = GymClass::list(&state.db, query.include_past, limit, offset).await?;
    Ok(Json(classes.into_iter().map(ClassResponse::from).collect()))
}

pub async fn get_class(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ClassResponse>> {
    let detail = GymClass::find_detail(&state.db, id)
        .await?
        .ok_or_else(class_not_found)?;

    Ok(Json(detail.into()))
}

pub async fn delete_class(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !GymClass::delete(&state.db, id).await? {
        return Err(class_not_found());
    }

    info!(class_id = %id, "Class deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn class_roster(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Booking>>> {
    if GymClass::find_by_id(&state.db, id).await?.is_none() {
        return Err(class_not_found());
    }

    Ok(Json(Booking::roster(&state.db, id).await?))
}

/// Books the caller into a class
///
/// The booking is `confirmed` while seats remain, else `waitlisted` when
/// the class allows it.
///
/// # Errors
///
/// - `400 Bad Request`: Class already started
/// - `404 Not Found`: Unknown class
/// - `409 Conflict`: Already booked, or class full without a waitlist
pub async fn book_class(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<Booking>)> {
    match Booking::book(&state.db, id, auth.user_id).await? {
        BookOutcome::Booked(booking) => Ok((StatusCode::CREATED, Json(booking))),
        BookOutcome::ClassNotFound => Err(class_not_found()),
        BookOutcome::ClassStarted => Err(ApiError::BadRequest(
            "Class has already started".to_string(),
        )),
        BookOutcome::AlreadyBooked => Err(ApiError::Conflict(
            "You already have a booking for this class".to_string(),
        )),
        BookOutcome::Full => Err(ApiError::Conflict("Class is full".to_string())),
    }
}

pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Booking>>> {
    Ok(Json(Booking::list_by_user(&state.db, auth.user_id).await?))
}

/// Cancels one of the caller's bookings
///
/// # Errors
///
/// - `403 Forbidden`: Someone else's booking
/// - `404 Not Found`: Unknown booking
/// - `409 Conflict`: Already cancelled
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CancelResponse>> {
    match Booking::cancel(&state.db, id, auth.user_id).await? {
        CancelOutcome::Cancelled { booking, promoted } => {
            info!(booking_id = %id, user_id = %auth.user_id, "Booking cancelled");
            Ok(Json(CancelResponse { booking, promoted }))
        }
        CancelOutcome::NotFound => Err(ApiError::NotFound("Booking not found".to_string())),
        CancelOutcome::NotOwner => Err(ApiError::Forbidden(
            "You can only cancel your own bookings".to_string(),
        )),
        CancelOutcome::AlreadyCancelled => Err(ApiError::Conflict(
            "Booking is already cancelled".to_string(),
        )),
    }
}
