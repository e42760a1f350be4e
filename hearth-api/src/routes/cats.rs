/// Cat activity logging endpoints
///
/// Every activity write recomputes the cat's daily conspiracy row for the
/// touched date(s) in the same transaction.
///
/// # Endpoints
///
/// - `POST   /v1/cats` - Add cat
/// - `GET    /v1/cats` - List cats
/// - `GET    /v1/cats/:cat_id` - Get cat
/// - `DELETE /v1/cats/:cat_id` - Delete cat, activities and daily rows
/// - `POST   /v1/cats/behaviors` - Add behavior type
/// - `GET    /v1/cats/behaviors` - List behavior types
/// - `DELETE /v1/cats/behaviors/:id` - Delete unused behavior type
/// - `POST   /v1/cats/:cat_id/activities` - Log activity
/// - `GET    /v1/cats/:cat_id/activities` - Activities, newest first (`date`)
/// - `PATCH  /v1/cats/activities/:id` - Change behavior, time or notes
/// - `DELETE /v1/cats/activities/:id` - Delete activity
/// - `GET    /v1/cats/:cat_id/conspiracy` - Daily levels (`from`, `to`)

use super::{non_blank, nullable};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use hearth_shared::models::{
    activity::{
        Activity, ActivityOutcome, ActivityView, CreateActivity, DeleteActivityOutcome,
        UpdateActivity,
    },
    cat::{
        BehaviorType, Cat, CreateBehaviorType, CreateCat, DeleteBehaviorOutcome,
        MAX_CONSPIRACY_SCORE, MIN_CONSPIRACY_SCORE,
    },
    conspiracy::{ConspiracyLevel, DailyConspiracy},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Longest range `/conspiracy` answers in one request
pub const MAX_RANGE_DAYS: i64 = 366;

/// Default `/conspiracy` window when `from` is omitted
const DEFAULT_RANGE_DAYS: i64 = 30;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCatRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 100, message = "Breed must be at most 100 characters"))]
    pub breed: Option<String>,

    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBehaviorRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    pub description: Option<String>,

    pub conspiracy_score: i32,
}

#[derive(Debug, Deserialize)]
pub struct LogActivityRequest {
    pub behavior_type_id: Uuid,

    /// Defaults to now
    pub occurred_at: Option<DateTime<Utc>>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateActivityRequest {
    pub behavior_type_id: Option<Uuid>,

    pub occurred_at: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ActivitiesQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ConspiracyQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DailyConspiracyResponse {
    #[serde(flatten)]
    pub daily: DailyConspiracy,
    pub level: ConspiracyLevel,
}

impl From<DailyConspiracy> for DailyConspiracyResponse {
    fn from(daily: DailyConspiracy) -> Self {
        Self {
            level: daily.level(),
            daily,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub activity: Activity,
    /// Daily rows after the write, one per touched date that still has activities
    pub daily: Vec<DailyConspiracyResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteActivityResponse {
    /// `None` when the day has no activities left
    pub daily: Option<DailyConspiracyResponse>,
}

impl CreateBehaviorRequest {
    fn check_score(&self) -> ApiResult<()> {
        if !(MIN_CONSPIRACY_SCORE..=MAX_CONSPIRACY_SCORE).contains(&self.conspiracy_score) {
            return Err(ApiError::invalid_field(
                "conspiracy_score",
                format!(
                    "Conspiracy score must be between {} and {}",
                    MIN_CONSPIRACY_SCORE, MAX_CONSPIRACY_SCORE
                ),
            ));
        }
        Ok(())
    }
}

fn cat_not_found() -> ApiError {
    ApiError::NotFound("Cat not found".to_string())
}

fn behavior_not_found() -> ApiError {
    ApiError::NotFound("Behavior type not found".to_string())
}

fn activity_not_found() -> ApiError {
    ApiError::NotFound("Activity not found".to_string())
}

fn saved_activity(outcome: ActivityOutcome) -> ApiResult<ActivityResponse> {
    match outcome {
        ActivityOutcome::Saved { activity, daily } => Ok(ActivityResponse {
            activity,
            daily: daily.into_iter().map(Into::into).collect(),
        }),
        ActivityOutcome::CatNotFound => Err(cat_not_found()),
        ActivityOutcome::BehaviorNotFound => Err(behavior_not_found()),
        ActivityOutcome::NotFound => Err(activity_not_found()),
    }
}

/// Resolves `[from, to]`: `to` defaults to today, `from` to 30 days before `to`.
fn resolve_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> ApiResult<(NaiveDate, NaiveDate)> {
    let to = to.unwrap_or(today);
    let from = match from {
        Some(from) => from,
        None => to
            .checked_sub_signed(Duration::days(DEFAULT_RANGE_DAYS))
            .ok_or_else(|| ApiError::BadRequest("to is out of range".to_string()))?,
    };

    if from > to {
        return Err(ApiError::BadRequest("from must not be after to".to_string()));
    }
    if (to - from).num_days() > MAX_RANGE_DAYS {
        return Err(ApiError::BadRequest(format!(
            "Range must be at most {} days",
            MAX_RANGE_DAYS
        )));
    }

    Ok((from, to))
}

pub async fn create_cat(
    State(state): State<AppState>,
    Json(req): Json<CreateCatRequest>,
) -> ApiResult<(StatusCode, Json<Cat>)> {
    req.validate()?;

    if req.birth_date.is_some_and(|d| d > Utc::now().date_naive()) {
        return Err(ApiError::invalid_field(
            "birth_date",
            "Birth date must not be in the future",
        ));
    }

    let cat = Cat::create(
        &state.db,
        CreateCat {
            name: req.name,
            breed: non_blank(req.breed),
            birth_date: req.birth_date,
        },
    )
    .await?;

    info!(cat_id = %cat.id, "Cat added");
    Ok((StatusCode::CREATED, Json(cat)))
}

pub async fn list_cats(State(state): State<AppState>) -> ApiResult<Json<Vec<Cat>>> {
    Ok(Json(Cat::list(&state.db).await?))
}

pub async fn get_cat(
    State(state): State<AppState>,
    Path(cat_id): Path<Uuid>,
) -> ApiResult<Json<Cat>> {
    let cat = Cat::find_by_id(&state.db, cat_id)
        .await?
        .ok_or_else(cat_not_found)?;

    Ok(Json(cat))
}

pub async fn delete_cat(
    State(state): State<AppState>,
    Path(cat_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Cat::delete(&state.db, cat_id).await? {
        return Err(cat_not_found());
    }

    info!(cat_id = %cat_id, "Cat deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// # Errors
///
/// - `409 Conflict`: Name already taken
pub async fn create_behavior(
    State(state): State<AppState>,
    Json(req): Json<CreateBehaviorRequest>,
) -> ApiResult<(StatusCode, Json<BehaviorType>)> {
    req.validate()?;
    req.check_score()?;

    let behavior = BehaviorType::create(
        &state.db,
        CreateBehaviorType {
            name: req.name.trim().to_string(),
            description: req.description,
            conspiracy_score: req.conspiracy_score,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(behavior)))
}

pub async fn list_behaviors(State(state): State<AppState>) -> ApiResult<Json<Vec<BehaviorType>>> {
    Ok(Json(BehaviorType::list(&state.db).await?))
}

/// # Errors
///
/// - `409 Conflict`: Activities still use this behavior
pub async fn delete_behavior(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    match BehaviorType::delete(&state.db, id).await? {
        DeleteBehaviorOutcome::Deleted => Ok(StatusCode::NO_CONTENT),
        DeleteBehaviorOutcome::NotFound => Err(behavior_not_found()),
        DeleteBehaviorOutcome::InUse(count) => Err(ApiError::Conflict(format!(
            "Behavior type is used by {} activities",
            count
        ))),
    }
}

pub async fn log_activity(
    State(state): State<AppState>,
    Path(cat_id): Path<Uuid>,
    Json(req): Json<LogActivityRequest>,
) -> ApiResult<(StatusCode, Json<ActivityResponse>)> {
    let outcome = Activity::create(
        &state.db,
        cat_id,
        CreateActivity {
            behavior_type_id: req.behavior_type_id,
            occurred_at: req.occurred_at.unwrap_or_else(Utc::now),
            notes: non_blank(req.notes),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(saved_activity(outcome)?)))
}

pub async fn update_activity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateActivityRequest>,
) -> ApiResult<Json<ActivityResponse>> {
    let outcome = Activity::update(
        &state.db,
        id,
        UpdateActivity {
            behavior_type_id: req.behavior_type_id,
            occurred_at: req.occurred_at,
            notes: req.notes.map(non_blank),
        },
    )
    .await?;

    Ok(Json(saved_activity(outcome)?))
}

pub async fn delete_activity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteActivityResponse>> {
    match Activity::delete(&state.db, id).await? {
        DeleteActivityOutcome::Deleted { daily } => Ok(Json(DeleteActivityResponse {
            daily: daily.map(Into::into),
        })),
        DeleteActivityOutcome::NotFound => Err(activity_not_found()),
    }
}

pub async fn list_activities(
    State(state): State<AppState>,
    Path(cat_id): Path<Uuid>,
    Query(query): Query<ActivitiesQuery>,
) -> ApiResult<Json<Vec<ActivityView>>> {
    if Cat::find_by_id(&state.db, cat_id).await?.is_none() {
        return Err(cat_not_found());
    }

    Ok(Json(
        Activity::list_for_cat(&state.db, cat_id, query.date).await?,
    ))
}

/// Daily conspiracy rows in date order, each with its level label. Days
/// without activities are absent.
pub async fn conspiracy(
    State(state): State<AppState>,
    Path(cat_id): Path<Uuid>,
    Query(query): Query<ConspiracyQuery>,
) -> ApiResult<Json<Vec<DailyConspiracyResponse>>> {
    let (from, to) = resolve_range(query.from, query.to, Utc::now().date_naive())?;

    if Cat::find_by_id(&state.db, cat_id).await?.is_none() {
        return Err(cat_not_found());
    }

    let rows = DailyConspiracy::range(&state.db, cat_id, from, to).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
