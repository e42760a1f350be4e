/// Inventory endpoints
///
/// # Endpoints
///
/// - `POST   /v1/inventory/items` - Create item
/// - `GET    /v1/inventory/items` - List items (`category`, `low_stock`, `limit`, `offset`)
/// - `GET    /v1/inventory/items/:id` - Get item
/// - `PATCH  /v1/inventory/items/:id` - Update item fields (not quantity)
/// - `DELETE /v1/inventory/items/:id` - Delete item and its movements
/// - `POST   /v1/inventory/items/:id/adjust` - Add or remove stock
/// - `GET    /v1/inventory/items/:id/movements` - Movement history
/// - `GET    /v1/inventory/summary` - Totals and low-stock count

use super::{nullable, Pagination};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use hearth_shared::models::inventory::{
    AdjustOutcome, CreateItem, InventoryItem, InventorySummary, ItemFilter, StockMovement,
    UpdateItem,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 64, message = "SKU must be 1-64 characters"))]
    pub sku: String,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: i32,

    #[validate(range(min = 0, message = "Price must not be negative"))]
    pub unit_price_cents: i64,

    #[serde(default)]
    #[validate(range(min = 0, message = "Reorder level must not be negative"))]
    pub reorder_level: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 64, message = "SKU must be 1-64 characters"))]
    pub sku: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<String>>,

    #[validate(range(min = 0, message = "Price must not be negative"))]
    pub unit_price_cents: Option<i64>,

    #[validate(range(min = 0, message = "Reorder level must not be negative"))]
    pub reorder_level: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub category: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdjustRequest {
    /// Positive to receive stock, negative to remove it
    pub delta: i32,

    #[validate(length(max = 255, message = "Reason must be at most 255 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustResponse {
    pub item: InventoryItem,
    pub movement: StockMovement,
}

fn item_not_found() -> ApiError {
    ApiError::NotFound("Item not found".to_string())
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(req): Json<CreateItemRequest>,
) -> ApiResult<(StatusCode, Json<InventoryItem>)> {
    req.validate()?;

    let item = InventoryItem::create(
        &state.db,
        CreateItem {
            sku: req.sku.trim().to_string(),
            name: req.name,
            description: req.description,
            category: req.category,
            quantity: req.quantity,
            unit_price_cents: req.unit_price_cents,
            reorder_level: req.reorder_level,
        },
    )
    .await?;

    info!(item_id = %item.id, sku = %item.sku, "Inventory item created");

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListItemsQuery>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    page.validate()?;
    let (limit, offset) = page.resolve();

    let items = InventoryItem::list(
        &state.db,
        &ItemFilter {
            category: query.category,
            low_stock: query.low_stock,
            limit,
            offset,
        },
    )
    .await?;

    Ok(Json(items))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<InventoryItem>> {
    let item = InventoryItem::find_by_id(&state.db, id)
        .await?
        .ok_or_else(item_not_found)?;

    Ok(Json(item))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> ApiResult<Json<InventoryItem>> {
    req.validate()?;

    let update = UpdateItem {
        sku: req.sku.map(|s| s.trim().to_string()),
        name: req.name,
        description: req.description,
        category: req.category,
        unit_price_cents: req.unit_price_cents,
        reorder_level: req.reorder_level,
    };

    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let item = InventoryItem::update(&state.db, id, update)
        .await?
        .ok_or_else(item_not_found)?;

    Ok(Json(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !InventoryItem::delete(&state.db, id).await? {
        return Err(item_not_found());
    }

    info!(item_id = %id, "Inventory item deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Adjusts stock by `delta`
///
/// # Errors
///
/// - `400 Bad Request`: `delta` is zero
/// - `404 Not Found`: Unknown item
/// - `400 Bad Request`: Quantity would exceed the maximum
/// - `409 Conflict`: Stock would go negative; nothing changes
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AdjustRequest>,
) -> ApiResult<Json<AdjustResponse>> {
    req.validate()?;

    if req.delta == 0 {
        return Err(ApiError::BadRequest("delta must not be zero".to_string()));
    }

    match InventoryItem::adjust_stock(&state.db, id, req.delta, req.reason).await? {
        AdjustOutcome::Adjusted { item, movement } => {
            info!(
                item_id = %id,
                delta = req.delta,
                quantity = item.quantity,
                "Stock adjusted"
            );
            if item.is_low_stock() {
                warn!(
                    item_id = %id,
                    quantity = item.quantity,
                    reorder_level = item.reorder_level,
                    "Stock at or below reorder level"
                );
            }
            Ok(Json(AdjustResponse { item, movement }))
        }
        AdjustOutcome::InsufficientStock {
            available,
            requested,
        } => Err(ApiError::Conflict(format!(
            "Insufficient stock: {} available, {} requested",
            available,
            requested.unsigned_abs()
        ))),
        AdjustOutcome::QuantityOverflow { available } => Err(ApiError::BadRequest(format!(
            "Quantity would exceed {}: {} in stock",
            i32::MAX,
            available
        ))),
        AdjustOutcome::NotFound => Err(item_not_found()),
    }
}

pub async fn list_movements(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<StockMovement>>> {
    page.validate()?;
    let (limit, _) = page.resolve();

    if InventoryItem::find_by_id(&state.db, id).await?.is_none() {
        return Err(item_not_found());
    }

    let movements = InventoryItem::movements(&state.db, id, limit).await?;
    Ok(Json(movements))
}

pub async fn summary(State(state): State<AppState>) -> ApiResult<Json<InventorySummary>> {
    Ok(Json(InventoryItem::summary(&state.db).await?))
}
