/// Inventory items and stock movements
///
/// Quantities change only through [`InventoryItem::adjust_stock`], which
/// locks the item row, refuses to go below zero and records a
/// [`StockMovement`] in the same transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE inventory_items (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     sku VARCHAR(64) NOT NULL UNIQUE,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     category VARCHAR(100),
///     quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
///     unit_price_cents BIGINT NOT NULL DEFAULT 0 CHECK (unit_price_cents >= 0),
///     reorder_level INTEGER NOT NULL DEFAULT 0 CHECK (reorder_level >= 0),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE stock_movements (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     item_id UUID NOT NULL REFERENCES inventory_items(id) ON DELETE CASCADE,
///     delta INTEGER NOT NULL CHECK (delta <> 0),
///     quantity_after INTEGER NOT NULL CHECK (quantity_after >= 0),
///     reason VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryItem {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub reorder_level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// At or below the reorder level
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StockMovement {
    pub id: Uuid,
    pub item_id: Uuid,
    pub delta: i32,
    pub quantity_after: i32,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateItem {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub reorder_level: i32,
}

/// Partial update. Quantity is deliberately absent: use `adjust_stock`.
#[derive(Debug, Clone, Default)]
pub struct UpdateItem {
    pub sku: Option<String>,
    pub name: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    /// `Some(None)` clears the category
    pub category: Option<Option<String>>,
    pub unit_price_cents: Option<i64>,
    pub reorder_level: Option<i32>,
}

impl UpdateItem {
    pub fn is_empty(&self) -> bool {
        self.sku.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.unit_price_cents.is_none()
            && self.reorder_level.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub category: Option<String>,
    /// Only items at or below their reorder level
    pub low_stock: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Result of a stock adjustment
#[derive(Debug, Clone)]
pub enum AdjustOutcome {
    Adjusted {
        item: InventoryItem,
        movement: StockMovement,
    },
    InsufficientStock {
        available: i32,
        requested: i32,
    },
    /// Quantity would exceed the column's range
    QuantityOverflow {
        available: i32,
    },
    NotFound,
}

/// Totals across the whole inventory
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct InventorySummary {
    pub item_count: i64,
    pub total_units: i64,
    pub total_value_cents: i64,
    pub low_stock_count: i64,
}

/// Why a delta cannot be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaError {
    Insufficient,
    Overflow,
}

/// New quantity after applying `delta`
pub fn apply_delta(quantity: i32, delta: i32) -> Result<i32, DeltaError> {
    match quantity.checked_add(delta) {
        None => Err(DeltaError::Overflow),
        Some(q) if q < 0 => Err(DeltaError::Insufficient),
        Some(q) => Ok(q),
    }
}

const COLUMNS: &str = "id, sku, name, description, category, quantity, unit_price_cents, \
                       reorder_level, created_at, updated_at";

impl InventoryItem {
    pub async fn create(pool: &PgPool, data: CreateItem) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            INSERT INTO inventory_items
                (sku, name, description, category, quantity, unit_price_cents, reorder_level)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(data.sku)
        .bind(data.name)
        .bind(data.description)
        .bind(data.category)
        .bind(data.quantity)
        .bind(data.unit_price_cents)
        .bind(data.reorder_level)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM inventory_items WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists items ordered by name
    pub async fn list(pool: &PgPool, filter: &ItemFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM inventory_items WHERE TRUE",
            COLUMNS
        ));

        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        if filter.low_stock {
            qb.push(" AND quantity <= reorder_level");
        }

        qb.push(" ORDER BY name, sku LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        qb.build_query_as::<InventoryItem>().fetch_all(pool).await
    }

    /// Applies the non-`None` fields of `data`.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateItem,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE inventory_items SET updated_at = NOW()");

        if let Some(sku) = data.sku {
            qb.push(", sku = ").push_bind(sku);
        }
        if let Some(name) = data.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(category) = data.category {
            qb.push(", category = ").push_bind(category);
        }
        if let Some(price) = data.unit_price_cents {
            qb.push(", unit_price_cents = ").push_bind(price);
        }
        if let Some(level) = data.reorder_level {
            qb.push(", reorder_level = ").push_bind(level);
        }

        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(COLUMNS);

        qb.build_query_as::<InventoryItem>()
            .fetch_optional(pool)
            .await
    }

    /// Deletes the item and its movement history
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Adds `delta` (positive or negative) to the item's quantity.
    ///
    /// The item row is locked for the duration of the transaction, so
    /// concurrent adjustments serialize and the non-negative check holds.
    pub async fn adjust_stock(
        pool: &PgPool,
        id: Uuid,
        delta: i32,
        reason: Option<String>,
    ) -> Result<AdjustOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current: Option<(i32,)> =
            sqlx::query_as("SELECT quantity FROM inventory_items WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((available,)) = current else {
            return Ok(AdjustOutcome::NotFound);
        };

        let new_quantity = match apply_delta(available, delta) {
            Ok(q) => q,
            Err(reason) => {
                debug!(item_id = %id, available, delta, ?reason, "Rejected stock adjustment");
                return Ok(match reason {
                    DeltaError::Insufficient => AdjustOutcome::InsufficientStock {
                        available,
                        requested: delta,
                    },
                    DeltaError::Overflow => AdjustOutcome::QuantityOverflow { available },
                });
            }
        };

        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "UPDATE inventory_items SET quantity = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id)
        .bind(new_quantity)
        .fetch_one(&mut *tx)
        .await?;

        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (item_id, delta, quantity_after, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING id, item_id, delta, quantity_after, reason, created_at
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(new_quantity)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AdjustOutcome::Adjusted { item, movement })
    }

    /// Movement history, newest first
    pub async fn movements(
        pool: &PgPool,
        item_id: Uuid,
        limit: i64,
    ) -> Result<Vec<StockMovement>, sqlx::Error> {
        sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, item_id, delta, quantity_after, reason, created_at
            FROM stock_movements
            WHERE item_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2
            "#,
        )
        .bind(item_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn summary(pool: &PgPool) -> Result<InventorySummary, sqlx::Error> {
        sqlx::query_as::<_, InventorySummary>(
            r#"
            SELECT
                COUNT(*) AS item_count,
                COALESCE(SUM(quantity), 0)::BIGINT AS total_units,
                COALESCE(SUM(quantity::BIGINT * unit_price_cents), 0)::BIGINT AS total_value_cents,
                COUNT(*) FILTER (WHERE quantity <= reorder_level) AS low_stock_count
            FROM inventory_items
            "#,
        )
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_delta() {
        assert_eq!(apply_delta(10, -3), Ok(7));
        assert_eq!(apply_delta(10, -10), Ok(0));
        assert_eq!(apply_delta(10, -11), Err(DeltaError::Insufficient));
        assert_eq!(apply_delta(0, 5), Ok(5));
        assert_eq!(apply_delta(i32::MAX, 1), Err(DeltaError::Overflow));
        assert_eq!(apply_delta(i32::MAX, -1), Ok(i32::MAX - 1));
    }

    #[test]
    fn test_low_stock_at_reorder_level() {
        let item = InventoryItem {
            id: Uuid::new_v4(),
            sku: "BOLT-M6".to_string(),
            name: "M6 bolt".to_string(),
            description: None,
            category: Some("hardware".to_string()),
            quantity: 5,
            unit_price_cents: 25,
            reorder_level: 5,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(item.is_low_stock());
        assert!(!InventoryItem { quantity: 6, ..item }.is_low_stock());
    }

    #[test]
    fn test_update_item_is_empty() {
        assert!(UpdateItem::default().is_empty());

        let update = UpdateItem {
            category: Some(None),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
