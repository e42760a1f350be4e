/// Cats and the behaviors they can be caught at
///
/// # Schema
///
/// ```sql
/// CREATE TABLE cats (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     breed VARCHAR(100),
///     birth_date DATE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE behavior_types (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     description TEXT,
///     conspiracy_score INTEGER NOT NULL CHECK (conspiracy_score BETWEEN 1 AND 10),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT behavior_types_name_key UNIQUE (name)
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

pub const MIN_CONSPIRACY_SCORE: i32 = 1;
pub const MAX_CONSPIRACY_SCORE: i32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cat {
    pub id: Uuid,
    pub name: String,
    pub breed: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCat {
    pub name: String,
    pub breed: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BehaviorType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub conspiracy_score: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateBehaviorType {
    pub name: String,
    pub description: Option<String>,
    pub conspiracy_score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteBehaviorOutcome {
    Deleted,
    NotFound,
    /// Still referenced by this many activities
    InUse(i64),
}

const CAT_COLUMNS: &str = "id, name, breed, birth_date, created_at";
const BEHAVIOR_COLUMNS: &str = "id, name, description, conspiracy_score, created_at";

impl Cat {
    pub async fn create(pool: &PgPool, data: CreateCat) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Cat>(&format!(
            "INSERT INTO cats (name, breed, birth_date) VALUES ($1, $2, $3) RETURNING {}",
            CAT_COLUMNS
        ))
        .bind(data.name)
        .bind(data.breed)
        .bind(data.birth_date)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Cat>(&format!("SELECT {} FROM cats WHERE id = $1", CAT_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Cat>(&format!("SELECT {} FROM cats ORDER BY name, id", CAT_COLUMNS))
            .fetch_all(pool)
            .await
    }

    /// Deletes the cat along with its activities and daily rows
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cats WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl BehaviorType {
    pub async fn create(pool: &PgPool, data: CreateBehaviorType) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, BehaviorType>(&format!(
            r#"
            INSERT INTO behavior_types (name, description, conspiracy_score)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            BEHAVIOR_COLUMNS
        ))
        .bind(data.name)
        .bind(data.description)
        .bind(data.conspiracy_score)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BehaviorType>(&format!(
            "SELECT {} FROM behavior_types WHERE id = $1",
            BEHAVIOR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Most conspiratorial first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, BehaviorType>(&format!(
            "SELECT {} FROM behavior_types ORDER BY conspiracy_score DESC, name",
            BEHAVIOR_COLUMNS
        ))
        .fetch_all(pool)
        .await
    }

    /// Refuses to delete a behavior that activities still point at.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<DeleteBehaviorOutcome, sqlx::Error> {
        let in_use: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cat_activities WHERE behavior_type_id = $1")
                .bind(id)
                .fetch_one(pool)
                .await?;

        if in_use > 0 {
            return Ok(DeleteBehaviorOutcome::InUse(in_use));
        }

        // ON DELETE RESTRICT still backstops a concurrent insert; that
        // surfaces as a foreign key violation.
        let result = sqlx::query("DELETE FROM behavior_types WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() > 0 {
            Ok(DeleteBehaviorOutcome::Deleted)
        } else {
            Ok(DeleteBehaviorOutcome::NotFound)
        }
    }
}
