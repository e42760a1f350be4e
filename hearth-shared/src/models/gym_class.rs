/// Gym classes
///
/// A class has a fixed capacity. Whether a new booking is confirmed,
/// waitlisted or refused is decided by [`decide_placement`]; the booking
/// model applies it under a lock on the class row.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE gym_classes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     instructor VARCHAR(255) NOT NULL,
///     starts_at TIMESTAMPTZ NOT NULL,
///     duration_minutes INTEGER NOT NULL CHECK (duration_minutes BETWEEN 1 AND 480),
///     capacity INTEGER NOT NULL CHECK (capacity >= 1),
///     waitlist_enabled BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GymClass {
    pub id: Uuid,
    pub name: String,
    pub instructor: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub capacity: i32,
    pub waitlist_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl GymClass {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now
    }
}

/// Class plus live booking counts
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GymClassDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub class: GymClass,
    pub confirmed_count: i64,
    pub waitlisted_count: i64,
}

impl GymClassDetail {
    pub fn spots_left(&self) -> i64 {
        (i64::from(self.class.capacity) - self.confirmed_count).max(0)
    }
}

#[derive(Debug, Clone)]
pub struct CreateGymClass {
    pub name: String,
    pub instructor: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub capacity: i32,
    pub waitlist_enabled: bool,
}

/// Where a new booking lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Confirmed,
    Waitlisted,
    Full,
}

/// Confirmed while seats remain, then waitlisted if the class allows it.
pub fn decide_placement(capacity: i32, confirmed: i64, waitlist_enabled: bool) -> Placement {
    if confirmed < i64::from(capacity) {
        Placement::Confirmed
    } else if waitlist_enabled {
        Placement::Waitlisted
    } else {
        Placement::Full
    }
}

const COLUMNS: &str =
    "id, name, instructor, starts_at, duration_minutes, capacity, waitlist_enabled, created_at";

const DETAIL_SELECT: &str = r#"
    SELECT c.id, c.name, c.instructor, c.starts_at, c.duration_minutes, c.capacity,
           c.waitlist_enabled, c.created_at,
           COUNT(b.id) FILTER (WHERE b.status = 'confirmed') AS confirmed_count,
           COUNT(b.id) FILTER (WHERE b.status = 'waitlisted') AS waitlisted_count
    FROM gym_classes c
    LEFT JOIN bookings b ON b.class_id = c.id
"#;

impl GymClass {
    pub async fn create(pool: &PgPool, data: CreateGymClass) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, GymClass>(&format!(
            r#"
            INSERT INTO gym_classes
                (name, instructor, starts_at, duration_minutes, capacity, waitlist_enabled)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(data.name)
        .bind(data.instructor)
        .bind(data.starts_at)
        .bind(data.duration_minutes)
        .bind(data.capacity)
        .bind(data.waitlist_enabled)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, GymClass>(&format!("SELECT {} FROM gym_classes WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_detail(pool: &PgPool, id: Uuid) -> Result<Option<GymClassDetail>, sqlx::Error> {
        sqlx::query_as::<_, GymClassDetail>(&format!(
            "{} WHERE c.id = $1 GROUP BY c.id",
            DETAIL_SELECT
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Classes in start order. Past classes are skipped unless asked for.
    pub async fn list(
        pool: &PgPool,
        include_past: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<GymClassDetail>, sqlx::Error> {
        sqlx::query_as::<_, GymClassDetail>(&format!(
            r#"{}
            WHERE $1 OR c.starts_at > NOW()
            GROUP BY c.id
            ORDER BY c.starts_at, c.id
            LIMIT $2 OFFSET $3
            "#,
            DETAIL_SELECT
        ))
        .bind(include_past)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Deletes the class and all of its bookings
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM gym_classes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
