/// Class bookings with capacity and waitlist handling
///
/// Both [`Booking::book`] and [`Booking::cancel`] lock the class row before
/// touching its bookings, so the confirmed count can never exceed capacity
/// and a freed seat goes to exactly one waitlisted booking.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE booking_status AS ENUM ('confirmed', 'waitlisted', 'cancelled');
///
/// CREATE TABLE bookings (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     class_id UUID NOT NULL REFERENCES gym_classes(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     status booking_status NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE UNIQUE INDEX bookings_active_class_user_key
///     ON bookings (class_id, user_id) WHERE status <> 'cancelled';
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use super::gym_class::{decide_placement, Placement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Waitlisted,
    Cancelled,
}

impl BookingStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl From<Placement> for Option<BookingStatus> {
    fn from(placement: Placement) -> Self {
        match placement {
            Placement::Confirmed => Some(BookingStatus::Confirmed),
            Placement::Waitlisted => Some(BookingStatus::Waitlisted),
            Placement::Full => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub class_id: Uuid,
    pub user_id: Uuid,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum BookOutcome {
    Booked(Booking),
    ClassNotFound,
    ClassStarted,
    AlreadyBooked,
    Full,
}

#[derive(Debug, Clone)]
pub enum CancelOutcome {
    Cancelled {
        booking: Booking,
        /// Waitlisted booking that took the freed seat
        promoted: Option<Booking>,
    },
    NotFound,
    NotOwner,
    AlreadyCancelled,
}

const COLUMNS: &str = "id, class_id, user_id, status, created_at, updated_at";

/// Locks the class row. Returns its start time, capacity and waitlist flag.
async fn lock_class(
    conn: &mut PgConnection,
    class_id: Uuid,
) -> Result<Option<(DateTime<Utc>, i32, bool)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT starts_at, capacity, waitlist_enabled FROM gym_classes WHERE id = $1 FOR UPDATE",
    )
    .bind(class_id)
    .fetch_optional(conn)
    .await
}

impl Booking {
    /// Books `user_id` into a class.
    pub async fn book(
        pool: &PgPool,
        class_id: Uuid,
        user_id: Uuid,
    ) -> Result<BookOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some((starts_at, capacity, waitlist_enabled)) = lock_class(&mut tx, class_id).await?
        else {
            return Ok(BookOutcome::ClassNotFound);
        };

        if starts_at <= Utc::now() {
            return Ok(BookOutcome::ClassStarted);
        }

        let already: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE class_id = $1 AND user_id = $2 AND status <> 'cancelled'
            )
            "#,
        )
        .bind(class_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if already {
            return Ok(BookOutcome::AlreadyBooked);
        }

        let confirmed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE class_id = $1 AND status = 'confirmed'",
        )
        .bind(class_id)
        .fetch_one(&mut *tx)
        .await?;

        let placement = decide_placement(capacity, confirmed, waitlist_enabled);
        let Some(status) = Option::<BookingStatus>::from(placement) else {
            return Ok(BookOutcome::Full);
        };

        let booking = sqlx::query_as::<_, Booking>(&format!(
            "INSERT INTO bookings (class_id, user_id, status) VALUES ($1, $2, $3) RETURNING {}",
            COLUMNS
        ))
        .bind(class_id)
        .bind(user_id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(booking_id = %booking.id, class_id = %class_id, status = ?status, "Class booked");
        Ok(BookOutcome::Booked(booking))
    }

    /// Cancels the caller's booking and promotes the oldest waitlisted
    /// booking if a confirmed seat was freed.
    pub async fn cancel(
        pool: &PgPool,
        booking_id: Uuid,
        user_id: Uuid,
    ) -> Result<CancelOutcome, sqlx::Error> {
        let Some(existing) = Self::find_by_id(pool, booking_id).await? else {
            return Ok(CancelOutcome::NotFound);
        };
        if existing.user_id != user_id {
            return Ok(CancelOutcome::NotOwner);
        }

        let mut tx = pool.begin().await?;

        // Class first, then booking: the same order `book` uses.
        if lock_class(&mut tx, existing.class_id).await?.is_none() {
            return Ok(CancelOutcome::NotFound);
        }

        let current: Option<BookingStatus> =
            sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1 FOR UPDATE")
                .bind(booking_id)
                .fetch_optional(&mut *tx)
                .await?;

        let previous = match current {
            None => return Ok(CancelOutcome::NotFound),
            Some(status) if !status.is_active() => return Ok(CancelOutcome::AlreadyCancelled),
            Some(status) => status,
        };

        let booking = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET status = 'cancelled', updated_at = NOW() WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(booking_id)
        .fetch_one(&mut *tx)
        .await?;

        let promoted = if previous == BookingStatus::Confirmed {
            sqlx::query_as::<_, Booking>(&format!(
                r#"
                UPDATE bookings SET status = 'confirmed', updated_at = NOW()
                WHERE id = (
                    SELECT id FROM bookings
                    WHERE class_id = $1 AND status = 'waitlisted'
                    ORDER BY created_at, id
                    LIMIT 1
                )
                RETURNING {}
                "#,
                COLUMNS
            ))
            .bind(booking.class_id)
            .fetch_optional(&mut *tx)
            .await?
        } else {
            None
        };

        tx.commit().await?;

        if let Some(promoted) = &promoted {
            info!(booking_id = %promoted.id, class_id = %promoted.class_id, "Promoted from waitlist");
        }

        Ok(CancelOutcome::Cancelled { booking, promoted })
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(&format!("SELECT {} FROM bookings WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All of a user's bookings, newest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC, id",
            COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Active bookings for a class: confirmed first, then the waitlist, each
    /// in booking order.
    pub async fn roster(pool: &PgPool, class_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {} FROM bookings
            WHERE class_id = $1 AND status <> 'cancelled'
            ORDER BY status, created_at, id
            "#,
            COLUMNS
        ))
        .bind(class_id)
        .fetch_all(pool)
        .await
    }
}
