/// Logged cat activities
///
/// Every write locks the cat row, changes `cat_activities` and calls
/// [`conspiracy::recompute`] for each touched date before committing, so
/// writes for one cat are serialized and the daily rows always match.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE cat_activities (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     cat_id UUID NOT NULL REFERENCES cats(id) ON DELETE CASCADE,
///     behavior_type_id UUID NOT NULL REFERENCES behavior_types(id) ON DELETE RESTRICT,
///     occurred_at TIMESTAMPTZ NOT NULL,
///     activity_date DATE NOT NULL,
///     notes TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use super::conspiracy::{self, DailyConspiracy};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub cat_id: Uuid,
    pub behavior_type_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    /// UTC calendar date of `occurred_at`
    pub activity_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Activity joined with its behavior
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub activity: Activity,
    pub behavior_name: String,
    pub conspiracy_score: i32,
}

#[derive(Debug, Clone)]
pub struct CreateActivity {
    pub behavior_type_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateActivity {
    pub behavior_type_id: Option<Uuid>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone)]
pub enum ActivityOutcome {
    Saved {
        activity: Activity,
        /// Daily rows after recompute, one per touched date
        daily: Vec<DailyConspiracy>,
    },
    CatNotFound,
    BehaviorNotFound,
    NotFound,
}

#[derive(Debug, Clone)]
pub enum DeleteActivityOutcome {
    /// `daily` is `None` when the day has no activities left
    Deleted { daily: Option<DailyConspiracy> },
    NotFound,
}

/// Date key an activity is aggregated under
pub fn activity_date(occurred_at: DateTime<Utc>) -> NaiveDate {
    occurred_at.date_naive()
}

const COLUMNS: &str = "id, cat_id, behavior_type_id, occurred_at, activity_date, notes, created_at";

async fn lock_cat(conn: &mut PgConnection, cat_id: Uuid) -> Result<bool, sqlx::Error> {
    let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM cats WHERE id = $1 FOR UPDATE")
        .bind(cat_id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

async fn behavior_exists(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM behavior_types WHERE id = $1)")
        .bind(id)
        .fetch_one(conn)
        .await
}

async fn recompute_dates(
    conn: &mut PgConnection,
    cat_id: Uuid,
    dates: &[NaiveDate],
) -> Result<Vec<DailyConspiracy>, sqlx::Error> {
    let mut daily = Vec::with_capacity(dates.len());
    for date in dates {
        if let Some(row) = conspiracy::recompute(conn, cat_id, *date).await? {
            daily.push(row);
        }
    }
    Ok(daily)
}

impl Activity {
    pub async fn create(
        pool: &PgPool,
        cat_id: Uuid,
        data: CreateActivity,
    ) -> Result<ActivityOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !lock_cat(&mut tx, cat_id).await? {
            return Ok(ActivityOutcome::CatNotFound);
        }
        if !behavior_exists(&mut tx, data.behavior_type_id).await? {
            return Ok(ActivityOutcome::BehaviorNotFound);
        }

        let date = activity_date(data.occurred_at);
        let activity = sqlx::query_as::<_, Activity>(&format!(
            r#"
            INSERT INTO cat_activities (cat_id, behavior_type_id, occurred_at, activity_date, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(cat_id)
        .bind(data.behavior_type_id)
        .bind(data.occurred_at)
        .bind(date)
        .bind(data.notes)
        .fetch_one(&mut *tx)
        .await?;

        let daily = recompute_dates(&mut tx, cat_id, &[date]).await?;
        tx.commit().await?;

        info!(activity_id = %activity.id, cat_id = %cat_id, %date, "Activity logged");
        Ok(ActivityOutcome::Saved { activity, daily })
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Activity>(&format!(
            "SELECT {} FROM cat_activities WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Changes behavior, time or notes. Recomputes the old date and, when
    /// the activity moved, the new one.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateActivity,
    ) -> Result<ActivityOutcome, sqlx::Error> {
        let Some(existing) = Self::find_by_id(pool, id).await? else {
            return Ok(ActivityOutcome::NotFound);
        };

        let mut tx = pool.begin().await?;

        if !lock_cat(&mut tx, existing.cat_id).await? {
            return Ok(ActivityOutcome::NotFound);
        }
        if let Some(behavior_type_id) = data.behavior_type_id {
            if !behavior_exists(&mut tx, behavior_type_id).await? {
                return Ok(ActivityOutcome::BehaviorNotFound);
            }
        }

        // Re-read under the cat lock; a concurrent update may have moved it.
        let Some(current) = sqlx::query_as::<_, Activity>(&format!(
            "SELECT {} FROM cat_activities WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(ActivityOutcome::NotFound);
        };

        let behavior_type_id = data.behavior_type_id.unwrap_or(current.behavior_type_id);
        let occurred_at = data.occurred_at.unwrap_or(current.occurred_at);
        let notes = data.notes.unwrap_or(current.notes);
        let new_date = activity_date(occurred_at);

        let activity = sqlx::query_as::<_, Activity>(&format!(
            r#"
            UPDATE cat_activities
            SET behavior_type_id = $2, occurred_at = $3, activity_date = $4, notes = $5
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(behavior_type_id)
        .bind(occurred_at)
        .bind(new_date)
        .bind(notes)
        .fetch_one(&mut *tx)
        .await?;

        let mut dates = vec![current.activity_date];
        if new_date != current.activity_date {
            dates.push(new_date);
        }
        let daily = recompute_dates(&mut tx, current.cat_id, &dates).await?;
        tx.commit().await?;

        Ok(ActivityOutcome::Saved { activity, daily })
    }

    /// Deletes the activity and recomputes its date.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<DeleteActivityOutcome, sqlx::Error> {
        let Some(existing) = Self::find_by_id(pool, id).await? else {
            return Ok(DeleteActivityOutcome::NotFound);
        };

        let mut tx = pool.begin().await?;

        if !lock_cat(&mut tx, existing.cat_id).await? {
            return Ok(DeleteActivityOutcome::NotFound);
        }

        let removed: Option<NaiveDate> = sqlx::query_scalar(
            "DELETE FROM cat_activities WHERE id = $1 RETURNING activity_date",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(date) = removed else {
            return Ok(DeleteActivityOutcome::NotFound);
        };

        let daily = conspiracy::recompute(&mut tx, existing.cat_id, date).await?;
        tx.commit().await?;

        info!(activity_id = %id, cat_id = %existing.cat_id, %date, "Activity deleted");
        Ok(DeleteActivityOutcome::Deleted { daily })
    }

    /// A cat's activities, newest first, optionally for one date
    pub async fn list_for_cat(
        pool: &PgPool,
        cat_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<ActivityView>, sqlx::Error> {
        sqlx::query_as::<_, ActivityView>(
            r#"
            SELECT a.id, a.cat_id, a.behavior_type_id, a.occurred_at, a.activity_date,
                   a.notes, a.created_at,
                   b.name AS behavior_name, b.conspiracy_score
            FROM cat_activities a
            JOIN behavior_types b ON b.id = a.behavior_type_id
            WHERE a.cat_id = $1 AND ($2::DATE IS NULL OR a.activity_date = $2)
            ORDER BY a.occurred_at DESC, a.id
            "#,
        )
        .bind(cat_id)
        .bind(date)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_activity_date_uses_utc() {
        let late = Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 59).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();

        assert_eq!(activity_date(late), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(activity_date(early), NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
    }

    #[test]
    fn test_offset_timestamps_land_on_utc_day() {
        let local = DateTime::parse_from_rfc3339("2024-05-01T22:30:00-05:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(activity_date(local), NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
    }
}
