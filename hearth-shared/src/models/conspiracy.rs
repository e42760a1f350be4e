/// Daily conspiracy aggregate
///
/// One row per cat per day holding the summed conspiracy score and count
/// of that day's activities. Rows are derived data: [`recompute`] rebuilds
/// a row from `cat_activities` and is called by every activity write in
/// the same transaction. Days without activities have no row.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE daily_conspiracy (
///     cat_id UUID NOT NULL REFERENCES cats(id) ON DELETE CASCADE,
///     date DATE NOT NULL,
///     total_score INTEGER NOT NULL,
///     activity_count INTEGER NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (cat_id, date)
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConspiracyLevel {
    Innocent,
    Suspicious,
    Scheming,
    WorldDomination,
}

impl ConspiracyLevel {
    pub fn from_score(total_score: i32) -> Self {
        match total_score {
            i32::MIN..=0 => ConspiracyLevel::Innocent,
            1..=10 => ConspiracyLevel::Suspicious,
            11..=25 => ConspiracyLevel::Scheming,
            _ => ConspiracyLevel::WorldDomination,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConspiracyLevel::Innocent => "innocent",
            ConspiracyLevel::Suspicious => "suspicious",
            ConspiracyLevel::Scheming => "scheming",
            ConspiracyLevel::WorldDomination => "world_domination",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyConspiracy {
    pub cat_id: Uuid,
    pub date: NaiveDate,
    pub total_score: i32,
    pub activity_count: i32,
    pub updated_at: DateTime<Utc>,
}

impl DailyConspiracy {
    pub fn level(&self) -> ConspiracyLevel {
        ConspiracyLevel::from_score(self.total_score)
    }

    /// Rows for `cat_id` in `[from, to]`, oldest first
    pub async fn range(
        pool: &PgPool,
        cat_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DailyConspiracy>(
            r#"
            SELECT cat_id, date, total_score, activity_count, updated_at
            FROM daily_conspiracy
            WHERE cat_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date
            "#,
        )
        .bind(cat_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }
}

/// Rebuilds the (cat, date) row from the activities on that date.
///
/// Must run inside the transaction that changed the activities.
pub async fn recompute(
    conn: &mut PgConnection,
    cat_id: Uuid,
    date: NaiveDate,
) -> Result<Option<DailyConspiracy>, sqlx::Error> {
    let (total_score, activity_count): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(b.conspiracy_score), 0)::BIGINT, COUNT(a.id)
        FROM cat_activities a
        JOIN behavior_types b ON b.id = a.behavior_type_id
        WHERE a.cat_id = $1 AND a.activity_date = $2
        "#,
    )
    .bind(cat_id)
    .bind(date)
    .fetch_one(&mut *conn)
    .await?;

    if activity_count == 0 {
        sqlx::query("DELETE FROM daily_conspiracy WHERE cat_id = $1 AND date = $2")
            .bind(cat_id)
            .bind(date)
            .execute(&mut *conn)
            .await?;

        debug!(cat_id = %cat_id, %date, "Daily conspiracy cleared");
        return Ok(None);
    }

    let row = sqlx::query_as::<_, DailyConspiracy>(
        r#"
        INSERT INTO daily_conspiracy (cat_id, date, total_score, activity_count)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (cat_id, date)
        DO UPDATE SET total_score = EXCLUDED.total_score,
                      activity_count = EXCLUDED.activity_count,
                      updated_at = NOW()
        RETURNING cat_id, date, total_score, activity_count, updated_at
        "#,
    )
    .bind(cat_id)
    .bind(date)
    .bind(total_score as i32)
    .bind(activity_count as i32)
    .fetch_one(&mut *conn)
    .await?;

    debug!(
        cat_id = %cat_id,
        %date,
        total_score = row.total_score,
        activity_count = row.activity_count,
        level = row.level().as_str(),
        "Daily conspiracy recomputed"
    );
    Ok(Some(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(ConspiracyLevel::from_score(0), ConspiracyLevel::Innocent);
        assert_eq!(ConspiracyLevel::from_score(1), ConspiracyLevel::Suspicious);
        assert_eq!(ConspiracyLevel::from_score(10), ConspiracyLevel::Suspicious);
        assert_eq!(ConspiracyLevel::from_score(11), ConspiracyLevel::Scheming);
        assert_eq!(ConspiracyLevel::from_score(25), ConspiracyLevel::Scheming);
        assert_eq!(ConspiracyLevel::from_score(26), ConspiracyLevel::WorldDomination);
    }

    #[test]
    fn test_level_names_match_serde() {
        for level in [
            ConspiracyLevel::Innocent,
            ConspiracyLevel::Suspicious,
            ConspiracyLevel::Scheming,
            ConspiracyLevel::WorldDomination,
        ] {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", level.as_str()));
        }
    }
}
