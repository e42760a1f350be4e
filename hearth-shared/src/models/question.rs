/// Question bank
///
/// A question is a prompt with 2 to 6 answer options and the index of the
/// correct one. Questions are reusable across quizzes via `quiz_questions`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE question_difficulty AS ENUM ('easy', 'medium', 'hard');
///
/// CREATE TABLE questions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     prompt TEXT NOT NULL,
///     options TEXT[] NOT NULL,
///     correct_option INTEGER NOT NULL,
///     category VARCHAR(100),
///     difficulty question_difficulty NOT NULL DEFAULT 'medium',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashSet;
use uuid::Uuid;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "question_difficulty", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub id: Uuid,
    pub prompt: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`
    pub correct_option: i32,
    pub category: Option<String>,
    pub difficulty: Difficulty,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn is_correct(&self, selected_option: i32) -> bool {
        self.correct_option == selected_option
    }
}

#[derive(Debug, Clone)]
pub struct CreateQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: i32,
    pub category: Option<String>,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateQuestion {
    pub prompt: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_option: Option<i32>,
    pub category: Option<Option<String>>,
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub limit: i64,
    pub offset: i64,
}

/// Checks an option list together with the index of the correct answer.
///
/// Options must number between [`MIN_OPTIONS`] and [`MAX_OPTIONS`], be
/// non-blank and distinct (ignoring case and surrounding whitespace).
pub fn validate_options(options: &[String], correct_option: i32) -> Result<(), String> {
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        return Err(format!(
            "A question needs between {} and {} options",
            MIN_OPTIONS, MAX_OPTIONS
        ));
    }

    let mut seen = HashSet::new();
    for option in options {
        let normalized = option.trim().to_lowercase();
        if normalized.is_empty() {
            return Err("Options must not be blank".to_string());
        }
        if !seen.insert(normalized) {
            return Err(format!("Duplicate option: {}", option.trim()));
        }
    }

    match usize::try_from(correct_option) {
        Ok(index) if index < options.len() => Ok(()),
        _ => Err(format!(
            "correct_option must be between 0 and {}",
            options.len() - 1
        )),
    }
}

const COLUMNS: &str =
    "id, prompt, options, correct_option, category, difficulty, created_at, updated_at";

impl Question {
    pub async fn create(pool: &PgPool, data: CreateQuestion) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Question>(&format!(
            r#"
            INSERT INTO questions (prompt, options, correct_option, category, difficulty)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(data.prompt)
        .bind(data.options)
        .bind(data.correct_option)
        .bind(data.category)
        .bind(data.difficulty)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Question>(&format!("SELECT {} FROM questions WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Newest first
    pub async fn list(pool: &PgPool, filter: &QuestionFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM questions WHERE TRUE", COLUMNS));

        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(difficulty) = filter.difficulty {
            qb.push(" AND difficulty = ").push_bind(difficulty);
        }

        qb.push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        qb.build_query_as::<Question>().fetch_all(pool).await
    }

    /// Applies a partial update. The caller is responsible for validating
    /// the merged options/correct_option pair first.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateQuestion,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE questions SET updated_at = NOW()");

        if let Some(prompt) = data.prompt {
            qb.push(", prompt = ").push_bind(prompt);
        }
        if let Some(options) = data.options {
            qb.push(", options = ").push_bind(options);
        }
        if let Some(correct) = data.correct_option {
            qb.push(", correct_option = ").push_bind(correct);
        }
        if let Some(category) = data.category {
            qb.push(", category = ").push_bind(category);
        }
        if let Some(difficulty) = data.difficulty {
            qb.push(", difficulty = ").push_bind(difficulty);
        }

        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(COLUMNS);

        qb.build_query_as::<Question>().fetch_optional(pool).await
    }

    /// Deletes the question; it disappears from every quiz that used it.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Lock every quiz holding the question, in id order.
        sqlx::query(
            r#"
            SELECT id FROM quizzes
            WHERE id IN (SELECT quiz_id FROM quiz_questions WHERE question_id = $1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        // Close the gap the question leaves in each quiz it belonged to.
        sqlx::query(
            r#"
            UPDATE quiz_questions q
            SET position = q.position - 1
            FROM quiz_questions removed
            WHERE removed.question_id = $1
              AND q.quiz_id = removed.quiz_id
              AND q.position > removed.position
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_valid_options() {
        assert!(validate_options(&opts(&["Paris", "Rome"]), 0).is_ok());
        assert!(validate_options(&opts(&["a", "b", "c", "d", "e", "f"]), 5).is_ok());
    }

    #[test]
    fn test_option_count_bounds() {
        assert!(validate_options(&opts(&["only"]), 0).is_err());
        assert!(validate_options(&opts(&["a", "b", "c", "d", "e", "f", "g"]), 0).is_err());
    }

    #[test]
    fn test_correct_option_out_of_range() {
        let options = opts(&["yes", "no"]);
        assert!(validate_options(&options, 2).is_err());
        assert!(validate_options(&options, -1).is_err());
    }

    #[test]
    fn test_blank_and_duplicate_options() {
        assert!(validate_options(&opts(&["yes", "  "]), 0).is_err());

        let err = validate_options(&opts(&["Yes", " yes "]), 0).unwrap_err();
        assert!(err.contains("Duplicate"));
    }

    #[test]
    fn test_difficulty_serde() {
        assert_eq!(serde_json::to_string(&Difficulty::Hard).unwrap(), "\"hard\"");
        assert_eq!(Difficulty::default(), Difficulty::Medium);
    }
}
