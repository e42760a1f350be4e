/// Recipes and ratings
///
/// # Schema
///
/// ```sql
/// CREATE TABLE recipes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     ingredients TEXT[] NOT NULL CHECK (cardinality(ingredients) >= 1),
///     instructions TEXT NOT NULL,
///     category VARCHAR(100),
///     prep_minutes INTEGER NOT NULL DEFAULT 0,
///     cook_minutes INTEGER NOT NULL DEFAULT 0,
///     servings INTEGER NOT NULL DEFAULT 1,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE recipe_ratings (
///     recipe_id UUID NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     score SMALLINT NOT NULL CHECK (score BETWEEN 1 AND 5),
///     comment TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (recipe_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub category: Option<String>,
    pub prep_minutes: i32,
    pub cook_minutes: i32,
    pub servings: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Recipe plus its rating aggregate
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub recipe: Recipe,
    /// `None` until someone rates it
    pub average_rating: Option<f64>,
    pub rating_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    pub score: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateRecipe {
    pub author_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub category: Option<String>,
    pub prep_minutes: i32,
    pub cook_minutes: i32,
    pub servings: i32,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRecipe {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<String>,
    pub category: Option<Option<String>>,
    pub prep_minutes: Option<i32>,
    pub cook_minutes: Option<i32>,
    pub servings: Option<i32>,
}

/// Search filters. All set filters must match.
#[derive(Debug, Clone, Default)]
pub struct RecipeSearch {
    /// Substring of title or description, case-insensitive
    pub q: Option<String>,
    pub category: Option<String>,
    /// Substring of any ingredient, case-insensitive
    pub ingredient: Option<String>,
    pub author_id: Option<Uuid>,
    /// Upper bound on prep + cook time
    pub max_total_minutes: Option<i32>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub enum RateOutcome {
    Rated(Rating),
    RecipeNotFound,
    OwnRecipe,
}

/// Escapes LIKE wildcards and wraps the term in `%`.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl RecipeSearch {
    fn build(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("{} WHERE TRUE", DETAIL_SELECT));

        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = like_pattern(q);
            qb.push(" AND (r.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR r.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category) = &self.category {
            qb.push(" AND r.category = ").push_bind(category.clone());
        }
        if let Some(ingredient) = self
            .ingredient
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty())
        {
            qb.push(" AND EXISTS (SELECT 1 FROM unnest(r.ingredients) AS i WHERE i ILIKE ")
                .push_bind(like_pattern(ingredient))
                .push(")");
        }
        if let Some(author_id) = self.author_id {
            qb.push(" AND r.author_id = ").push_bind(author_id);
        }
        if let Some(max) = self.max_total_minutes {
            qb.push(" AND r.prep_minutes::BIGINT + r.cook_minutes <= ")
                .push_bind(max);
        }

        qb.push(" GROUP BY r.id ORDER BY r.created_at DESC, r.id LIMIT ")
            .push_bind(self.limit)
            .push(" OFFSET ")
            .push_bind(self.offset);

        qb
    }
}

const COLUMNS: &str = "id, author_id, title, description, ingredients, instructions, category, \
                       prep_minutes, cook_minutes, servings, created_at, updated_at";

const RATING_COLUMNS: &str = "recipe_id, user_id, score, comment, created_at, updated_at";

const DETAIL_SELECT: &str = r#"
    SELECT r.id, r.author_id, r.title, r.description, r.ingredients, r.instructions,
           r.category, r.prep_minutes, r.cook_minutes, r.servings, r.created_at, r.updated_at,
           AVG(rr.score)::FLOAT8 AS average_rating,
           COUNT(rr.user_id) AS rating_count
    FROM recipes r
    LEFT JOIN recipe_ratings rr ON rr.recipe_id = r.id
"#;

impl Recipe {
    pub async fn create(pool: &PgPool, data: CreateRecipe) -> Result<Self, sqlx::Error> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            INSERT INTO recipes (author_id, title, description, ingredients, instructions,
                                 category, prep_minutes, cook_minutes, servings)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(data.author_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.ingredients)
        .bind(data.instructions)
        .bind(data.category)
        .bind(data.prep_minutes)
        .bind(data.cook_minutes)
        .bind(data.servings)
        .fetch_one(pool)
        .await?;

        info!(recipe_id = %recipe.id, author_id = %recipe.author_id, "Recipe created");
        Ok(recipe)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Recipe>(&format!("SELECT {} FROM recipes WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_detail(pool: &PgPool, id: Uuid) -> Result<Option<RecipeDetail>, sqlx::Error> {
        sqlx::query_as::<_, RecipeDetail>(&format!(
            "{} WHERE r.id = $1 GROUP BY r.id",
            DETAIL_SELECT
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Newest first
    pub async fn search(
        pool: &PgPool,
        search: &RecipeSearch,
    ) -> Result<Vec<RecipeDetail>, sqlx::Error> {
        search
            .build()
            .build_query_as::<RecipeDetail>()
            .fetch_all(pool)
            .await
    }

    /// Applies a partial update. Ownership is checked by the caller.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateRecipe,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE recipes SET updated_at = NOW()");

        if let Some(title) = data.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(ingredients) = data.ingredients {
            qb.push(", ingredients = ").push_bind(ingredients);
        }
        if let Some(instructions) = data.instructions {
            qb.push(", instructions = ").push_bind(instructions);
        }
        if let Some(category) = data.category {
            qb.push(", category = ").push_bind(category);
        }
        if let Some(prep) = data.prep_minutes {
            qb.push(", prep_minutes = ").push_bind(prep);
        }
        if let Some(cook) = data.cook_minutes {
            qb.push(", cook_minutes = ").push_bind(cook);
        }
        if let Some(servings) = data.servings {
            qb.push(", servings = ").push_bind(servings);
        }

        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(COLUMNS);

        qb.build_query_as::<Recipe>().fetch_optional(pool).await
    }

    /// Deletes the recipe and its ratings
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Inserts or replaces `user_id`'s rating of a recipe.
    pub async fn rate(
        pool: &PgPool,
        recipe_id: Uuid,
        user_id: Uuid,
        score: i16,
        comment: Option<String>,
    ) -> Result<RateOutcome, sqlx::Error> {
        let author: Option<Uuid> = sqlx::query_scalar("SELECT author_id FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await?;

        match author {
            None => return Ok(RateOutcome::RecipeNotFound),
            Some(author) if author == user_id => return Ok(RateOutcome::OwnRecipe),
            Some(_) => {}
        }

        let rating = sqlx::query_as::<_, Rating>(&format!(
            r#"
            INSERT INTO recipe_ratings (recipe_id, user_id, score, comment)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (recipe_id, user_id)
            DO UPDATE SET score = EXCLUDED.score, comment = EXCLUDED.comment, updated_at = NOW()
            RETURNING {}
            "#,
            RATING_COLUMNS
        ))
        .bind(recipe_id)
        .bind(user_id)
        .bind(score)
        .bind(comment)
        .fetch_one(pool)
        .await?;

        Ok(RateOutcome::Rated(rating))
    }

    pub async fn ratings(pool: &PgPool, recipe_id: Uuid) -> Result<Vec<Rating>, sqlx::Error> {
        sqlx::query_as::<_, Rating>(&format!(
            "SELECT {} FROM recipe_ratings WHERE recipe_id = $1 ORDER BY updated_at DESC",
            RATING_COLUMNS
        ))
        .bind(recipe_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("egg"), "%egg%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }

    #[test]
    fn test_search_without_filters() {
        let search = RecipeSearch {
            limit: 20,
            ..Default::default()
        };
        let qb = search.build();
        let sql = qb.sql();

        assert!(!sql.contains("ILIKE"));
        assert!(sql.contains("ORDER BY r.created_at DESC"));
    }

    #[test]
    fn test_search_combines_filters() {
        let search = RecipeSearch {
            q: Some("soup".to_string()),
            category: Some("dinner".to_string()),
            ingredient: Some("leek".to_string()),
            author_id: Some(Uuid::new_v4()),
            max_total_minutes: Some(30),
            limit: 10,
            offset: 0,
        };
        let qb = search.build();
        let sql = qb.sql();

        assert!(sql.contains("r.title ILIKE $1 OR r.description ILIKE $2"));
        assert!(sql.contains("r.category = $3"));
        assert!(sql.contains("unnest(r.ingredients)"));
        assert!(sql.contains("r.author_id = $5"));
        assert!(sql.contains("r.prep_minutes::BIGINT + r.cook_minutes <= $6"));
        assert!(sql.contains("LIMIT $7 OFFSET $8"));
    }

    #[test]
    fn test_blank_query_is_ignored() {
        let search = RecipeSearch {
            q: Some("   ".to_string()),
            limit: 20,
            ..Default::default()
        };
        assert!(!search.build().sql().contains("ILIKE"));
    }
}
