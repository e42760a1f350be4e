/// Recipe sharing endpoints
///
/// # Endpoints
///
/// - `GET    /v1/recipes` - Search (`q`, `category`, `ingredient`, `author_id`,
///   `max_total_minutes`, `limit`, `offset`)
/// - `GET    /v1/recipes/:id` - Recipe with average rating
/// - `GET    /v1/recipes/:id/ratings` - Ratings, newest first
/// - `POST   /v1/recipes` - Create recipe as the caller (JWT)
/// - `PATCH  /v1/recipes/:id` - Update own recipe (JWT)
/// - `DELETE /v1/recipes/:id` - Delete own recipe (JWT)
/// - `PUT    /v1/recipes/:id/rating` - Rate someone else's recipe (JWT)

use super::{non_blank, nullable, Pagination};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use hearth_shared::{
    auth::middleware::AuthContext,
    models::recipe::{
        CreateRecipe, RateOutcome, Rating, Recipe, RecipeDetail, RecipeSearch, UpdateRecipe,
    },
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_ingredients(ingredients: &[String]) -> Result<(), ValidationError> {
    if ingredients.iter().any(|i| i.trim().is_empty()) {
        let mut err = ValidationError::new("blank_ingredient");
        err.message = Some("Ingredients must not be blank".into());
        return Err(err);
    }
    Ok(())
}

fn clean_ingredients(ingredients: Vec<String>) -> Vec<String> {
    ingredients.into_iter().map(|i| i.trim().to_string()).collect()
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecipeRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    #[validate(
        length(min = 1, message = "At least one ingredient is required"),
        custom(function = "validate_ingredients")
    )]
    pub ingredients: Vec<String>,

    #[validate(length(min = 1, message = "Instructions are required"))]
    pub instructions: String,

    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0, max = 10000, message = "Prep time must be 0-10000 minutes"))]
    pub prep_minutes: i32,

    #[serde(default)]
    #[validate(range(min = 0, max = 10000, message = "Cook time must be 0-10000 minutes"))]
    pub cook_minutes: i32,

    #[serde(default = "default_servings")]
    #[validate(range(min = 1, message = "Servings must be at least 1"))]
    pub servings: i32,
}

fn default_servings() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRecipeRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    #[validate(
        length(min = 1, message = "At least one ingredient is required"),
        custom(function = "validate_ingredients")
    )]
    pub ingredients: Option<Vec<String>>,

    #[validate(length(min = 1, message = "Instructions must not be empty"))]
    pub instructions: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<String>>,

    #[validate(range(min = 0, max = 10000, message = "Prep time must be 0-10000 minutes"))]
    pub prep_minutes: Option<i32>,

    #[validate(range(min = 0, max = 10000, message = "Cook time must be 0-10000 minutes"))]
    pub cook_minutes: Option<i32>,

    #[validate(range(min = 1, message = "Servings must be at least 1"))]
    pub servings: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub ingredient: Option<String>,
    pub author_id: Option<Uuid>,

    #[validate(range(min = 0, message = "max_total_minutes must not be negative"))]
    pub max_total_minutes: Option<i32>,

    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i64>,

    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RateRequest {
    #[validate(range(min = 1, max = 5, message = "Score must be between 1 and 5"))]
    pub score: i16,

    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: Option<String>,
}

fn recipe_not_found() -> ApiError {
    ApiError::NotFound("Recipe not found".to_string())
}

/// Loads the recipe and checks the caller wrote it
async fn authored_recipe(state: &AppState, id: Uuid, auth: AuthContext) -> ApiResult<Recipe> {
    let recipe = Recipe::find_by_id(&state.db, id)
        .await?
        .ok_or_else(recipe_not_found)?;

    if !auth.owns(recipe.author_id) {
        return Err(ApiError::Forbidden(
            "Only the author can change this recipe".to_string(),
        ));
    }

    Ok(recipe)
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<RecipeDetail>>> {
    query.validate()?;
    let (limit, offset) = Pagination {
        limit: query.limit,
        offset: query.offset,
    }
    .resolve();

    let recipes = Recipe::search(
        &state.db,
        &RecipeSearch {
            q: non_blank(query.q),
            category: non_blank(query.category),
            ingredient: non_blank(query.ingredient),
            author_id: query.author_id,
            max_total_minutes: query.max_total_minutes,
            limit,
            offset,
        },
    )
    .await?;

    Ok(Json(recipes))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RecipeDetail>> {
    let detail = Recipe::find_detail(&state.db, id)
        .await?
        .ok_or_else(recipe_not_found)?;

    Ok(Json(detail))
}

pub async fn list_ratings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Rating>>> {
    if Recipe::find_by_id(&state.db, id).await?.is_none() {
        return Err(recipe_not_found());
    }

    Ok(Json(Recipe::ratings(&state.db, id).await?))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateRecipeRequest>,
) -> ApiResult<(StatusCode, Json<Recipe>)> {
    req.validate()?;

    let recipe = Recipe::create(
        &state.db,
        CreateRecipe {
            author_id: auth.user_id,
            title: req.title,
            description: req.description,
            ingredients: clean_ingredients(req.ingredients),
            instructions: req.instructions,
            category: non_blank(req.category),
            prep_minutes: req.prep_minutes,
            cook_minutes: req.cook_minutes,
            servings: req.servings,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(recipe)))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRecipeRequest>,
) -> ApiResult<Json<Recipe>> {
    req.validate()?;
    authored_recipe(&state, id, auth).await?;

    let recipe = Recipe::update(
        &state.db,
        id,
        UpdateRecipe {
            title: req.title,
            description: req.description,
            ingredients: req.ingredients.map(clean_ingredients),
            instructions: req.instructions,
            category: req.category.map(non_blank),
            prep_minutes: req.prep_minutes,
            cook_minutes: req.cook_minutes,
            servings: req.servings,
        },
    )
    .await?
    .ok_or_else(recipe_not_found)?;

    Ok(Json(recipe))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    authored_recipe(&state, id, auth).await?;

    if !Recipe::delete(&state.db, id).await? {
        return Err(recipe_not_found());
    }

    info!(recipe_id = %id, author_id = %auth.user_id, "Recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Creates or replaces the caller's rating
///
/// # Errors
///
/// - `400 Bad Request`: Rating your own recipe
/// - `404 Not Found`: Unknown recipe
pub async fn rate_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<RateRequest>,
) -> ApiResult<Json<Rating>> {
    req.validate()?;

    match Recipe::rate(&state.db, id, auth.user_id, req.score, non_blank(req.comment)).await? {
        RateOutcome::Rated(rating) => Ok(Json(rating)),
        RateOutcome::RecipeNotFound => Err(recipe_not_found()),
        RateOutcome::OwnRecipe => Err(ApiError::BadRequest(
            "You cannot rate your own recipe".to_string(),
        )),
    }
}
