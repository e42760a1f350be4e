/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use hearth_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = hearth_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{delete, get, patch, post, put},
    Router,
};
use hearth_shared::auth::middleware::authenticate;
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /health
/// /v1/auth          register, login, refresh, me (JWT)
/// /v1/inventory     items, stock adjustments, movements, summary
/// /v1/quiz          questions, quizzes, membership, ordering, grading
/// /v1/gym           classes, bookings (JWT for booking and cancelling)
/// /v1/recipes       search, recipes (JWT for writes), ratings (JWT)
/// /v1/cats          cats, behavior types, activities, conspiracy
/// ```
///
/// Middleware, outermost first: security headers, CORS, compression,
/// request tracing. The JWT layer is applied per route group.
pub fn build_router(state: AppState) -> Router {
    let jwt = || from_fn_with_state(state.clone(), jwt_auth_layer);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .merge(Router::new().route("/me", get(routes::auth::me)).layer(jwt()));

    let inventory_routes = Router::new()
        .route(
            "/items",
            post(routes::inventory::create_item).get(routes::inventory::list_items),
        )
        .route(
            "/items/:id",
            get(routes::inventory::get_item)
                .patch(routes::inventory::update_item)
                .delete(routes::inventory::delete_item),
        )
        .route("/items/:id/adjust", post(routes::inventory::adjust_stock))
        .route("/items/:id/movements", get(routes::inventory::list_movements))
        .route("/summary", get(routes::inventory::summary));

    let quiz_routes = Router::new()
        .route(
            "/questions",
            post(routes::quiz::create_question).get(routes::quiz::list_questions),
        )
        .route(
            "/questions/:id",
            get(routes::quiz::get_question)
                .patch(routes::quiz::update_question)
                .delete(routes::quiz::delete_question),
        )
        .route(
            "/quizzes",
            post(routes::quiz::create_quiz).get(routes::quiz::list_quizzes),
        )
        .route(
            "/quizzes/:id",
            get(routes::quiz::get_quiz)
                .patch(routes::quiz::update_quiz)
                .delete(routes::quiz::delete_quiz),
        )
        .route("/quizzes/:id/questions", post(routes::quiz::add_question))
        .route(
            "/quizzes/:id/questions/:question_id",
            delete(routes::quiz::remove_question),
        )
        .route("/quizzes/:id/order", put(routes::quiz::reorder))
        .route("/quizzes/:id/submit", post(routes::quiz::submit));

    let gym_routes = Router::new()
        .route(
            "/classes",
            post(routes::gym::create_class).get(routes::gym::list_classes),
        )
        .route(
            "/classes/:id",
            get(routes::gym::get_class).delete(routes::gym::delete_class),
        )
        .route("/classes/:id/bookings", get(routes::gym::class_roster))
        .merge(
            Router::new()
                .route("/classes/:id/book", post(routes::gym::book_class))
                .route("/bookings", get(routes::gym::my_bookings))
                .route("/bookings/:id/cancel", post(routes::gym::cancel_booking))
                .layer(jwt()),
        );

    let recipe_routes = Router::new()
        .route("/", get(routes::recipes::search))
        .route("/:id", get(routes::recipes::get_recipe))
        .route("/:id/ratings", get(routes::recipes::list_ratings))
        .merge(
            Router::new()
                .route("/", post(routes::recipes::create_recipe))
                .route(
                    "/:id",
                    patch(routes::recipes::update_recipe).delete(routes::recipes::delete_recipe),
                )
                .route("/:id/rating", put(routes::recipes::rate_recipe))
                .layer(jwt()),
        );

    let cat_routes = Router::new()
        .route("/", post(routes::cats::create_cat).get(routes::cats::list_cats))
        .route(
            "/behaviors",
            post(routes::cats::create_behavior).get(routes::cats::list_behaviors),
        )
        .route(
            "/behaviors/:id",
            delete(routes::cats::delete_behavior),
        )
        .route(
            "/activities/:id",
            patch(routes::cats::update_activity).delete(routes::cats::delete_activity),
        )
        .route(
            "/:cat_id",
            get(routes::cats::get_cat).delete(routes::cats::delete_cat),
        )
        .route(
            "/:cat_id/activities",
            post(routes::cats::log_activity).get(routes::cats::list_activities),
        )
        .route("/:cat_id/conspiracy", get(routes::cats::conspiracy));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/inventory", inventory_routes)
        .nest("/quiz", quiz_routes)
        .nest("/gym", gym_routes)
        .nest("/recipes", recipe_routes)
        .nest("/cats", cat_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Permissive when no origins are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Validates the bearer access token and injects an `AuthContext` into
/// request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let auth_context = authenticate(auth_header, state.jwt_secret())?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
