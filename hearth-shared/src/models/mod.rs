/// Database models for Hearth
///
/// Each model owns its SQL and exposes async CRUD functions over a
/// `PgPool`. Lookups return `Ok(None)` when nothing matches; rejections
/// that depend on current state (class full, insufficient stock) come back
/// as outcome enums rather than errors.
///
/// # Models
///
/// - `user`: Accounts shared by every application
/// - `inventory`: Stock items and their movement history
/// - `question`, `quiz`: Question bank, ordered quizzes and grading
/// - `gym_class`, `booking`: Class schedule, bookings and waitlist
/// - `recipe`: Recipes, search and ratings
/// - `cat`, `activity`, `conspiracy`: Cat activity log and daily aggregate
///
/// # Example
///
/// ```no_run
/// use hearth_shared::models::user::{User, CreateUser};
/// use hearth_shared::db::pool::{create_pool, PoolConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(PoolConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Jo Doe".to_string()),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod activity;
pub mod booking;
pub mod cat;
pub mod conspiracy;
pub mod gym_class;
pub mod inventory;
pub mod question;
pub mod quiz;
pub mod recipe;
pub mod user;
