/// Authentication primitives
///
/// - [`password`]: Argon2id hashing and strength checks
/// - [`jwt`]: HS256 access and refresh tokens
/// - [`middleware`]: the per-request [`middleware::AuthContext`] and bearer parsing
///
/// ```
/// use hearth_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Kitchen#Table9")?;
/// assert!(verify_password("Kitchen#Table9", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
