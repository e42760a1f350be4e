/// Request authentication context
///
/// The API's auth layer turns an `Authorization: Bearer <token>` header into
/// an [`AuthContext`] and stores it in the request extensions, where
/// handlers pick it up with `Extension<AuthContext>`.
///
/// ```
/// use hearth_shared::auth::jwt::{create_token, Claims, TokenType};
/// use hearth_shared::auth::middleware::authenticate;
/// use uuid::Uuid;
///
/// let secret = "a-secret-that-is-at-least-32-bytes-long";
/// let user_id = Uuid::new_v4();
/// let token = create_token(&Claims::new(user_id, TokenType::Access), secret).unwrap();
///
/// let header = format!("Bearer {}", token);
/// let auth = authenticate(Some(&header), secret).unwrap();
/// assert_eq!(auth.user_id, user_id);
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Identity of the caller for the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }

    /// True when the caller is the owner of a resource
    pub fn owns(&self, owner_id: Uuid) -> bool {
        self.user_id == owner_id
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid token issuer".to_string()),
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

/// Extracts the token from a `Bearer` header value.
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates the `Authorization` header value and builds the context.
pub fn authenticate(header: Option<&str>, secret: &str) -> Result<AuthContext, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;
    let token = bearer_token(header)?;
    let claims = validate_access_token(token, secret)?;

    Ok(AuthContext::new(claims.sub))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims, TokenType};

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def").unwrap(), "abc.def");
        assert!(matches!(bearer_token("Basic Zm9vOmJhcg=="), Err(AuthError::InvalidFormat(_))));
        assert!(bearer_token("Bearer ").is_err());
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            authenticate(None, SECRET),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_refresh_token_not_accepted() {
        let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Refresh), SECRET).unwrap();
        let header = format!("Bearer {}", token);
        assert!(matches!(
            authenticate(Some(&header), SECRET),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_owns() {
        let user_id = Uuid::new_v4();
        let auth = AuthContext::new(user_id);
        assert!(auth.owns(user_id));
        assert!(!auth.owns(Uuid::new_v4()));
    }
}
