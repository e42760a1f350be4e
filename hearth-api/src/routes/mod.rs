/// API route handlers
///
/// One module per application, plus:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh, profile

pub mod auth;
pub mod cats;
pub mod gym;
pub mod health;
pub mod inventory;
pub mod quiz;
pub mod recipes;

use serde::{Deserialize, Deserializer};
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?limit=&offset=` query parameters
#[derive(Debug, Default, Deserialize, Validate)]
pub struct Pagination {
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i64>,

    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: Option<i64>,
}

impl Pagination {
    /// `(limit, offset)` with defaults applied
    pub fn resolve(&self) -> (i64, i64) {
        (
            self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            self.offset.unwrap_or(0).max(0),
        )
    }
}

/// Tells an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims and drops empty strings
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        note: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.note, None);

        let cleared: Patch = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(cleared.note, Some(None));

        let set: Patch = serde_json::from_str(r#"{"note": "hi"}"#).unwrap();
        assert_eq!(set.note, Some(Some("hi".to_string())));
    }

    #[test]
    fn test_pagination_defaults() {
        assert_eq!(Pagination::default().resolve(), (DEFAULT_PAGE_SIZE, 0));

        let page = Pagination {
            limit: Some(5),
            offset: Some(10),
        };
        assert_eq!(page.resolve(), (5, 10));
    }

    #[test]
    fn test_pagination_validation() {
        let too_big = Pagination {
            limit: Some(101),
            offset: None,
        };
        assert!(too_big.validate().is_err());

        let negative = Pagination {
            limit: None,
            offset: Some(-1),
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some(" soup ".to_string())), Some("soup".to_string()));
        assert_eq!(non_blank(None), None);
    }
}
