//! Limit/offset pagination for list endpoints.
//!
//! - `limit`: Maximum number of items to return (1-100, default: 20)
//! - `offset`: Number of items to skip from the beginning
//!
//! List handlers return a [`Paginated`] payload inside the response envelope:
//!
//! ```json
//! {
//!   "success": true,
//!   "message": "Courses retrieved",
//!   "data": {
//!     "items": [...],
//!     "meta": { "total": 42, "limit": 20, "offset": 20, "has_more": true }
//!   }
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Query strings deliver numbers as text and sometimes as empty strings,
/// which are treated as absent.
fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse::<i64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Total number of matching items
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    /// Whether there are more items after this page
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, Hash, Deserialize)]
pub struct PaginationParams {
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub offset: Option<i64>,
}

impl PaginationParams {
    /// Returns the effective limit, clamped to [1, 100].
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    #[must_use]
    pub fn meta(&self, total: i64) -> PaginationMeta {
        let limit = self.limit();
        let offset = self.offset();
        PaginationMeta {
            total,
            limit,
            offset,
            has_more: offset + limit < total,
        }
    }
}

/// A page of items plus its pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, params: &PaginationParams) -> Self {
        Self {
            items,
            meta: params.meta(total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.limit(), 20);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_limit_is_clamped() {
        let params = PaginationParams {
            limit: Some(150),
            offset: None,
        };
        assert_eq!(params.limit(), 100);

        let params = PaginationParams {
            limit: Some(-10),
            offset: None,
        };
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn test_negative_offset_is_zero() {
        let params = PaginationParams {
            limit: Some(10),
            offset: Some(-5),
        };
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_has_more() {
        let params = PaginationParams {
            limit: Some(10),
            offset: Some(10),
        };
        assert!(params.meta(25).has_more);
        assert!(!params.meta(20).has_more);
    }

    #[test]
    fn test_empty_strings_deserialize_as_none() {
        let params: PaginationParams =
            serde_json::from_str(r#"{"limit":"","offset":"30"}"#).unwrap();
        assert_eq!(params.limit, None);
        assert_eq!(params.offset, Some(30));
    }
}
