use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// Success envelope shared by every endpoint: `{ status, message, data[, pagination] }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    code: StatusCode,
    pub status: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::OK,
            status: true,
            message: message.into(),
            data,
            pagination: None,
        }
    }

    /// 201 Created
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::CREATED,
            ..Self::ok(message, data)
        }
    }

    /// 200 OK with pagination metadata
    pub fn paginated(message: impl Into<String>, data: T, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(message, data)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl Pagination {
    #[must_use]
    pub const fn new(total: u64, page: u64, limit: u64) -> Self {
        Self {
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        }
    }
}

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
pub const MAX_PAGE: u64 = 1_000_000;

/// Common list query: `?page=&limit=&search=&status=`.
///
/// Out-of-range values are clamped rather than rejected: `page` to `1..=MAX_PAGE`,
/// `limit` to `1..=100`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub project_id: Option<uuid::Uuid>,
}

impl ListQuery {
    #[must_use]
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Trimmed, non-empty search term.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn pagination(&self, total: u64) -> Pagination {
        Pagination::new(total, self.page(), self.limit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let q = ListQuery::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 10);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        let q = ListQuery {
            page: Some(0),
            limit: Some(500),
            ..ListQuery::default()
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 100);

        let q = ListQuery {
            limit: Some(0),
            ..ListQuery::default()
        };
        assert_eq!(q.limit(), 1);
    }

    #[test]
    fn test_offset() {
        let q = ListQuery {
            page: Some(3),
            limit: Some(20),
            ..ListQuery::default()
        };
        assert_eq!(q.offset(), 40);
    }

    #[test]
    fn test_huge_page_is_capped() {
        let q = ListQuery {
            page: Some(u64::MAX),
            limit: Some(100),
            ..ListQuery::default()
        };
        assert_eq!(q.page(), MAX_PAGE);
        assert_eq!(q.offset(), (MAX_PAGE - 1) * 100);
        assert_eq!(q.pagination(5).page, MAX_PAGE);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(Pagination::new(0, 1, 10).total_pages, 0);
        assert_eq!(Pagination::new(10, 1, 10).total_pages, 1);
        assert_eq!(Pagination::new(11, 1, 10).total_pages, 2);
    }

    #[test]
    fn test_search_term_blank() {
        let q = ListQuery {
            search: Some("   ".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(q.search_term(), None);
    }
}
