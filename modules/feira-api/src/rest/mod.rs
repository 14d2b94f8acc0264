pub mod logs;
pub mod search;

use axum::Json;
use serde_json::{json, Value};

use crate::db::Pagination;
use crate::error::ApiError;

pub const MAX_PAGE_SIZE: u32 = 100;

/// `{"success": true, "data": ...}`
pub fn success(data: Value) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Validate paging parameters: `page >= 1`, `1 <= limit <= 100`.
pub fn pagination(
    page: Option<u32>,
    limit: Option<u32>,
    default_limit: u32,
) -> Result<Pagination, ApiError> {
    let page = page.unwrap_or(1);
    let limit = limit.unwrap_or(default_limit);
    if page < 1 || !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(ApiError::invalid_query());
    }
    Ok(Pagination { page, limit })
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "name": "feira-api",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "intelligentSearch": "GET /api/search/intelligent?q=",
            "productSearch": "GET /api/search/products",
            "logs": "GET /api/logs",
            "logStats": "GET /api/logs/stats",
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_bounds() {
        assert_eq!(pagination(None, None, 20).unwrap(), Pagination { page: 1, limit: 20 });
        assert_eq!(pagination(Some(3), Some(100), 20).unwrap(), Pagination { page: 3, limit: 100 });
        assert!(pagination(Some(0), None, 20).is_err());
        assert!(pagination(None, Some(0), 20).is_err());
        assert!(pagination(None, Some(101), 20).is_err());
    }
}
