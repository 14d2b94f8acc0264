use std::time::Instant;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use feira_search::activity_record;

use super::{pagination, success};
use crate::app::AppState;
use crate::auth::MaybeIdentity;
use crate::db::ProductFilter;
use crate::error::ApiError;

pub const MAX_QUERY_CHARS: usize = 200;
const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct IntelligentParams {
    q: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductParams {
    q: Option<String>,
    category: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    page: Option<u32>,
    limit: Option<u32>,
}

/// Trimmed query text of 1..=200 characters.
fn search_text(q: Option<&str>) -> Result<&str, ApiError> {
    let q = q.map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return Err(ApiError::BadRequest("Query parameter \"q\" is required".into()));
    }
    if q.chars().count() > MAX_QUERY_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Query parameter \"q\" must be at most {MAX_QUERY_CHARS} characters"
        )));
    }
    Ok(q)
}

/// `GET /api/search/intelligent`
pub async fn intelligent_search(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    params: Result<Query<IntelligentParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let started = Instant::now();
    let Query(params) = params.map_err(|_| ApiError::invalid_query())?;
    let q = search_text(params.q.as_deref())?;
    let page = pagination(params.page, params.limit, DEFAULT_PAGE_SIZE)?;

    let outcome = state.search.search(q, identity.as_ref()).await;

    let organization_id = identity.as_ref().and_then(|i| i.organization_id);
    let filter = ProductFilter::from_search(&outcome.filters, organization_id);

    let (products, total) = match state.products.find_matching(&filter, page).await {
        Ok(found) => found,
        Err(e) => {
            let latency_ms = started.elapsed().as_millis() as u64;
            state.search.dispatch_activity(activity_record(
                q,
                &outcome,
                identity.as_ref(),
                500,
                latency_ms,
            ));
            return Err(ApiError::Internal(e));
        }
    };

    info!(
        query = q,
        total,
        ai_success = outcome.ai_success,
        "Intelligent search served"
    );

    Ok(success(json!({
        "products": products,
        "pagination": page.summary(total),
        "searchInfo": {
            "query": q,
            "interpretation": outcome.interpretation,
            "aiSuccess": outcome.ai_success,
            "fallbackUsed": outcome.fallback_used,
            "filters": outcome.filters,
        },
    })))
}

/// `GET /api/search/products`, structured search without interpretation.
pub async fn product_search(
    State(state): State<AppState>,
    params: Result<Query<ProductParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(|_| ApiError::invalid_query())?;
    let page = pagination(params.page, params.limit, DEFAULT_PAGE_SIZE)?;

    let price_ok = |p: Option<f64>| p.map_or(true, |v| v.is_finite() && v >= 0.0);
    if !price_ok(params.min_price) || !price_ok(params.max_price) {
        return Err(ApiError::invalid_query());
    }

    let non_blank = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let filter = ProductFilter {
        category: non_blank(params.category),
        price_min: params.min_price,
        price_max: params.max_price,
        text: non_blank(params.q),
        ..Default::default()
    };

    let (products, total) = state.products.find_matching(&filter, page).await?;

    Ok(success(json!({
        "products": products,
        "pagination": page.summary(total),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_text_is_trimmed_and_bounded() {
        assert_eq!(search_text(Some("  doces  ")).unwrap(), "doces");
        assert!(search_text(None).is_err());
        assert!(search_text(Some("   ")).is_err());
        assert!(search_text(Some(&"é".repeat(200))).is_ok());
        assert!(search_text(Some(&"a".repeat(201))).is_err());
    }
}
