use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{pagination, success};
use crate::app::AppState;
use crate::auth::AdminIdentity;
use crate::db::logs::LOG_METHODS;
use crate::db::LogQuery;
use crate::error::ApiError;

const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogParams {
    page: Option<u32>,
    limit: Option<u32>,
    method: Option<String>,
    status_code: Option<u16>,
    route: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

/// RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
        })
}

fn optional_date(value: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    value
        .map(|v| parse_date(v).ok_or_else(ApiError::invalid_query))
        .transpose()
}

/// `GET /api/logs`, scoped to the admin's organization when they have one.
pub async fn list_logs(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    params: Result<Query<LogParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(|_| ApiError::invalid_query())?;

    if let Some(method) = &params.method {
        if !LOG_METHODS.contains(&method.as_str()) {
            return Err(ApiError::invalid_query());
        }
    }

    let query = LogQuery {
        page: pagination(params.page, params.limit, DEFAULT_PAGE_SIZE)?,
        organization_id: admin.organization_id,
        method: params.method,
        status_code: params.status_code,
        route: params.route.filter(|r| !r.trim().is_empty()),
        start_date: optional_date(params.start_date.as_deref())?,
        end_date: optional_date(params.end_date.as_deref())?,
    };

    let (logs, total) = state.logs.list(&query).await?;

    Ok(success(json!({
        "logs": logs,
        "pagination": query.page.summary(total),
    })))
}

/// `GET /api/logs/stats`
pub async fn log_stats(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
) -> Result<Json<Value>, ApiError> {
    let stats = state.logs.stats(admin.organization_id).await?;
    Ok(success(json!(stats)))
}
