use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use feira_common::{LogEntry, SearchActivityRecord};
use feira_search::ActivitySink;

use super::contains_pattern;
use super::products::Pagination;

/// Methods accepted by the log listing filter.
pub const LOG_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "SEARCH"];

#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    pub page: Pagination,
    pub organization_id: Option<Uuid>,
    pub method: Option<String>,
    pub status_code: Option<u16>,
    /// Route contains this (case-insensitive).
    pub route: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl LogQuery {
    pub fn new(page: Pagination) -> Self {
        Self {
            page,
            organization_id: None,
            method: None,
            status_code: None,
            route: None,
            start_date: None,
            end_date: None,
        }
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.organization_id
            .map_or(true, |id| entry.organization_id == Some(id))
            && self.method.as_deref().map_or(true, |m| entry.method == m)
            && self.status_code.map_or(true, |s| entry.status_code == s)
            && self.route.as_deref().map_or(true, |r| {
                entry.route.to_lowercase().contains(&r.to_lowercase())
            })
            && self.start_date.map_or(true, |d| entry.timestamp >= d)
            && self.end_date.map_or(true, |d| entry.timestamp <= d)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub total_logs: i64,
    pub error_logs: i64,
    pub success_logs: i64,
    pub search_logs: i64,
    /// Percentage of logs with status >= 400. Zero when there are no logs.
    pub error_rate: f64,
}

impl LogStats {
    pub fn new(total_logs: i64, error_logs: i64, success_logs: i64, search_logs: i64) -> Self {
        let error_rate = if total_logs > 0 {
            error_logs as f64 / total_logs as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_logs,
            error_logs,
            success_logs,
            search_logs,
            error_rate,
        }
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> Self {
        let (mut total, mut errors, mut searches) = (0, 0, 0);
        for entry in entries {
            total += 1;
            if entry.is_error() {
                errors += 1;
            }
            if entry.search_query.is_some() {
                searches += 1;
            }
        }
        Self::new(total, errors, total - errors, searches)
    }
}

/// Request log storage.
#[async_trait]
pub trait LogRepository: Send + Sync {
    async fn append(&self, entry: LogEntry) -> Result<()>;

    /// Matching page (newest first) and total count.
    async fn list(&self, query: &LogQuery) -> Result<(Vec<LogEntry>, i64)>;

    async fn stats(&self, organization_id: Option<Uuid>) -> Result<LogStats>;
}

/// Search activity lands in the request log as a `SEARCH` entry.
pub struct LogActivitySink {
    logs: Arc<dyn LogRepository>,
}

impl LogActivitySink {
    pub fn new(logs: Arc<dyn LogRepository>) -> Self {
        Self { logs }
    }
}

#[async_trait]
impl ActivitySink for LogActivitySink {
    async fn append(&self, record: SearchActivityRecord) -> Result<()> {
        self.logs.append(LogEntry::from(record)).await
    }
}

// --- Postgres ---

pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: Uuid,
    method: String,
    route: String,
    status_code: i32,
    latency_ms: i64,
    user_id: Option<Uuid>,
    organization_id: Option<Uuid>,
    user_agent: Option<String>,
    ip_address: Option<String>,
    search_query: Option<String>,
    ai_filters: Option<serde_json::Value>,
    ai_success: Option<bool>,
    fallback_applied: Option<bool>,
    timestamp: DateTime<Utc>,
}

impl From<LogRow> for LogEntry {
    fn from(row: LogRow) -> Self {
        Self {
            id: row.id,
            method: row.method,
            route: row.route,
            status_code: u16::try_from(row.status_code).unwrap_or_default(),
            latency_ms: u64::try_from(row.latency_ms).unwrap_or_default(),
            user_id: row.user_id,
            organization_id: row.organization_id,
            user_agent: row.user_agent,
            ip_address: row.ip_address,
            search_query: row.search_query,
            ai_filters: row.ai_filters,
            ai_success: row.ai_success,
            fallback_applied: row.fallback_applied,
            timestamp: row.timestamp,
        }
    }
}

fn push_log_conditions(qb: &mut QueryBuilder<'static, Postgres>, query: &LogQuery) {
    qb.push("WHERE TRUE ");
    if let Some(id) = query.organization_id {
        qb.push("AND organization_id = ");
        qb.push_bind(id);
        qb.push(" ");
    }
    if let Some(method) = &query.method {
        qb.push("AND method = ");
        qb.push_bind(method.clone());
        qb.push(" ");
    }
    if let Some(status) = query.status_code {
        qb.push("AND status_code = ");
        qb.push_bind(i32::from(status));
        qb.push(" ");
    }
    if let Some(route) = &query.route {
        qb.push("AND route ILIKE ");
        qb.push_bind(contains_pattern(route));
        qb.push(" ");
    }
    if let Some(start) = query.start_date {
        qb.push("AND timestamp >= ");
        qb.push_bind(start);
        qb.push(" ");
    }
    if let Some(end) = query.end_date {
        qb.push("AND timestamp <= ");
        qb.push_bind(end);
        qb.push(" ");
    }
}

#[async_trait]
impl LogRepository for PgLogStore {
    async fn append(&self, entry: LogEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO logs (id, method, route, status_code, latency_ms, user_id, organization_id, \
             user_agent, ip_address, search_query, ai_filters, ai_success, fallback_applied, timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(entry.id)
        .bind(&entry.method)
        .bind(&entry.route)
        .bind(i32::from(entry.status_code))
        .bind(i64::try_from(entry.latency_ms).unwrap_or(i64::MAX))
        .bind(entry.user_id)
        .bind(entry.organization_id)
        .bind(&entry.user_agent)
        .bind(&entry.ip_address)
        .bind(&entry.search_query)
        .bind(&entry.ai_filters)
        .bind(entry.ai_success)
        .bind(entry.fallback_applied)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, query: &LogQuery) -> Result<(Vec<LogEntry>, i64)> {
        let mut select = QueryBuilder::new("SELECT * FROM logs ");
        push_log_conditions(&mut select, query);
        select.push("ORDER BY timestamp DESC OFFSET ");
        select.push_bind(query.page.offset());
        select.push(" LIMIT ");
        select.push_bind(i64::from(query.page.limit));

        let rows: Vec<LogRow> = select.build_query_as().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM logs ");
        push_log_conditions(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        Ok((rows.into_iter().map(LogEntry::from).collect(), total))
    }

    async fn stats(&self, organization_id: Option<Uuid>) -> Result<LogStats> {
        let (total, errors, successes, searches): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
             COUNT(*) FILTER (WHERE status_code >= 400), \
             COUNT(*) FILTER (WHERE status_code < 400), \
             COUNT(*) FILTER (WHERE search_query IS NOT NULL) \
             FROM logs WHERE ($1::uuid IS NULL OR organization_id = $1)",
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(LogStats::new(total, errors, successes, searches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(method: &str, status: u16) -> LogEntry {
        LogEntry::request(method, "/api/search/products", status, 3)
    }

    #[test]
    fn error_rate_is_zero_without_logs() {
        let stats = LogStats::from_entries(&Vec::<LogEntry>::new());
        assert_eq!(stats.total_logs, 0);
        assert_eq!(stats.error_rate, 0.0);
    }

    #[test]
    fn stats_split_errors_successes_and_searches() {
        let mut search = entry("SEARCH", 200);
        search.search_query = Some("doces".into());
        let entries = [entry("GET", 200), entry("GET", 404), entry("POST", 500), search];

        let stats = LogStats::from_entries(&entries);
        assert_eq!(stats.total_logs, 4);
        assert_eq!(stats.error_logs, 2);
        assert_eq!(stats.success_logs, 2);
        assert_eq!(stats.search_logs, 1);
        assert_eq!(stats.error_rate, 50.0);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["errorRate"], 50.0);
        assert_eq!(json["totalLogs"], 4);
    }

    #[test]
    fn query_matching() {
        let org = Uuid::new_v4();
        let mut query = LogQuery::new(Pagination { page: 1, limit: 50 });
        query.organization_id = Some(org);
        query.method = Some("GET".into());
        query.route = Some("SEARCH".into());

        let mut hit = entry("GET", 200);
        hit.organization_id = Some(org);
        assert!(query.matches(&hit));

        let mut other_org = hit.clone();
        other_org.organization_id = Some(Uuid::new_v4());
        assert!(!query.matches(&other_org));

        let mut post = hit.clone();
        post.method = "POST".into();
        assert!(!query.matches(&post));
    }

    #[test]
    fn conditions_are_bound() {
        let mut query = LogQuery::new(Pagination { page: 1, limit: 50 });
        query.status_code = Some(500);
        query.route = Some("/api".into());
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM logs ");
        push_log_conditions(&mut qb, &query);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM logs WHERE TRUE AND status_code = $1 AND route ILIKE $2 "
        );
    }
}
