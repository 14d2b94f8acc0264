use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Interpretation shown when nothing structured could be derived from a query.
pub const SIMPLE_TEXT_SEARCH: &str = "simple text search";

/// Method and route under which search activity lands in the request log.
pub const SEARCH_LOG_METHOD: &str = "SEARCH";
pub const SEARCH_LOG_ROUTE: &str = "/api/search/intelligent";

// --- Search Types ---

/// Structured constraints derived from a free-text product query.
///
/// Every field is optional; the default value constrains nothing. Price bounds
/// are not checked against each other: an inverted range matches no product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && self.keywords.is_empty()
            && self.organization.is_none()
    }
}

/// Filters plus the human-readable summary of how they were understood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub filters: SearchFilters,
    pub interpretation: String,
}

/// Which path produced a [`SearchOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPath {
    Interpreter,
    Fallback,
}

impl std::fmt::Display for SearchPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchPath::Interpreter => write!(f, "interpreter"),
            SearchPath::Fallback => write!(f, "fallback"),
        }
    }
}

/// Result handed back to the HTTP layer, whichever path produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub filters: SearchFilters,
    pub interpretation: String,
    pub ai_success: bool,
    pub fallback_used: bool,
}

impl SearchOutcome {
    /// The two flags are derived from one path value, so exactly one is set.
    pub fn new(interpretation: Interpretation, path: SearchPath) -> Self {
        Self {
            filters: interpretation.filters,
            interpretation: interpretation.interpretation,
            ai_success: path == SearchPath::Interpreter,
            fallback_used: path == SearchPath::Fallback,
        }
    }

    pub fn path(&self) -> SearchPath {
        if self.ai_success {
            SearchPath::Interpreter
        } else {
            SearchPath::Fallback
        }
    }
}

// --- Identity ---

/// Caller identity established by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub is_admin: bool,
}

// --- Activity / Request Log ---

/// One search invocation as seen by the observability sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchActivityRecord {
    pub query: String,
    pub filters: SearchFilters,
    pub ai_success: bool,
    pub fallback_used: bool,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub status_code: u16,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Row of the request log. HTTP requests and search activity share the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: Uuid,
    pub method: String,
    pub route: String,
    pub status_code: u16,
    pub latency_ms: u64,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub search_query: Option<String>,
    pub ai_filters: Option<serde_json::Value>,
    pub ai_success: Option<bool>,
    pub fallback_applied: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Plain HTTP request entry.
    pub fn request(
        method: impl Into<String>,
        route: impl Into<String>,
        status_code: u16,
        latency_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: method.into(),
            route: route.into(),
            status_code,
            latency_ms,
            user_id: None,
            organization_id: None,
            user_agent: None,
            ip_address: None,
            search_query: None,
            ai_filters: None,
            ai_success: None,
            fallback_applied: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_identity(mut self, identity: Option<&Identity>) -> Self {
        self.user_id = identity.map(|i| i.user_id);
        self.organization_id = identity.and_then(|i| i.organization_id);
        self
    }

    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}

impl From<SearchActivityRecord> for LogEntry {
    fn from(record: SearchActivityRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: SEARCH_LOG_METHOD.to_string(),
            route: SEARCH_LOG_ROUTE.to_string(),
            status_code: record.status_code,
            latency_ms: record.latency_ms,
            user_id: record.user_id,
            organization_id: record.organization_id,
            user_agent: None,
            ip_address: None,
            ai_filters: serde_json::to_value(&record.filters).ok(),
            search_query: Some(record.query),
            ai_success: Some(record.ai_success),
            fallback_applied: Some(record.fallback_used),
            timestamp: record.timestamp,
        }
    }
}
