use std::sync::Arc;
use std::time::{Duration, Instant};

use ai_client::{AiError, Completion, CompletionRequest};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use feira_common::{CategoryCatalog, Interpretation, SearchFilters};

use crate::fallback::keywords;
use crate::summary::describe;

/// Deadline for one interpreter call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

const MAX_REPLY_TOKENS: u32 = 300;
const TEMPERATURE: f32 = 0.1;

const INTERPRETER_PREAMBLE: &str = r#"You convert product searches for a Brazilian marketplace of charitable organizations (ONGs) into structured filters. Searches are usually written in Portuguese.

Return a JSON object with:
- filters.category: one of the available categories, or null
- filters.priceMin / filters.priceMax: prices in BRL as numbers, or null
- filters.keywords: lowercase words describing the product itself, without category names, prices or filler words; [] when there are none
- filters.organization: the organization named in the search, or null
- interpretation: a short summary of what was understood

Available categories: {categories}

Examples:
- "doces até 50 reais" -> {"filters": {"category": "Doces", "priceMin": null, "priceMax": 50, "keywords": [], "organization": null}, "interpretation": "Category: Doces; Max price: R$ 50"}
- "artesanato da ONG Esperança" -> {"filters": {"category": "Artesanato", "priceMin": null, "priceMax": null, "keywords": [], "organization": "ONG Esperança"}, "interpretation": "Category: Artesanato; Organization: ONG Esperança"}"#;

// =============================================================================
// Interpreter
// =============================================================================

/// Why an interpretation attempt produced nothing usable.
///
/// Callers only branch on success vs. failure; the variant exists for logs.
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("interpreter not configured")]
    NotConfigured,

    #[error("interpreter timed out after {0:?}")]
    Timeout(Duration),

    #[error("interpreter returned an empty reply")]
    EmptyReply,

    #[error("interpreter reply malformed: {0}")]
    Malformed(String),

    #[error("interpreter unavailable: {0}")]
    Unavailable(String),
}

impl From<AiError> for InterpretError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::Config(_) => InterpretError::NotConfigured,
            AiError::EmptyResponse => InterpretError::EmptyReply,
            AiError::Parse(msg) => InterpretError::Malformed(msg),
            other => InterpretError::Unavailable(other.to_string()),
        }
    }
}

/// Turns a free-text query into filters, or reports that it could not.
#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn interpret(&self, query: &str) -> Result<Interpretation, InterpretError>;
}

// =============================================================================
// Reply shape
// =============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ReplyFilters {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    price_min: Option<f64>,
    #[serde(default)]
    price_max: Option<f64>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    organization: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct InterpreterReply {
    filters: ReplyFilters,
    #[serde(default)]
    interpretation: Option<String>,
}

impl InterpreterReply {
    /// Keep only values the product query can use safely.
    ///
    /// The model's own summary is kept only when nothing it could describe was
    /// dropped; otherwise the text is rebuilt from the surviving filters.
    fn into_interpretation(self, catalog: &CategoryCatalog) -> Interpretation {
        let reply = self.filters;
        let price = |p: Option<f64>| p.filter(|v| v.is_finite() && *v >= 0.0);
        let filters = SearchFilters {
            category: reply
                .category
                .as_deref()
                .and_then(|c| catalog.canonical(c))
                .map(str::to_string),
            price_min: price(reply.price_min),
            price_max: price(reply.price_max),
            keywords: reply.keywords.iter().flat_map(|k| keywords(k)).collect(),
            organization: reply
                .organization
                .as_deref()
                .map(str::trim)
                .filter(|o| !o.is_empty() && !o.eq_ignore_ascii_case("null"))
                .map(str::to_string),
        };

        let dropped = reply.category.is_some() != filters.category.is_some()
            || reply.price_min.is_some() != filters.price_min.is_some()
            || reply.price_max.is_some() != filters.price_max.is_some()
            || reply.organization.is_some() != filters.organization.is_some()
            || reply
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .ne(filters.keywords.iter().cloned());

        let interpretation = self
            .interpretation
            .map(|i| i.trim().to_string())
            .filter(|i| !dropped && !i.is_empty())
            .unwrap_or_else(|| describe(&filters));

        Interpretation {
            filters,
            interpretation,
        }
    }
}

// =============================================================================
// InterpreterGateway
// =============================================================================

/// Interpreter backed by a hosted chat model, bounded by a hard deadline.
///
/// With no model configured every call fails fast with `NotConfigured`.
#[derive(Clone)]
pub struct InterpreterGateway {
    model: Option<Arc<dyn Completion>>,
    catalog: CategoryCatalog,
    timeout: Duration,
}

impl InterpreterGateway {
    pub fn new(model: Option<Arc<dyn Completion>>, catalog: CategoryCatalog) -> Self {
        Self {
            model,
            catalog,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request(&self, query: &str) -> CompletionRequest {
        let preamble = INTERPRETER_PREAMBLE.replace("{categories}", &self.catalog.names().join(", "));
        CompletionRequest::new()
            .system(preamble)
            .user(format!("Search: \"{query}\""))
            .temperature(TEMPERATURE)
            .max_tokens(MAX_REPLY_TOKENS)
    }

    async fn attempt(&self, query: &str) -> Result<Interpretation, InterpretError> {
        let model = self.model.as_deref().ok_or(InterpretError::NotConfigured)?;

        // Dropping the losing future cancels the request; a late reply is never seen.
        let reply: InterpreterReply = tokio::time::timeout(
            self.timeout,
            ai_client::extract(model, self.request(query)),
        )
        .await
        .map_err(|_| InterpretError::Timeout(self.timeout))??;

        Ok(reply.into_interpretation(&self.catalog))
    }
}

#[async_trait]
impl Interpreter for InterpreterGateway {
    async fn interpret(&self, query: &str) -> Result<Interpretation, InterpretError> {
        let started = Instant::now();
        let result = self.attempt(query).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(interpretation) => info!(
                query,
                filters = ?interpretation.filters,
                interpretation = %interpretation.interpretation,
                duration_ms,
                "Interpreter search successful"
            ),
            Err(e) => warn!(
                query,
                error = %e,
                duration_ms,
                "Interpreter search failed, using fallback"
            ),
        }

        result
    }
}
