use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{info, warn};

use feira_common::{Identity, SearchActivityRecord, SearchOutcome, SearchPath};

use crate::activity::ActivitySink;
use crate::fallback::FallbackParser;
use crate::gateway::Interpreter;

/// Entry point for natural-language search.
///
/// Tries the interpreter first and falls back to the rule-based parser on any
/// failure. Every invocation reports one activity record to the sink without
/// waiting for the write.
#[derive(Clone)]
pub struct SearchService {
    interpreter: Arc<dyn Interpreter>,
    fallback: FallbackParser,
    sink: Arc<dyn ActivitySink>,
}

impl SearchService {
    pub fn new(
        interpreter: Arc<dyn Interpreter>,
        fallback: FallbackParser,
        sink: Arc<dyn ActivitySink>,
    ) -> Self {
        Self {
            interpreter,
            fallback,
            sink,
        }
    }

    /// Resolve `query` into filters. Never fails.
    pub async fn search(&self, query: &str, identity: Option<&Identity>) -> SearchOutcome {
        let started = Instant::now();

        let outcome = match self.interpreter.interpret(query).await {
            Ok(interpretation) => SearchOutcome::new(interpretation, SearchPath::Interpreter),
            Err(_) => SearchOutcome::new(self.fallback.parse(query), SearchPath::Fallback),
        };

        let latency_ms = started.elapsed().as_millis() as u64;

        info!(
            query,
            path = %outcome.path(),
            filters = ?outcome.filters,
            latency_ms,
            "Search completed"
        );

        self.dispatch_activity(activity_record(query, &outcome, identity, 200, latency_ms));

        outcome
    }

    /// Fire-and-forget append. Sink errors are logged and dropped.
    pub fn dispatch_activity(&self, record: SearchActivityRecord) {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.append(record).await {
                warn!(error = %e, "Failed to record search activity");
            }
        });
    }
}

/// Build the activity record for a finished search.
pub fn activity_record(
    query: &str,
    outcome: &SearchOutcome,
    identity: Option<&Identity>,
    status_code: u16,
    latency_ms: u64,
) -> SearchActivityRecord {
    SearchActivityRecord {
        query: query.to_string(),
        filters: outcome.filters.clone(),
        ai_success: outcome.ai_success,
        fallback_used: outcome.fallback_used,
        user_id: identity.map(|i| i.user_id),
        organization_id: identity.and_then(|i| i.organization_id),
        status_code,
        latency_ms,
        timestamp: Utc::now(),
    }
}
