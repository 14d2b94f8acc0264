// Test mocks for the search pipeline.
//
// One mock per trait boundary:
// - MockCompletion (ai_client::Completion): canned reply or error, optional delay
// - MockInterpreter (Interpreter): fixed success or failure, counts calls
// - RecordingSink / FailingSink (ActivitySink): capture or reject records
//
// No network, no database: the pipeline runs end to end in memory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ai_client::{AiError, Completion, CompletionRequest};
use anyhow::{bail, Result};
use async_trait::async_trait;

use feira_common::{Interpretation, SearchActivityRecord, SearchFilters};

use crate::activity::ActivitySink;
use crate::gateway::{InterpretError, Interpreter};

// ---------------------------------------------------------------------------
// MockCompletion
// ---------------------------------------------------------------------------

/// Chat model stand-in. Records every request it receives.
pub struct MockCompletion {
    reply: Result<String, AiError>,
    delay: Option<Duration>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletion {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn error(error: AiError) -> Self {
        Self {
            reply: Err(error),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Hold the reply back for `delay` (tokio time, so paused clocks apply).
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

fn copy_error(error: &AiError) -> AiError {
    match error {
        AiError::Config(m) => AiError::Config(m.clone()),
        AiError::Network(m) => AiError::Network(m.clone()),
        AiError::Api { status, body } => AiError::Api {
            status: *status,
            body: body.clone(),
        },
        AiError::EmptyResponse => AiError::EmptyResponse,
        AiError::Parse(m) => AiError::Parse(m.clone()),
    }
}

#[async_trait]
impl Completion for MockCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AiError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(e) => Err(copy_error(e)),
        }
    }
}

// ---------------------------------------------------------------------------
// MockInterpreter
// ---------------------------------------------------------------------------

/// Interpreter with a fixed answer.
pub struct MockInterpreter {
    answer: Option<Interpretation>,
    calls: AtomicUsize,
}

impl MockInterpreter {
    pub fn succeeding(filters: SearchFilters, interpretation: &str) -> Self {
        Self {
            answer: Some(Interpretation {
                filters,
                interpretation: interpretation.to_string(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Interpreter for MockInterpreter {
    async fn interpret(&self, _query: &str) -> Result<Interpretation, InterpretError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .clone()
            .ok_or_else(|| InterpretError::Unavailable("mock interpreter down".into()))
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Keeps every appended record.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<SearchActivityRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SearchActivityRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Wait (bounded) until at least `count` records arrived from detached tasks.
    pub async fn wait_for(&self, count: usize) -> Vec<SearchActivityRecord> {
        for _ in 0..1000 {
            let records = self.records();
            if records.len() >= count {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        self.records()
    }
}

#[async_trait]
impl ActivitySink for RecordingSink {
    async fn append(&self, record: SearchActivityRecord) -> Result<()> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

/// Rejects every record, optionally after a delay.
#[derive(Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
    delay: Option<Duration>,
}

impl FailingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActivitySink for FailingSink {
    async fn append(&self, _record: SearchActivityRecord) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        bail!("activity store unavailable")
    }
}
