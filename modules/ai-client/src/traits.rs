use async_trait::async_trait;

use crate::error::AiError;
use crate::openai::StructuredOutput;
use crate::util::json_payload;

// =============================================================================
// Message Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// =============================================================================
// Completion Request
// =============================================================================

/// Provider-neutral description of one chat completion call.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Name and JSON schema the reply must conform to, when structured output is wanted.
    pub response_schema: Option<(String, serde_json::Value)>,
}

impl CompletionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Ask the provider to constrain the reply to `T`'s schema.
    pub fn structured<T: StructuredOutput>(mut self) -> Self {
        self.response_schema = Some((T::type_name(), T::openai_schema()));
        self
    }
}

// =============================================================================
// Completion Trait
// =============================================================================

#[async_trait]
pub trait Completion: Send + Sync {
    /// Send the request and return the text of the first choice.
    async fn complete(&self, request: CompletionRequest) -> Result<String, AiError>;
}

/// Run a structured completion and deserialize the reply into `T`.
///
/// Empty replies and replies that do not match `T` are errors; markdown fences
/// around the JSON are tolerated.
pub async fn extract<T, C>(client: &C, request: CompletionRequest) -> Result<T, AiError>
where
    T: StructuredOutput,
    C: Completion + ?Sized,
{
    let text = client.complete(request.structured::<T>()).await?;
    let body = json_payload(&text);
    if body.is_empty() {
        return Err(AiError::EmptyResponse);
    }
    serde_json::from_str(body).map_err(|e| AiError::Parse(e.to_string()))
}
