use serde::{Deserialize, Serialize};

use crate::traits::{CompletionRequest, MessageRole};

// =============================================================================
// Chat Request
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    System,
    User,
    Assistant,
}

impl From<MessageRole> for Role {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::System => Role::System,
            MessageRole::User => Role::User,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    /// Map a provider-neutral request onto the OpenAI wire format.
    pub fn from_completion(model: &str, request: CompletionRequest) -> Self {
        let reasoning_model = uses_max_completion_tokens(model);
        Self {
            model: model.to_string(),
            messages: request
                .messages
                .into_iter()
                .map(|m| WireMessage {
                    role: m.role.into(),
                    content: Some(m.content),
                })
                .collect(),
            // Reasoning models reject a temperature other than the default.
            temperature: if reasoning_model {
                None
            } else {
                request.temperature
            },
            max_tokens: if reasoning_model {
                None
            } else {
                request.max_tokens
            },
            max_completion_tokens: if reasoning_model {
                request.max_tokens
            } else {
                None
            },
            response_format: request
                .response_schema
                .map(|(name, schema)| ResponseFormat {
                    format_type: "json_schema".to_string(),
                    json_schema: JsonSchemaFormat {
                        name,
                        strict: true,
                        schema,
                    },
                }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    pub json_schema: JsonSchemaFormat,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: serde_json::Value,
}

// =============================================================================
// Chat Response
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Choice {
    pub message: WireMessage,
}

impl ChatResponse {
    /// Trimmed text of the first choice, if it has any.
    pub fn first_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

/// Check if a model requires max_completion_tokens instead of max_tokens.
pub(crate) fn uses_max_completion_tokens(model: &str) -> bool {
    model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("gpt-5")
        || model.contains("-o1")
        || model.contains("-o3")
}
