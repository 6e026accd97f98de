use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::tools::{ToolCall, ToolDefinition};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

pub const SYSTEM_PROMPT: &str = "You are a knowledgeable DeFi and trading assistant. Help users with:\n\
- Understanding trading concepts and DeFi protocols\n\
- Analyzing trading strategies and market conditions\n\
- Explaining blockchain concepts and smart contracts\n\
- Providing guidance on safe trading practices\n\
- Answering questions about crypto markets and tokens\n\n\
Keep responses clear, accurate, and focused on helping users make informed trading decisions.\n\
Always emphasize the importance of DYOR (Do Your Own Research) and risk management.\n\
Never provide financial advice or specific trading recommendations.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: Role::System,
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }
}

/// What the model returned: plain text, or one or more structured tool calls
#[derive(Debug, Clone)]
pub enum LlmReply {
    Text(String),
    ToolCalls(Vec<ToolCall>),
}

/// Chat-completion collaborator. The only contract with this interface is
/// that tool-call arguments are untyped JSON and must be validated locally
/// before use.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LlmReply, Error>;
}

/// Validate an LLM provider credential. Presence of a valid key gates all
/// chat features; its absence disables them without affecting anything else.
pub fn validate_api_key(key: &str) -> Result<(), Error> {
    if key.trim().starts_with("sk-") {
        Ok(())
    } else {
        Err(Error::Config(
            "API key must start with 'sk-'".to_string(),
        ))
    }
}

/// OpenAI-compatible chat completion client
pub struct OpenAiChat {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(api_key: &str) -> Result<Self, Error> {
        validate_api_key(api_key)?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_key: api_key.trim().to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<RawToolCall>>,
}

#[derive(Debug, Deserialize)]
struct RawToolCall {
    function: RawFunction,
}

#[derive(Debug, Deserialize)]
struct RawFunction {
    name: String,
    /// JSON object serialized as a string, per the provider wire format
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct CompletionError {
    error: CompletionErrorDetail,
}

#[derive(Debug, Deserialize)]
struct CompletionErrorDetail {
    message: String,
}

#[async_trait]
impl ChatBackend for OpenAiChat {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LlmReply, Error> {
        debug!(model = %self.model, turns = messages.len(), "requesting chat completion");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": messages,
                "tools": tools,
                "tool_choice": "auto",
                "temperature": 0.7,
                "max_tokens": 1000,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<CompletionError>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "no detail".to_string());
            return Err(Error::Llm(format!("{}: {}", status, detail)));
        }

        let completion: Completion = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("invalid completion response: {}", e)))?;

        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| Error::Llm("completion returned no choices".to_string()))?;

        if let Some(raw_calls) = message.tool_calls.filter(|calls| !calls.is_empty()) {
            let mut calls = Vec::with_capacity(raw_calls.len());
            for raw in raw_calls {
                let arguments: Value = if raw.function.arguments.trim().is_empty() {
                    Value::Object(Default::default())
                } else {
                    serde_json::from_str(&raw.function.arguments).map_err(|e| {
                        Error::Llm(format!(
                            "tool call '{}' carried unparseable arguments: {}",
                            raw.function.name, e
                        ))
                    })?
                };
                calls.push(ToolCall {
                    name: raw.function.name,
                    arguments,
                });
            }
            return Ok(LlmReply::ToolCalls(calls));
        }

        Ok(LlmReply::Text(message.content.unwrap_or_default()))
    }
}
