//! OpenAI-compatible chat completions, including Azure OpenAI deployments.

use crate::api_types::{ContentBlock, MessagesResponse, Role, Tool, Turn};
use crate::llm::{CompletionParams, LlmClient};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use reqwest::Client;
use scout_core::config::LlmConfig;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_AZURE_API_VERSION: &str = "2024-06-01";

#[derive(Debug, Clone)]
enum Endpoint {
    OpenAi,
    Azure { api_version: String },
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    endpoint: Endpoint,
    retry: RetryConfig,
}

impl OpenAiClient {
    pub fn openai(config: &LlmConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string());
        Self::build(config, base_url, Endpoint::OpenAi)
    }

    /// `base_url` is the Azure resource endpoint and `model` the deployment name.
    pub fn azure(config: &LlmConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .context("azure provider requires llm.base_url (the resource endpoint)")?;
        let api_version = config
            .api_version
            .clone()
            .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());
        Self::build(config, base_url, Endpoint::Azure { api_version })
    }

    fn build(config: &LlmConfig, base_url: String, endpoint: Endpoint) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .context("llm.api_key is not set (OPENAI_API_KEY)")?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            endpoint,
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self) -> String {
        match &self.endpoint {
            Endpoint::OpenAi => format!("{}/chat/completions", self.base_url),
            Endpoint::Azure { api_version } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.base_url, self.model, api_version
            ),
        }
    }

    fn provider_name(&self) -> &'static str {
        match self.endpoint {
            Endpoint::OpenAi => "OpenAI",
            Endpoint::Azure { .. } => "Azure OpenAI",
        }
    }
}

// ============================================================================
// Wire conversion
// ============================================================================

fn to_openai_tools(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.input_schema
                }
            })
        })
        .collect()
}

/// The preamble goes first as a system message, followed by the log in order.
fn to_openai_messages(system: &str, turns: &[Turn]) -> Vec<Value> {
    let mut messages = vec![json!({"role": "system", "content": system})];

    for turn in turns {
        match turn.role {
            Role::System | Role::User => {
                let role = if turn.role == Role::System { "system" } else { "user" };
                messages.push(json!({"role": role, "content": turn.text_content()}));
            }
            Role::Assistant => {
                let mut text_parts = Vec::new();
                let mut tool_calls = Vec::new();
                for block in &turn.content {
                    match block {
                        ContentBlock::Text { text } => text_parts.push(text.as_str()),
                        ContentBlock::ToolUse { id, name, input } => tool_calls.push(json!({
                            "id": id,
                            "type": "function",
                            "function": {
                                "name": name,
                                "arguments": input.to_string()
                            }
                        })),
                        ContentBlock::ToolResult { .. } => {}
                    }
                }
                let mut msg = json!({"role": "assistant"});
                msg["content"] = if text_parts.is_empty() {
                    Value::Null
                } else {
                    json!(text_parts.join("\n"))
                };
                if !tool_calls.is_empty() {
                    msg["tool_calls"] = json!(tool_calls);
                }
                messages.push(msg);
            }
            Role::Tool => {
                for block in &turn.content {
                    if let ContentBlock::ToolResult { tool_use_id, content, .. } = block {
                        messages.push(json!({
                            "role": "tool",
                            "tool_call_id": tool_use_id,
                            "content": content
                        }));
                    }
                }
            }
        }
    }
    messages
}

fn parse_response(body: &Value) -> Result<MessagesResponse> {
    let choice = body["choices"]
        .get(0)
        .context("completion response has no choices")?;
    let message = &choice["message"];
    let mut content = Vec::new();

    if let Some(text) = message["content"].as_str() {
        if !text.is_empty() {
            content.push(ContentBlock::Text { text: text.to_string() });
        }
    }

    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let id = call["id"].as_str().unwrap_or_default().to_string();
            let name = call["function"]["name"].as_str().unwrap_or_default().to_string();
            let raw = call["function"]["arguments"].as_str().unwrap_or("{}");
            let input = serde_json::from_str(raw).unwrap_or_else(|e| {
                tracing::warn!(tool = %name, "unparseable tool arguments: {}", e);
                json!({ "_raw": raw })
            });
            content.push(ContentBlock::ToolUse { id, name, input });
        }
    }

    Ok(MessagesResponse {
        content,
        stop_reason: choice["finish_reason"].as_str().map(str::to_string),
    })
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        system: &str,
        turns: Vec<Turn>,
        tools: Vec<Tool>,
        params: CompletionParams,
    ) -> Result<MessagesResponse> {
        let mut payload = json!({
            "messages": to_openai_messages(system, &turns),
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        });
        if matches!(self.endpoint, Endpoint::OpenAi) {
            payload["model"] = json!(self.model);
        }
        if !tools.is_empty() {
            payload["tools"] = json!(to_openai_tools(&tools));
        }

        let url = self.url();
        let response = with_retry(&self.retry, self.provider_name(), || {
            let request = self.client.post(&url).json(&payload);
            let request = match self.endpoint {
                Endpoint::OpenAi => request.bearer_auth(&self.api_key),
                Endpoint::Azure { .. } => request.header("api-key", &self.api_key),
            };
            async move { request.send().await.map_err(anyhow::Error::from) }
        })
        .await?;

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("invalid {} response body", self.provider_name()))?;
        parse_response(&body)
    }
}
