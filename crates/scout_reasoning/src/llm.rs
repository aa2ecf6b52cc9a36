use crate::api_types::{MessagesResponse, Tool, Turn};
use anyhow::Result;
use async_trait::async_trait;

/// Parameters for LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    /// Maximum tokens to generate (will be clamped to provider limits)
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.2,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request with tool definitions.
    ///
    /// `system` is sent ahead of `turns` for this call only; it is never
    /// part of the shared log.
    async fn complete(
        &self,
        system: &str,
        turns: Vec<Turn>,
        tools: Vec<Tool>,
        params: CompletionParams,
    ) -> Result<MessagesResponse>;
}
