//! Scripted LLM provider for tests and offline runs.
//!
//! Responses are served in order; every call is recorded so tests can assert
//! on what each step was shown.

use crate::api_types::{ContentBlock, MessagesResponse, Tool, Turn};
use crate::llm::{CompletionParams, LlmClient};
use anyhow::Result;
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// What one `complete` call received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub turn_count: usize,
    pub tool_names: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MockProvider {
    script: Mutex<VecDeque<MessagesResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockProvider {
    pub fn scripted(responses: Vec<MessagesResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.script.lock().await.len()
    }
}

/// A final answer with no tool calls.
pub fn text_response(text: &str) -> MessagesResponse {
    MessagesResponse {
        content: vec![ContentBlock::Text { text: text.to_string() }],
        stop_reason: Some("stop".to_string()),
    }
}

/// A turn requesting the given `(name, arguments)` calls, ids `call_0..`.
pub fn tool_call_response(calls: &[(&str, Value)]) -> MessagesResponse {
    let content = calls
        .iter()
        .enumerate()
        .map(|(i, (name, input))| ContentBlock::ToolUse {
            id: format!("call_{}", i),
            name: name.to_string(),
            input: input.clone(),
        })
        .collect();
    MessagesResponse {
        content,
        stop_reason: Some("tool_calls".to_string()),
    }
}

#[async_trait::async_trait]
impl LlmClient for MockProvider {
    async fn complete(
        &self,
        system: &str,
        turns: Vec<Turn>,
        tools: Vec<Tool>,
        _params: CompletionParams,
    ) -> Result<MessagesResponse> {
        self.calls.lock().await.push(RecordedCall {
            system: system.to_string(),
            turn_count: turns.len(),
            tool_names: tools.into_iter().map(|t| t.name).collect(),
        });
        self.script
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("mock script exhausted"))
    }
}
