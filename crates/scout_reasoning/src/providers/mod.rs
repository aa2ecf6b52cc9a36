pub mod mock;
pub mod openai;

use crate::llm::LlmClient;
use anyhow::Result;
use scout_core::config::LlmConfig;

/// Build the chat client named by `llm.provider`.
pub fn create_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(openai::OpenAiClient::openai(config)?)),
        "azure" => Ok(Box::new(openai::OpenAiClient::azure(config)?)),
        "mock" => Ok(Box::new(mock::MockProvider::default())),
        other => anyhow::bail!("unknown LLM provider '{}' (expected openai, azure or mock)", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider() {
        let cfg = LlmConfig {
            provider: "gemini".into(),
            ..LlmConfig::default()
        };
        let err = create_client(&cfg).err().unwrap();
        assert!(err.to_string().contains("gemini"));
    }

    #[test]
    fn test_azure_requires_endpoint() {
        let cfg = LlmConfig {
            provider: "azure".into(),
            api_key: Some("k".into()),
            ..LlmConfig::default()
        };
        assert!(create_client(&cfg).is_err());
    }
}
