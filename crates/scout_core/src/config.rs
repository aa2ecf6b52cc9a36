use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub llm: LlmConfig,
    pub services: ServicesConfig,
    pub pipeline: PipelineConfig,
}

impl ScoutConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: ScoutConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("AZURE_OPENAI_API_VERSION") {
            self.llm.api_version = Some(v);
        }
        if let Ok(v) = std::env::var("LLM_TEMPERATURE") {
            if let Ok(n) = v.parse() {
                self.llm.temperature = n;
            }
        }
        if let Ok(v) = std::env::var("GOOGLE_API_KEY") {
            self.services.google_api_key = Some(v);
        }
        if let Ok(v) = std::env::var("MAPBOX_TOKEN") {
            self.services.mapbox_token = Some(v);
        }
        if let Ok(v) = std::env::var("SERP_API_KEY") {
            self.services.serp_api_key = Some(v);
        }
        if let Ok(v) = std::env::var("SEGMENTATION_URL") {
            self.services.segmentation_url = Some(v);
        }
        if let Ok(v) = std::env::var("SCOUT_MAX_ITERATIONS") {
            if let Ok(n) = v.parse() {
                self.pipeline.max_iterations = n;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `openai`, `azure` or `mock`.
    pub provider: String,
    /// Model name, or the deployment name for Azure.
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Azure `api-version` query parameter.
    pub api_version: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            base_url: None,
            api_key: None,
            api_version: None,
            max_tokens: 4096,
            temperature: 0.2,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub google_api_key: Option<String>,
    pub mapbox_token: Option<String>,
    pub serp_api_key: Option<String>,
    pub segmentation_url: Option<String>,
    pub maps_base_url: String,
    pub mapbox_base_url: String,
    pub serpapi_base_url: String,
    /// Per-request timeout applied to every tool HTTP client.
    pub request_timeout_secs: u64,
    /// Where downloaded satellite images are written.
    pub image_dir: PathBuf,
    /// `hl` parameter of the search API.
    pub search_language: String,
    pub search_results: u32,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            mapbox_token: None,
            serp_api_key: None,
            segmentation_url: None,
            maps_base_url: "https://maps.googleapis.com/maps/api".to_string(),
            mapbox_base_url: "https://api.mapbox.com".to_string(),
            serpapi_base_url: "https://serpapi.com".to_string(),
            request_timeout_secs: 20,
            image_dir: PathBuf::from("images"),
            search_language: "it".to_string(),
            search_results: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum model invocations per step before the run fails.
    pub max_iterations: usize,
    /// Run the tool calls of one model turn concurrently.
    pub concurrent_tool_dispatch: bool,
    /// Step names in execution order.
    pub steps: Vec<String>,
    /// Per-step instruction preamble overrides, keyed by step name.
    pub instructions: HashMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            concurrent_tool_dispatch: false,
            steps: vec![
                "position_analysis".to_string(),
                "asset_dimensions".to_string(),
                "competitive_set".to_string(),
            ],
            instructions: HashMap::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ScoutConfig::default();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.pipeline.max_iterations, 25);
        assert_eq!(cfg.pipeline.steps.len(), 3);
        assert!(!cfg.pipeline.concurrent_tool_dispatch);
        assert!(cfg.services.google_api_key.is_none());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[llm]
provider = "azure"
model = "gpt-4o-deploy"
"#;
        let cfg: ScoutConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.llm.provider, "azure");
        assert_eq!(cfg.llm.model, "gpt-4o-deploy");
        // Defaults for unspecified fields
        assert_eq!(cfg.llm.max_tokens, 4096);
        assert_eq!(cfg.services.request_timeout_secs, 20);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[llm]
provider = "openai"
model = "gpt-4.1"
base_url = "http://localhost:8080/v1"
temperature = 0.0
timeout_secs = 30

[services]
google_api_key = "g"
mapbox_token = "m"
serp_api_key = "s"
segmentation_url = "http://localhost:9000/segment"
request_timeout_secs = 5
image_dir = "/tmp/scout"
search_language = "en"

[pipeline]
max_iterations = 8
concurrent_tool_dispatch = true
steps = ["position_analysis"]

[pipeline.instructions]
position_analysis = "Locate the hotel."
"#;
        let cfg: ScoutConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.llm.base_url.as_deref(), Some("http://localhost:8080/v1"));
        assert_eq!(cfg.llm.timeout_secs, 30);
        assert_eq!(cfg.services.mapbox_token.as_deref(), Some("m"));
        assert_eq!(cfg.services.image_dir, PathBuf::from("/tmp/scout"));
        assert_eq!(cfg.pipeline.max_iterations, 8);
        assert!(cfg.pipeline.concurrent_tool_dispatch);
        assert_eq!(cfg.pipeline.steps, vec!["position_analysis".to_string()]);
        assert_eq!(
            cfg.pipeline.instructions.get("position_analysis").map(String::as_str),
            Some("Locate the hotel.")
        );
    }

    #[test]
    fn test_env_overrides_and_defaults() {
        // Part 1: env overrides
        std::env::set_var("SERP_API_KEY", "serp-test");
        std::env::set_var("SCOUT_MAX_ITERATIONS", "7");

        let mut cfg = ScoutConfig::default();
        cfg.apply_env_overrides();

        assert_eq!(cfg.services.serp_api_key.as_deref(), Some("serp-test"));
        assert_eq!(cfg.pipeline.max_iterations, 7);

        // Clean up env vars before testing defaults
        std::env::remove_var("SERP_API_KEY");
        std::env::remove_var("SCOUT_MAX_ITERATIONS");

        // Part 2: nonexistent path returns defaults (no env interference)
        let cfg = ScoutConfig::load_or_default("/nonexistent/path.toml");
        assert_eq!(cfg.pipeline.max_iterations, 25);
    }
}
