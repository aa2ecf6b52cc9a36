use crate::api_types::Tool;
use scout_core::error::PipelineError;
use scout_core::tools::{ToolHandler, ToolOutcome};
use serde_json::Value;
use std::collections::HashMap;

/// Capability lookup table: tool identifier to handler.
pub struct ToolRegistry {
    handlers: HashMap<String, Box<dyn ToolHandler>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn with_handlers(handlers: Vec<Box<dyn ToolHandler>>) -> Self {
        let mut registry = Self::new();
        for handler in handlers {
            registry.register(handler);
        }
        registry
    }

    /// Register a tool handler. Overwrites any existing handler with the same name.
    pub fn register(&mut self, handler: Box<dyn ToolHandler>) {
        let name = handler.name().to_string();
        tracing::debug!("Registered tool: {}", name);
        self.handlers.insert(name, handler);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Sorted tool identifiers.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Schemas for `names`, in the given order. Fails on the first unknown identifier.
    pub fn schemas_for(&self, names: &[String]) -> Result<Vec<Tool>, PipelineError> {
        names
            .iter()
            .map(|name| {
                self.handlers.get(name).map(|h| h.schema()).ok_or_else(|| {
                    PipelineError::Configuration(format!("unknown tool '{}'", name))
                })
            })
            .collect()
    }

    pub async fn dispatch(&self, name: &str, input: &Value) -> ToolOutcome {
        match self.handlers.get(name) {
            Some(handler) => handler.execute(input).await,
            None => ToolOutcome::permanent_error(format!("Unknown tool: {}", name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::tools::{ToolErrorKind, ToolInputSchema};
    use serde_json::json;

    struct EchoTool;

    #[async_trait::async_trait]
    impl ToolHandler for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn schema(&self) -> Tool {
            Tool {
                name: "echo".into(),
                description: "echoes its input".into(),
                input_schema: ToolInputSchema::object(json!({}), &[]),
            }
        }
        async fn execute(&self, input: &Value) -> ToolOutcome {
            ToolOutcome::json(input)
        }
    }

    #[tokio::test]
    async fn test_dispatch_known_and_unknown() {
        let registry = ToolRegistry::with_handlers(vec![Box::new(EchoTool)]);
        let ok = registry.dispatch("echo", &json!({"a": 1})).await;
        assert!(!ok.is_error);
        assert_eq!(ok.content, r#"{"a":1}"#);

        let missing = registry.dispatch("nope", &json!({})).await;
        assert!(missing.is_error);
        assert_eq!(missing.error_kind, Some(ToolErrorKind::Permanent));
    }

    #[test]
    fn test_schemas_for_rejects_unknown() {
        let registry = ToolRegistry::with_handlers(vec![Box::new(EchoTool)]);
        let schemas = registry.schemas_for(&["echo".to_string()]).unwrap();
        assert_eq!(schemas[0].name, "echo");

        let err = registry
            .schemas_for(&["echo".to_string(), "teleport".to_string()])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(ref m) if m.contains("teleport")));
    }
}
