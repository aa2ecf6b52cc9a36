//! Tool abstraction types, shared between the tool layer and the reasoning crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

/// JSON tool definition sent to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
}

/// JSON Schema for tool input parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: Value,
    pub required: Vec<String>,
}

impl ToolInputSchema {
    pub fn object(properties: Value, required: &[&str]) -> Self {
        Self {
            schema_type: "object".to_string(),
            properties,
            required: required.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Classification of tool execution errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolErrorKind {
    /// Timeout, network failure, upstream 5xx or rate limiting. A later call may succeed.
    Transient,
    /// Bad arguments, unknown tool, missing credentials or an upstream 4xx. Repeating the same call fails again.
    Permanent,
}

/// Structured result from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
    pub error_kind: Option<ToolErrorKind>,
}

impl ToolOutcome {
    pub fn ok(content: String) -> Self {
        Self { content, is_error: false, error_kind: None }
    }

    /// Successful outcome carrying a JSON value.
    pub fn json(value: &Value) -> Self {
        Self::ok(value.to_string())
    }

    pub fn transient_error(msg: String) -> Self {
        Self { content: msg, is_error: true, error_kind: Some(ToolErrorKind::Transient) }
    }

    pub fn permanent_error(msg: String) -> Self {
        Self { content: msg, is_error: true, error_kind: Some(ToolErrorKind::Permanent) }
    }
}

impl From<ToolError> for ToolOutcome {
    fn from(err: ToolError) -> Self {
        match err.kind() {
            ToolErrorKind::Transient => Self::transient_error(err.to_string()),
            ToolErrorKind::Permanent => Self::permanent_error(err.to_string()),
        }
    }
}

impl From<Result<Value, ToolError>> for ToolOutcome {
    fn from(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(value) => Self::json(&value),
            Err(err) => err.into(),
        }
    }
}

/// Trait for tool handlers that can be registered and dispatched.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Unique name used for dispatch (must match the tool name in schema).
    fn name(&self) -> &str;
    /// Human-readable description, also sent to the model to guide tool selection.
    fn description(&self) -> &str;
    /// JSON schema sent to the LLM so it knows how to call this tool.
    fn schema(&self) -> Tool;
    /// Execute the tool with the given JSON input.
    async fn execute(&self, input: &Value) -> ToolOutcome;
}

/// Read a required string argument.
pub fn require_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::invalid(format!("missing required parameter: \"{key}\"")))
}

/// Read a required numeric argument. Numeric strings are accepted.
pub fn require_f64(input: &Value, key: &str) -> Result<f64, ToolError> {
    let value = input
        .get(key)
        .ok_or_else(|| ToolError::invalid(format!("missing required parameter: \"{key}\"")))?;
    as_f64(value).ok_or_else(|| ToolError::invalid(format!("\"{key}\" must be a number")))
}

pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_from_error_keeps_kind() {
        let outcome: ToolOutcome = ToolError::invalid("bad").into();
        assert!(outcome.is_error);
        assert_eq!(outcome.error_kind, Some(ToolErrorKind::Permanent));
        assert_eq!(outcome.content, "invalid argument: bad");
    }

    #[test]
    fn test_outcome_from_ok_value() {
        let outcome: ToolOutcome = Ok(json!({"area_sqm": 12.5})).into();
        assert!(!outcome.is_error);
        assert_eq!(outcome.content, r#"{"area_sqm":12.5}"#);
    }

    #[test]
    fn test_require_f64_accepts_numeric_strings() {
        let input = json!({"zoom": "18", "lat": 43.7, "bad": "north"});
        assert_eq!(require_f64(&input, "zoom").unwrap(), 18.0);
        assert_eq!(require_f64(&input, "lat").unwrap(), 43.7);
        assert!(require_f64(&input, "bad").is_err());
        assert!(require_f64(&input, "missing").is_err());
    }
}
