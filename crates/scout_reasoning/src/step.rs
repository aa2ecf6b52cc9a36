use crate::api_types::{Tool, Turn};
use crate::llm::{CompletionParams, LlmClient};
use crate::prompts;
use crate::tool_registry::ToolRegistry;
use anyhow::Result;
use scout_core::error::PipelineError;
use scout_core::state::{RunState, StepKind};

/// Static description of one pipeline step. The tool list never changes
/// after the graph is built.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDefinition {
    pub kind: StepKind,
    pub instructions: String,
    pub tools: Vec<String>,
}

impl StepDefinition {
    pub fn new(kind: StepKind, instructions: impl Into<String>, tools: &[&str]) -> Self {
        Self {
            kind,
            instructions: instructions.into(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Default instructions and tool binding for `kind`.
    pub fn standard(kind: StepKind) -> Self {
        Self::new(
            kind,
            prompts::default_instructions(kind),
            prompts::default_tools(kind),
        )
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn binds(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t == tool)
    }
}

/// A step whose tool identifiers have been resolved against the registry.
#[derive(Debug, Clone)]
pub struct ReasoningStep {
    definition: StepDefinition,
    preamble: String,
    schemas: Vec<Tool>,
}

impl ReasoningStep {
    pub fn bind(definition: StepDefinition, registry: &ToolRegistry) -> Result<Self, PipelineError> {
        let schemas = registry.schemas_for(&definition.tools).map_err(|e| match e {
            PipelineError::Configuration(msg) => {
                PipelineError::Configuration(format!("step '{}': {}", definition.kind, msg))
            }
            other => other,
        })?;
        let preamble = prompts::system_preamble(definition.kind, &definition.instructions);
        Ok(Self {
            definition,
            preamble,
            schemas,
        })
    }

    pub fn definition(&self) -> &StepDefinition {
        &self.definition
    }

    pub fn kind(&self) -> StepKind {
        self.definition.kind
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// One model invocation over the whole log. The resulting assistant turn
    /// is appended to `state` and returned.
    #[tracing::instrument(skip_all, fields(step = %self.kind()))]
    pub async fn invoke(
        &self,
        client: &dyn LlmClient,
        params: &CompletionParams,
        state: &mut RunState,
    ) -> Result<Turn> {
        let response = client
            .complete(
                &self.preamble,
                state.turns().to_vec(),
                self.schemas.clone(),
                params.clone(),
            )
            .await?;
        let turn = response.into_turn();

        let text = turn.text_content();
        if !text.is_empty() {
            tracing::debug!("model text: {}", text.chars().take(500).collect::<String>());
        }
        state.push(turn.clone());
        Ok(turn)
    }
}
