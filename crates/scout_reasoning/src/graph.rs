//! The assessment pipeline: a fixed, linear sequence of reasoning steps over
//! one shared run state.

use crate::api_types::Turn;
use crate::extraction;
use crate::llm::{CompletionParams, LlmClient};
use crate::router::StepRouter;
use crate::step::{ReasoningStep, StepDefinition};
use crate::tool_registry::ToolRegistry;
use scout_core::config::{LlmConfig, PipelineConfig};
use scout_core::error::PipelineError;
use scout_core::state::{RunState, StepKind};

pub struct AssessmentGraph {
    steps: Vec<ReasoningStep>,
    client: Box<dyn LlmClient>,
    registry: ToolRegistry,
    router: StepRouter,
    params: CompletionParams,
}

impl std::fmt::Debug for AssessmentGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentGraph")
            .field("steps", &self.step_kinds())
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct GraphBuilder {
    steps: Vec<StepDefinition>,
    client: Option<Box<dyn LlmClient>>,
    registry: Option<ToolRegistry>,
    router: Option<StepRouter>,
    params: CompletionParams,
}

impl GraphBuilder {
    pub fn step(mut self, definition: StepDefinition) -> Self {
        self.steps.push(definition);
        self
    }

    pub fn client(mut self, client: Box<dyn LlmClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn router(mut self, router: StepRouter) -> Self {
        self.router = Some(router);
        self
    }

    pub fn params(mut self, params: CompletionParams) -> Self {
        self.params = params;
        self
    }

    /// Resolve every step's tools against the registry.
    pub fn build(self) -> Result<AssessmentGraph, PipelineError> {
        let missing = |what: &str| PipelineError::Configuration(format!("graph has no {}", what));

        if self.steps.is_empty() {
            return Err(missing("steps"));
        }
        for (i, step) in self.steps.iter().enumerate() {
            if self.steps[..i].iter().any(|s| s.kind == step.kind) {
                return Err(PipelineError::Configuration(format!(
                    "step '{}' appears twice",
                    step.kind
                )));
            }
        }
        let client = self.client.ok_or_else(|| missing("LLM client"))?;
        let router = self.router.ok_or_else(|| missing("router"))?;
        let registry = self.registry.unwrap_or_default();

        let steps = self
            .steps
            .into_iter()
            .map(|def| ReasoningStep::bind(def, &registry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AssessmentGraph {
            steps,
            client,
            registry,
            router,
            params: self.params,
        })
    }
}

impl AssessmentGraph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    /// Build the pipeline described by configuration: step order, instruction
    /// overrides, iteration cap and dispatch mode.
    pub fn from_config(
        pipeline: &PipelineConfig,
        llm: &LlmConfig,
        client: Box<dyn LlmClient>,
        registry: ToolRegistry,
    ) -> Result<Self, PipelineError> {
        let router = StepRouter::new(pipeline.max_iterations)?
            .dispatch_concurrently(pipeline.concurrent_tool_dispatch);
        let mut builder = Self::builder()
            .client(client)
            .registry(registry)
            .router(router)
            .params(CompletionParams {
                max_tokens: llm.max_tokens,
                temperature: llm.temperature,
            });

        for name in &pipeline.steps {
            let kind = StepKind::parse(name)
                .ok_or_else(|| PipelineError::Configuration(format!("unknown step '{}'", name)))?;
            let mut definition = StepDefinition::standard(kind);
            if let Some(instructions) = pipeline.instructions.get(name) {
                definition = definition.with_instructions(instructions.clone());
            }
            builder = builder.step(definition);
        }
        for key in pipeline.instructions.keys() {
            if !pipeline.steps.contains(key) {
                tracing::warn!("instructions given for step '{}' which is not in the pipeline", key);
            }
        }
        builder.build()
    }

    pub fn step_kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(ReasoningStep::kind).collect()
    }

    /// Seed a run with one user turn and execute it.
    pub async fn assess(&self, request: &str) -> Result<RunState, PipelineError> {
        self.run(RunState::seeded(Turn::user(request)), None).await
    }

    /// Execute every step in order. `limit` overrides the router's per-step
    /// iteration cap for this run.
    #[tracing::instrument(skip_all, fields(run_id = %state.run_id))]
    pub async fn run(&self, mut state: RunState, limit: Option<usize>) -> Result<RunState, PipelineError> {
        let limit = match limit {
            Some(0) => {
                return Err(PipelineError::Configuration(
                    "iteration limit must be at least 1".to_string(),
                ))
            }
            Some(n) => n,
            None => self.router.max_iterations(),
        };

        for step in &self.steps {
            let kind = step.kind();
            let start = state.turns().len();
            tracing::info!(step = %kind, "step started");

            let invocations = self
                .router
                .run_step(step, &*self.client, &self.params, &self.registry, &mut state, limit)
                .await?;

            let text = state
                .last_assistant_since(start)
                .map(Turn::text_content)
                .ok_or(PipelineError::MissingFinalTurn { step: kind })?;
            let record = extraction::extract_for(kind, &text).map_err(|source| {
                tracing::warn!(step = %kind, "extraction failed: {}", source);
                PipelineError::Extraction { step: kind, source }
            })?;
            state.complete_step(record);
            tracing::info!(step = %kind, invocations, "step completed");
        }

        tracing::info!(steps = state.completed_steps.len(), "run finished");
        Ok(state)
    }
}
