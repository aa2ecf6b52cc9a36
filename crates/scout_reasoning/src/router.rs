//! Per-step control loop: invoke the model, dispatch requested tools, repeat
//! until a turn arrives without tool calls.

use crate::api_types::Turn;
use crate::llm::{CompletionParams, LlmClient};
use crate::step::{ReasoningStep, StepDefinition};
use crate::tool_registry::ToolRegistry;
use futures_util::future::join_all;
use scout_core::error::PipelineError;
use scout_core::state::RunState;
use scout_core::tools::ToolOutcome;
use scout_core::turn::ToolCallRequest;

#[derive(Debug, Clone, PartialEq)]
pub enum StepPhase {
    AwaitingModel,
    ToolsRequested(Vec<ToolCallRequest>),
    StepComplete,
}

impl StepPhase {
    /// Phase that follows an assistant turn.
    pub fn after(turn: &Turn) -> Self {
        let calls = turn.tool_calls();
        if calls.is_empty() {
            StepPhase::StepComplete
        } else {
            StepPhase::ToolsRequested(calls)
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepRouter {
    max_iterations: usize,
    concurrent: bool,
}

impl StepRouter {
    /// `max_iterations` bounds model invocations per step and must be non-zero.
    pub fn new(max_iterations: usize) -> Result<Self, PipelineError> {
        if max_iterations == 0 {
            return Err(PipelineError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_iterations,
            concurrent: false,
        })
    }

    /// Run the tool calls of one turn concurrently. Results still land in request order.
    pub fn dispatch_concurrently(mut self, enabled: bool) -> Self {
        self.concurrent = enabled;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Drive `step` to completion, returning the number of model invocations.
    pub async fn run_step(
        &self,
        step: &ReasoningStep,
        client: &dyn LlmClient,
        params: &CompletionParams,
        registry: &ToolRegistry,
        state: &mut RunState,
        limit: usize,
    ) -> Result<usize, PipelineError> {
        let kind = step.kind();
        let mut invocations = 0usize;
        let mut phase = StepPhase::AwaitingModel;

        loop {
            phase = match phase {
                StepPhase::AwaitingModel => {
                    invocations += 1;
                    let turn = step
                        .invoke(client, params, state)
                        .await
                        .map_err(|source| PipelineError::Model { step: kind, source })?;
                    StepPhase::after(&turn)
                }
                StepPhase::ToolsRequested(calls) => {
                    if invocations >= limit {
                        tracing::warn!(step = %kind, limit, "iteration limit reached with tools pending");
                        return Err(PipelineError::IterationLimit { step: kind, limit });
                    }
                    tracing::info!(step = %kind, count = calls.len(), "dispatching tool calls");
                    for turn in self.dispatch(step.definition(), &calls, registry).await {
                        state.push(turn);
                    }
                    StepPhase::AwaitingModel
                }
                StepPhase::StepComplete => return Ok(invocations),
            };
        }
    }

    /// One tool-result turn per call, in request order.
    pub async fn dispatch(
        &self,
        step: &StepDefinition,
        calls: &[ToolCallRequest],
        registry: &ToolRegistry,
    ) -> Vec<Turn> {
        let pending = calls.iter().map(|call| dispatch_one(step, call, registry));
        if self.concurrent {
            join_all(pending).await
        } else {
            let mut turns = Vec::with_capacity(calls.len());
            for fut in pending {
                turns.push(fut.await);
            }
            turns
        }
    }
}

async fn dispatch_one(step: &StepDefinition, call: &ToolCallRequest, registry: &ToolRegistry) -> Turn {
    let outcome = if step.binds(&call.name) {
        registry.dispatch(&call.name, &call.arguments).await
    } else {
        ToolOutcome::permanent_error(format!(
            "Tool '{}' is not available in step '{}'",
            call.name,
            step.name()
        ))
    };

    if outcome.is_error {
        tracing::warn!(
            tool = %call.name,
            kind = ?outcome.error_kind,
            "tool failed: {}",
            outcome.content
        );
    } else {
        tracing::debug!(tool = %call.name, "tool succeeded");
    }
    Turn::tool_result(&call.id, outcome.content, outcome.is_error)
}
