pub mod api_types;
pub mod extraction;
pub mod graph;
pub mod llm;
pub mod prompts;
pub mod providers;
pub mod retry;
pub mod router;
pub mod step;
pub mod tool_registry;

pub use graph::AssessmentGraph;
pub use llm::{CompletionParams, LlmClient};
pub use router::{StepPhase, StepRouter};
pub use step::StepDefinition;
pub use tool_registry::ToolRegistry;
