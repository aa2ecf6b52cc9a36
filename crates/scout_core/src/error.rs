//! Typed failures at the structural boundaries of a run.
//!
//! Tool failures are informational: they end up in the turn log as error
//! tool-results. Pipeline failures are fatal to the run and are surfaced to
//! the caller.

use thiserror::Error;

use crate::state::StepKind;
use crate::tools::ToolErrorKind;

/// Failure of a single tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `retryable` is false when the upstream rejected the call itself
    /// (missing credentials, 4xx, denied request).
    #[error("{service} error: {message}")]
    ExternalService {
        service: String,
        message: String,
        retryable: bool,
    },

    #[error("{service} timed out")]
    Timeout { service: String },
}

impl ToolError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Upstream failure that may clear up on its own.
    pub fn external(service: &str, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.to_string(),
            message: message.into(),
            retryable: true,
        }
    }

    /// Upstream refusal that repeats until configuration or arguments change.
    pub fn rejected(service: &str, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.to_string(),
            message: message.into(),
            retryable: false,
        }
    }

    /// Whether retrying the same call could plausibly succeed.
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            Self::InvalidArgument(_) => ToolErrorKind::Permanent,
            Self::ExternalService { retryable: false, .. } => ToolErrorKind::Permanent,
            Self::ExternalService { .. } | Self::Timeout { .. } => ToolErrorKind::Transient,
        }
    }
}

/// Failure to turn free-form model output into a validated record.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no JSON object found in model output")]
    NoObject,

    #[error("schema mismatch: {0}")]
    Schema(String),
}

/// Fatal run-level failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("step '{step}': extraction failed: {source}")]
    Extraction {
        step: StepKind,
        #[source]
        source: ExtractionError,
    },

    #[error("step '{step}' exceeded the limit of {limit} model invocations")]
    IterationLimit { step: StepKind, limit: usize },

    #[error("step '{step}' finished without an assistant turn")]
    MissingFinalTurn { step: StepKind },

    #[error("step '{step}': model call failed: {source}")]
    Model {
        step: StepKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid pipeline configuration: {0}")]
    Configuration(String),
}
