pub mod config;
pub mod error;
pub mod geo;
pub mod records;
pub mod state;
pub mod tools;
pub mod turn;

pub use config::ScoutConfig;
pub use error::{ExtractionError, PipelineError, ToolError};
pub use geo::Coordinates;
pub use records::{
    Amenity, AssetDimensions, CompetitiveSet, Competitor, Measure, NearbyCity, PositionAnalysis,
    SourcedValue, StructuredRecord, Validate,
};
pub use state::{RunState, StepKind, StepResults};
pub use tools::{Tool, ToolErrorKind, ToolHandler, ToolInputSchema, ToolOutcome};
pub use turn::{ContentBlock, Role, ToolCallRequest, Turn};
