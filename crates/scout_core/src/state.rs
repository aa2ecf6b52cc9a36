//! Shared run state threaded through every step of a run.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::records::{AssetDimensions, CompetitiveSet, PositionAnalysis, StructuredRecord};
use crate::turn::{Role, Turn};

/// Identity of a pipeline step and of the record it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    PositionAnalysis,
    AssetDimensions,
    CompetitiveSet,
}

impl StepKind {
    pub const ALL: [StepKind; 3] = [
        StepKind::PositionAnalysis,
        StepKind::AssetDimensions,
        StepKind::CompetitiveSet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PositionAnalysis => "position_analysis",
            Self::AssetDimensions => "asset_dimensions",
            Self::CompetitiveSet => "competitive_set",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed slot per step. A step only ever writes its own slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepResults {
    pub position_analysis: Option<PositionAnalysis>,
    pub asset_dimensions: Option<AssetDimensions>,
    pub competitive_set: Option<CompetitiveSet>,
}

impl StepResults {
    /// Write a record into the slot matching its kind.
    pub fn store(&mut self, record: StructuredRecord) {
        match record {
            StructuredRecord::Position(r) => self.position_analysis = Some(r),
            StructuredRecord::Dimensions(r) => self.asset_dimensions = Some(r),
            StructuredRecord::CompetitiveSet(r) => self.competitive_set = Some(r),
        }
    }

    pub fn get(&self, kind: StepKind) -> Option<StructuredRecord> {
        match kind {
            StepKind::PositionAnalysis => {
                self.position_analysis.clone().map(StructuredRecord::Position)
            }
            StepKind::AssetDimensions => {
                self.asset_dimensions.clone().map(StructuredRecord::Dimensions)
            }
            StepKind::CompetitiveSet => {
                self.competitive_set.clone().map(StructuredRecord::CompetitiveSet)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub run_id: Uuid,
    turns: Vec<Turn>,
    pub results: StepResults,
    /// Steps that reached completion, in pipeline order.
    pub completed_steps: Vec<StepKind>,
}

impl RunState {
    /// Create a run with its single seed turn.
    pub fn seeded(seed: Turn) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            turns: vec![seed],
            results: StepResults::default(),
            completed_steps: Vec::new(),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Append a turn. The log is never rewritten.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Last assistant turn appended at or after `from`.
    pub fn last_assistant_since(&self, from: usize) -> Option<&Turn> {
        self.turns
            .get(from..)?
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant)
    }

    pub fn complete_step(&mut self, record: StructuredRecord) {
        self.completed_steps.push(record.kind());
        self.results.store(record);
    }

    /// Record of the most recently completed step.
    pub fn final_record(&self) -> Option<StructuredRecord> {
        self.completed_steps
            .last()
            .and_then(|kind| self.results.get(*kind))
    }
}
